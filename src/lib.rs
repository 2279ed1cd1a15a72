//! Convert a Jupyter notebook of written answers into a PDF where every
//! question spans the same number of pages.

pub mod convert;
pub mod error;
pub mod marker;
pub mod normalize;
pub mod notebook;
pub mod pdf;
pub mod regions;
pub mod render;

pub use convert::{convert, convert_with, Conversion, ConvertOptions};
pub use error::ConvertError;
