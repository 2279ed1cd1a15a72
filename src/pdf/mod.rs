pub mod document;
pub mod outline;
pub mod writer;

pub use document::PdfDocument;
