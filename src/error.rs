use std::path::PathBuf;
use thiserror::Error;

use crate::normalize::{NormalizeError, Overflow};

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse notebook: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unsupported notebook: {0}")]
    Unsupported(String),

    #[error("invalid question marker: {0}")]
    Marker(String),

    #[error("render failed: {0}")]
    Render(String),

    #[error("malformed question regions: {0}")]
    Regions(String),

    #[error("{}", describe_overflows(.0))]
    Overflow(Vec<Overflow>),

    #[error("expected {expected} questions but found {found}")]
    QuestionCountMismatch { expected: usize, found: usize },

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("failed to open PDF {}: {source}", path.display())]
    OpenPdf {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<NormalizeError> for ConvertError {
    fn from(e: NormalizeError) -> Self {
        match e {
            NormalizeError::Overflow(overflows) => ConvertError::Overflow(overflows),
            NormalizeError::MalformedRegions(msg) => ConvertError::Regions(msg),
        }
    }
}

fn describe_overflows(overflows: &[Overflow]) -> String {
    let parts: Vec<String> = overflows.iter().map(|o| o.to_string()).collect();
    format!("page budget exceeded: {}", parts.join("; "))
}

pub type Result<T, E = ConvertError> = std::result::Result<T, E>;
