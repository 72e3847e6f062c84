use thiserror::Error;

/// Error type that captures storage and parsing failures around the books.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Invalid month `{0}`, expected YYYY-MM")]
    InvalidMonth(String),
    #[error("Invalid reference: {0}")]
    InvalidRef(String),
}
