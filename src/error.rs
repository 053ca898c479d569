use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EdfError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed header: {0}")]
    MalformedHeader(String),

    #[error("Truncated file: {0}")]
    TruncatedFile(String),

    #[error("Time range out of bounds: {0}")]
    OutOfRange(String),

    #[error("Signal index {0} out of range")]
    InvalidSignalIndex(usize),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Session is unusable after a previous read failure")]
    SessionUnusable,
}

impl EdfError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        EdfError::MalformedHeader(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, EdfError>;
