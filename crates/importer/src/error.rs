use std::fmt;

use thiserror::Error;

use crate::rating::EngineError;

pub type Result<T> = std::result::Result<T, ImporterError>;

#[derive(Error, Debug)]
pub enum ImporterError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Failed to parse JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Unexpected feed format: {0}")]
    FeedFormatError(String),

    #[error("Data integrity error: {0}")]
    DataIntegrityError(String),

    #[error("Rating engine error: {0}")]
    EngineError(#[from] EngineError),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    StorageError(#[from] storage::error::StorageError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Coarse classification of a run failure, kept for the failure log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Fetch,
    FeedFormat,
    DataIntegrity,
    Engine,
    Storage,
    Io,
}

impl ImporterError {
    pub fn kind(&self) -> FailureKind {
        match self {
            // reqwest reports a body that is not the expected JSON as a decode error
            Self::RequestError(e) if e.is_decode() => FailureKind::FeedFormat,
            Self::RequestError(_) => FailureKind::Fetch,
            Self::ParseError(_) | Self::FeedFormatError(_) => FailureKind::FeedFormat,
            Self::DataIntegrityError(_) => FailureKind::DataIntegrity,
            Self::EngineError(_) => FailureKind::Engine,
            Self::DatabaseError(_) | Self::StorageError(_) => FailureKind::Storage,
            Self::IoError(_) => FailureKind::Io,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fetch => "fetch",
            Self::FeedFormat => "feed_format",
            Self::DataIntegrity => "data_integrity",
            Self::Engine => "engine",
            Self::Storage => "storage",
            Self::Io => "io",
        };
        f.write_str(name)
    }
}
