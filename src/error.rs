use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SwhidError {
    /// Malformed textual identifier.
    #[error("parse error: {0}")]
    Parse(String),

    /// Well-formed input carrying semantically invalid data.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error("archive error: {0}")]
    Archive(String),

    #[error("invalid permission table: {0}")]
    PermissionTable(#[from] serde_json::Error),

    #[error("content too large: {length} bytes exceeds limit of {limit}")]
    ContentTooLarge { length: u64, limit: u64 },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl SwhidError {
    pub(crate) fn parse(msg: impl Into<String>) -> Self {
        SwhidError::Parse(msg.into())
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        SwhidError::Validation(msg.into())
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, SwhidError::Parse(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, SwhidError::Validation(_))
    }
}

impl From<zip::result::ZipError> for SwhidError {
    fn from(err: zip::result::ZipError) -> Self {
        SwhidError::Archive(err.to_string())
    }
}
