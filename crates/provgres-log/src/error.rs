//! Error types for the log crate.

use thiserror::Error;

/// Errors raised while writing, reading or parsing a session log.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown record tag '{tag}'")]
    UnknownTag { tag: String },

    #[error("malformed {tag} record: {line}")]
    Malformed { tag: String, line: String },

    #[error("invalid hex payload: {0}")]
    InvalidHex(String),
}
