//! Centralized error types for emldigest.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the emldigest library.
#[derive(Error, Debug)]
pub enum DigestError {
    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The archive directory does not exist.
    #[error("Message archive not found: {0}")]
    StoreNotFound(PathBuf),

    /// Every configured encoding failed to decode a message.
    #[error("Cannot decode '{path}' with any of: {}", tried.join(", "))]
    DecodeFailed { path: PathBuf, tried: Vec<String> },

    /// The message carries no `Date` header.
    #[error("Message '{0}' has no Date header")]
    MissingDate(String),

    /// The `Date` header could not be parsed.
    #[error("Message '{id}' has unparseable date: '{value}'")]
    InvalidDate { id: String, value: String },

    /// The metadata cache file is corrupt or was written by an incompatible version.
    #[error("Corrupt or incompatible metadata cache '{path}': {reason}")]
    InvalidCache { path: PathBuf, reason: String },

    /// The clustering stage failed for the whole corpus.
    #[error("Clustering failed: {0}")]
    Clustering(String),
}

/// Convenience alias for `Result<T, DigestError>`.
pub type Result<T> = std::result::Result<T, DigestError>;

impl DigestError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Allow `?` on `std::io::Error` inside functions returning `DigestError`
/// when no path context is available (rare — prefer `DigestError::io`).
impl From<std::io::Error> for DigestError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}
