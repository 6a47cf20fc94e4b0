//! Storage Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Object does not exist under the given key
    #[display("object not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// Access denied (permissions or credentials)
    #[display("permission denied: {_0}")]
    PermissionDenied(#[error(not(source))] String),
    /// Underlying I/O error on the local side of a transfer
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// The local file taking part in a transfer could not be opened
    #[display("unable to access local file: {}", _0.display())]
    LocalFile(#[error(not(source))] PathBuf),
    /// Network-related error (S3 connections, timeouts, etc.)
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// Path contains invalid characters or escapes root
    #[display("invalid path: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    /// Object key cannot be mapped back onto a local path
    #[display("invalid key: {_0}")]
    InvalidKey(#[error(not(source))] String),
    /// Backend-specific error
    #[display("backend error: {_0}")]
    BackendError(#[error(not(source))] String),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Network(_) | Self::BackendError(_))
    }

    /// Returns `true` if the error means "there is nothing under that key".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(ErrorKind::NotFound("backup/a.txt".to_string()).to_string(), "object not found: backup/a.txt");
        assert_eq!(ErrorKind::InvalidKey("../x".to_string()).to_string(), "invalid key: ../x");
    }

    #[test]
    fn test_retryable() {
        assert!(ErrorKind::Network("timeout".to_string()).is_retryable());
        assert!(!ErrorKind::NotFound("a".to_string()).is_retryable());
        assert!(!ErrorKind::PermissionDenied("a".to_string()).is_retryable());
    }
}
