//! Engine Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Each pass ([`backup`](crate::backup),
//! [`restore`](crate::restore)) has its own error kinds that get raised into
//! one of these when they leave the pass.

use derive_more::{Display, Error};

/// An engine error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Namespace is not a single, non-special key segment
    #[display("invalid namespace: {_0:?}")]
    InvalidNamespace(#[error(not(source))] String),
    /// Backup prefix cannot be turned into a key fragment
    #[display("invalid backup prefix: {_0:?}")]
    InvalidPrefix(#[error(not(source))] String),
    /// A local path could not be mapped onto an object key (or back)
    #[display("unable to map between object key and local path")]
    Key,
    /// The upload pass could not run
    #[display("backup failed")]
    Backup,
    /// The restore pass could not run
    #[display("restore failed")]
    Restore,
    /// The namespace could not be listed for browsing
    #[display("unable to browse namespace")]
    Browse,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Backup | Self::Restore | Self::Browse)
    }
}
