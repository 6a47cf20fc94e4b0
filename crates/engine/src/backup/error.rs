//! Error types for the [`backup`](super) module.
//!
//! Uses [`exn`] for automatic location tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A backup error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for backup operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a backup failure.
///
/// ### Pass Errors
/// - [`ErrorKind::Root`] - the whole pass is rejected before any network call.
///
/// ### File Errors
/// - [`ErrorKind::Walk`]
/// - [`ErrorKind::Key`]
/// - [`ErrorKind::Fingerprint`]
/// - [`ErrorKind::Storage`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The sync root is missing or not a directory.
    #[display("backup root is not a readable directory: {}", _0.display())]
    Root(#[error(not(source))] PathBuf),
    /// A directory (or entry) under the root could not be read.
    #[display("unable to read {}", _0.display())]
    Walk(#[error(not(source))] PathBuf),
    /// The relative path cannot be turned into an object key.
    #[display("unable to derive object key")]
    Key,
    /// The file could not be read for hashing.
    #[display("unable to fingerprint {}", _0.display())]
    Fingerprint(#[error(not(source))] PathBuf),
    /// The upload itself failed.
    #[display("upload failed")]
    Storage,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Walk(_) | Self::Fingerprint(_) | Self::Storage)
    }
}
