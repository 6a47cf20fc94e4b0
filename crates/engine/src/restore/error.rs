//! Error types for the [`restore`](super) module.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A restore error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for restore operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a restore failure.
///
/// Only [`ErrorKind::Listing`] ends a pass; the rest are reported against
/// the object they happened to.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The namespace could not be listed; nothing has been downloaded.
    #[display("unable to list remote objects")]
    Listing,
    /// The key does not belong to the namespace, or would land outside the
    /// destination.
    #[display("refusing to restore key {_0:?}")]
    Key(#[error(not(source))] String),
    /// A directory under the destination could not be created.
    #[display("unable to create {}", _0.display())]
    Filesystem(#[error(not(source))] PathBuf),
    /// The download itself failed.
    #[display("download failed")]
    Storage,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Listing | Self::Filesystem(_) | Self::Storage)
    }
}
