//! Config Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// All of these are raised before any network call is made.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// An explicitly requested config file does not exist
    #[display("config file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// Config file extension is not one of toml, yaml, yml or json
    #[display("unsupported config format: {}", _0.display())]
    UnknownFormat(#[error(not(source))] PathBuf),
    /// The merged sources could not be turned into a [`Config`](crate::Config)
    #[display("unable to load configuration")]
    Load,
    /// A setting required for the requested command is blank
    #[display("missing required setting: {_0}")]
    Missing(#[error(not(source))] &'static str),
    /// A recurring backup cannot run every zero units
    #[display("backup interval must be greater than zero")]
    ZeroInterval,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}

/// Returned when parsing an interval unit from a string.
#[derive(Debug, Display, Error)]
#[display("unknown interval unit {_0:?} (expected seconds, minutes, hours or days)")]
pub struct UnknownUnit(#[error(not(source))] pub String);
