//! Command Error Types

use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Config could not be loaded, or is not enough for the command
    #[display("invalid configuration")]
    Config,
    /// Neither the command line nor the config names a directory
    #[display("no directory given, and no {_0} configured")]
    NoDirectory(#[error(not(source))] &'static str),
    #[display("backup failed")]
    Backup,
    #[display("restore failed")]
    Restore,
    #[display("unable to list backed up files")]
    List,
    /// Requested keys are not part of the namespace
    #[display("not in the backup: {}", _0.join(", "))]
    NotInBackup(#[error(not(source))] Vec<String>),
    /// The pass finished, but some items could not be transferred
    #[display("{_0} file(s) could not be transferred")]
    Incomplete(#[error(not(source))] u64),
    #[display("interrupted")]
    Interrupted,
}
