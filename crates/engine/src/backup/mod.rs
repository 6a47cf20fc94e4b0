//! Change-detecting upload pass.

pub mod error;
mod file;
mod stream;
mod walk;

pub use self::file::{Action, Backup, backup_file};
pub use self::stream::{BackupEvent, BackupSummary, Report, backup};
