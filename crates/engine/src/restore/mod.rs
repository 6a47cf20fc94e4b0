//! Restore pass: pull a namespace (or part of it) back down.

pub mod error;
mod file;
mod stream;

pub use self::file::{Restored, restore_object};
pub use self::stream::{Report, RestoreEvent, RestoreSummary, restore, restore_selected};
