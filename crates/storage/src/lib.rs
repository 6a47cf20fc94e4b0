pub mod backend;
pub mod error;
mod key;
mod models;

pub use crate::backend::StorageBackend;
pub use crate::key::{normalize as normalize_key, to_path as key_to_path};
pub use crate::models::{Metadata, ObjectInfo};
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
