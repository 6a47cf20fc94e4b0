//! Storage models.
//!
//! These types describe remote objects as reported by a storage backend's
//! listing and metadata operations.

use std::collections::HashMap;
use time::OffsetDateTime;

/// User-defined object metadata (string-to-string, as stored by S3).
pub type Metadata = HashMap<String, String>;

/// Object metadata returned by storage backend listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Full object key, always `/`-separated
    pub key: String,
    /// Object size in bytes
    pub size: u64,
    /// Last modified timestamp
    pub modified: OffsetDateTime,
}
impl ObjectInfo {
    pub fn new(key: impl Into<String>, size: u64, modified: OffsetDateTime) -> Self {
        Self {
            key: key.into(),
            size,
            modified,
        }
    }

    /// Final segment of the key, as shown in a file browser.
    pub fn name(&self) -> &str {
        self.key.trim_end_matches('/').rsplit('/').next().unwrap_or(&self.key)
    }

    /// Zero-sized keys ending in `/` are folder placeholders, not files.
    pub fn is_folder_marker(&self) -> bool {
        self.key.ends_with('/')
    }
}
