//! Read-only view of a namespace, as a remote file browser shows it.

use crate::context::Context;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use s3sync_storage::{BackendHandle, ObjectInfo};
use std::path::PathBuf;

/// One row of a namespace listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Last key segment
    pub name: String,
    /// Where the object lands relative to a restore root
    pub relative: PathBuf,
    /// Key, size and last modified time; hand these back to
    /// [`restore_selected`](crate::restore::restore_selected).
    pub object: ObjectInfo,
}

/// List every object in the namespace, draining all listing pages.
///
/// Keys that could never be restored (the namespace placeholder itself, or
/// anything that would escape a restore root) are left out with a warning.
pub async fn browse(backend: &BackendHandle, ctx: &Context) -> Result<Vec<Entry>> {
    let prefix = ctx.namespace_prefix();
    let objects = backend.list(&prefix).await.or_raise(|| ErrorKind::Browse)?;
    let entries = objects
        .into_iter()
        .filter_map(|object| match ctx.relative_path(&object.key) {
            Ok(relative) => Some(Entry {
                name: object.name().to_string(),
                relative,
                object,
            }),
            Err(e) => {
                tracing::warn!(key = %object.key, error = ?e, "Leaving unrestorable key out of listing");
                None
            },
        })
        .collect();
    Ok(entries)
}
