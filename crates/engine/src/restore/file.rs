use crate::context::Context;
use crate::restore::error::{ErrorKind, Result};
use exn::ResultExt;
use s3sync_storage::{BackendHandle, ObjectInfo};
use std::path::{Path, PathBuf};
use tracing::instrument;

/// What a restored object turned into on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Restored {
    File { path: PathBuf, bytes: u64 },
    /// Folder markers (and the namespace root itself) only create a directory.
    Directory(PathBuf),
}

/// Download a single object to its place under `destination`.
///
/// The namespace prefix is stripped from the key and the remainder is mapped
/// onto a relative path; a key that would escape `destination` is refused.
/// Missing parent directories are created and an existing file is always
/// overwritten. Against a dry-run backend no directory is created.
#[instrument(skip_all, fields(key = %object.key))]
pub async fn restore_object(
    backend: &BackendHandle,
    ctx: &Context,
    object: &ObjectInfo,
    destination: &Path,
) -> Result<Restored> {
    let refuse = || ErrorKind::Key(object.key.clone());
    let remainder = ctx.key_remainder(&object.key).or_raise(refuse)?;
    let dry_run = backend.is_dry_run();
    if remainder.trim_matches('/').is_empty() {
        if !dry_run {
            create_dir(destination).await?;
        }
        return Ok(Restored::Directory(destination.to_path_buf()));
    }
    let path = destination.join(ctx.relative_path(&object.key).or_raise(refuse)?);

    if object.is_folder_marker() {
        if !dry_run {
            create_dir(&path).await?;
        }
        tracing::debug!(path = %path.display(), "Created directory for folder marker");
        return Ok(Restored::Directory(path));
    }
    if let Some(parent) = path.parent().filter(|_| !dry_run) {
        create_dir(parent).await?;
    }
    let bytes = backend.download(&object.key, &path).await.or_raise(|| ErrorKind::Storage)?;
    tracing::debug!(target = backend.name(), path = %path.display(), bytes, "Restored file");
    Ok(Restored::File { path, bytes })
}

async fn create_dir(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path).await.or_raise(|| ErrorKind::Filesystem(path.to_path_buf()))
}
