use crate::backup::error::{ErrorKind, Result};
use crate::context::Context;
use crate::fingerprint::Fingerprint;
use crate::local::LocalFile;
use exn::ResultExt;
use s3sync_storage::BackendHandle;
use tracing::instrument;

/// What the upload pass did with a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// The object was missing or stale, and the file was uploaded.
    Uploaded,
    /// The stored fingerprint matches; nothing was transferred.
    Unchanged,
    /// The remote metadata could not be fetched (for a reason other than
    /// "not found"), so the file was left alone this time round.
    Skipped,
}

/// A successfully handled file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backup {
    pub key: String,
    pub fingerprint: Fingerprint,
    pub action: Action,
}

/// Brings the remote copy of a single local file up to date.
///
/// 1. The file's content is fingerprinted and its object key derived.
/// 2. The object's metadata is fetched. A "not found" means there is no
///    remote copy yet.
/// 3. If the stored fingerprint equals the local one the file is
///    [`Unchanged`](Action::Unchanged). Size and modification time are never
///    consulted.
/// 4. Otherwise the full file is uploaded with the fingerprint attached.
///
/// A metadata fetch that fails for any other reason is logged and the file
/// is [`Skipped`](Action::Skipped) without an upload; there is no retry
/// beyond whatever the backend itself does.
#[instrument(skip_all, fields(path = %file.relative.display()))]
pub async fn backup_file(backend: &BackendHandle, ctx: &Context, file: LocalFile) -> Result<Backup> {
    let key = ctx.object_key(&file.relative).or_raise(|| ErrorKind::Key)?;
    let path = file.path.clone();
    let file = file.fingerprint().await.or_raise(|| ErrorKind::Fingerprint(path))?;

    let remote = match backend.head(&key).await {
        Ok(metadata) => Some(metadata),
        Err(e) if e.is_not_found() => None,
        Err(e) => {
            tracing::warn!(target = backend.name(), key = %key, error = ?e, "Unable to fetch remote metadata; skipping file");
            let fingerprint = file.fingerprint;
            return Ok(Backup { key, fingerprint, action: Action::Skipped });
        },
    };
    if remote.as_ref().is_some_and(|metadata| file.fingerprint.matches(metadata)) {
        tracing::debug!(key = %key, "Skipping unchanged file");
        let fingerprint = file.fingerprint;
        return Ok(Backup { key, fingerprint, action: Action::Unchanged });
    }

    backend.upload(&key, &file.path, file.fingerprint.to_metadata()).await.or_raise(|| ErrorKind::Storage)?;
    tracing::debug!(target = backend.name(), key = %key, bytes = file.size, "Uploaded file");
    let fingerprint = file.fingerprint;
    Ok(Backup { key, fingerprint, action: Action::Uploaded })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::FINGERPRINT_METADATA_KEY;
    use s3sync_storage::Metadata;
    use s3sync_storage::backend::{MockBackend, Operation, StorageBackend};
    use std::path::Path;
    use std::sync::Arc;

    fn local_file(root: &Path, relative: &str, content: &[u8]) -> LocalFile {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        LocalFile::new(path, relative, content.len() as u64)
    }

    #[tokio::test]
    async fn test_new_file_is_uploaded() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mock = Arc::new(MockBackend::default());
        let backend: BackendHandle = mock.clone();
        let ctx = Context::new("Default").unwrap();
        let file = local_file(temp_dir.path(), "a.txt", b"hello");

        let backup = backup_file(&backend, &ctx, file).await.unwrap();
        assert_eq!(backup.action, Action::Uploaded);
        assert_eq!(backup.key, "backup/Default/a.txt");
        let metadata = mock.head("backup/Default/a.txt").await.unwrap();
        assert_eq!(metadata[FINGERPRINT_METADATA_KEY], "5d41402abc4b2a76b9719d911017c592");
        assert_eq!(mock.content("backup/Default/a.txt").await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_matching_fingerprint_is_not_transferred() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mock = Arc::new(MockBackend::default());
        let fingerprint = Fingerprint::of_bytes(b"hello");
        mock.insert("backup/Default/a.txt", b"hello".to_vec(), fingerprint.to_metadata()).await;
        let backend: BackendHandle = mock.clone();
        let ctx = Context::new("Default").unwrap();

        let file = local_file(temp_dir.path(), "a.txt", b"hello");
        let backup = backup_file(&backend, &ctx, file).await.unwrap();
        assert_eq!(backup.action, Action::Unchanged);
        assert_eq!(mock.upload_count(), 0);
    }

    #[tokio::test]
    async fn test_changed_content_overwrites_fingerprint() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mock = Arc::new(MockBackend::default());
        mock.insert("backup/Default/a.txt", b"hello".to_vec(), Fingerprint::of_bytes(b"hello").to_metadata()).await;
        let backend: BackendHandle = mock.clone();
        let ctx = Context::new("Default").unwrap();

        let file = local_file(temp_dir.path(), "a.txt", b"hello, again");
        let backup = backup_file(&backend, &ctx, file).await.unwrap();
        assert_eq!(backup.action, Action::Uploaded);
        let metadata = mock.head("backup/Default/a.txt").await.unwrap();
        assert!(Fingerprint::of_bytes(b"hello, again").matches(&metadata));
        assert_eq!(mock.content("backup/Default/a.txt").await.unwrap(), b"hello, again");
    }

    #[tokio::test]
    async fn test_object_without_fingerprint_is_uploaded() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mock = Arc::new(MockBackend::with_objects([("backup/Default/a.txt", b"hello".to_vec())]));
        let backend: BackendHandle = mock.clone();
        let ctx = Context::new("Default").unwrap();

        let file = local_file(temp_dir.path(), "a.txt", b"hello");
        let backup = backup_file(&backend, &ctx, file).await.unwrap();
        assert_eq!(backup.action, Action::Uploaded);
        assert_eq!(mock.upload_count(), 1);
    }

    #[tokio::test]
    async fn test_metadata_failure_skips_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mock = Arc::new(MockBackend::default().with_failure(Operation::Head, "backup/Default/a.txt"));
        let backend: BackendHandle = mock.clone();
        let ctx = Context::new("Default").unwrap();

        let file = local_file(temp_dir.path(), "a.txt", b"hello");
        let backup = backup_file(&backend, &ctx, file).await.unwrap();
        assert_eq!(backup.action, Action::Skipped);
        assert_eq!(mock.upload_count(), 0);
        assert!(mock.content("backup/Default/a.txt").await.is_none());
    }

    #[tokio::test]
    async fn test_upload_failure_is_an_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mock = Arc::new(MockBackend::default().with_failure(Operation::Upload, "backup/Default/a.txt"));
        let backend: BackendHandle = mock;
        let ctx = Context::new("Default").unwrap();

        let file = local_file(temp_dir.path(), "a.txt", b"hello");
        let err = backup_file(&backend, &ctx, file).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Storage));
    }

    #[tokio::test]
    async fn test_unreadable_file_is_an_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend: BackendHandle = Arc::new(MockBackend::default());
        let ctx = Context::new("Default").unwrap();

        let file = LocalFile::new(temp_dir.path().join("gone.txt"), "gone.txt", 10);
        let err = backup_file(&backend, &ctx, file).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Fingerprint(_)));
    }

    #[tokio::test]
    async fn test_stored_metadata_is_fingerprint_only() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mock = Arc::new(MockBackend::default());
        let backend: BackendHandle = mock.clone();
        let ctx = Context::new("Default").unwrap();
        let file = local_file(temp_dir.path(), "sub/b.txt", b"world");

        backup_file(&backend, &ctx, file).await.unwrap();
        let expected = Metadata::from([(FINGERPRINT_METADATA_KEY.to_string(), "7d793037a0760186574b0282f2f435e7".to_string())]);
        assert_eq!(mock.head("backup/Default/sub/b.txt").await.unwrap(), expected);
    }
}
