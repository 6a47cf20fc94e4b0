//! Command Runners
//!
//! Each command drives one of the engine's event streams and turns its
//! events into log lines. Per-file results are logged as they arrive, along
//! with the overall percentage.

use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use futures::StreamExt;
use s3sync_engine::backup::{Action, BackupEvent, BackupSummary};
use s3sync_engine::browse::{Entry, browse};
use s3sync_engine::restore::{RestoreEvent, RestoreSummary, Restored};
use s3sync_engine::{Context, Progress};
use s3sync_storage::{BackendHandle, ObjectInfo};
use std::path::{Path, PathBuf};
use std::pin::pin;
use std::time::Duration;
use time::macros::format_description;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Pick the directory from the command line, falling back to the config.
pub fn directory(given: Option<PathBuf>, configured: Option<&PathBuf>, setting: &'static str) -> Result<PathBuf> {
    given.or_else(|| configured.cloned()).ok_or_raise(|| ErrorKind::NoDirectory(setting))
}

/// One upload pass. Ctrl-C stops it between files.
pub async fn backup(
    backend: &BackendHandle,
    ctx: &Context,
    root: &Path,
    cancel: &CancellationToken,
) -> Result<BackupSummary> {
    tracing::info!(root = %root.display(), namespace = ctx.namespace(), "Starting backup");
    let mut events = pin!(s3sync_engine::backup::backup(backend, ctx, root));
    let mut progress = Progress::default();
    let mut summary = None;
    while let Some(event) = events.next().await {
        match event.or_raise(|| ErrorKind::Backup)? {
            BackupEvent::Started => {},
            BackupEvent::DiscoveryComplete { files, bytes } => {
                tracing::info!(files, bytes, "Found files to check");
                progress = Progress::new(bytes);
            },
            BackupEvent::Processed(report) => {
                progress.advance(report.delta());
                let path = report.file.relative.display();
                let percent = progress.percent();
                match &report.result {
                    Ok(backup) => match backup.action {
                        Action::Uploaded => tracing::info!(%path, key = %backup.key, percent, "Uploaded"),
                        Action::Unchanged => tracing::info!(%path, percent, "Unchanged"),
                        Action::Skipped => tracing::warn!(%path, percent, "Skipped"),
                    },
                    Err(e) => tracing::error!(%path, percent, error = ?e, "Failed"),
                }
            },
            BackupEvent::Complete(s) => summary = Some(s),
        }
        if cancel.is_cancelled() {
            exn::bail!(ErrorKind::Interrupted);
        }
    }
    let summary = summary.ok_or_raise(|| ErrorKind::Backup)?;
    tracing::info!(
        uploaded = summary.uploaded,
        unchanged = summary.unchanged,
        skipped = summary.skipped,
        failed = summary.failed,
        bytes = summary.bytes_uploaded,
        "Backup completed"
    );
    match summary.failed {
        0 => Ok(summary),
        failed => exn::bail!(ErrorKind::Incomplete(failed)),
    }
}

/// Restore the whole namespace, or only `keys` when any are given.
pub async fn restore(
    backend: &BackendHandle,
    ctx: &Context,
    destination: &Path,
    keys: &[String],
    cancel: &CancellationToken,
) -> Result<RestoreSummary> {
    tracing::info!(destination = %destination.display(), namespace = ctx.namespace(), "Starting restore");
    if keys.is_empty() {
        let events = s3sync_engine::restore::restore(backend, ctx, destination, cancel);
        return drive_restore(events).await;
    }
    let entries = browse(backend, ctx).await.or_raise(|| ErrorKind::Restore)?;
    let selected = select(ctx, entries, keys)?;
    let events = s3sync_engine::restore::restore_selected(backend, ctx, selected, destination, cancel);
    drive_restore(events).await
}

/// Resolve keys relative to the namespace against a listing. Every
/// requested key must be present.
fn select(ctx: &Context, entries: Vec<Entry>, keys: &[String]) -> Result<Vec<ObjectInfo>> {
    let wanted = keys
        .iter()
        .map(|key| ctx.object_key(Path::new(key)).or_raise(|| ErrorKind::NotInBackup(vec![key.clone()])))
        .collect::<Result<Vec<_>>>()?;
    let selected: Vec<ObjectInfo> = entries
        .into_iter()
        .filter(|entry| wanted.contains(&entry.object.key))
        .map(|entry| entry.object)
        .collect();
    let missing: Vec<String> = keys
        .iter()
        .zip(&wanted)
        .filter(|(_, full)| !selected.iter().any(|object| &object.key == *full))
        .map(|(key, _)| key.clone())
        .collect();
    if !missing.is_empty() {
        exn::bail!(ErrorKind::NotInBackup(missing));
    }
    Ok(selected)
}

async fn drive_restore(
    events: impl futures::Stream<Item = s3sync_engine::error::Result<RestoreEvent>>,
) -> Result<RestoreSummary> {
    let mut events = pin!(events);
    let mut progress = Progress::default();
    while let Some(event) = events.next().await {
        match event.or_raise(|| ErrorKind::Restore)? {
            RestoreEvent::Started => {},
            RestoreEvent::DiscoveryComplete { objects, bytes } => {
                tracing::info!(objects, bytes, "Found objects to restore");
                progress = Progress::new(bytes);
            },
            RestoreEvent::Processed(report) => {
                progress.advance(report.delta());
                let percent = progress.percent();
                let key = &report.object.key;
                match &report.result {
                    Ok(Restored::File { path, bytes }) => {
                        tracing::info!(path = %path.display(), bytes, percent, "Restored");
                    },
                    Ok(Restored::Directory(path)) => {
                        tracing::info!(path = %path.display(), percent, "Created directory");
                    },
                    Err(e) => tracing::error!(%key, percent, error = ?e, "Failed"),
                }
            },
            RestoreEvent::Cancelled { remaining } => {
                tracing::warn!(remaining, "Restore interrupted");
                exn::bail!(ErrorKind::Interrupted);
            },
            RestoreEvent::Complete(summary) => {
                tracing::info!(
                    files = summary.files,
                    directories = summary.directories,
                    failed = summary.failed,
                    bytes = summary.bytes_downloaded,
                    "Restore completed"
                );
                return match summary.failed {
                    0 => Ok(summary),
                    failed => exn::bail!(ErrorKind::Incomplete(failed)),
                };
            },
        }
    }
    exn::bail!(ErrorKind::Restore)
}

/// Print the namespace, one object per line.
pub async fn list(backend: &BackendHandle, ctx: &Context) -> Result<()> {
    let entries = browse(backend, ctx).await.or_raise(|| ErrorKind::List)?;
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    for entry in &entries {
        let modified = entry.object.modified.format(format).or_raise(|| ErrorKind::List)?;
        println!("{:>12}  {modified}  {}", entry.object.size, entry.relative.display());
    }
    tracing::info!(namespace = ctx.namespace(), objects = entries.len(), "Listing complete");
    Ok(())
}

/// Back up immediately, then once every `period` until cancelled.
///
/// A pass that overruns the period pushes the next one back rather than
/// overlapping it. A failed pass is logged and the schedule carries on.
pub async fn schedule(
    backend: &BackendHandle,
    ctx: &Context,
    root: &Path,
    period: Duration,
    cancel: &CancellationToken,
) -> Result<()> {
    tracing::info!(root = %root.display(), every = ?period, "Scheduled backup started");
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {},
        }
        match backup(backend, ctx, root, cancel).await {
            Ok(_) => tracing::info!(every = ?period, "Scheduled backup finished; waiting for the next run"),
            Err(_) if cancel.is_cancelled() => break,
            Err(e) => tracing::error!(error = ?e, "Scheduled backup failed; will try again next time"),
        }
    }
    tracing::info!("Scheduled backup stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use s3sync_storage::StorageBackend;
    use s3sync_storage::backend::{MockBackend, Operation};
    use std::sync::Arc;

    fn scenario() -> tempfile::TempDir {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(temp_dir.path().join("sub")).unwrap();
        std::fs::write(temp_dir.path().join("a.txt"), b"hello").unwrap();
        std::fs::write(temp_dir.path().join("sub/b.txt"), b"world").unwrap();
        temp_dir
    }

    #[test]
    fn test_directory_fallback() {
        let configured = PathBuf::from("/configured");
        assert_eq!(directory(Some("/given".into()), Some(&configured), "backup_dir").unwrap(), PathBuf::from("/given"));
        assert_eq!(directory(None, Some(&configured), "backup_dir").unwrap(), configured);
        let err = directory(None, None, "restore_dir").unwrap_err();
        assert!(matches!(&*err, ErrorKind::NoDirectory("restore_dir")));
    }

    #[tokio::test]
    async fn test_backup_then_restore_selected() {
        let source = scenario();
        let target = tempfile::tempdir().unwrap();
        let mock = Arc::new(MockBackend::default());
        let backend: BackendHandle = mock.clone();
        let ctx = Context::new("Default").unwrap();
        let cancel = CancellationToken::new();

        let summary = backup(&backend, &ctx, source.path(), &cancel).await.unwrap();
        assert_eq!(summary.uploaded, 2);

        let keys = vec!["sub/b.txt".to_string()];
        let summary = restore(&backend, &ctx, target.path(), &keys, &cancel).await.unwrap();
        assert_eq!(summary.files, 1);
        assert_eq!(std::fs::read(target.path().join("sub").join("b.txt")).unwrap(), b"world");
        assert!(!target.path().join("a.txt").exists());
    }

    #[tokio::test]
    async fn test_restore_unknown_key() {
        let target = tempfile::tempdir().unwrap();
        let backend: BackendHandle = Arc::new(MockBackend::with_objects([("backup/Default/x.txt", b"x".to_vec())]));
        let ctx = Context::new("Default").unwrap();
        let cancel = CancellationToken::new();

        let keys = vec!["x.txt".to_string(), "nope.txt".to_string()];
        let err = restore(&backend, &ctx, target.path(), &keys, &cancel).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotInBackup(missing) if missing == &["nope.txt"]));
        assert!(!target.path().join("x.txt").exists());
    }

    #[tokio::test]
    async fn test_failed_files_fail_the_command() {
        let source = scenario();
        let mock = Arc::new(MockBackend::default().with_failure(Operation::Upload, "backup/Default/a.txt"));
        let backend: BackendHandle = mock.clone();
        let ctx = Context::new("Default").unwrap();
        let cancel = CancellationToken::new();

        let err = backup(&backend, &ctx, source.path(), &cancel).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Incomplete(1)));
        assert!(mock.head("backup/Default/sub/b.txt").await.is_ok());
    }

    #[tokio::test]
    async fn test_cancelled_backup_stops() {
        let source = scenario();
        let mock = Arc::new(MockBackend::default());
        let backend: BackendHandle = mock.clone();
        let ctx = Context::new("Default").unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = backup(&backend, &ctx, source.path(), &cancel).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Interrupted));
        assert_eq!(mock.upload_count(), 0);
    }

    #[tokio::test]
    async fn test_schedule_stops_when_cancelled() {
        let source = scenario();
        let mock = Arc::new(MockBackend::default());
        let backend: BackendHandle = mock.clone();
        let ctx = Context::new("Default").unwrap();
        let cancel = CancellationToken::new();

        let stopper = cancel.clone();
        let watcher = mock.clone();
        tokio::spawn(async move {
            while watcher.upload_count() < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            stopper.cancel();
        });
        schedule(&backend, &ctx, source.path(), Duration::from_secs(3600), &cancel).await.unwrap();
        assert_eq!(mock.upload_count(), 2);
    }
}
