use crate::backup::error::{ErrorKind as BackupErrorKind, Result as BackupResult};
use crate::backup::file::{Action, Backup, backup_file};
use crate::backup::walk::walk;
use crate::context::Context;
use crate::error::{ErrorKind as EngineErrorKind, Result as EngineResult};
use crate::local::LocalMeta;
use async_stream::stream;
use exn::ResultExt;
use futures::Stream;
use s3sync_storage::BackendHandle;
use std::path::PathBuf;

#[derive(Debug)]
pub enum BackupEvent {
    Started,
    /// Every file under the root has been found. `bytes` is the total the
    /// per-file deltas add up to.
    DiscoveryComplete { files: u64, bytes: u64 },
    Processed(Box<Report>),
    Complete(BackupSummary),
}

/// Outcome for a single local file.
#[derive(Debug)]
pub struct Report {
    pub file: LocalMeta,
    pub result: BackupResult<Backup>,
}
impl Report {
    /// Bytes to advance progress by. Every file counts, whatever happened to
    /// it, so a finished pass always adds up to the discovered total.
    pub fn delta(&self) -> u64 {
        self.file.size
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackupSummary {
    pub uploaded: u64,
    pub unchanged: u64,
    pub skipped: u64,
    pub failed: u64,
    pub bytes_uploaded: u64,
}
impl BackupSummary {
    fn record(&mut self, report: &Report) {
        match report.result.as_ref().map(|backup| backup.action) {
            Ok(Action::Uploaded) => {
                self.uploaded += 1;
                self.bytes_uploaded += report.file.size;
            },
            Ok(Action::Unchanged) => self.unchanged += 1,
            Ok(Action::Skipped) => self.skipped += 1,
            Err(_) => self.failed += 1,
        }
    }

    pub fn files(&self) -> u64 {
        self.uploaded + self.unchanged + self.skipped + self.failed
    }
}

/// Run the upload pass over everything under `root`.
///
/// Only a root that is missing or not a directory ends the stream with an
/// error, and that happens before the backend is ever touched. Anything that
/// goes wrong with an individual file is carried on its [`Report`].
pub fn backup<'a>(
    backend: &'a BackendHandle,
    ctx: &'a Context,
    root: impl Into<PathBuf>,
) -> impl Stream<Item = EngineResult<BackupEvent>> + 'a {
    let root = root.into();
    stream! {
        for await event in backup_inner(backend, ctx, root) {
            yield event.or_raise(|| EngineErrorKind::Backup);
        }
    }
}

fn backup_inner<'a>(
    backend: &'a BackendHandle,
    ctx: &'a Context,
    root: PathBuf,
) -> impl Stream<Item = BackupResult<BackupEvent>> + 'a {
    stream! {
        yield Ok(BackupEvent::Started);
        match tokio::fs::metadata(&root).await {
            Ok(metadata) if metadata.is_dir() => {},
            Ok(_) => {
                yield Err(exn::Exn::from(BackupErrorKind::Root(root.clone())));
                return;
            },
            Err(err) => {
                yield Err::<BackupEvent, _>(err).or_raise(|| BackupErrorKind::Root(root.clone()));
                return;
            },
        }

        // Discovery first, so that the total is known before the first byte
        // is sent.
        let mut files = Vec::new();
        for await entry in walk(&root) {
            match entry {
                Ok(file) => files.push(file),
                Err(e) => tracing::warn!(error = ?e, "Skipping unreadable part of the backup root"),
            }
        }
        files.sort_by(|a, b| a.relative.cmp(&b.relative));
        let bytes: u64 = files.iter().map(|file| file.size).sum();
        tracing::debug!(root = %root.display(), files = files.len(), bytes, "Discovery complete");
        yield Ok(BackupEvent::DiscoveryComplete { files: files.len() as u64, bytes });

        let mut summary = BackupSummary::default();
        for file in files {
            let meta = file.meta().clone();
            let result = backup_file(backend, ctx, file).await;
            let report = Report { file: meta, result };
            summary.record(&report);
            yield Ok(BackupEvent::Processed(Box::new(report)));
        }
        tracing::info!(
            namespace = ctx.namespace(),
            uploaded = summary.uploaded,
            unchanged = summary.unchanged,
            skipped = summary.skipped,
            failed = summary.failed,
            "Backup pass complete"
        );
        yield Ok(BackupEvent::Complete(summary));
    }
}
