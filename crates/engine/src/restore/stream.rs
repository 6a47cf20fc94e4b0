use crate::context::Context;
use crate::error::{ErrorKind as EngineErrorKind, Result as EngineResult};
use crate::restore::error::{ErrorKind as RestoreErrorKind, Result as RestoreResult};
use crate::restore::file::{Restored, restore_object};
use async_stream::stream;
use exn::ResultExt;
use futures::Stream;
use s3sync_storage::{BackendHandle, ObjectInfo};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
pub enum RestoreEvent {
    Started,
    DiscoveryComplete { objects: u64, bytes: u64 },
    Processed(Box<Report>),
    /// The token was cancelled; `remaining` objects were never touched and
    /// the stream ends here.
    Cancelled { remaining: u64 },
    Complete(RestoreSummary),
}

/// Outcome for a single remote object.
#[derive(Debug)]
pub struct Report {
    pub object: ObjectInfo,
    pub result: RestoreResult<Restored>,
}
impl Report {
    pub fn delta(&self) -> u64 {
        self.object.size
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    pub files: u64,
    pub directories: u64,
    pub failed: u64,
    pub bytes_downloaded: u64,
}
impl RestoreSummary {
    fn record(&mut self, report: &Report) {
        match &report.result {
            Ok(Restored::File { bytes, .. }) => {
                self.files += 1;
                self.bytes_downloaded += bytes;
            },
            Ok(Restored::Directory(_)) => self.directories += 1,
            Err(_) => self.failed += 1,
        }
    }
}

/// Restore everything in the context's namespace into `destination`.
///
/// The listing is drained completely before the first download, and a
/// listing failure ends the stream with an error without anything having
/// been written. `cancel` is checked before each object.
pub fn restore<'a>(
    backend: &'a BackendHandle,
    ctx: &'a Context,
    destination: impl Into<PathBuf>,
    cancel: &'a CancellationToken,
) -> impl Stream<Item = EngineResult<RestoreEvent>> + 'a {
    let destination = destination.into();
    stream! {
        yield Ok(RestoreEvent::Started);
        let prefix = ctx.namespace_prefix();
        let objects = match backend.list(&prefix).await {
            Ok(objects) => objects,
            Err(err) => {
                let err = Err::<RestoreEvent, _>(err).or_raise(|| RestoreErrorKind::Listing);
                yield err.or_raise(|| EngineErrorKind::Restore);
                return;
            },
        };
        tracing::debug!(target = backend.name(), prefix = %prefix, objects = objects.len(), "Listing complete");
        for await event in transfer(backend, ctx, objects, destination, cancel) {
            yield Ok(event);
        }
    }
}

/// Restore a caller-chosen subset of a previous listing (typically picked
/// from [`browse`](crate::browse::browse)) into `destination`.
pub fn restore_selected<'a>(
    backend: &'a BackendHandle,
    ctx: &'a Context,
    objects: Vec<ObjectInfo>,
    destination: impl Into<PathBuf>,
    cancel: &'a CancellationToken,
) -> impl Stream<Item = EngineResult<RestoreEvent>> + 'a {
    let destination = destination.into();
    stream! {
        yield Ok(RestoreEvent::Started);
        for await event in transfer(backend, ctx, objects, destination, cancel) {
            yield Ok(event);
        }
    }
}

// Nothing in here can fail as a whole; per-object errors go on the report.
fn transfer<'a>(
    backend: &'a BackendHandle,
    ctx: &'a Context,
    objects: Vec<ObjectInfo>,
    destination: PathBuf,
    cancel: &'a CancellationToken,
) -> impl Stream<Item = RestoreEvent> + 'a {
    stream! {
        let bytes: u64 = objects.iter().map(|object| object.size).sum();
        yield RestoreEvent::DiscoveryComplete { objects: objects.len() as u64, bytes };

        let total = objects.len();
        let mut summary = RestoreSummary::default();
        for (index, object) in objects.into_iter().enumerate() {
            if cancel.is_cancelled() {
                let remaining = (total - index) as u64;
                tracing::info!(remaining, "Restore cancelled");
                yield RestoreEvent::Cancelled { remaining };
                return;
            }
            let result = restore_object(backend, ctx, &object, &destination).await;
            let report = Report { object, result };
            summary.record(&report);
            yield RestoreEvent::Processed(Box::new(report));
        }
        tracing::info!(
            namespace = ctx.namespace(),
            files = summary.files,
            directories = summary.directories,
            failed = summary.failed,
            "Restore pass complete"
        );
        yield RestoreEvent::Complete(summary);
    }
}
