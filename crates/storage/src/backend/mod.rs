//! Storage backend trait and implementations.
//!
//! This module defines the `StorageBackend` trait, which provides a unified
//! interface over the four object-store capabilities a sync pass needs:
//! fetching an object's metadata, uploading a local file with metadata,
//! listing keys under a prefix, and downloading an object to a local file.
//!

mod dry_run;
#[cfg(feature = "mock")]
mod mock;
#[cfg(feature = "s3")]
mod s3;

pub use self::dry_run::DryRunBackend;
#[cfg(feature = "mock")]
pub use self::mock::{MockBackend, Operation};
#[cfg(feature = "s3")]
pub use self::s3::S3Backend;
use crate::error::Result;
use crate::models::{Metadata, ObjectInfo};
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::path::Path;
use std::pin::Pin;

pub(crate) type ObjectInfoStream<'a> = Pin<Box<dyn Stream<Item = Result<ObjectInfo>> + Send + 'a>>;

/// Unified interface for object storage backends.
///
/// All storage operations are asynchronous to efficiently handle network
/// operations. Keys are plain `/`-separated strings; callers are expected to
/// build them with [`normalize_key`](crate::normalize_key).
///
/// # Examples
///
/// ```
/// use s3sync_storage::{backend::StorageBackend, error::Result};
///
/// async fn stored_fingerprint(backend: &dyn StorageBackend, key: &str) -> Result<Option<String>> {
///     match backend.head(key).await {
///         Ok(metadata) => Ok(metadata.get("file_md5").cloned()),
///         Err(e) if e.is_not_found() => Ok(None),
///         Err(e) => Err(e),
///     }
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured backend. Used for logging only.
    fn name(&self) -> &str;

    /// Whether transfers are only logged. Callers should leave the local
    /// filesystem untouched too.
    fn is_dry_run(&self) -> bool {
        false
    }

    /// List all objects whose key starts with `prefix`.
    ///
    /// Default implementation of this method is to collect all the results
    /// from [`list_stream()`](Self::list_stream) into a [`Vec`] before
    /// returning. Any error aborts the whole listing; no partial result is
    /// returned.
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>> {
        self.list_stream(prefix).try_collect().await
    }

    /// Stream object information for every key starting with `prefix`.
    ///
    /// Backends that page their listings (S3 returns at most 1000 keys per
    /// request) fetch the next page lazily as the stream is polled. The
    /// prefix is matched as a plain string, so callers wanting "directory"
    /// semantics should end it with `/`.
    ///
    /// # Examples
    ///
    /// ```
    /// use futures::TryStreamExt;
    /// # use s3sync_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// let mut stream = backend.list_stream("backup/Default/");
    /// while let Some(info) = stream.try_next().await? {
    ///     println!("{}: {} bytes", info.key, info.size);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    fn list_stream<'a>(&'a self, prefix: &'a str) -> ObjectInfoStream<'a>;

    /// Fetch the user metadata attached to an object, without its content.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if no object
    /// exists under `key`.
    async fn head(&self, key: &str) -> Result<Metadata>;

    /// Upload the full content of a local file under `key`, replacing any
    /// existing object and attaching `metadata` to it.
    ///
    /// ```no_run
    /// use std::path::Path;
    /// use s3sync_storage::Metadata;
    /// # use s3sync_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// let metadata = Metadata::from([("file_md5".to_string(), "5d41402abc4b2a76b9719d911017c592".to_string())]);
    /// backend.upload("backup/Default/a.txt", Path::new("/home/me/a.txt"), metadata).await?;
    /// # Ok(())
    /// # }
    /// ```
    async fn upload(&self, key: &str, source: &Path, metadata: Metadata) -> Result<()>;

    /// Download the object stored under `key` into `destination`,
    /// overwriting it if it already exists.
    ///
    /// The parent directory of `destination` must already exist. A failed
    /// download leaves any existing file at `destination` as it was. Returns
    /// the number of bytes written, or [`NotFound`](crate::error::ErrorKind::NotFound)
    /// if there is no such object.
    async fn download(&self, key: &str, destination: &Path) -> Result<u64>;
}
