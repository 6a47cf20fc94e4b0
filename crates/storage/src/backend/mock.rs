//! In-memory storage backend for testing.

use super::ObjectInfoStream;
use crate::error::{ErrorKind, Result};
use crate::models::{Metadata, ObjectInfo};
use async_stream::stream;
use async_trait::async_trait;
use exn::ResultExt;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::StorageBackend;

/// Backend operation that a [`MockBackend`] can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Head,
    Upload,
    Download,
    List,
}

#[derive(Clone)]
struct MockObject {
    modified: OffsetDateTime,
    data: Vec<u8>,
    metadata: Metadata,
}

/// In-memory storage backend for testing.
///
/// Objects are stored in a `BTreeMap` behind a [`RwLock`], so all trait
/// methods can operate on `&self` without external synchronisation, and
/// listings come back in key order. Every call is counted so tests can
/// assert that no transfer happened, and individual keys can be set up to
/// fail with [`with_failure()`](Self::with_failure).
///
/// # Examples
///
/// ```
/// use s3sync_storage::backend::{MockBackend, StorageBackend};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_objects([
///     ("backup/Default/a.txt", b"hello".to_vec()),
/// ]);
/// assert_eq!(backend.list("backup/Default/").await.unwrap().len(), 1);
/// assert!(backend.head("backup/Default/missing.txt").await.is_err());
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    storage: RwLock<BTreeMap<String, MockObject>>,
    failures: HashSet<(Operation, String)>,
    heads: AtomicUsize,
    uploads: AtomicUsize,
    downloads: AtomicUsize,
}

impl MockBackend {
    /// Create a mock backend pre-populated with objects (without metadata).
    pub fn with_objects(objects: impl IntoIterator<Item = (impl Into<String>, impl Into<Vec<u8>>)>) -> Self {
        let now = OffsetDateTime::now_utc();
        let storage = objects
            .into_iter()
            .map(|(key, data)| {
                let object = MockObject {
                    modified: now,
                    data: data.into(),
                    metadata: Metadata::new(),
                };
                (key.into(), object)
            })
            .collect();
        Self {
            name: "mock".to_string(),
            storage: RwLock::new(storage),
            failures: HashSet::new(),
            heads: AtomicUsize::new(0),
            uploads: AtomicUsize::new(0),
            downloads: AtomicUsize::new(0),
        }
    }

    /// Make `operation` fail with a [`BackendError`](ErrorKind::BackendError)
    /// for `key`. For [`Operation::List`], `key` is the listing prefix.
    pub fn with_failure(mut self, operation: Operation, key: impl Into<String>) -> Self {
        self.failures.insert((operation, key.into()));
        self
    }

    /// Store an object directly, bypassing the call counters.
    pub async fn insert(&self, key: impl Into<String>, data: impl Into<Vec<u8>>, metadata: Metadata) {
        let object = MockObject {
            modified: OffsetDateTime::now_utc(),
            data: data.into(),
            metadata,
        };
        self.storage.write().await.insert(key.into(), object);
    }

    /// Raw content of a stored object.
    pub async fn content(&self, key: &str) -> Option<Vec<u8>> {
        self.storage.read().await.get(key).map(|o| o.data.clone())
    }

    pub fn head_count(&self) -> usize {
        self.heads.load(Ordering::SeqCst)
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    fn check(&self, operation: Operation, key: &str) -> Result<()> {
        if self.failures.contains(&(operation, key.to_string())) {
            exn::bail!(ErrorKind::BackendError(format!("injected {operation:?} failure for {key}")));
        }
        Ok(())
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let objects: [(&str, &[u8]); 0] = [];
        Self::with_objects(objects)
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream<'a>(&'a self, prefix: &'a str) -> ObjectInfoStream<'a> {
        Box::pin(stream! {
            if let Err(e) = self.check(Operation::List, prefix) {
                yield Err(e);
                return;
            }
            // Snapshot matching entries under the read lock, then drop it
            // before yielding to avoid holding the lock across yield points.
            let entries: Vec<ObjectInfo> = {
                let guard = self.storage.read().await;
                guard
                    .iter()
                    .filter(|(key, _)| key.starts_with(prefix))
                    .map(|(key, object)| ObjectInfo::new(key.clone(), object.data.len() as u64, object.modified))
                    .collect()
            };
            for info in entries {
                yield Ok(info);
            }
        })
    }

    async fn head(&self, key: &str) -> Result<Metadata> {
        self.heads.fetch_add(1, Ordering::SeqCst);
        self.check(Operation::Head, key)?;
        let guard = self.storage.read().await;
        let object = guard.get(key).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(key.to_string())))?;
        Ok(object.metadata.clone())
    }

    async fn upload(&self, key: &str, source: &Path, metadata: Metadata) -> Result<()> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        self.check(Operation::Upload, key)?;
        let data = tokio::fs::read(source).await.or_raise(|| ErrorKind::LocalFile(source.to_path_buf()))?;
        self.insert(key, data, metadata).await;
        Ok(())
    }

    async fn download(&self, key: &str, destination: &Path) -> Result<u64> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        self.check(Operation::Download, key)?;
        let data = self.content(key).await.ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(key.to_string())))?;
        tokio::fs::write(destination, &data).await.or_raise(|| ErrorKind::LocalFile(destination.to_path_buf()))?;
        Ok(data.len() as u64)
    }
}
