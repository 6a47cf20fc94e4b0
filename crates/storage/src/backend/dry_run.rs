//! Dry-run storage backend.
//!
//! This module provides a storage backend implementation that wraps other
//! implementations and prevents transfers from executing, but indicating
//! success on return.

use async_trait::async_trait;
use std::path::Path;

use crate::{BackendHandle, Metadata, StorageBackend, backend::ObjectInfoStream, error::Result};

/// Dry-run storage backend.
///
/// Wraps another backend and silently drops all transfers (uploads and
/// downloads), logging an [`info event`](tracing::Event) instead. Listing and
/// metadata lookups pass through, so change detection still runs against the
/// real bucket.
#[derive(Clone)]
pub struct DryRunBackend {
    inner: BackendHandle,
}
impl DryRunBackend {
    pub fn new(inner: BackendHandle) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl StorageBackend for DryRunBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn is_dry_run(&self) -> bool {
        true
    }

    fn list_stream<'a>(&'a self, prefix: &'a str) -> ObjectInfoStream<'a> {
        self.inner.list_stream(prefix)
    }

    async fn head(&self, key: &str) -> Result<Metadata> {
        self.inner.head(key).await
    }

    async fn upload(&self, key: &str, source: &Path, _metadata: Metadata) -> Result<()> {
        tracing::info!(key, source = %source.display(), "Skipping upload during dry run");
        Ok(())
    }

    async fn download(&self, key: &str, destination: &Path) -> Result<u64> {
        tracing::info!(key, destination = %destination.display(), "Skipping download during dry run");
        Ok(0)
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_transfers_are_dropped() {
        let mock = Arc::new(MockBackend::with_objects([("backup/Default/x.txt", b"hello".to_vec())]));
        let backend = DryRunBackend::new(mock.clone());
        let temp_dir = tempfile::tempdir().unwrap();
        let source = temp_dir.path().join("a.txt");
        std::fs::write(&source, b"data").unwrap();

        backend.upload("backup/Default/a.txt", &source, Metadata::new()).await.unwrap();
        assert_eq!(mock.upload_count(), 0);
        assert!(mock.head("backup/Default/a.txt").await.is_err());

        let destination = temp_dir.path().join("x.txt");
        assert_eq!(backend.download("backup/Default/x.txt", &destination).await.unwrap(), 0);
        assert!(!destination.exists());
    }

    #[tokio::test]
    async fn test_reads_pass_through() {
        let mock = Arc::new(MockBackend::with_objects([("backup/Default/x.txt", b"hello".to_vec())]));
        let backend = DryRunBackend::new(mock);
        assert_eq!(backend.list("backup/").await.unwrap().len(), 1);
        assert!(backend.head("backup/Default/x.txt").await.is_ok());
        assert_eq!(backend.name(), "mock");
        assert!(backend.is_dry_run());
    }
}
