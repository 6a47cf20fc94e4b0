//! S3-compatible storage backend.
//!
//! This module provides a storage backend implementation for S3-compatible
//! services including AWS S3, Backblaze B2, Tigris (Fly.io), and others.
//!
//! # Credentials
//!
//! Credentials are provided explicitly via the configuration file (or the
//! environment, through the config crate). The SDK's own credential chain
//! is deliberately not consulted, so a backup never silently runs under a
//! different account than the one configured.

use crate::{
    Metadata, ObjectInfo, StorageBackend,
    backend::ObjectInfoStream,
    error::{Error, ErrorKind, Result},
};
use async_stream::stream;
use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Credentials, Region, http::HttpResponse, retry::RetryConfig},
    error::{DisplayErrorContext, SdkError},
    primitives::{ByteStream, DateTime},
    types::Object,
};
use exn::{OptionExt, ResultExt};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::io::AsyncWriteExt;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Generous default for concurrent S3 requests.
const DEFAULT_CONCURRENT_REQUESTS: usize = 100;

/// S3-compatible storage backend.
///
/// Stores objects in an S3 bucket under exactly the keys it is given.
///
/// # Supported Services
///
/// - AWS S3
/// - Backblaze B2 (via S3-compatible API)
/// - Tigris (Fly.io storage)
/// - MinIO
/// - Other S3-compatible services
///
/// # Examples
///
/// ```no_run
/// use s3sync_storage::backend::S3Backend;
///
/// let backend = S3Backend::new(
///     "my-storage",
///     "my-bucket",
///     "us-west-004",
///     Some("https://s3.us-west-004.backblazeb2.com"),
///     "access_key_id",
///     "secret_access_key",
/// );
/// ```
#[derive(Debug, Clone)]
pub struct S3Backend {
    name: String,
    client: Client,
    bucket: String,
    /// Rate limiter for concurrent S3 requests.
    rate_limiter: Arc<Semaphore>,
}

impl S3Backend {
    /// Create a new S3 storage backend.
    ///
    /// # Arguments
    /// * `name` - A name for this backend (used in display/logging)
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region or provider-specific region (e.g., "us-west-004" for Backblaze)
    /// * `endpoint` - Custom endpoint URL for S3-compatible services
    /// * `key_id` - AWS/provider access key ID
    /// * `key_secret` - AWS/provider secret access key
    pub fn new(
        name: impl Into<String>,
        bucket: impl Into<String>,
        region: impl Into<String>,
        endpoint: Option<impl Into<String>>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
    ) -> Self {
        let region = Region::new(region.into());
        let credentials = Credentials::new(key_id, key_secret, None, None, "s3sync-config");
        let mut config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(region)
            // Configure retry policy with exponential backoff (1 initial + 3 retries)
            .retry_config(RetryConfig::standard().with_max_attempts(4))
            // Use path-style addressing for better compatibility with
            // S3-compatible services (Backblaze, MinIO, etc.)
            .force_path_style(true);
        // Set custom endpoint for non-AWS services
        if let Some(endpoint_url) = endpoint {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }
        Self::from_client(name, Client::from_conf(config_builder.build()), bucket)
    }

    /// Wrap an already-configured SDK client.
    pub fn from_client(name: impl Into<String>, client: Client, bucket: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            client,
            bucket: bucket.into(),
            rate_limiter: Arc::new(Semaphore::new(DEFAULT_CONCURRENT_REQUESTS)),
        }
    }

    /// Acquire a rate limiter permit before making an S3 API call.
    async fn acquire_permit(&self) -> OwnedSemaphorePermit {
        // unwrap is safe: semaphore is never closed
        self.rate_limiter.clone().acquire_owned().await.unwrap()
    }

    /// Convert AWS DateTime to OffsetDateTime.
    fn parse_datetime(dt: &DateTime) -> Result<OffsetDateTime> {
        OffsetDateTime::from_unix_timestamp_nanos(dt.as_nanos())
            .or_raise(|| ErrorKind::BackendError("S3 datetime out of range".to_string()))
    }

    fn object_info(object: &Object) -> Result<ObjectInfo> {
        let key = object.key().ok_or_raise(|| ErrorKind::BackendError("listed object has no key".to_string()))?;
        // Negative sizes never come back from a real service; treat as empty.
        let size = object.size().and_then(|s| u64::try_from(s).ok()).unwrap_or(0);
        let modified = match object.last_modified() {
            Some(dt) => Self::parse_datetime(dt)?,
            None => OffsetDateTime::UNIX_EPOCH,
        };
        Ok(ObjectInfo::new(key, size, modified))
    }

    /// Map an SDK error onto the storage error categories.
    ///
    /// `is_not_found` inspects the modeled service error, since not every
    /// operation models "missing" the same way (`HeadObject` has no body, so
    /// it only ever reports a bare 404).
    fn map_sdk_error<E>(err: SdkError<E, HttpResponse>, key: &str, is_not_found: impl FnOnce(&E) -> bool) -> Error
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let status = err.raw_response().map(|r| r.status().as_u16());
        let not_found = err.as_service_error().is_some_and(is_not_found) || status == Some(404);
        let kind = match (&err, status) {
            _ if not_found => ErrorKind::NotFound(key.to_string()),
            (_, Some(403)) => ErrorKind::PermissionDenied(key.to_string()),
            (SdkError::DispatchFailure(_) | SdkError::TimeoutError(_), _) => {
                ErrorKind::Network(DisplayErrorContext(&err).to_string())
            },
            _ => ErrorKind::BackendError(DisplayErrorContext(&err).to_string()),
        };
        exn::Exn::from(kind)
    }
}

#[async_trait]
impl StorageBackend for S3Backend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream<'a>(&'a self, prefix: &'a str) -> ObjectInfoStream<'a> {
        Box::pin(stream! {
            let mut pages = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .into_paginator()
                .send();
            loop {
                let page = {
                    let _permit = self.acquire_permit().await;
                    pages.next().await
                };
                let page = match page {
                    Some(Ok(page)) => page,
                    Some(Err(err)) => {
                        yield Err(Self::map_sdk_error(err, prefix, |_| false));
                        return;
                    },
                    None => break,
                };
                tracing::trace!(prefix, keys = page.key_count().unwrap_or_default(), "Fetched listing page");
                for object in page.contents() {
                    yield Self::object_info(object);
                }
            }
        })
    }

    async fn head(&self, key: &str) -> Result<Metadata> {
        let _permit = self.acquire_permit().await;
        let output = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(e, key, |e| e.is_not_found()))?;
        Ok(output.metadata().cloned().unwrap_or_default())
    }

    async fn upload(&self, key: &str, source: &Path, metadata: Metadata) -> Result<()> {
        let body = ByteStream::from_path(source).await.or_raise(|| ErrorKind::LocalFile(source.to_path_buf()))?;
        let _permit = self.acquire_permit().await;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .set_metadata(Some(metadata))
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(e, key, |_| false))?;
        Ok(())
    }

    async fn download(&self, key: &str, destination: &Path) -> Result<u64> {
        let _permit = self.acquire_permit().await;
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(e, key, |e| e.is_no_such_key()))?;
        // The existing file is only replaced once the whole body has arrived.
        let partial = partial_path(destination);
        let result = async {
            let written = write_body(output.body, &partial).await?;
            tokio::fs::rename(&partial, destination)
                .await
                .or_raise(|| ErrorKind::LocalFile(destination.to_path_buf()))?;
            Ok::<_, Error>(written)
        }
        .await;
        if result.is_err() {
            let _ = tokio::fs::remove_file(&partial).await;
        }
        result
    }
}

/// Sibling of `destination` that a download is streamed into first.
fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination.file_name().map(OsString::from).unwrap_or_default();
    name.push(".part");
    destination.with_file_name(name)
}

async fn write_body(body: ByteStream, path: &Path) -> Result<u64> {
    let mut reader = body.into_async_read();
    let mut file = tokio::fs::File::create(path).await.or_raise(|| ErrorKind::LocalFile(path.to_path_buf()))?;
    let written = tokio::io::copy(&mut reader, &mut file).await.map_err(ErrorKind::Io)?;
    file.flush().await.map_err(ErrorKind::Io)?;
    Ok(written)
}
