//! Content fingerprints.
//!
//! A fingerprint is the hex MD5 of a file's bytes. It is only ever used as a
//! cheap "has this changed since the last upload" marker, stored next to the
//! object as user metadata, never as an integrity guarantee.

use derive_more::Display;
use md5::{Digest, Md5};
use s3sync_storage::Metadata;
use std::io::{self, Read};
use std::path::Path;
use tracing::instrument;

/// Metadata entry the fingerprint is stored under on every uploaded object.
pub const FINGERPRINT_METADATA_KEY: &str = "file_md5";
/// Files are hashed in chunks of this many bytes; no file is ever read into
/// memory whole.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Lowercase hex MD5 of a file's full content.
#[derive(Debug, Display, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of_bytes(data: &[u8]) -> Self {
        Self(hex::encode(Md5::digest(data)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the remote metadata records exactly this fingerprint.
    ///
    /// Missing metadata never matches. No size or timestamp is consulted.
    pub fn matches(&self, metadata: &Metadata) -> bool {
        metadata.get(FINGERPRINT_METADATA_KEY).is_some_and(|stored| *stored == self.0)
    }

    /// Metadata to attach to an upload of the fingerprinted content.
    pub fn to_metadata(&self) -> Metadata {
        Metadata::from([(FINGERPRINT_METADATA_KEY.to_string(), self.0.clone())])
    }
}

/// Fingerprint everything a reader yields, [`CHUNK_SIZE`] bytes at a time.
pub fn fingerprint_reader(mut reader: impl Read) -> io::Result<Fingerprint> {
    let mut hasher = Md5::new();
    let mut buffer = vec![0; CHUNK_SIZE];
    loop {
        match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => hasher.update(&buffer[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(Fingerprint(hex::encode(hasher.finalize())))
}

/// Fingerprint a file on disk.
///
/// Hashing is CPU-bound and uses blocking reads, so it runs on Tokio's
/// blocking pool.
#[instrument(skip_all, fields(path = %path.display()))]
pub async fn fingerprint_file(path: &Path) -> io::Result<Fingerprint> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || fingerprint_reader(std::fs::File::open(path)?))
        .await
        .map_err(io::Error::other)?
}
