//! Local file entries discovered under a sync root.

use crate::fingerprint::{Fingerprint, fingerprint_file};
use std::io;
use std::ops::Deref;
use std::path::PathBuf;

// Typestate: a discovered file has no fingerprint yet, and the upload
// decision can only be made on one that has been hashed.

/// Where a file lives, and how big it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalMeta {
    /// Absolute path on disk
    pub path: PathBuf,
    /// Path relative to the sync root
    pub relative: PathBuf,
    /// File size in bytes (for progress accounting only)
    pub size: u64,
}

mod sealed {
    pub trait Sealed {}
}
pub trait HashState: sealed::Sealed {
    type Hash;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Discovered;
impl sealed::Sealed for Discovered {}
impl HashState for Discovered {
    type Hash = ();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprinted;
impl sealed::Sealed for Fingerprinted {}
impl HashState for Fingerprinted {
    type Hash = Fingerprint;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile<S: HashState = Discovered> {
    meta: LocalMeta,
    pub fingerprint: S::Hash,
}
impl<S: HashState> LocalFile<S> {
    pub fn meta(&self) -> &LocalMeta {
        &self.meta
    }
}
impl<S: HashState> Deref for LocalFile<S> {
    type Target = LocalMeta;
    fn deref(&self) -> &LocalMeta {
        &self.meta
    }
}

impl LocalFile {
    pub fn new(path: impl Into<PathBuf>, relative: impl Into<PathBuf>, size: u64) -> Self {
        LocalMeta {
            path: path.into(),
            relative: relative.into(),
            size,
        }
        .into()
    }

    pub fn with_fingerprint(self, fingerprint: Fingerprint) -> LocalFile<Fingerprinted> {
        LocalFile { meta: self.meta, fingerprint }
    }

    /// Hash the file's current content.
    pub async fn fingerprint(self) -> io::Result<LocalFile<Fingerprinted>> {
        let fingerprint = fingerprint_file(&self.path).await?;
        Ok(self.with_fingerprint(fingerprint))
    }
}
impl From<LocalMeta> for LocalFile<Discovered> {
    fn from(meta: LocalMeta) -> Self {
        Self { meta, fingerprint: () }
    }
}
