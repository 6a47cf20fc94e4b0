//! The sync engine.
//!
//! Walks a local directory, fingerprints every file, and keeps an object
//! storage namespace in step with it ([`backup`]); lists a namespace and
//! pulls it back down again ([`restore`]); and lists a namespace for
//! browsing ([`browse`]).
//!
//! Every pass is a lazy [`Stream`](futures::Stream) of events, so whatever
//! drives it (a CLI, a GUI, a scheduler) decides how to show progress. Per
//! file failures are carried inside the events and never end the stream;
//! only failures that make the whole pass meaningless (unreadable root,
//! failed listing) surface as an `Err` item.

pub mod backup;
pub mod browse;
mod context;
pub mod error;
mod fingerprint;
mod local;
mod progress;
pub mod restore;

pub use crate::context::{Context, DEFAULT_NAMESPACE, DEFAULT_PREFIX};
pub use crate::fingerprint::{CHUNK_SIZE, FINGERPRINT_METADATA_KEY, Fingerprint, fingerprint_file, fingerprint_reader};
pub use crate::local::{Discovered, Fingerprinted, HashState, LocalFile, LocalMeta};
pub use crate::progress::Progress;
