use crate::backup::error::{ErrorKind, Result};
use crate::local::LocalFile;
use async_stream::stream;
use exn::ResultExt;
use futures::Stream;
use std::path::{Path, PathBuf};
use tokio::fs::{self, DirEntry};

enum WalkEntry {
    File(LocalFile),
    Descend(PathBuf),
    Skip,
}

/// Classify a single directory entry. Pulled out of the stream so that `?`
/// works; inside `stream!` every error has to be yielded by hand.
async fn process_entry(root: &Path, entry: DirEntry) -> Result<WalkEntry> {
    let path = entry.path();
    // Does not follow symlinks.
    let file_type = entry.file_type().await.or_raise(|| ErrorKind::Walk(path.clone()))?;
    if file_type.is_dir() {
        return Ok(WalkEntry::Descend(path));
    }
    if !file_type.is_file() {
        tracing::debug!(path = %path.display(), "Skipping symlink or special file");
        return Ok(WalkEntry::Skip);
    }
    let metadata = entry.metadata().await.or_raise(|| ErrorKind::Walk(path.clone()))?;
    let relative = path.strip_prefix(root).or_raise(|| ErrorKind::Walk(path.clone()))?.to_path_buf();
    Ok(WalkEntry::File(LocalFile::new(path, relative, metadata.len())))
}

/// Recursively yield every regular file under `root`.
///
/// There are no exclusion rules. Unreadable directories or entries are
/// yielded as errors and the walk carries on with the rest of the tree.
pub(crate) fn walk(root: &Path) -> impl Stream<Item = Result<LocalFile>> + '_ {
    let mut stack = vec![root.to_path_buf()];
    stream! {
        'dirs: while let Some(current) = stack.pop() {
            let mut entries = match fs::read_dir(&current).await {
                Ok(entries) => entries,
                Err(err) => {
                    yield Err::<LocalFile, _>(err).or_raise(|| ErrorKind::Walk(current.clone()));
                    continue 'dirs;
                }
            };

            'entries: loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break 'entries,
                    Err(err) => {
                        yield Err::<LocalFile, _>(err).or_raise(|| ErrorKind::Walk(current.clone()));
                        // A failing iterator does not recover.
                        break 'entries;
                    },
                };
                match process_entry(root, entry).await {
                    Ok(WalkEntry::File(f)) => yield Ok(f),
                    Ok(WalkEntry::Descend(d)) => stack.push(d),
                    Ok(WalkEntry::Skip) => {},
                    Err(e) => yield Err(e),
                };
            }
        }
    }
}
