//! Object key normalization and security utilities.
//!
//! Object keys are always `/`-separated, whatever platform produced the
//! local path. This module converts local relative paths into key segments
//! and back again, refusing anything that could escape a root directory.

use crate::error::{ErrorKind, Result};
use std::path::{Component, Path, PathBuf};

/// Resolve a single segment against the segments collected so far.
///
/// Returns `false` if the segment is unacceptable (NUL byte, or a `..` that
/// would climb out of the root).
fn push_segment<'a>(segments: &mut Vec<&'a str>, segment: &'a str) -> bool {
    match segment {
        "" | "." => true,
        ".." => segments.pop().is_some(),
        // NUL bytes pass through Path::components() on Unix but cause
        // truncation in C-based syscalls; reject them explicitly.
        s if s.contains('\0') => false,
        s => {
            segments.push(s);
            true
        },
    }
}

/// Normalizes a relative local path into a `/`-separated key fragment.
///
/// Backslashes are treated as separators on every platform, so a path
/// recorded on Windows produces the same key everywhere.
///
/// # Returns
/// The normalized key fragment, or [`InvalidPath`](crate::error::ErrorKind::InvalidPath)
/// if the path is empty, escapes its root, contains NUL bytes, carries a
/// Windows drive prefix, or is not valid UTF-8.
///
/// # Examples
///
/// ```
/// use s3sync_storage::normalize_key;
/// assert_eq!(normalize_key("sub/b.txt").unwrap(), "sub/b.txt");
/// assert_eq!(normalize_key("sub\\b.txt").unwrap(), "sub/b.txt");
/// assert_eq!(normalize_key("a/./b/../c.txt").unwrap(), "a/c.txt");
/// assert!(normalize_key("../etc/passwd").is_err());
/// assert!(normalize_key("").is_err());
/// ```
pub fn normalize(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let invalid = || ErrorKind::InvalidPath(path.to_path_buf());
    let mut segments = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(s) => {
                let Some(s) = s.to_str() else {
                    exn::bail!(invalid());
                };
                for segment in s.split('\\') {
                    if !push_segment(&mut segments, segment) {
                        exn::bail!(invalid());
                    }
                }
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(invalid()),
            Component::ParentDir => {
                if segments.pop().is_none() {
                    exn::bail!(invalid());
                }
            },
        }
    }
    match segments.is_empty() {
        true => exn::bail!(invalid()),
        false => Ok(segments.join("/")),
    }
}

/// Converts the tail of an object key (with any prefix already stripped)
/// back into a relative local path.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use s3sync_storage::key_to_path;
/// assert_eq!(key_to_path("y/z.txt").unwrap(), Path::new("y").join("z.txt"));
/// assert!(key_to_path("../../outside").is_err());
/// assert!(key_to_path("/").is_err());
/// ```
pub fn to_path(key: &str) -> Result<PathBuf> {
    let invalid = || ErrorKind::InvalidKey(key.to_string());
    let mut segments = Vec::new();
    for segment in key.split(['/', '\\']) {
        if !push_segment(&mut segments, segment) {
            exn::bail!(invalid());
        }
    }
    if segments.is_empty() {
        exn::bail!(invalid());
    }
    let path: PathBuf = segments.into_iter().collect();
    // A segment like `C:` would turn into an absolute path on Windows.
    if path.components().any(|c| !matches!(c, Component::Normal(_))) {
        exn::bail!(invalid());
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_paths() {
        assert_eq!(normalize(Path::new("a.txt")).unwrap(), "a.txt");
        assert_eq!(normalize(Path::new("sub/b.txt")).unwrap(), "sub/b.txt");
        assert_eq!(normalize(Path::new("a/b/c/file.bin")).unwrap(), "a/b/c/file.bin");
    }

    #[test]
    fn test_path_normalization() {
        // Double slashes are normalized
        assert_eq!(normalize(Path::new("a//b//c")).unwrap(), "a/b/c");
        // Current directory references removed
        assert_eq!(normalize(Path::new("a/./b/./c")).unwrap(), "a/b/c");
        // Trailing slashes stripped
        assert_eq!(normalize(Path::new("a/b/")).unwrap(), "a/b");
    }

    #[test]
    fn test_backslash_normalization() {
        assert_eq!(normalize(Path::new("a\\b\\c")).unwrap(), "a/b/c");
        assert_eq!(normalize(Path::new("a\\b/c\\d")).unwrap(), "a/b/c/d");
        assert!(normalize(Path::new("..\\escape")).is_err());
    }

    #[test]
    fn test_traversal_attempts() {
        assert!(normalize(Path::new("../etc/passwd")).is_err());
        assert!(normalize(Path::new("a/../../b")).is_err());
        assert!(normalize(Path::new("..")).is_err());
        // Traversal that stays inside the root is resolved
        assert_eq!(normalize(Path::new("a/b/..")).unwrap(), "a");
    }

    #[test]
    fn test_invalid_characters() {
        assert!(normalize(Path::new("a\0b")).is_err());
        assert!(to_path("a\0b").is_err());
    }

    #[test]
    fn test_empty_paths() {
        assert!(normalize(Path::new("")).is_err());
        assert!(normalize(Path::new(".")).is_err());
        assert!(normalize(Path::new("./.")).is_err());
        assert!(normalize(Path::new("//")).is_err());
    }

    #[test]
    fn test_to_path() {
        assert_eq!(to_path("x.txt").unwrap(), PathBuf::from("x.txt"));
        assert_eq!(to_path("y/z.txt").unwrap(), Path::new("y").join("z.txt"));
        assert_eq!(to_path("y//z.txt").unwrap(), Path::new("y").join("z.txt"));
        assert!(to_path("").is_err());
        assert!(to_path("../x").is_err());
        assert!(to_path("y/../../x").is_err());
    }

    #[test]
    fn test_to_path_rejects_with_invalid_key() {
        let err = to_path("../x").unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidKey(k) if k == "../x"));
    }
}
