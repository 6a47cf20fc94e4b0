use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use s3sync_storage::{key_to_path, normalize_key};
use std::path::{Path, PathBuf};

/// Remote prefix all backups live under.
pub const DEFAULT_PREFIX: &str = "backup";
/// Namespace used when none (or a blank one) is configured.
pub const DEFAULT_NAMESPACE: &str = "Default";

/// Where in the bucket a pass reads and writes.
///
/// Every object key has the shape `<prefix>/<namespace>/<relative path>`.
/// The namespace is a single key segment (usually one per machine), so two
/// namespaces can never see each other's objects.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use s3sync_engine::Context;
///
/// let ctx = Context::new("laptop").unwrap();
/// assert_eq!(ctx.namespace_prefix(), "backup/laptop/");
/// assert_eq!(ctx.object_key(Path::new("sub/b.txt")).unwrap(), "backup/laptop/sub/b.txt");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    prefix: String,
    namespace: String,
}

impl Context {
    /// Create a context under the [`DEFAULT_PREFIX`]. A blank namespace
    /// falls back to [`DEFAULT_NAMESPACE`].
    pub fn new(namespace: impl AsRef<str>) -> Result<Self> {
        let namespace = match namespace.as_ref().trim() {
            "" => DEFAULT_NAMESPACE,
            ns => ns,
        };
        let is_segment = !matches!(namespace, "." | "..") && !namespace.contains(['/', '\\', '\0']);
        if !is_segment {
            exn::bail!(ErrorKind::InvalidNamespace(namespace.to_string()));
        }
        Ok(Self {
            prefix: DEFAULT_PREFIX.to_string(),
            namespace: namespace.to_string(),
        })
    }

    /// Replace the backup prefix. Nested prefixes (`a/b`) are allowed.
    pub fn with_prefix(mut self, prefix: impl AsRef<str>) -> Result<Self> {
        let prefix = prefix.as_ref();
        self.prefix = normalize_key(prefix).or_raise(|| ErrorKind::InvalidPrefix(prefix.to_string()))?;
        Ok(self)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Listing prefix for the whole namespace, including the trailing `/`
    /// so that `Default` never matches `Default2`.
    pub fn namespace_prefix(&self) -> String {
        format!("{}/{}/", self.prefix, self.namespace)
    }

    /// Derive the object key for a path relative to the sync root.
    ///
    /// Pure and deterministic: separators always come out as `/`.
    pub fn object_key(&self, relative: &Path) -> Result<String> {
        let fragment = normalize_key(relative).or_raise(|| ErrorKind::Key)?;
        Ok(format!("{}{fragment}", self.namespace_prefix()))
    }

    /// The part of `key` below the namespace prefix, or an error if the key
    /// belongs to a different namespace.
    pub fn key_remainder<'k>(&self, key: &'k str) -> Result<&'k str> {
        key.strip_prefix(&self.namespace_prefix()).ok_or_raise(|| ErrorKind::Key)
    }

    /// Map an object key back onto a path relative to a restore root.
    pub fn relative_path(&self, key: &str) -> Result<PathBuf> {
        key_to_path(self.key_remainder(key)?).or_raise(|| ErrorKind::Key)
    }
}
