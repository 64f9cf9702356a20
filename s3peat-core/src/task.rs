//! Units of upload work and destination key derivation.

use std::path::{Component, Path, PathBuf};

/// Canonical separator used in object keys, independent of the host OS.
pub const KEY_SEPARATOR: char = '/';

/// One local file mapped to one destination key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTask {
    local_path: PathBuf,
    destination_key: String,
}

impl UploadTask {
    /// Build a task for `local_path` discovered under `root`, prefixed by `prefix`.
    pub fn new(root: &Path, local_path: PathBuf, prefix: &str) -> Self {
        let destination_key = join_key(prefix, &relative_key(root, &local_path));
        Self {
            local_path,
            destination_key,
        }
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    pub fn destination_key(&self) -> &str {
        &self.destination_key
    }

    pub fn into_local_path(self) -> PathBuf {
        self.local_path
    }
}

/// Path of `path` relative to `root`, written with `/` separators.
///
/// Paths that do not live under `root` keep all their normal components,
/// minus any leading root or drive prefix.
pub fn relative_key(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let mut key = String::new();
    for component in relative.components() {
        let segment = match component {
            Component::Normal(s) => s.to_string_lossy(),
            Component::ParentDir => "..".into(),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => continue,
        };
        if !key.is_empty() {
            key.push(KEY_SEPARATOR);
        }
        key.push_str(&segment);
    }
    key
}

/// Join a key prefix and a relative key with exactly one separator.
pub fn join_key(prefix: &str, relative: &str) -> String {
    let prefix = prefix.trim_matches(KEY_SEPARATOR);
    let relative = relative.trim_start_matches(KEY_SEPARATOR);
    if prefix.is_empty() {
        relative.to_string()
    } else {
        format!("{prefix}{KEY_SEPARATOR}{relative}")
    }
}
