//! Directory traversal producing candidate upload paths.
//!
//! Traversal is depth-first and sorted by file name at every level, so two
//! walks over an unchanged tree yield the same sequence. Filtering happens
//! while walking: excluded files never leave the iterator.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::error::FilesystemError;
use crate::filter::PathFilter;
use crate::task::relative_key;

/// Walks a root directory and yields the files accepted by a [`PathFilter`]
#[derive(Debug, Clone)]
pub struct FileWalker {
    root: PathBuf,
    filter: PathFilter,
}

impl FileWalker {
    pub fn new(root: impl Into<PathBuf>, filter: PathFilter) -> Self {
        Self {
            root: root.into(),
            filter,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Start a fresh traversal of the root, yielding only accepted files.
    ///
    /// Fails when the root is missing, unreadable, or not a directory. Errors
    /// below the root are logged and the offending entry is skipped.
    pub fn walk(&self) -> Result<impl Iterator<Item = PathBuf> + '_, FilesystemError> {
        Ok(self.files()?.filter(move |path| self.accepts(path)))
    }

    /// Every regular file under the root, before filtering.
    ///
    /// Files whose root-relative path is not valid UTF-8 are skipped with a
    /// warning: lossy conversion could map two of them onto the same key.
    pub fn files(&self) -> Result<impl Iterator<Item = PathBuf> + '_, FilesystemError> {
        self.check_root()?;
        debug!(root = %self.root.display(), "Walking directory");

        let files = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(path = ?e.path(), error = %e, "Skipping unreadable entry");
                    None
                }
            })
            .filter(is_file)
            .map(DirEntry::into_path)
            .filter(move |path| {
                let utf8 = path
                    .strip_prefix(&self.root)
                    .map_or(false, |relative| relative.to_str().is_some());
                if !utf8 {
                    warn!(path = ?path, "Skipping file with a non UTF-8 name");
                }
                utf8
            });

        Ok(files)
    }

    /// Whether the filter accepts `path`, matched relative to the root.
    pub fn accepts(&self, path: &Path) -> bool {
        self.filter.should_include(&relative_key(&self.root, path))
    }

    fn check_root(&self) -> Result<(), FilesystemError> {
        let metadata = fs::metadata(&self.root).map_err(|source| match source.kind() {
            ErrorKind::NotFound => FilesystemError::NotFound(self.root.clone()),
            _ => FilesystemError::Unreadable {
                path: self.root.clone(),
                source,
            },
        })?;
        if !metadata.is_dir() {
            return Err(FilesystemError::NotADirectory(self.root.clone()));
        }
        fs::read_dir(&self.root).map_err(|source| FilesystemError::Unreadable {
            path: self.root.clone(),
            source,
        })?;
        Ok(())
    }
}

/// Regular files, plus symlinks that resolve to regular files.
fn is_file(entry: &DirEntry) -> bool {
    let file_type = entry.file_type();
    file_type.is_file() || (file_type.is_symlink() && entry.path().is_file())
}
