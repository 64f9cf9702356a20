//! Error types for s3peat-core
//!
//! Errors fall into two groups:
//! - Fatal, pre-run errors ([`ConfigError`], [`FilesystemError`]) which abort
//!   before any worker is spawned
//! - Per-file [`StorageError`]s, which the worker pool records as failures
//!   and never propagates
//!
//! [`UploadError`] is what the coordinator hands back to callers.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error returned by [`crate::coordinator::UploadCoordinator`]
#[derive(Error, Debug)]
pub enum UploadError {
    /// Invalid run configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Root directory could not be traversed
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),

    /// Bucket could not be reached
    #[error(transparent)]
    Connectivity(StorageError),
}

/// Configuration validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Concurrency must be positive.")]
    InvalidConcurrency,

    #[error("A bucket name is required.")]
    MissingBucket,

    #[error("Directory does not exist: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Errors raised while traversing the local tree
#[derive(Error, Debug)]
pub enum FilesystemError {
    #[error("Directory does not exist: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Cannot read '{}': {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors reported by a [`crate::storage::StorageClient`]
#[derive(Error, Debug)]
pub enum StorageError {
    /// The local file could not be opened for upload
    #[error("Failed to read '{}': {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The remote request failed
    #[error("Request for '{key}' failed: {message}")]
    Request { key: String, message: String },

    /// The bucket could not be reached or is not accessible
    #[error("Error connecting to bucket '{bucket}': {message}")]
    Connectivity { bucket: String, message: String },
}

/// Convenience alias for coordinator results
pub type Result<T> = std::result::Result<T, UploadError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn wrapped_errors_do_not_repeat_their_message() {
        let err = UploadError::from(FilesystemError::NotADirectory(PathBuf::from("/tmp/x")));
        assert_eq!(err.to_string(), "Not a directory: /tmp/x");
        assert!(err.source().is_none());

        let err = UploadError::Connectivity(StorageError::Connectivity {
            bucket: "b".into(),
            message: "refused".into(),
        });
        assert_eq!(err.to_string(), "Error connecting to bucket 'b': refused");
        assert!(err.source().is_none());
    }

    #[test]
    fn io_cause_is_kept_in_the_chain() {
        let err = UploadError::from(FilesystemError::Unreadable {
            path: PathBuf::from("/root"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        });
        assert!(err.to_string().starts_with("Cannot read '/root'"));
        assert!(err.source().is_some());
    }
}
