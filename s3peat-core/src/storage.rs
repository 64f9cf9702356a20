//! # storage: interface to the remote bucket
//!
//! This module defines the [`StorageClient`] trait the worker pool uploads
//! through. Concrete clients (the S3 adapter in the `s3peat` crate, test
//! stubs) implement it; the core never talks to the network itself.
//!
//! ## Contract
//! - `put` uploads one local file to one key. It is invoked concurrently
//!   from every worker, so implementations must be `Send + Sync` and safe
//!   for shared use.
//! - `check_connectivity` verifies the bucket is reachable with the
//!   configured credentials.
//! - Retries, multipart mechanics and authentication are the implementor's
//!   business.
//!
//! ## Mocking
//! The trait is annotated for `mockall`, so tests can generate
//! `MockStorageClient` with exact call expectations.

use std::path::Path;

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::StorageError;

/// Access control applied to each uploaded object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectAcl {
    /// Readable by anyone.
    PublicRead,
    /// Readable by any authenticated principal.
    AuthenticatedRead,
}

impl ObjectAcl {
    pub fn from_public(public_read: bool) -> Self {
        if public_read {
            ObjectAcl::PublicRead
        } else {
            ObjectAcl::AuthenticatedRead
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectAcl::PublicRead => "public-read",
            ObjectAcl::AuthenticatedRead => "authenticated-read",
        }
    }
}

/// Remote bucket operations used by the upload engine.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Upload the file at `local_path` to `key`, applying `acl`.
    async fn put(&self, local_path: &Path, key: &str, acl: ObjectAcl) -> Result<(), StorageError>;

    /// Check that the bucket exists and is accessible.
    async fn check_connectivity(&self) -> Result<(), StorageError>;
}
