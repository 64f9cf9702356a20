#![doc = "S3 storage client: implements the core `StorageClient` trait over aws-sdk-s3."]
//
//! # S3 integration (CLI <-> Core)
//!
//! This module wires the [`StorageClient`] abstraction from `s3peat-core` to a
//! real bucket. [`S3Bucket`] wraps one `aws_sdk_s3::Client`; the client keeps
//! its own connection pool and is shared by every upload worker.
//!
//! ## Credentials
//! - Explicit or environment credentials come in through a
//!   [`CredentialsProvider`].
//! - When the provider has nothing, the AWS SDK default chain applies
//!   (shared config files, SSO, instance metadata).
//!
//! ## S3-compatible stores
//! Setting an endpoint URL switches to path-style addressing, which MinIO and
//! most other S3-compatible servers expect.

use std::path::Path;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials as AwsCredentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client;
use s3peat_core::credentials::CredentialsProvider;
use s3peat_core::error::StorageError;
use s3peat_core::storage::{ObjectAcl, StorageClient};

/// Region used when neither the CLI nor the AWS config names one
pub const DEFAULT_REGION: &str = "us-east-1";

/// Where and how to reach the bucket
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct S3Settings {
    pub bucket: String,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
}

pub struct S3Bucket {
    client: Client,
    name: String,
}

impl S3Bucket {
    /// Build a client for `settings.bucket`. No network traffic happens here.
    pub async fn connect(settings: &S3Settings, credentials: &dyn CredentialsProvider) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        match credentials.credentials() {
            Some(creds) => {
                tracing::info!(provider = credentials.name(), "Using explicit credentials");
                loader = loader.credentials_provider(AwsCredentials::new(
                    creds.access_key_id,
                    creds.secret_access_key,
                    None,
                    None,
                    "s3peat",
                ));
            }
            None => tracing::info!("No explicit credentials, using the AWS default chain"),
        }
        if let Some(region) = &settings.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(url) = &settings.endpoint_url {
            loader = loader.endpoint_url(url.clone());
        }
        let shared = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if shared.region().is_none() {
            tracing::debug!(region = DEFAULT_REGION, "No region configured, using default");
            builder = builder.region(Region::new(DEFAULT_REGION));
        }
        if settings.endpoint_url.is_some() {
            builder = builder.force_path_style(true);
        }

        tracing::info!(
            bucket = %settings.bucket,
            endpoint = settings.endpoint_url.as_deref().unwrap_or("aws"),
            "Initialized S3 client"
        );
        Self {
            client: Client::from_conf(builder.build()),
            name: settings.bucket.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

fn canned_acl(acl: ObjectAcl) -> ObjectCannedAcl {
    match acl {
        ObjectAcl::PublicRead => ObjectCannedAcl::PublicRead,
        ObjectAcl::AuthenticatedRead => ObjectCannedAcl::AuthenticatedRead,
    }
}

#[async_trait]
impl StorageClient for S3Bucket {
    async fn put(&self, local_path: &Path, key: &str, acl: ObjectAcl) -> Result<(), StorageError> {
        let body = ByteStream::from_path(local_path)
            .await
            .map_err(|e| StorageError::ReadFile {
                path: local_path.to_path_buf(),
                source: std::io::Error::other(e),
            })?;

        self.client
            .put_object()
            .bucket(&self.name)
            .key(key)
            .acl(canned_acl(acl))
            .body(body)
            .send()
            .await
            .map_err(|e| StorageError::Request {
                key: key.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        tracing::trace!(bucket = %self.name, key, "PutObject succeeded");
        Ok(())
    }

    async fn check_connectivity(&self) -> Result<(), StorageError> {
        self.client
            .head_bucket()
            .bucket(&self.name)
            .send()
            .await
            .map_err(|e| StorageError::Connectivity {
                bucket: self.name.clone(),
                message: DisplayErrorContext(&e).to_string(),
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acl_mapping() {
        assert_eq!(canned_acl(ObjectAcl::PublicRead), ObjectCannedAcl::PublicRead);
        assert_eq!(
            canned_acl(ObjectAcl::AuthenticatedRead),
            ObjectCannedAcl::AuthenticatedRead
        );
    }
}
