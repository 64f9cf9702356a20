use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::filter::PathFilter;
use crate::pool::WorkerPoolConfig;

/// Everything needed for one upload run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Local directory to upload
    pub directory: PathBuf,

    /// Destination bucket
    pub bucket: String,

    /// Key prefix prepended to every object key
    #[serde(default)]
    pub prefix: String,

    /// Inclusion regexes
    #[serde(default)]
    pub include: Vec<String>,

    /// Exclusion regexes
    #[serde(default)]
    pub exclude: Vec<String>,

    #[serde(flatten)]
    pub pool: WorkerPoolConfig,
}

impl UploadConfig {
    pub fn new(directory: impl Into<PathBuf>, bucket: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            bucket: bucket.into(),
            prefix: String::new(),
            include: Vec::new(),
            exclude: Vec::new(),
            pool: WorkerPoolConfig::default(),
        }
    }

    /// Check concurrency, bucket, directory and patterns, in that order.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pool.validate()?;
        if self.bucket.trim().is_empty() {
            return Err(ConfigError::MissingBucket);
        }
        if !self.directory.exists() {
            return Err(ConfigError::DirectoryNotFound(self.directory.clone()));
        }
        self.filter()?;
        Ok(())
    }

    pub fn filter(&self) -> Result<PathFilter, ConfigError> {
        PathFilter::new(&self.include, &self.exclude)
    }

    pub fn trace_loaded(&self) {
        info!(
            directory = %self.directory.display(),
            bucket = %self.bucket,
            prefix = %self.prefix,
            concurrency = self.pool.concurrency,
            dry_run = self.pool.dry_run,
            "Loaded UploadConfig"
        );
        debug!(?self, "UploadConfig loaded (full debug)");
    }
}
