//! High-level run orchestration: validate → discover → upload.
//!
//! [`UploadCoordinator`] drives one run of the uploader:
//!   - Validates the [`UploadConfig`] before touching the filesystem
//!   - Walks the root directory through the configured filters and builds the
//!     task list
//!   - In dry-run mode, reports what would be uploaded and stops without
//!     contacting storage
//!   - Otherwise hands the tasks to a [`WorkerPool`] and waits for it to drain
//!     or for the cancellation token to fire
//!
//! # States
//! `Init → Discovering → (DryRunReport | Uploading) → Done`, with `Aborting`
//! entered from `Uploading` when the run was cancelled.
//!
//! # Error Handling
//! Configuration and filesystem problems are returned before any worker is
//! spawned. Per-file upload errors never surface as `Err`: they end up in
//! [`RunResult::failures`].

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::UploadConfig;
use crate::error::{Result, UploadError};
use crate::pool::{RunResult, WorkerPool};
use crate::progress::ProgressSink;
use crate::storage::StorageClient;
use crate::task::{relative_key, UploadTask};
use crate::walker::FileWalker;

/// Lifecycle of a coordinator run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    Discovering,
    DryRunReport,
    Uploading,
    Aborting,
    Done,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Init => "init",
            RunState::Discovering => "discovering",
            RunState::DryRunReport => "dry-run-report",
            RunState::Uploading => "uploading",
            RunState::Aborting => "aborting",
            RunState::Done => "done",
        };
        f.write_str(name)
    }
}

/// What a dry run would upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DryRunReport {
    /// Canonical path of the scanned directory
    pub root: PathBuf,

    /// Matched files, relative to the root, in walk order
    pub files: Vec<String>,
}

impl DryRunReport {
    pub fn count(&self) -> usize {
        self.files.len()
    }
}

/// Result of walking the root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    /// Regular files found, before filtering
    pub total_discovered: usize,

    /// One task per file the filter accepted, in walk order
    pub tasks: Vec<UploadTask>,
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    DryRun(DryRunReport),
    Completed(RunResult),
}

/// Orchestrates discovery and upload for one directory
pub struct UploadCoordinator<C: ?Sized> {
    config: UploadConfig,
    client: Arc<C>,
    cancel: CancellationToken,
    state: RunState,
}

impl<C> UploadCoordinator<C>
where
    C: StorageClient + ?Sized + 'static,
{
    pub fn new(config: UploadConfig, client: Arc<C>) -> Self {
        Self {
            config,
            client,
            cancel: CancellationToken::new(),
            state: RunState::Init,
        }
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Get a clone of the cancellation token (for signal handlers)
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Run to completion.
    pub async fn run(&mut self, progress: &mut dyn ProgressSink) -> Result<RunOutcome> {
        self.transition(RunState::Init);
        self.config.validate()?;
        self.config.trace_loaded();

        self.transition(RunState::Discovering);
        let Discovery {
            total_discovered,
            tasks,
        } = self.discover()?;
        info!(
            discovered = total_discovered,
            matched = tasks.len(),
            root = %self.config.directory.display(),
            "Discovered files"
        );

        if self.config.pool.dry_run {
            self.transition(RunState::DryRunReport);
            let report = self.dry_run_report(&tasks);
            self.transition(RunState::Done);
            return Ok(RunOutcome::DryRun(report));
        }

        self.transition(RunState::Uploading);
        if let Err(e) = self.check_connectivity().await {
            warn!(error = %e, "Connectivity check failed, attempting uploads anyway");
        }

        let pool = WorkerPool::new(self.config.pool.clone())?;
        let mut result = pool
            .run(tasks, Arc::clone(&self.client), &self.cancel, progress)
            .await;
        result.total_discovered = total_discovered;

        if result.aborted {
            self.transition(RunState::Aborting);
        }
        if !result.is_success() {
            error!(
                failed = result.failures.len(),
                incomplete = result.incomplete.len(),
                "Some files were not uploaded"
            );
        }
        self.transition(RunState::Done);
        Ok(RunOutcome::Completed(result))
    }

    /// Walk the root, counting every file, and build one task per match.
    pub fn discover(&self) -> Result<Discovery> {
        let filter = self.config.filter()?;
        let walker = FileWalker::new(&self.config.directory, filter);
        let mut total_discovered = 0;
        let mut tasks = Vec::new();
        for path in walker.files()? {
            total_discovered += 1;
            if walker.accepts(&path) {
                tasks.push(UploadTask::new(&self.config.directory, path, &self.config.prefix));
            }
        }
        Ok(Discovery {
            total_discovered,
            tasks,
        })
    }

    /// Ask the storage client whether the bucket is reachable.
    pub async fn check_connectivity(&self) -> Result<()> {
        match self.client.check_connectivity().await {
            Ok(()) => {
                info!(bucket = %self.config.bucket, "Connected to bucket");
                Ok(())
            }
            Err(e) => Err(UploadError::Connectivity(e)),
        }
    }

    fn dry_run_report(&self, tasks: &[UploadTask]) -> DryRunReport {
        let root = self
            .config
            .directory
            .canonicalize()
            .unwrap_or_else(|_| self.config.directory.clone());
        let files = tasks
            .iter()
            .map(|t| relative_key(&self.config.directory, t.local_path()))
            .collect();
        DryRunReport { root, files }
    }

    fn transition(&mut self, next: RunState) {
        debug!(from = %self.state, to = %next, "Coordinator state");
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::progress::NoProgress;
    use crate::storage::MockStorageClient;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn invalid_config_fails_before_discovery() {
        let dir = tempdir().unwrap();
        let mut config = UploadConfig::new(dir.path(), "bucket");
        config.pool.concurrency = 0;

        let mut client = MockStorageClient::new();
        client.expect_check_connectivity().never();
        client.expect_put().never();

        let mut coordinator = UploadCoordinator::new(config, Arc::new(client));
        let err = coordinator.run(&mut NoProgress).await.unwrap_err();
        assert!(matches!(err, UploadError::Config(ConfigError::InvalidConcurrency)));
        assert_eq!(coordinator.state(), RunState::Init);
    }

    #[tokio::test]
    async fn connectivity_failure_is_only_a_warning() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();

        let mut client = MockStorageClient::new();
        client.expect_check_connectivity().times(1).returning(|| {
            Err(crate::error::StorageError::Connectivity {
                bucket: "bucket".into(),
                message: "unreachable".into(),
            })
        });
        client.expect_put().times(1).returning(|_, _, _| Ok(()));

        let mut coordinator =
            UploadCoordinator::new(UploadConfig::new(dir.path(), "bucket"), Arc::new(client));
        let outcome = coordinator.run(&mut NoProgress).await.unwrap();
        match outcome {
            RunOutcome::Completed(result) => assert!(result.is_success()),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(coordinator.state(), RunState::Done);
    }
}
