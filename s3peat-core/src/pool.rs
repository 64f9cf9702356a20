//! Fixed-size pool of upload workers.
//!
//! Every worker pulls from one shared queue until it is empty or the
//! cancellation token fires. Outcomes go back over a channel, exactly one per
//! claimed task, and the caller's task aggregates them. The queue lock is
//! only held while popping, never across a network call.

use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::ConfigError;
use crate::progress::{Progress, ProgressSink};
use crate::storage::{ObjectAcl, StorageClient};
use crate::task::UploadTask;

/// Upper bound on concurrent workers
pub const MAX_CONCURRENCY: usize = 1024;

/// Worker pool settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerPoolConfig {
    /// Number of concurrent workers (must be at least 1)
    pub concurrency: usize,

    /// Upload objects as publicly readable
    pub public_read: bool,

    /// Skip all network calls
    pub dry_run: bool,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            public_read: true,
            dry_run: false,
        }
    }
}

impl WorkerPoolConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency);
        }
        Ok(())
    }

    /// Configured concurrency, clamped to [`MAX_CONCURRENCY`].
    pub fn effective_concurrency(&self) -> usize {
        if self.concurrency > MAX_CONCURRENCY {
            warn!(
                requested = self.concurrency,
                max = MAX_CONCURRENCY,
                "Concurrency clamped"
            );
            return MAX_CONCURRENCY;
        }
        self.concurrency.max(1)
    }

    pub fn acl(&self) -> ObjectAcl {
        ObjectAcl::from_public(self.public_read)
    }
}

/// Result of a pool run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunResult {
    /// Files found before filtering. The pool itself only sees tasks and
    /// reports their count; the coordinator replaces it with the walk total.
    pub total_discovered: usize,

    /// Tasks a worker actually claimed
    pub attempted: usize,

    /// Tasks uploaded successfully
    pub succeeded: usize,

    /// Local paths whose upload failed, sorted
    pub failures: Vec<PathBuf>,

    /// Local paths never attempted because the run was cancelled, sorted
    pub incomplete: Vec<PathBuf>,

    /// Whether cancellation was requested during the run
    pub aborted: bool,
}

impl RunResult {
    /// Every path that did not make it to the bucket, sorted.
    pub fn unsuccessful(&self) -> Vec<PathBuf> {
        let mut all: Vec<PathBuf> = self
            .failures
            .iter()
            .chain(self.incomplete.iter())
            .cloned()
            .collect();
        all.sort();
        all
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.incomplete.is_empty()
    }
}

struct Outcome {
    task: UploadTask,
    ok: bool,
}

/// Runs upload tasks across a fixed number of concurrent workers
#[derive(Debug, Clone)]
pub struct WorkerPool {
    config: WorkerPoolConfig,
}

impl WorkerPool {
    pub fn new(config: WorkerPoolConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &WorkerPoolConfig {
        &self.config
    }

    /// Upload every task and return once all workers have exited.
    ///
    /// Cancelling `cancel` stops workers from claiming further tasks; uploads
    /// already in flight run to completion. Unclaimed tasks come back in
    /// [`RunResult::incomplete`].
    pub async fn run<C>(
        &self,
        tasks: Vec<UploadTask>,
        client: Arc<C>,
        cancel: &CancellationToken,
        progress: &mut dyn ProgressSink,
    ) -> RunResult
    where
        C: StorageClient + ?Sized + 'static,
    {
        let total = tasks.len();
        if self.config.dry_run {
            info!(total, "Dry run, no uploads performed");
            return RunResult {
                total_discovered: total,
                ..RunResult::default()
            };
        }

        let worker_count = self.config.effective_concurrency().min(total);
        let acl = self.config.acl();
        let queue = Arc::new(Mutex::new(VecDeque::from(tasks)));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut workers = JoinSet::new();
        for id in 0..worker_count {
            workers.spawn(worker(
                id,
                Arc::clone(&queue),
                Arc::clone(&client),
                acl,
                cancel.clone(),
                tx.clone(),
            ));
        }
        drop(tx);
        info!(workers = worker_count, total, acl = acl.as_str(), "Workers spawned");

        let mut state = Progress::new(total);
        let mut failures = Vec::new();
        while let Some(outcome) = rx.recv().await {
            state.record(outcome.ok);
            if !outcome.ok {
                failures.push(outcome.task.into_local_path());
            }
            progress.update(&state);
        }

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(processed) => debug!(processed, "Worker joined"),
                Err(e) => warn!(error = %e, "Worker failed to join cleanly"),
            }
        }

        let mut incomplete: Vec<PathBuf> = queue
            .lock()
            .await
            .drain(..)
            .map(UploadTask::into_local_path)
            .collect();
        failures.sort();
        incomplete.sort();

        let aborted = cancel.is_cancelled();
        if aborted {
            warn!(
                completed = state.completed,
                incomplete = incomplete.len(),
                "Upload cancelled"
            );
        }
        progress.finish(&state);

        info!(
            total,
            succeeded = state.succeeded(),
            errors = state.errors,
            "Upload finished"
        );

        RunResult {
            total_discovered: total,
            attempted: state.completed,
            succeeded: state.succeeded(),
            failures,
            incomplete,
            aborted,
        }
    }
}

async fn worker<C>(
    id: usize,
    queue: Arc<Mutex<VecDeque<UploadTask>>>,
    client: Arc<C>,
    acl: ObjectAcl,
    cancel: CancellationToken,
    outcomes: mpsc::UnboundedSender<Outcome>,
) -> usize
where
    C: StorageClient + ?Sized + 'static,
{
    let mut processed = 0;
    loop {
        if cancel.is_cancelled() {
            debug!(worker = id, "Cancellation observed, stopping");
            break;
        }
        let next = queue.lock().await.pop_front();
        let Some(task) = next else {
            break;
        };

        let put = async { client.put(task.local_path(), task.destination_key(), acl).await };
        let ok = match AssertUnwindSafe(put).catch_unwind().await {
            Ok(Ok(())) => {
                debug!(worker = id, key = task.destination_key(), "Uploaded");
                true
            }
            Ok(Err(e)) => {
                error!(worker = id, key = task.destination_key(), error = %e, "Failed");
                false
            }
            Err(_) => {
                error!(worker = id, key = task.destination_key(), "Upload panicked");
                false
            }
        };

        processed += 1;
        if outcomes.send(Outcome { task, ok }).is_err() {
            break;
        }
    }
    processed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::progress::NoProgress;
    use crate::storage::MockStorageClient;
    use std::path::Path;

    fn tasks(n: usize) -> Vec<UploadTask> {
        (0..n)
            .map(|i| UploadTask::new(Path::new("/root"), PathBuf::from(format!("/root/f{i:03}")), "p"))
            .collect()
    }

    fn pool(concurrency: usize) -> WorkerPool {
        WorkerPool::new(WorkerPoolConfig {
            concurrency,
            ..WorkerPoolConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        assert!(matches!(
            WorkerPool::new(WorkerPoolConfig {
                concurrency: 0,
                ..WorkerPoolConfig::default()
            }),
            Err(ConfigError::InvalidConcurrency)
        ));
    }

    #[test]
    fn concurrency_is_clamped() {
        let config = WorkerPoolConfig {
            concurrency: MAX_CONCURRENCY * 2,
            ..WorkerPoolConfig::default()
        };
        assert_eq!(config.effective_concurrency(), MAX_CONCURRENCY);
    }

    #[test]
    fn acl_follows_public_flag() {
        let mut config = WorkerPoolConfig::default();
        assert_eq!(config.acl(), ObjectAcl::PublicRead);
        config.public_read = false;
        assert_eq!(config.acl(), ObjectAcl::AuthenticatedRead);
    }

    #[tokio::test]
    async fn empty_task_list_spawns_nothing() {
        let client = Arc::new(MockStorageClient::new());
        let result = pool(4)
            .run(Vec::new(), client, &CancellationToken::new(), &mut NoProgress)
            .await;
        assert_eq!(result, RunResult::default());
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn records_failed_paths() {
        let mut client = MockStorageClient::new();
        client
            .expect_put()
            .times(4)
            .returning(|_, key, _| {
                if key.ends_with("f001") {
                    Err(StorageError::Request {
                        key: key.to_string(),
                        message: "denied".into(),
                    })
                } else {
                    Ok(())
                }
            });

        let result = pool(2)
            .run(tasks(4), Arc::new(client), &CancellationToken::new(), &mut NoProgress)
            .await;
        assert_eq!(result.attempted, 4);
        assert_eq!(result.succeeded, 3);
        assert_eq!(result.failures, vec![PathBuf::from("/root/f001")]);
        assert!(result.incomplete.is_empty());
        assert!(!result.aborted);
    }

    #[tokio::test]
    async fn private_uploads_use_authenticated_read() {
        let mut client = MockStorageClient::new();
        client
            .expect_put()
            .withf(|_, _, acl| *acl == ObjectAcl::AuthenticatedRead)
            .times(2)
            .returning(|_, _, _| Ok(()));

        let pool = WorkerPool::new(WorkerPoolConfig {
            concurrency: 1,
            public_read: false,
            dry_run: false,
        })
        .unwrap();
        let result = pool
            .run(tasks(2), Arc::new(client), &CancellationToken::new(), &mut NoProgress)
            .await;
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn dry_run_never_calls_put() {
        let mut client = MockStorageClient::new();
        client.expect_put().never();

        let pool = WorkerPool::new(WorkerPoolConfig {
            concurrency: 8,
            public_read: true,
            dry_run: true,
        })
        .unwrap();
        let result = pool
            .run(tasks(10), Arc::new(client), &CancellationToken::new(), &mut NoProgress)
            .await;
        assert_eq!(result.total_discovered, 10);
        assert_eq!(result.attempted, 0);
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn cancelled_before_start_leaves_everything_incomplete() {
        let mut client = MockStorageClient::new();
        client.expect_put().never();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = pool(3)
            .run(tasks(5), Arc::new(client), &cancel, &mut NoProgress)
            .await;
        assert!(result.aborted);
        assert_eq!(result.attempted, 0);
        assert_eq!(result.incomplete.len(), 5);
        assert_eq!(result.unsuccessful().len(), 5);
    }

    struct PanicsOn(&'static str);

    #[async_trait::async_trait]
    impl StorageClient for PanicsOn {
        async fn put(&self, _: &Path, key: &str, _: ObjectAcl) -> Result<(), StorageError> {
            if key.ends_with(self.0) {
                panic!("boom");
            }
            Ok(())
        }

        async fn check_connectivity(&self) -> Result<(), StorageError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn panicking_put_is_a_failure() {
        let result = pool(1)
            .run(tasks(3), Arc::new(PanicsOn("f000")), &CancellationToken::new(), &mut NoProgress)
            .await;
        assert_eq!(result.attempted, 3);
        assert_eq!(result.succeeded, 2);
        assert_eq!(result.failures, vec![PathBuf::from("/root/f000")]);
    }
}
