#![doc = "s3peat-core: the concurrent upload engine behind s3peat."]

//! This crate contains file discovery, filtering, the worker pool and the run
//! coordinator. It talks to object storage only through the
//! [`storage::StorageClient`] trait; concrete clients live in the `s3peat`
//! crate or in tests.
//!
//! # Usage
//! Build an [`config::UploadConfig`], wrap a storage client in an `Arc`, and
//! drive an [`coordinator::UploadCoordinator`].

pub mod config;
pub mod coordinator;
pub mod credentials;
pub mod error;
pub mod filter;
pub mod pool;
pub mod progress;
pub mod storage;
pub mod task;
pub mod walker;

pub use config::UploadConfig;
pub use coordinator::{Discovery, DryRunReport, RunOutcome, RunState, UploadCoordinator};
pub use error::{ConfigError, FilesystemError, StorageError, UploadError};
pub use filter::PathFilter;
pub use pool::{RunResult, WorkerPool, WorkerPoolConfig};
pub use progress::{NoProgress, Progress, ProgressSink};
pub use storage::{ObjectAcl, StorageClient};
pub use task::UploadTask;
pub use walker::FileWalker;
