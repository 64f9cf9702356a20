use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use s3peat_core::config::UploadConfig;
use s3peat_core::coordinator::{DryRunReport, RunOutcome, UploadCoordinator};
use s3peat_core::credentials::{ChainCredentials, EnvCredentials, StaticCredentials};
use s3peat_core::pool::{RunResult, WorkerPoolConfig};
use s3peat_core::progress::{Progress, ProgressSink};
use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::load_config::{load_config, FileConfig};
use crate::s3::{S3Bucket, S3Settings};

/// CLI for s3peat: fast, parallel uploads of a directory tree to S3.
#[derive(Parser)]
#[clap(
    name = "s3peat",
    version,
    about = "Upload a local directory tree to an S3 bucket in parallel"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload every matching file under DIRECTORY to the bucket
    Upload(UploadArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct UploadArgs {
    /// Directory to upload
    pub directory: PathBuf,

    /// Bucket name (required, here or in the config file)
    #[clap(short, long)]
    pub bucket: Option<String>,

    /// Key prefix for every uploaded object
    #[clap(short, long)]
    pub prefix: Option<String>,

    /// AWS access key id
    #[clap(short, long)]
    pub key: Option<String>,

    /// AWS secret access key
    #[clap(short, long)]
    pub secret: Option<String>,

    /// Number of parallel uploads [default: 1]
    #[clap(short, long)]
    pub concurrency: Option<usize>,

    /// Skip files whose relative path matches this regex (repeatable)
    #[clap(short, long)]
    pub exclude: Vec<String>,

    /// Only upload files whose relative path matches this regex (repeatable)
    #[clap(short, long)]
    pub include: Vec<String>,

    /// Upload with the authenticated-read ACL instead of public-read
    #[clap(short = 'r', long)]
    pub private: bool,

    /// List matching files and check the bucket, without uploading
    #[clap(short, long)]
    pub dry_run: bool,

    /// Increase output (-v progress, -vv dry-run listing, -vvv debug logs)
    #[clap(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// YAML file with defaults for the options above
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Custom S3 endpoint, e.g. a MinIO server
    #[clap(long)]
    pub endpoint_url: Option<String>,

    /// AWS region [default: from the AWS config, else us-east-1]
    #[clap(long)]
    pub region: Option<String>,
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        match &self.command {
            Commands::Upload(args) => args.verbose,
        }
    }
}

impl UploadArgs {
    /// Merge with file defaults. Options given on the command line win.
    pub fn resolve(&self, file: FileConfig) -> (UploadConfig, S3Settings) {
        let bucket = self.bucket.clone().or(file.bucket).unwrap_or_default();
        let pick = |cli: &Vec<String>, file: Vec<String>| {
            if cli.is_empty() {
                file
            } else {
                cli.clone()
            }
        };

        let config = UploadConfig {
            directory: self.directory.clone(),
            bucket: bucket.clone(),
            prefix: self.prefix.clone().or(file.prefix).unwrap_or_default(),
            include: pick(&self.include, file.include),
            exclude: pick(&self.exclude, file.exclude),
            pool: WorkerPoolConfig {
                concurrency: self.concurrency.or(file.concurrency).unwrap_or(1),
                public_read: !(self.private || file.private.unwrap_or(false)),
                dry_run: self.dry_run,
            },
        };
        let settings = S3Settings {
            bucket,
            region: self.region.clone().or(file.region),
            endpoint_url: self.endpoint_url.clone().or(file.endpoint_url),
        };
        (config, settings)
    }
}

/// How the process should exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Success,
    /// Some files were not uploaded.
    Unsuccessful,
    /// The run could not proceed (bad config, unreachable bucket on dry run).
    Fatal,
}

impl From<Exit> for ExitCode {
    fn from(exit: Exit) -> Self {
        match exit {
            Exit::Success => ExitCode::SUCCESS,
            Exit::Unsuccessful => ExitCode::from(1),
            Exit::Fatal => ExitCode::from(2),
        }
    }
}

/// Prints `\r`-refreshed progress to stdout when verbose, and a final summary line always.
struct ConsoleProgress {
    live: bool,
    printed: bool,
}

impl ProgressSink for ConsoleProgress {
    fn update(&mut self, progress: &Progress) {
        if self.live {
            let mut out = std::io::stdout().lock();
            let _ = write!(out, "\r{progress}");
            let _ = out.flush();
            self.printed = true;
        }
    }

    fn finish(&mut self, progress: &Progress) {
        if self.printed {
            println!("\r{progress}");
        } else {
            println!("{progress}");
        }
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<Exit> {
    match cli.command {
        Commands::Upload(args) => upload(args).await,
    }
}

async fn upload(args: UploadArgs) -> Result<Exit> {
    let file = match &args.config {
        Some(path) => load_config(path)?,
        None => FileConfig::default(),
    };
    let (config, settings) = args.resolve(file);
    config.validate().context("Invalid configuration")?;

    let credentials = ChainCredentials::new()
        .with(StaticCredentials::new(args.key.clone(), args.secret.clone()))
        .with(EnvCredentials);
    let bucket = Arc::new(S3Bucket::connect(&settings, &credentials).await);

    let dry_run = config.pool.dry_run;
    if dry_run && args.verbose > 1 {
        let root = config
            .directory
            .canonicalize()
            .unwrap_or_else(|_| config.directory.clone());
        println!("Finding files in {} ...", root.display());
        println!();
    }

    let mut coordinator = UploadCoordinator::new(config, Arc::clone(&bucket));
    let cancel = coordinator.cancellation_token();
    let interrupt = tokio::spawn(async move {
        if watch_interrupts(tokio::signal::ctrl_c, cancel).await {
            eprintln!("Aborted.");
            std::process::exit(130);
        }
    });

    let mut progress = ConsoleProgress {
        live: args.verbose > 0,
        printed: false,
    };
    let outcome = coordinator.run(&mut progress).await;
    interrupt.abort();

    match outcome? {
        RunOutcome::DryRun(report) => {
            print_dry_run(&report, args.verbose);
            if report.count() == 0 {
                return Ok(Exit::Unsuccessful);
            }
            Ok(report_connectivity(&coordinator, bucket.name(), args.verbose).await)
        }
        RunOutcome::Completed(result) => Ok(report_upload(&result)),
    }
}

/// Cancels `cancel` on the first interrupt. Returns `true` once a second
/// interrupt arrives, `false` if the signal source fails.
async fn watch_interrupts<F, Fut>(mut signal: F, cancel: CancellationToken) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if signal().await.is_err() {
        return false;
    }
    eprintln!("Stopping...");
    cancel.cancel();
    signal().await.is_ok()
}

fn print_dry_run(report: &DryRunReport, verbose: u8) {
    if verbose > 1 {
        for file in &report.files {
            println!("{file}");
        }
        println!();
    }
    match report.count() {
        0 => eprintln!("No files found."),
        n => println!("{n} files found."),
    }
    if verbose > 1 {
        println!();
    }
}

async fn report_connectivity(
    coordinator: &UploadCoordinator<S3Bucket>,
    bucket: &str,
    verbose: u8,
) -> Exit {
    match coordinator.check_connectivity().await {
        Ok(()) => {
            if verbose > 0 {
                println!("Connected to bucket '{bucket}' OK.");
            }
            Exit::Success
        }
        Err(e) => {
            eprintln!("Error connecting to bucket '{bucket}'.");
            if verbose > 0 {
                let detail = format!("{:#}", anyhow::Error::new(e));
                if verbose > 1 {
                    for line in detail.lines() {
                        eprintln!("    {line}");
                    }
                } else if let Some(first) = detail.lines().next() {
                    eprintln!("    {first}");
                }
            }
            Exit::Fatal
        }
    }
}

fn report_upload(result: &RunResult) -> Exit {
    if result.is_success() {
        return Exit::Success;
    }
    if result.aborted {
        eprintln!("Upload interrupted.");
    }
    eprintln!("Error uploading files:");
    for path in result.unsuccessful() {
        eprintln!("    {}", path.display());
    }
    Exit::Unsuccessful
}
