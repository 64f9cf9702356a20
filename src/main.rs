use clap::Parser;
use s3peat::cli::{run, Cli};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Maps `-v` count to a default filter. `RUST_LOG` takes precedence.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0..=2 => "warn",
        3 => "warn,s3peat=debug,s3peat_core=debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbosity());
    tracing::debug!("CLI arguments parsed, invoking run");

    match run(cli).await {
        Ok(exit) => exit.into(),
        Err(e) => {
            tracing::debug!(error = ?e, "Run failed");
            eprintln!("{e:#}");
            ExitCode::from(2)
        }
    }
}
