use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{error, info};

/// Defaults read from a YAML file. Command-line options override every field.
///
/// Credentials are deliberately not accepted here; they come from
/// `--key/--secret`, the environment, or the AWS config files.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub bucket: Option<String>,
    pub prefix: Option<String>,
    pub concurrency: Option<usize>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub private: Option<bool>,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
}

/// Loads a YAML defaults file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<FileConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let content = fs::read_to_string(path_ref)
        .map_err(|e| {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            e
        })
        .with_context(|| format!("Failed to read config file {}", path_ref.display()))?;

    let config: FileConfig = match serde_yaml::from_str::<Option<FileConfig>>(&content) {
        Ok(conf) => conf.unwrap_or_default(),
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            anyhow::bail!("Failed to parse config YAML {}: {e}", path_ref.display());
        }
    };

    info!(
        bucket = config.bucket.as_deref().unwrap_or("-"),
        concurrency = ?config.concurrency,
        "Config file parsed successfully"
    );
    Ok(config)
}
