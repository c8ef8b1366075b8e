//! Configuration module for evrelay-server.
//!
//! Handles loading configuration from an optional TOML file, CLI arguments
//! and environment variables, then checks that the selected run mode has
//! everything it needs.

pub mod file;

use crate::config::file::FileConfig;
use evrelay_core::config::{MAX_BATCH_SIZE, ObjectKeyLayout, WorkerConfig};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Bucket variable read by older deployments of the worker.
pub const LEGACY_BUCKET_ENV: &str = "S3BucketName";

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Values given on the command line or through the environment. They take
/// precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub listen: Option<SocketAddr>,
    pub region: Option<String>,
    pub queue_url: Option<String>,
    pub bucket: Option<String>,
    pub token_parameter: Option<String>,
    pub token: Option<String>,
}

/// Everything the `ingress` mode needs.
#[derive(Debug, Clone)]
pub struct IngressSettings {
    pub listen: SocketAddr,
    pub region: Option<String>,
    pub queue_url: String,
    pub token_parameter: String,
}

/// Everything the `worker` mode needs.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub region: Option<String>,
    pub queue_url: String,
    pub bucket: String,
    pub worker: WorkerConfig,
    pub layout: ObjectKeyLayout,
}

/// Everything the `local` mode needs.
#[derive(Clone)]
pub struct LocalSettings {
    pub listen: SocketAddr,
    pub token: String,
    pub worker: WorkerConfig,
    pub layout: ObjectKeyLayout,
}

impl std::fmt::Debug for LocalSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSettings")
            .field("listen", &self.listen)
            .field("token", &"<redacted>")
            .field("worker", &self.worker)
            .field("layout", &self.layout)
            .finish()
    }
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    overrides: ConfigOverrides,
}

impl ConfigLoader {
    /// Create a new config loader. Without a path only overrides and
    /// defaults are used.
    pub fn new(config_path: Option<&Path>, overrides: ConfigOverrides) -> Self {
        Self {
            config_path: config_path.map(Path::to_path_buf),
            overrides,
        }
    }

    /// Settings for the `ingress` mode.
    pub fn load_ingress(&self) -> Result<IngressSettings, ConfigError> {
        let mut config = self.merged()?;
        Ok(IngressSettings {
            listen: config.server.listen,
            region: config.aws.region.take(),
            queue_url: required(config.queue.url.take(), "queue url (SQS_QUEUE_URL)")?,
            token_parameter: required(
                config.auth.token_parameter.take(),
                "token parameter (SSM_PARAMETER_NAME)",
            )?,
        })
    }

    /// Settings for the `worker` mode.
    pub fn load_worker(&self) -> Result<WorkerSettings, ConfigError> {
        let mut config = self.merged()?;
        let worker = worker_config(&config)?;
        Ok(WorkerSettings {
            region: config.aws.region.take(),
            queue_url: required(config.queue.url.take(), "queue url (SQS_QUEUE_URL)")?,
            bucket: required(config.store.bucket.take(), "bucket (S3_BUCKET_NAME)")?,
            worker,
            layout: ObjectKeyLayout::new(config.store.key_prefix, config.store.key_suffix),
        })
    }

    /// Settings for the `local` mode.
    pub fn load_local(&self) -> Result<LocalSettings, ConfigError> {
        let config = self.merged()?;
        let worker = worker_config(&config)?;
        let token = required(self.overrides.token.clone(), "token (RELAY_TOKEN)")?;
        Ok(LocalSettings {
            listen: config.server.listen,
            token,
            worker,
            layout: ObjectKeyLayout::new(config.store.key_prefix, config.store.key_suffix),
        })
    }

    fn read_file(&self) -> Result<FileConfig, ConfigError> {
        match &self.config_path {
            Some(path) => {
                let config_content = std::fs::read_to_string(path)?;
                Ok(toml::from_str(&config_content)?)
            }
            None => Ok(FileConfig::default()),
        }
    }

    /// Read the file and apply the overrides on top.
    fn merged(&self) -> Result<FileConfig, ConfigError> {
        let mut config = self.read_file()?;
        let overrides = self.overrides.clone();

        if let Some(listen) = overrides.listen {
            config.server.listen = listen;
        }
        if overrides.region.is_some() {
            config.aws.region = overrides.region;
        }
        if overrides.queue_url.is_some() {
            config.queue.url = overrides.queue_url;
        }
        if overrides.bucket.is_some() {
            config.store.bucket = overrides.bucket;
        }
        if overrides.token_parameter.is_some() {
            config.auth.token_parameter = overrides.token_parameter;
        }
        Ok(config)
    }
}

/// A present and non-blank value, or [`ConfigError::Missing`].
fn required(value: Option<String>, name: &'static str) -> Result<String, ConfigError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn worker_config(config: &FileConfig) -> Result<WorkerConfig, ConfigError> {
    let section = &config.worker;
    if section.batch_size == 0 || section.batch_size > MAX_BATCH_SIZE {
        return Err(ConfigError::ValidationError(format!(
            "worker.batch_size must be between 1 and {MAX_BATCH_SIZE}, got {}",
            section.batch_size
        )));
    }
    for (name, value) in [
        ("worker.wait_time_secs", section.wait_time_secs),
        ("worker.idle_interval_secs", section.idle_interval_secs),
        ("worker.max_in_flight", section.max_in_flight as u64),
    ] {
        if value == 0 {
            return Err(ConfigError::ValidationError(format!(
                "{name} must be greater than zero"
            )));
        }
    }
    Ok(WorkerConfig {
        batch_size: section.batch_size,
        wait_time: Duration::from_secs(section.wait_time_secs),
        idle_interval: Duration::from_secs(section.idle_interval_secs),
        max_in_flight: section.max_in_flight,
    })
}

/// The bucket from the legacy environment variable, if set.
pub fn legacy_bucket_from_env() -> Option<String> {
    std::env::var(LEGACY_BUCKET_ENV).ok()
}
