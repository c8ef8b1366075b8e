//! TOML file configuration structures.
//!
//! These structs directly map to the `evrelay.toml` file format. Every
//! section is optional; values left out here can still come from the
//! command line or the environment.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub aws: AwsConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub worker: WorkerSection,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

pub(crate) fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

/// AWS client settings shared by every backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AwsConfig {
    /// Region override. Falls back to the SDK's default provider chain.
    pub region: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueConfig {
    /// SQS queue URL.
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// S3 bucket receiving the stored messages.
    pub bucket: Option<String>,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    #[serde(default = "default_key_suffix")]
    pub key_suffix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            key_prefix: default_key_prefix(),
            key_suffix: default_key_suffix(),
        }
    }
}

fn default_key_prefix() -> String {
    "messages/".to_string()
}

fn default_key_suffix() -> String {
    ".json".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Name of the SSM parameter holding the authority token.
    pub token_parameter: Option<String>,
}

/// Worker loop tuning. Durations are whole seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSection {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_wait_time_secs")]
    pub wait_time_secs: u64,
    #[serde(default = "default_idle_interval_secs")]
    pub idle_interval_secs: u64,
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

impl Default for WorkerSection {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            wait_time_secs: default_wait_time_secs(),
            idle_interval_secs: default_idle_interval_secs(),
            max_in_flight: default_max_in_flight(),
        }
    }
}

fn default_batch_size() -> usize {
    10
}

fn default_wait_time_secs() -> u64 {
    5
}

fn default_idle_interval_secs() -> u64 {
    10
}

fn default_max_in_flight() -> usize {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config_parsing() {
        let toml_str = r#"
[server]
listen = "127.0.0.1:3000"

[aws]
region = "il-central-1"

[queue]
url = "https://sqs.il-central-1.amazonaws.com/123456789012/relay"

[store]
bucket = "relay-messages"
key_prefix = "inbox/"

[auth]
token_parameter = "/relay/token"

[worker]
batch_size = 5
idle_interval_secs = 2
max_in_flight = 4
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen.port(), 3000);
        assert_eq!(config.aws.region.as_deref(), Some("il-central-1"));
        assert_eq!(config.store.bucket.as_deref(), Some("relay-messages"));
        assert_eq!(config.store.key_prefix, "inbox/");
        assert_eq!(config.store.key_suffix, ".json");
        assert_eq!(config.auth.token_parameter.as_deref(), Some("/relay/token"));
        assert_eq!(config.worker.batch_size, 5);
        assert_eq!(config.worker.wait_time_secs, 5);
        assert_eq!(config.worker.idle_interval_secs, 2);
        assert_eq!(config.worker.max_in_flight, 4);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.listen, default_listen_addr());
        assert!(config.queue.url.is_none());
        assert_eq!(config.store.key_prefix, "messages/");
        assert_eq!(config.worker.batch_size, 10);
        assert_eq!(config.worker.idle_interval_secs, 10);
    }

    #[test]
    fn test_unknown_section_is_rejected() {
        let result: Result<FileConfig, _> = toml::from_str("[database]\nurl = \"x\"\n");
        assert!(result.is_err());
    }
}
