//! Configuration file handling

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Default settings
    #[serde(default)]
    pub defaults: Defaults,

    /// Retry settings
    #[serde(default)]
    pub retry: RetryConfig,

    /// Local service bootstrap settings
    #[serde(default)]
    pub service: ServiceConfig,
}

/// Default settings
#[derive(Debug, Deserialize)]
pub struct Defaults {
    /// Engine targeted when `--engine` is not given
    #[serde(default = "default_engine")]
    pub engine: String,

    /// The only engine a local binary can be bootstrapped for
    #[serde(default = "default_engine")]
    pub primary_engine: String,

    /// Directory holding the scenario tree
    #[serde(default = "default_scenario_root")]
    pub scenario_root: PathBuf,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            engine: default_engine(),
            primary_engine: default_engine(),
            scenario_root: default_scenario_root(),
        }
    }
}

fn default_engine() -> String {
    "quickwit".to_string()
}

fn default_scenario_root() -> PathBuf {
    PathBuf::from("scenarii")
}

/// Retry settings
#[derive(Debug, Deserialize)]
pub struct RetryConfig {
    /// Wait between two attempts of the same request
    #[serde(default = "default_wait_ms")]
    pub wait_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            wait_ms: default_wait_ms(),
        }
    }
}

impl RetryConfig {
    pub fn wait(&self) -> Duration {
        Duration::from_millis(self.wait_ms)
    }
}

fn default_wait_ms() -> u64 {
    500
}

/// Settings for bootstrapping a local service instance with `--binary`
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    /// Service configuration file copied into the instance directory
    #[serde(default = "default_service_config_file")]
    pub config_file: PathBuf,

    /// File name the binary is copied under
    #[serde(default = "default_binary_name")]
    pub binary_name: String,

    /// Arguments passed to the binary
    #[serde(default = "default_service_args")]
    pub args: Vec<String>,

    /// Data directory created inside the instance directory
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Config directory created inside the instance directory
    #[serde(default = "default_config_dir")]
    pub config_dir: String,

    /// Endpoint polled until the service reports readiness
    #[serde(default = "default_readiness_url")]
    pub readiness_url: String,

    /// Body the readiness endpoint returns once ready (trimmed)
    #[serde(default = "default_ready_body")]
    pub ready_body: String,

    /// Number of readiness polls before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Sleep between readiness polls
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Extra delay once the service reports ready
    #[serde(default = "default_settle_secs")]
    pub settle_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            config_file: default_service_config_file(),
            binary_name: default_binary_name(),
            args: default_service_args(),
            data_dir: default_data_dir(),
            config_dir: default_config_dir(),
            readiness_url: default_readiness_url(),
            ready_body: default_ready_body(),
            max_attempts: default_max_attempts(),
            poll_interval_ms: default_poll_interval_ms(),
            settle_secs: default_settle_secs(),
        }
    }
}

fn default_service_config_file() -> PathBuf {
    PathBuf::from("../../config/quickwit.yaml")
}
fn default_binary_name() -> String {
    "quickwit".to_string()
}
fn default_service_args() -> Vec<String> {
    vec!["run".to_string()]
}
fn default_data_dir() -> String {
    "qwdata".to_string()
}
fn default_config_dir() -> String {
    "config".to_string()
}
fn default_readiness_url() -> String {
    "http://localhost:7280/health/readyz".to_string()
}
fn default_ready_body() -> String {
    "true".to_string()
}
fn default_max_attempts() -> u32 {
    100
}
fn default_poll_interval_ms() -> u64 {
    1000
}
fn default_settle_secs() -> u64 {
    6
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from an explicit path, which must exist
    pub fn load_from(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| super::Error::file_read(path, e))?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.defaults.engine, "quickwit");
        assert_eq!(config.defaults.scenario_root, PathBuf::from("scenarii"));
        assert_eq!(config.retry.wait(), Duration::from_millis(500));
        assert_eq!(config.service.max_attempts, 100);
        assert_eq!(config.service.args, vec!["run".to_string()]);
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::parse(
            r#"
[defaults]
engine = "elasticsearch"

[retry]
wait_ms = 10

[service]
max_attempts = 3
readiness_url = "http://127.0.0.1:9000/ready"
"#,
        )
        .unwrap();
        assert_eq!(config.defaults.engine, "elasticsearch");
        assert_eq!(config.defaults.primary_engine, "quickwit");
        assert_eq!(config.retry.wait_ms, 10);
        assert_eq!(config.service.max_attempts, 3);
        assert_eq!(config.service.readiness_url, "http://127.0.0.1:9000/ready");
        assert_eq!(config.service.ready_body, "true");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let err = Config::parse("[retry]\nwait_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, super::super::Error::ConfigParse(_)));
    }
}
