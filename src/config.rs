use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppError, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub github: GitHubConfig,
    pub circleci: CircleCiConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Deserialize, Clone)]
pub struct GitHubConfig {
    pub app_id: u64,
    pub private_key_path: PathBuf,
    pub webhook_secret: String,
    /// Override for GitHub Enterprise installs.
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default = "default_ci_config_path")]
    pub ci_config_path: String,
}

// Manual Debug impl to avoid leaking the webhook secret
impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("app_id", &self.app_id)
            .field("private_key_path", &self.private_key_path)
            .field("webhook_secret", &"[REDACTED]")
            .field("api_base_url", &self.api_base_url)
            .field("ci_config_path", &self.ci_config_path)
            .finish()
    }
}

#[derive(Deserialize, Clone)]
pub struct CircleCiConfig {
    pub token: String,
    #[serde(default = "default_circleci_api")]
    pub api_base_url: String,
    #[serde(default = "default_circleci_legacy_api")]
    pub legacy_api_base_url: String,
    #[serde(default = "default_vcs_slug")]
    pub vcs_slug: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

// Manual Debug impl to avoid leaking the API token
impl std::fmt::Debug for CircleCiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircleCiConfig")
            .field("token", &"[REDACTED]")
            .field("api_base_url", &self.api_base_url)
            .field("legacy_api_base_url", &self.legacy_api_base_url)
            .field("vcs_slug", &self.vcs_slug)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl CircleCiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SchedulerConfig {
    #[serde(default = "default_correlation_max_attempts")]
    pub correlation_max_attempts: u32,
    #[serde(default = "default_correlation_interval_secs")]
    pub correlation_interval_secs: u64,
    #[serde(default = "default_poll_max_retries")]
    pub poll_max_retries: u32,
    /// Length of one backoff unit; the poller's wait time is expressed in these.
    #[serde(default = "default_backoff_unit_ms")]
    pub backoff_unit_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            correlation_max_attempts: default_correlation_max_attempts(),
            correlation_interval_secs: default_correlation_interval_secs(),
            poll_max_retries: default_poll_max_retries(),
            backoff_unit_ms: default_backoff_unit_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReportConfig {
    #[serde(default = "default_max_comment_chars")]
    pub max_comment_chars: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            max_comment_chars: default_max_comment_chars(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_ci_config_path() -> String {
    ".circleci/config.yml".to_string()
}

fn default_circleci_api() -> String {
    "https://circleci.com/api/v2".to_string()
}

fn default_circleci_legacy_api() -> String {
    "https://circleci.com/api/v1.1".to_string()
}

fn default_vcs_slug() -> String {
    "gh".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_correlation_max_attempts() -> u32 {
    10
}

fn default_correlation_interval_secs() -> u64 {
    5
}

fn default_poll_max_retries() -> u32 {
    12
}

fn default_backoff_unit_ms() -> u64 {
    1000
}

fn default_max_comment_chars() -> usize {
    60_000 // GitHub rejects comment bodies over 65536 chars
}

impl AppConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Load from file if specified
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        } else {
            // Try default paths
            builder = builder.add_source(
                config::File::with_name("circleci-feedback")
                    .required(false),
            );
        }

        // Environment variable overrides with CIRCLECI_FEEDBACK_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("CIRCLECI_FEEDBACK")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))
    }

    pub fn webhook_secret(&self) -> &str {
        &self.github.webhook_secret
    }
}
