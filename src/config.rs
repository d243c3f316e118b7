//! Configuration management for Aerin
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::cli::Cli;
use crate::error::{AerinError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable that selects the cloud bucket storage backend
/// when set to "1" (deployment mode).
pub const DEPLOYMENT_ENV: &str = "AERIN_DEPLOYMENT";

/// Environment variable naming the storage bucket in deployment mode.
pub const BUCKET_NAME_ENV: &str = "STORAGE_BUCKET_NAME";

/// Main configuration structure for Aerin
///
/// This structure holds all configuration needed for the service,
/// including server binding, storage backends, provider settings,
/// and chat behavior.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Conversation storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// AI provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Chat endpoint behavior configuration
    #[serde(default)]
    pub chat: ChatConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind the HTTP listener to
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Conversation storage configuration
///
/// The backend is selected once at process start: deployment mode
/// (`AERIN_DEPLOYMENT=1`) selects the cloud bucket backend, anything
/// else selects the local filesystem backend rooted at `base_dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base directory for the filesystem backend
    #[serde(default = "default_base_dir")]
    pub base_dir: String,

    /// Bucket name for the cloud backend
    ///
    /// Falls back to the `STORAGE_BUCKET_NAME` environment variable.
    /// Required in deployment mode; its absence there is a startup-fatal
    /// configuration error.
    #[serde(default)]
    pub bucket_name: Option<String>,

    /// Sidecar endpoint that issues access tokens for the bucket backend
    #[serde(default = "default_sidecar_endpoint")]
    pub sidecar_endpoint: String,
}

fn default_base_dir() -> String {
    ".".to_string()
}

fn default_sidecar_endpoint() -> String {
    "http://127.0.0.1:1106".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            bucket_name: None,
            sidecar_endpoint: default_sidecar_endpoint(),
        }
    }
}

impl StorageConfig {
    /// Whether the process is running in deployment mode
    ///
    /// Deployment mode selects the cloud bucket backend.
    pub fn deployment_mode() -> bool {
        std::env::var(DEPLOYMENT_ENV).map(|v| v == "1").unwrap_or(false)
    }

    /// Resolve the bucket name from config or environment
    pub fn resolved_bucket_name(&self) -> Option<String> {
        self.bucket_name
            .clone()
            .or_else(|| std::env::var(BUCKET_NAME_ENV).ok())
    }
}

/// AI provider configuration (Anthropic Messages API)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL for the Anthropic API (useful for tests and local mocks)
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// API version header value
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Default model when the request does not carry one
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Output token budget per response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Extended thinking budget in tokens
    #[serde(default = "default_thinking_budget")]
    pub thinking_budget_tokens: u32,
}

fn default_api_base() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

fn default_api_version() -> String {
    "2023-06-01".to_string()
}

fn default_model() -> String {
    "claude-sonnet-4-5-20250929".to_string()
}

fn default_max_tokens() -> u32 {
    16_000
}

fn default_thinking_budget() -> u32 {
    4_096
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key_env: default_api_key_env(),
            api_version: default_api_version(),
            default_model: default_model(),
            max_tokens: default_max_tokens(),
            thinking_budget_tokens: default_thinking_budget(),
        }
    }
}

/// Chat endpoint behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Maximum messages accepted per saved conversation
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,

    /// Minimum milliseconds between saves for one user
    #[serde(default = "default_save_rate_limit_ms")]
    pub save_rate_limit_ms: u64,

    /// Maximum end-to-end duration of one chat stream (seconds)
    #[serde(default = "default_stream_timeout")]
    pub stream_timeout_seconds: u64,

    /// Optional path to a system prompt file (embedded default when unset)
    #[serde(default)]
    pub system_prompt_path: Option<String>,

    /// Web fetch tool configuration
    #[serde(default)]
    pub web_fetch: WebFetchConfig,
}

fn default_max_messages() -> usize {
    100
}

fn default_save_rate_limit_ms() -> u64 {
    1_000
}

fn default_stream_timeout() -> u64 {
    300
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_messages: default_max_messages(),
            save_rate_limit_ms: default_save_rate_limit_ms(),
            stream_timeout_seconds: default_stream_timeout(),
            system_prompt_path: None,
            web_fetch: WebFetchConfig::default(),
        }
    }
}

/// Web fetch tool configuration
///
/// When enabled, the chat endpoint attaches the provider-side web fetch
/// tool restricted to the allowed domains, with citations enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebFetchConfig {
    /// Whether the web fetch tool is attached to chat requests
    #[serde(default)]
    pub enabled: bool,

    /// Domains the tool may fetch from
    #[serde(default)]
    pub allowed_domains: Vec<String>,

    /// Maximum fetches per response
    #[serde(default = "default_fetch_max_uses")]
    pub max_uses: u32,
}

fn default_fetch_max_uses() -> u32 {
    10
}

impl Default for WebFetchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            allowed_domains: Vec::new(),
            max_uses: default_fetch_max_uses(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file with CLI overrides applied
    ///
    /// A missing config file is not an error; defaults are used so the
    /// service can run with zero configuration in development.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the YAML configuration file
    /// * `cli` - Parsed CLI arguments whose values override the file
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>, cli: &Cli) -> Result<Self> {
        let path = path.as_ref();

        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path).map_err(AerinError::Io)?;
            serde_yaml::from_str::<Config>(&contents).map_err(AerinError::Yaml)?
        } else {
            tracing::warn!(
                "Config file {} not found, using defaults",
                path.display()
            );
            Config::default()
        };

        config.apply_cli_overrides(cli);
        Ok(config)
    }

    /// Apply CLI overrides onto the loaded configuration
    fn apply_cli_overrides(&mut self, cli: &Cli) {
        if let Some(host) = &cli.host {
            self.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.server.port = port;
        }
        if let Some(dir) = &cli.storage_dir {
            self.storage.base_dir = dir.clone();
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns a `Config` error describing the first invalid field, or the
    /// missing bucket name when running in deployment mode.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(AerinError::Config("server.port must be non-zero".to_string()).into());
        }
        if self.chat.max_messages == 0 {
            return Err(
                AerinError::Config("chat.max_messages must be at least 1".to_string()).into(),
            );
        }
        if self.chat.save_rate_limit_ms == 0 {
            return Err(AerinError::Config(
                "chat.save_rate_limit_ms must be non-zero".to_string(),
            )
            .into());
        }
        if self.provider.thinking_budget_tokens >= self.provider.max_tokens {
            return Err(AerinError::Config(
                "provider.thinking_budget_tokens must be below provider.max_tokens".to_string(),
            )
            .into());
        }
        if self.chat.web_fetch.enabled && self.chat.web_fetch.allowed_domains.is_empty() {
            return Err(AerinError::Config(
                "chat.web_fetch.allowed_domains must not be empty when web fetch is enabled"
                    .to_string(),
            )
            .into());
        }
        if StorageConfig::deployment_mode() && self.storage.resolved_bucket_name().is_none() {
            return Err(AerinError::Config(format!(
                "{} is required in deployment mode; create a bucket and set the variable",
                BUCKET_NAME_ENV
            ))
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn cli_with_no_overrides() -> Cli {
        Cli {
            config: None,
            host: None,
            port: None,
            storage_dir: None,
        }
    }

    #[test]
    #[serial]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_server_binding() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_default_provider_settings() {
        let config = Config::default();
        assert_eq!(config.provider.api_base, "https://api.anthropic.com");
        assert_eq!(config.provider.api_key_env, "ANTHROPIC_API_KEY");
        assert!(config.provider.thinking_budget_tokens < config.provider.max_tokens);
    }

    #[test]
    fn test_default_chat_limits() {
        let config = Config::default();
        assert_eq!(config.chat.max_messages, 100);
        assert_eq!(config.chat.save_rate_limit_ms, 1_000);
        assert_eq!(config.chat.stream_timeout_seconds, 300);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let cli = cli_with_no_overrides();
        let config = Config::load("/nonexistent/aerin.yaml", &cli).expect("load");
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_load_parses_yaml_and_applies_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "server:\n  port: 8080\nchat:\n  max_messages: 50\n",
        )
        .expect("write config");

        let cli = Cli {
            config: None,
            host: Some("127.0.0.1".to_string()),
            port: None,
            storage_dir: Some("/tmp/aerin-data".to_string()),
        };
        let config = Config::load(&path, &cli).expect("load");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.chat.max_messages, 50);
        assert_eq!(config.storage.base_dir, "/tmp/aerin-data");
    }

    #[test]
    fn test_validate_rejects_zero_port() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_max_messages() {
        let mut config = Config::default();
        config.chat.max_messages = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_thinking_budget_above_max_tokens() {
        let mut config = Config::default();
        config.provider.thinking_budget_tokens = config.provider.max_tokens;
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_validate_rejects_fetch_enabled_without_domains() {
        let mut config = Config::default();
        config.chat.web_fetch.enabled = true;
        assert!(config.validate().is_err());

        config.chat.web_fetch.allowed_domains = vec!["example.org".to_string()];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_web_fetch_defaults() {
        let fetch = WebFetchConfig::default();
        assert!(!fetch.enabled);
        assert!(fetch.allowed_domains.is_empty());
        assert_eq!(fetch.max_uses, 10);
    }
}
