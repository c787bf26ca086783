//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/modex/config.toml` by default:
//!
//! ```toml
//! [server]
//! url = "http://127.0.0.1:8000"
//! timeout_secs = 30
//! # timeout_ms = 500 takes precedence when set
//!
//! [protocol]
//! receive_mode = "json_body"
//!
//! [protocol.endpoints]
//! session_status = "/get_specific_session_status"
//!
//! [retry]
//! max_attempts = 10
//! delay_ms = 500
//! ```
//!
//! `MODEX_SERVER_URL` overrides `server.url` when loading from the default
//! location.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use modex_protocol::EndpointPaths;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::{ClientError, ClientResult};
use crate::poll::RetryPolicy;
use crate::session::{ReceiveMode, SessionClient};
use crate::transport::{DEFAULT_USER_AGENT, ReqwestEngine};

/// Environment variable overriding the server URL.
pub const SERVER_URL_ENV: &str = "MODEX_SERVER_URL";

// ---------------------------------------------------------------------------
// ExchangeConfig (config.toml)
// ---------------------------------------------------------------------------

/// Configuration for the exchange client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    /// Server connection settings.
    pub server: ServerSettings,

    /// Wire protocol settings.
    pub protocol: ProtocolSettings,

    /// Polling helper bounds.
    pub retry: RetrySettings,
}

/// Server connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Base URL of the exchange server.
    pub url: String,

    /// Request timeout in seconds. `0` disables the timeout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Request timeout in milliseconds; wins over `timeout_secs`. `0`
    /// disables the timeout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// User agent sent with every request.
    pub user_agent: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8000".to_string(),
            timeout_secs: Some(30),
            timeout_ms: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Wire protocol settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolSettings {
    /// How `receive_data` addresses the server.
    pub receive_mode: ReceiveMode,

    /// Route overrides.
    pub endpoints: EndpointPaths,
}

/// Polling helper bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            delay_ms: policy.delay.as_millis() as u64,
        }
    }
}

impl ExchangeConfig {
    /// Creates a configuration pointing at `url`, with defaults elsewhere.
    pub fn new(url: impl Into<String>) -> Self {
        Self::default().with_server_url(url)
    }

    /// Loads configuration from the default path, then applies the
    /// environment override.
    pub fn load() -> ClientResult<Self> {
        let path = Self::default_path();
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            debug!(path = %path.display(), "no config file, using defaults");
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates configuration from a specific path.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ClientError::Config(format!("failed to read config: {}", e)))?;
        let config = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), url = %config.server.url, "loaded config");
        Ok(config)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml_str(content: &str) -> ClientResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ClientError::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the configuration as TOML.
    pub fn save_to(&self, path: &Path) -> ClientResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ClientError::Config(format!("failed to create config dir: {}", e)))?;
        }
        std::fs::write(path, content)
            .map_err(|e| ClientError::Config(format!("failed to write config: {}", e)))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("modex")
    }

    /// Applies overrides looked up by variable name.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(SERVER_URL_ENV).filter(|v| !v.trim().is_empty()) {
            debug!(url = %url, "server url overridden from environment");
            self.server.url = url.trim().to_string();
        }
    }

    /// Checks that the server URL is an absolute http(s) URL.
    pub fn validate(&self) -> ClientResult<()> {
        let url = Url::parse(self.server.url.trim()).map_err(|e| {
            ClientError::Config(format!("invalid server url '{}': {}", self.server.url, e))
        })?;
        match url.scheme() {
            "http" | "https" => Ok(()),
            other => Err(ClientError::Config(format!(
                "unsupported url scheme '{}', expected http or https",
                other
            ))),
        }
    }

    /// Builder method to set the server URL.
    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server.url = url.into();
        self
    }

    /// Builder method to set the request timeout. `None` disables it.
    ///
    /// Stored in milliseconds, rounded up so a non-zero timeout never
    /// becomes `0`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        let millis = timeout.map_or(0, |t| {
            let ms = u64::try_from(t.as_millis()).unwrap_or(u64::MAX);
            if t > Duration::from_millis(ms) {
                ms.saturating_add(1)
            } else {
                ms
            }
        });
        self.server.timeout_ms = Some(millis);
        self.server.timeout_secs = None;
        self
    }

    /// Builder method to set the receive mode.
    pub fn with_receive_mode(mut self, mode: ReceiveMode) -> Self {
        self.protocol.receive_mode = mode;
        self
    }

    /// Builder method to set the polling bounds.
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry.max_attempts = policy.max_attempts;
        self.retry.delay_ms = policy.delay.as_millis() as u64;
        self
    }

    /// Effective request timeout.
    pub fn timeout(&self) -> Option<Duration> {
        match (self.server.timeout_ms, self.server.timeout_secs) {
            (Some(ms), _) => (ms > 0).then(|| Duration::from_millis(ms)),
            (None, Some(secs)) => (secs > 0).then(|| Duration::from_secs(secs)),
            (None, None) => None,
        }
    }

    /// Polling bounds as a [`RetryPolicy`].
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.delay_ms),
        )
    }

    /// Builds a session client from this configuration.
    ///
    /// The shared connection pool is used unless a custom user agent is set.
    pub fn to_client(&self) -> ClientResult<SessionClient> {
        self.validate()?;
        let engine = if self.server.user_agent == DEFAULT_USER_AGENT {
            ReqwestEngine::shared()?
        } else {
            ReqwestEngine::new(&self.server.user_agent)?
        };
        Ok(
            SessionClient::with_engine(self.server.url.trim(), Arc::new(engine))
                .with_timeout(self.timeout())
                .with_receive_mode(self.protocol.receive_mode)
                .with_endpoints(self.protocol.endpoints.clone()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults() {
        let config = ExchangeConfig::default();
        assert_eq!(config.server.url, "http://127.0.0.1:8000");
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.protocol.receive_mode, ReceiveMode::Query);
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_all_sections() {
        let config = ExchangeConfig::from_toml_str(
            r#"
[server]
url = "https://exchange.example.org/api"
timeout_secs = 5

[protocol]
receive_mode = "json_body"

[protocol.endpoints]
session_status = "/get_specific_session_status"

[retry]
max_attempts = 10
delay_ms = 250
"#,
        )
        .unwrap();

        assert_eq!(config.server.url, "https://exchange.example.org/api");
        assert_eq!(config.timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.protocol.receive_mode, ReceiveMode::JsonBody);
        assert_eq!(
            config.protocol.endpoints.session_status,
            "/get_specific_session_status"
        );
        assert_eq!(config.protocol.endpoints.send_data, "/send_data");
        assert_eq!(
            config.retry_policy(),
            RetryPolicy::new(10, Duration::from_millis(250))
        );
    }

    #[test]
    fn zero_timeout_disables() {
        let config = ExchangeConfig::from_toml_str("[server]\ntimeout_secs = 0\n").unwrap();
        assert_eq!(config.timeout(), None);

        let config = ExchangeConfig::default().with_timeout(None);
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn sub_second_timeouts_are_kept() {
        for ms in [1, 500, 2500] {
            let timeout = Some(Duration::from_millis(ms));
            let config = ExchangeConfig::default().with_timeout(timeout);
            assert_eq!(config.timeout(), timeout);
            assert_eq!(config.to_client().unwrap().timeout(), timeout);
        }

        let config = ExchangeConfig::default().with_timeout(Some(Duration::from_micros(1)));
        assert_eq!(config.timeout(), Some(Duration::from_millis(1)));

        let both = "[server]\ntimeout_secs = 9\ntimeout_ms = 750\n";
        let config = ExchangeConfig::from_toml_str(both).unwrap();
        assert_eq!(config.timeout(), Some(Duration::from_millis(750)));
    }

    #[test]
    fn millisecond_timeout_survives_save() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let config = ExchangeConfig::default().with_timeout(Some(Duration::from_millis(500)));
        config.save_to(&path).unwrap();

        let loaded = ExchangeConfig::load_from(&path).unwrap();
        assert_eq!(loaded.timeout(), Some(Duration::from_millis(500)));
    }

    #[test]
    fn rejects_invalid_urls() {
        let err = ExchangeConfig::from_toml_str("[server]\nurl = \"not a url\"\n").unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));

        let err = ExchangeConfig::new("ftp://exchange.example.org").validate().unwrap_err();
        assert!(err.to_string().contains("unsupported url scheme"));
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = ExchangeConfig::from_toml_str("[server\nurl=").unwrap_err();
        assert!(err.to_string().contains("failed to parse config"));
    }

    #[test]
    fn load_from_file_and_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = ExchangeConfig::new("http://10.0.0.5:8000")
            .with_receive_mode(ReceiveMode::JsonBody)
            .with_retry(RetryPolicy::new(3, Duration::from_millis(100)));
        config.save_to(&path).unwrap();

        let loaded = ExchangeConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let err = ExchangeConfig::load_from(&dir.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read config"));
    }

    #[test]
    fn environment_override() {
        let mut config = ExchangeConfig::default();
        config.apply_overrides(|key| {
            (key == SERVER_URL_ENV).then(|| " http://override.test:9000 ".to_string())
        });
        assert_eq!(config.server.url, "http://override.test:9000");

        config.apply_overrides(|_| Some(String::new()));
        assert_eq!(config.server.url, "http://override.test:9000");
    }

    #[test]
    fn builds_client() {
        let client = ExchangeConfig::new("http://127.0.0.1:8000")
            .with_timeout(Some(Duration::from_secs(2)))
            .with_receive_mode(ReceiveMode::JsonBody)
            .to_client()
            .unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:8000");
        assert_eq!(client.timeout(), Some(Duration::from_secs(2)));
        assert_eq!(client.receive_mode(), ReceiveMode::JsonBody);
    }
}
