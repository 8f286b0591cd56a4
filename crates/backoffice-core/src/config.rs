//! Application configuration management.
//!
//! Two kinds of configuration live here:
//! - `EndpointInputs` / `Endpoint`: which backend to talk to, decided once at
//!   startup from the build profile and environment variables
//! - `Config`: user settings (last username, data directory, retry policy),
//!   stored at `~/.config/backoffice/config.json`

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::auth::{Backoff, RetryPolicy};

/// Application name used for config/data directory paths
const APP_NAME: &str = "backoffice";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const PRODUCTION_ENDPOINT: &str = "https://hodong-erp.com/backoffice";
pub const TEST_ENDPOINT: &str = "https://test.hodong-erp.com/backoffice";
pub const MOCK_PATH: &str = "/api/backoffice";

pub const ENV_PROFILE: &str = "BACKOFFICE_PROFILE";
pub const ENV_ENABLE_MOCK: &str = "BACKOFFICE_ENABLE_MOCK";
pub const ENV_API_BASE_URL: &str = "BACKOFFICE_API_BASE_URL";
pub const ENV_DATA_DIR: &str = "BACKOFFICE_DATA_DIR";

// ============================================================================
// Endpoint Resolution
// ============================================================================

/// Everything endpoint selection depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointInputs {
    pub production: bool,
    /// Raw value of `BACKOFFICE_ENABLE_MOCK`; only the exact string "false"
    /// disables the mock.
    pub enable_mock: Option<String>,
    pub api_base_url: Option<String>,
}

/// Where backoffice requests go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// A real server, by absolute base URL
    Remote(String),
    /// The in-process scenario backend, mounted at this path
    LocalMock(&'static str),
}

impl EndpointInputs {
    /// Read inputs from the process environment.
    ///
    /// A release build counts as production unless `BACKOFFICE_PROFILE`
    /// says otherwise.
    pub fn from_env() -> Self {
        let production = match std::env::var(ENV_PROFILE).ok().as_deref() {
            Some("production") => true,
            Some("development") => false,
            _ => !cfg!(debug_assertions),
        };
        Self {
            production,
            enable_mock: std::env::var(ENV_ENABLE_MOCK).ok(),
            api_base_url: std::env::var(ENV_API_BASE_URL).ok(),
        }
    }

    pub fn mock_disabled(&self) -> bool {
        self.enable_mock.as_deref() == Some("false")
    }

    pub fn resolve(&self) -> Endpoint {
        if self.production {
            return Endpoint::Remote(PRODUCTION_ENDPOINT.to_string());
        }

        if self.mock_disabled() {
            return match self.api_base_url.as_deref().map(str::trim) {
                Some(base) if !base.is_empty() => {
                    Endpoint::Remote(format!("{}/backoffice", base.trim_end_matches('/')))
                }
                _ => Endpoint::Remote(TEST_ENDPOINT.to_string()),
            };
        }

        Endpoint::LocalMock(MOCK_PATH)
    }
}

impl Endpoint {
    /// Absolute base URL, given the origin the mock is served from.
    pub fn base_url(&self, mock_origin: &str) -> String {
        match self {
            Endpoint::Remote(url) => url.clone(),
            Endpoint::LocalMock(path) => format!("{}{}", mock_origin.trim_end_matches('/'), path),
        }
    }

    pub fn is_mock(&self) -> bool {
        matches!(self, Endpoint::LocalMock(_))
    }
}

// ============================================================================
// User Config File
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    #[default]
    Fixed,
    Exponential,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub delay_ms: u64,
    pub backoff: BackoffKind,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_retries: policy.max_retries,
            delay_ms: policy.base_delay().as_millis() as u64,
            backoff: BackoffKind::Fixed,
        }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        let delay = Duration::from_millis(self.delay_ms);
        let backoff = match self.backoff {
            BackoffKind::Fixed => Backoff::Fixed(delay),
            BackoffKind::Exponential => Backoff::Exponential { initial: delay },
        };
        RetryPolicy::new(self.max_retries, backoff)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub last_username: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub retry: RetryConfig,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory for durable storage: `BACKOFFICE_DATA_DIR`, then the
    /// config override, then the platform data directory.
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
            if !dir.is_empty() {
                return Ok(PathBuf::from(dir));
            }
        }
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(production: bool, enable_mock: Option<&str>, base: Option<&str>) -> EndpointInputs {
        EndpointInputs {
            production,
            enable_mock: enable_mock.map(str::to_string),
            api_base_url: base.map(str::to_string),
        }
    }

    #[test]
    fn test_production_wins() {
        assert_eq!(
            inputs(true, Some("false"), Some("https://api.example.com")).resolve(),
            Endpoint::Remote(PRODUCTION_ENDPOINT.to_string())
        );
        assert_eq!(
            inputs(true, None, None).resolve(),
            Endpoint::Remote(PRODUCTION_ENDPOINT.to_string())
        );
    }

    #[test]
    fn test_mock_disabled_uses_base_url() {
        assert_eq!(
            inputs(false, Some("false"), Some("https://api.example.com/")).resolve(),
            Endpoint::Remote("https://api.example.com/backoffice".to_string())
        );
    }

    #[test]
    fn test_mock_disabled_without_base_url_falls_back() {
        let expected = Endpoint::Remote(TEST_ENDPOINT.to_string());
        assert_eq!(inputs(false, Some("false"), None).resolve(), expected);
        assert_eq!(inputs(false, Some("false"), Some("  ")).resolve(), expected);
    }

    #[test]
    fn test_mock_is_default() {
        assert_eq!(inputs(false, None, None).resolve(), Endpoint::LocalMock(MOCK_PATH));
        // anything other than the exact string "false" keeps the mock
        assert_eq!(
            inputs(false, Some("FALSE"), Some("https://api.example.com")).resolve(),
            Endpoint::LocalMock(MOCK_PATH)
        );
        assert_eq!(inputs(false, Some("true"), None).resolve(), Endpoint::LocalMock(MOCK_PATH));
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let i = inputs(false, Some("false"), Some("https://a.example"));
        assert_eq!(i.resolve(), i.resolve());
    }

    #[test]
    fn test_endpoint_base_url() {
        assert_eq!(
            Endpoint::LocalMock(MOCK_PATH).base_url("http://127.0.0.1:4000/"),
            "http://127.0.0.1:4000/api/backoffice"
        );
        assert_eq!(
            Endpoint::Remote("https://x/backoffice".into()).base_url("ignored"),
            "https://x/backoffice"
        );
    }

    #[test]
    fn test_config_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert!(config.last_username.is_none());
        assert_eq!(config.retry, RetryConfig::default());
        assert_eq!(config.retry.max_retries, 1);
        assert_eq!(config.retry.delay_ms, 1000);
    }

    #[test]
    fn test_config_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            last_username: Some("admin@test.com".into()),
            data_dir: None,
            retry: RetryConfig {
                max_retries: 3,
                delay_ms: 250,
                backoff: BackoffKind::Exponential,
            },
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.last_username.as_deref(), Some("admin@test.com"));
        assert_eq!(loaded.retry, config.retry);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"retry": {"max_retries": 2}}"#).unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.retry.delay_ms, 1000);
        assert_eq!(config.retry.backoff, BackoffKind::Fixed);
    }

    #[test]
    fn test_retry_config_to_policy() {
        let policy = RetryConfig {
            max_retries: 2,
            delay_ms: 100,
            backoff: BackoffKind::Exponential,
        }
        .to_policy();
        assert_eq!(policy.max_retries, 2);
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
    }
}
