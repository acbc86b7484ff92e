use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::domain::{EndpointDirectory, DEFAULT_ENDPOINTS};

/// Process-level settings.
pub struct Config {
    pub mode: String, // "stdio" or "server"
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Self {
        let mode = std::env::var("MODE").unwrap_or_else(|_| "stdio".into());
        let port = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(8080);

        Self { mode, port }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("{0}")]
    Invalid(String),
}

/// Outbound HTTP behaviour shared by every capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Sent as `x-test-key` when present.
    pub test_key: Option<String>,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Extra attempts for GET capabilities after a transport failure.
    pub retries: u32,
    pub max_error_body: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            test_key: None,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            retries: 0,
            max_error_body: 4 * 1024,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    transport: TransportSection,
    endpoints: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct TransportSection {
    timeout_ms: Option<u64>,
    connect_timeout_ms: Option<u64>,
    retries: Option<u32>,
    max_error_body_bytes: Option<usize>,
}

/// Gateway configuration: transport settings plus endpoint overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    pub transport: TransportConfig,
    pub endpoints: BTreeMap<String, String>,
}

impl AppConfig {
    /// Optional TOML file named by `PYLON_CONFIG`, then environment overrides.
    pub fn from_env_and_toml() -> Result<Self, ConfigError> {
        let mut cfg = match std::env::var("PYLON_CONFIG") {
            Ok(path) if !path.trim().is_empty() => Self::from_toml_file(PathBuf::from(path))?,
            _ => Self::default(),
        };
        cfg.apply_env(|key| std::env::var(key).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_toml_file(path: PathBuf) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read { path, source })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(raw)?;
        let mut cfg = Self::default();
        let t = file.transport;
        if let Some(ms) = t.timeout_ms {
            cfg.transport.timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = t.connect_timeout_ms {
            cfg.transport.connect_timeout = Duration::from_millis(ms);
        }
        if let Some(n) = t.retries {
            cfg.transport.retries = n;
        }
        if let Some(n) = t.max_error_body_bytes {
            cfg.transport.max_error_body = n;
        }
        cfg.endpoints = file.endpoints;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply `PYLON_*` overrides through `lookup` (normally `std::env::var`).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        self.transport.test_key = lookup("PYLON_TEST_KEY")
            .filter(|k| !k.is_empty())
            .or(self.transport.test_key.take());
        if let Some(raw) = lookup("PYLON_TIMEOUT_MS") {
            let ms = parse_number::<u64>("PYLON_TIMEOUT_MS", &raw)?;
            self.transport.timeout = Duration::from_millis(ms);
        }
        if let Some(raw) = lookup("PYLON_RETRIES") {
            self.transport.retries = parse_number("PYLON_RETRIES", &raw)?;
        }
        for (group, _) in DEFAULT_ENDPOINTS {
            let key = format!("PYLON_ENDPOINT_{}", group.to_ascii_uppercase());
            if let Some(base) = lookup(&key).filter(|b| !b.trim().is_empty()) {
                self.endpoints.insert((*group).to_owned(), base.trim().to_owned());
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.transport.timeout.is_zero() {
            return Err(ConfigError::Invalid("transport timeout must be greater than zero".into()));
        }
        for (group, base) in &self.endpoints {
            if !DEFAULT_ENDPOINTS.iter().any(|(g, _)| *g == group.as_str()) {
                return Err(ConfigError::Invalid(format!("unknown endpoint group: {group}")));
            }
            let url = reqwest::Url::parse(base)
                .map_err(|e| ConfigError::Invalid(format!("endpoint {group}: {e}")))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::Invalid(format!(
                    "endpoint {group}: unsupported scheme {}",
                    url.scheme()
                )));
            }
        }
        Ok(())
    }

    pub fn endpoint_directory(&self) -> Result<EndpointDirectory, ConfigError> {
        EndpointDirectory::with_overrides(&self.endpoints).map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{key} must be a non-negative integer, got {raw:?}")))
}
