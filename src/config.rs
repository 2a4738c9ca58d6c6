use crate::error::{Result, ToolStreamError};
use crate::limits::ReassemblyLimits;
use serde::Deserialize;
use std::env;
use std::fs;

const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:5002";
const DEFAULT_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub limits: ReassemblyLimits,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    /// Base URL of the plugin daemon
    pub endpoint: String,
    /// Sent as `X-Api-Key`
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl ClientConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let endpoint =
            env::var("PLUGIN_DAEMON_URL").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());

        let api_key = env::var("PLUGIN_DAEMON_KEY")
            .map_err(|_| ToolStreamError::ConfigError("PLUGIN_DAEMON_KEY not set".to_string()))?;

        let timeout_secs = match env::var("PLUGIN_DAEMON_TIMEOUT_SECS") {
            Ok(v) => v.parse::<u64>().map_err(|e| {
                ToolStreamError::ConfigError(format!("Invalid timeout value: {}", e))
            })?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        Ok(ClientConfig {
            daemon: DaemonConfig {
                endpoint,
                api_key,
                timeout_secs,
            },
            limits: ReassemblyLimits::default(),
        })
    }

    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            ToolStreamError::ConfigError(format!("Failed to read config file: {}", e))
        })?;

        let mut config = Self::from_toml(&contents)?;

        // Allow environment variables to override file config
        if let Ok(api_key) = env::var("PLUGIN_DAEMON_KEY") {
            config.daemon.api_key = api_key;
        }

        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| {
            ToolStreamError::ConfigError(format!("Failed to parse config file: {}", e))
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.daemon.endpoint.is_empty() {
            return Err(ToolStreamError::ConfigError("Endpoint is empty".to_string()));
        }

        if !self.daemon.endpoint.starts_with("http://")
            && !self.daemon.endpoint.starts_with("https://")
        {
            return Err(ToolStreamError::ConfigError(format!(
                "Endpoint must be an http(s) URL: {}",
                self.daemon.endpoint
            )));
        }

        if self.daemon.api_key.is_empty() {
            return Err(ToolStreamError::ConfigError("API key is empty".to_string()));
        }

        if self.daemon.timeout_secs == 0 {
            return Err(ToolStreamError::ConfigError(
                "Timeout must be greater than 0".to_string(),
            ));
        }

        self.limits.validate()
    }
}
