//! Configuration types and loading
//!
//! Configuration is plain JSON, validated at load time. The crate ships no
//! binary; embedders load a [`Config`] and wire the acceptors themselves.

use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConfigError;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Direct forwarding entries (listen address -> fixed destination)
    #[serde(default)]
    pub forward: Vec<ForwardConfig>,

    /// Transparent-intercept listener, if enabled
    #[serde(default)]
    pub tproxy: Option<TproxyConfig>,
}

impl Config {
    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.forward.is_empty() && self.tproxy.is_none() {
            return Err(ConfigError::ValidationError(
                "At least one forward entry or a tproxy listener must be configured".into(),
            ));
        }
        for entry in &self.forward {
            entry.validate()?;
        }
        if let Some(tproxy) = &self.tproxy {
            tproxy.validate()?;
        }
        Ok(())
    }
}

/// One direct-forward listener: every accepted connection is relayed to the
/// same fixed remote destination
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ForwardConfig {
    /// Local listen address
    pub listen: SocketAddr,

    /// Remote destination as `host:port`
    pub remote: String,
}

impl ForwardConfig {
    /// Validate this entry
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if the remote destination is
    /// not of the form `host:port`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.remote.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => Ok(()),
            _ => Err(ConfigError::ValidationError(format!(
                "Invalid remote destination '{}': expected host:port",
                self.remote
            ))),
        }
    }
}

/// Transparent-intercept (TPROXY) listener configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TproxyConfig {
    /// Listen address for redirected connections
    pub listen: SocketAddr,

    /// TCP accept backlog
    #[serde(default = "default_backlog")]
    pub tcp_backlog: u32,

    /// Whether to set `SO_REUSEPORT`
    #[serde(default = "default_reuse_port")]
    pub reuse_port: bool,
}

impl TproxyConfig {
    /// Create a config with defaults for the given listen address
    #[must_use]
    pub fn new(listen: SocketAddr) -> Self {
        Self {
            listen,
            tcp_backlog: default_backlog(),
            reuse_port: default_reuse_port(),
        }
    }

    /// Validate this entry
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if the backlog is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tcp_backlog == 0 {
            return Err(ConfigError::ValidationError(
                "tcp_backlog must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

const fn default_backlog() -> u32 {
    1024
}

const fn default_reuse_port() -> bool {
    true
}

/// Load configuration from a JSON file
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();

    debug!("Loading configuration from {:?}", path);

    if !path.exists() {
        return Err(ConfigError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let contents = std::fs::read_to_string(path)?;
    let config = load_config_str(&contents)?;

    info!(
        "Configuration loaded: {} forward entries, tproxy={}",
        config.forward.len(),
        config.tproxy.is_some()
    );

    Ok(config)
}

/// Load configuration from a JSON string
///
/// # Errors
///
/// Returns `ConfigError` if parsing or validation fails.
pub fn load_config_str(json: &str) -> Result<Config, ConfigError> {
    let config: Config =
        serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    config.validate()?;
    Ok(config)
}
