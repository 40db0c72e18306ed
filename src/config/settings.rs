//! Configuration settings for the RPC server and client.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::RpcError;

/// Main configuration structure.
///
/// Every section is optional in the TOML file; missing sections fall back to
/// their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub protocol: ProtocolConfig,
}

/// Server listen configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind (e.g., "0.0.0.0").
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// TCP port to bind. Zero picks an ephemeral port.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Client connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Server host name or address.
    #[serde(default = "default_client_host")]
    pub host: String,
    /// Server port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Connect timeout in seconds.
    #[serde(default = "default_client_timeout")]
    pub connect_timeout_seconds: u64,
    /// Read/write timeout in seconds.
    #[serde(default = "default_client_timeout")]
    pub io_timeout_seconds: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format ("pretty" or "json").
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Limits configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum connections served concurrently.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_connections: usize,
    /// Server-side socket read/write timeout in seconds.
    #[serde(default = "default_socket_timeout")]
    pub socket_timeout_seconds: u64,
}

/// Protocol behaviour configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProtocolConfig {
    /// Send raw handler failure text to clients instead of a generic message.
    #[serde(default)]
    pub expose_handler_errors: bool,
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_client_host() -> String {
    "127.0.0.1".to_string()
}

fn default_client_timeout() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_max_concurrent() -> usize {
    100
}

fn default_socket_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: default_client_host(),
            port: default_port(),
            connect_timeout_seconds: default_client_timeout(),
            io_timeout_seconds: default_client_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_concurrent_connections: default_max_concurrent(),
            socket_timeout_seconds: default_socket_timeout(),
        }
    }
}

impl ServerConfig {
    /// The `host:port` string to bind.
    pub fn address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

impl ClientConfig {
    /// Client configuration for a given host and port with default timeouts.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// The `host:port` string to connect to.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout_seconds)
    }
}

impl LimitsConfig {
    pub fn socket_timeout(&self) -> Duration {
        Duration::from_secs(self.socket_timeout_seconds)
    }
}

impl Settings {
    /// Load settings from a TOML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RpcError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| RpcError::Config {
            message: format!("Failed to read config file '{}': {}", path.display(), e),
        })?;

        Self::from_toml(&content).map_err(|e| match e {
            RpcError::Config { message } => RpcError::Config {
                message: format!("{} ({})", message, path.display()),
            },
            other => other,
        })
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, RpcError> {
        let settings: Settings = toml::from_str(content).map_err(|e| RpcError::Config {
            message: format!("Failed to parse config: {}", e),
        })?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate the settings.
    fn validate(&self) -> Result<(), RpcError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(RpcError::Config {
                message: format!(
                    "Invalid log level '{}'. Valid levels: {:?}",
                    self.logging.level, valid_levels
                ),
            });
        }

        let valid_formats = ["pretty", "json"];
        if !valid_formats.contains(&self.logging.format.to_lowercase().as_str()) {
            return Err(RpcError::Config {
                message: format!(
                    "Invalid log format '{}'. Valid formats: {:?}",
                    self.logging.format, valid_formats
                ),
            });
        }

        if self.limits.max_concurrent_connections == 0 {
            return Err(RpcError::Config {
                message: "limits.max_concurrent_connections must be at least 1".to_string(),
            });
        }

        if self.limits.socket_timeout_seconds == 0
            || self.client.connect_timeout_seconds == 0
            || self.client.io_timeout_seconds == 0
        {
            return Err(RpcError::Config {
                message: "Timeouts must be at least 1 second".to_string(),
            });
        }

        Ok(())
    }
}
