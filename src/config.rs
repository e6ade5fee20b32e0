//! Server configuration
//!
//! Recognized options mirror the runtime surface of the server: bind port and
//! hostname, socket timeouts, an optional connection cap, and an `ssl` block
//! that is recognized but unused (TLS termination is out of scope).
//! Configuration can be built programmatically or loaded from a file with
//! `SERVER_`-prefixed environment overrides.

use crate::error::ServerError;
use serde::Deserialize;
use std::net::{SocketAddr, ToSocketAddrs};

const DEFAULT_PORT: u16 = 3000;

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Port to bind (default 3000)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Hostname to bind; unset means bind-all (0.0.0.0)
    #[serde(default)]
    pub hostname: Option<String>,
    /// Socket idle timeout in milliseconds
    #[serde(default)]
    pub timeout: Option<u64>,
    /// Keep-alive timeout in milliseconds; 0 disables keep-alive
    #[serde(default)]
    pub keep_alive_timeout: Option<u64>,
    /// Maximum concurrent connections; unset means unlimited
    #[serde(default)]
    pub max_connections: Option<u64>,
    /// Log level for the default console logger ("debug" enables debug output)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Recognized but unused: TLS termination is a collaborator concern
    #[serde(default)]
    pub ssl: Option<SslConfig>,
}

/// TLS key/certificate paths (recognized, not consumed by this crate)
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct SslConfig {
    pub key: String,
    pub cert: String,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            hostname: None,
            timeout: None,
            keep_alive_timeout: None,
            max_connections: None,
            log_level: default_log_level(),
            ssl: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from the given file path (extension optional),
    /// overlaid with `SERVER_`-prefixed environment variables.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("SERVER"))
            .set_default("port", i64::from(DEFAULT_PORT))?
            .set_default("log_level", "info")?
            .build()?;

        settings.try_deserialize()
    }

    /// Resolve the configured hostname:port into a bindable socket address
    pub fn socket_addr(&self) -> Result<SocketAddr, ServerError> {
        let host = self.hostname.as_deref().unwrap_or("0.0.0.0");
        let addr = format!("{host}:{}", self.port);
        addr.to_socket_addrs()
            .map_err(|e| ServerError::InvalidAddress {
                addr: addr.clone(),
                reason: e.to_string(),
            })?
            .next()
            .ok_or(ServerError::InvalidAddress {
                addr,
                reason: "no addresses resolved".to_string(),
            })
    }
}
