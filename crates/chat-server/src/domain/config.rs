//! Server configuration schema.
//!
//! [`ServerConfig`] is the single source of truth for runtime settings.  It is
//! deserialized from an optional TOML file, then overridden by CLI flags in
//! `main.rs`.  Every field has a serde default, so an empty file (or no file
//! at all) yields a working server:
//!
//! ```toml
//! [network]
//! bind_address = "0.0.0.0"
//! port = 12345
//! idle_timeout_secs = 120
//! write_timeout_secs = 10
//!
//! [storage]
//! image_dir = "chat_images"
//! history_file = "chat_history.txt"
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Reading the file from disk lives in `infrastructure::config_file`; this
//! module only knows the schema.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// `bind_address` is not an IP address.
    #[error("invalid bind address: '{0}'")]
    InvalidBindAddress(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Listener and per-connection timing settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// IP address to bind the listener to.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// TCP port for client connections.
    #[serde(default = "default_port")]
    pub port: u16,
    /// A session whose client sends nothing for this long is disconnected.
    /// `0` disables the timeout.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Upper bound on a single line write to one client.  `0` disables it.
    #[serde(default = "default_write_timeout_secs")]
    pub write_timeout_secs: u64,
}

/// Where uploads and history are kept.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    /// Directory receiving uploaded files.  Created at startup if missing.
    #[serde(default = "default_image_dir")]
    pub image_dir: PathBuf,
    /// Append-only log of delivered chat lines.
    #[serde(default = "default_history_file")]
    pub history_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    chat_core::DEFAULT_PORT
}
fn default_idle_timeout_secs() -> u64 {
    120
}
fn default_write_timeout_secs() -> u64 {
    10
}
fn default_image_dir() -> PathBuf {
    PathBuf::from("chat_images")
}
fn default_history_file() -> PathBuf {
    PathBuf::from("chat_history.txt")
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            idle_timeout_secs: default_idle_timeout_secs(),
            write_timeout_secs: default_write_timeout_secs(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            image_dir: default_image_dir(),
            history_file: default_history_file(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ServerConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the TOML is malformed or a field has
    /// the wrong type.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Resolves the listener address from `bind_address` and `port`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBindAddress`] if `bind_address` is not an
    /// IPv4 or IPv6 address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .network
            .bind_address
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddress(self.network.bind_address.clone()))?;
        Ok(SocketAddr::new(ip, self.network.port))
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.network.idle_timeout_secs)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.network.write_timeout_secs)
    }
}

fn non_zero_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
