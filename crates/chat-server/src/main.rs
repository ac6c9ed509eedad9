//! Line-chat server: entry point.
//!
//! Accepts TCP connections from chat clients.  Each client names itself on
//! the first line and then sends plain chat, `/private` messages, and inline
//! `/image` uploads.
//!
//! # Usage
//!
//! ```text
//! chat-server [OPTIONS]
//!
//! Options:
//!   --config        <FILE>  TOML configuration file
//!   --bind          <ADDR>  Listener IP address          [default: 0.0.0.0]
//!   --port          <PORT>  Listener port                [default: 12345]
//!   --image-dir     <DIR>   Upload directory             [default: chat_images]
//!   --history-file  <FILE>  History log                  [default: chat_history.txt]
//!   --idle-timeout  <SECS>  Idle read timeout, 0 = off   [default: 120]
//!   --write-timeout <SECS>  Per-line write timeout       [default: 10]
//!   --log-level     <LEVEL> Level used when RUST_LOG is unset [default: info]
//! ```
//!
//! # Precedence
//!
//! Command-line flag, then environment variable, then the config file, then
//! the built-in default.
//!
//! | Variable             | Flag              |
//! |----------------------|-------------------|
//! | `CHAT_CONFIG`        | `--config`        |
//! | `CHAT_BIND`          | `--bind`          |
//! | `CHAT_PORT`          | `--port`          |
//! | `CHAT_IMAGE_DIR`     | `--image-dir`     |
//! | `CHAT_HISTORY_FILE`  | `--history-file`  |
//! | `CHAT_IDLE_TIMEOUT`  | `--idle-timeout`  |
//! | `CHAT_WRITE_TIMEOUT` | `--write-timeout` |
//! | `CHAT_LOG_LEVEL`     | `--log-level`     |

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chat_server::domain::ServerConfig;
use chat_server::infrastructure::{load_config, run_server};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Line-chat server with inline file transfer.
///
/// Every option is optional; anything left unset falls back to the config
/// file and then to the built-in defaults.
#[derive(Debug, Parser)]
#[command(
    name = "chat-server",
    about = "Line-oriented TCP chat server with inline file transfer",
    version
)]
struct Cli {
    /// TOML configuration file.  When given, it must exist.
    #[arg(long, env = "CHAT_CONFIG")]
    config: Option<PathBuf>,

    /// IP address to bind the listener to.
    #[arg(long, env = "CHAT_BIND")]
    bind: Option<String>,

    /// TCP port for client connections.
    #[arg(long, env = "CHAT_PORT")]
    port: Option<u16>,

    /// Directory where uploads are stored.
    #[arg(long, env = "CHAT_IMAGE_DIR")]
    image_dir: Option<PathBuf>,

    /// Append-only history file.
    #[arg(long, env = "CHAT_HISTORY_FILE")]
    history_file: Option<PathBuf>,

    /// Seconds a client may stay silent before it is disconnected.  0
    /// disables the timeout.
    #[arg(long, env = "CHAT_IDLE_TIMEOUT")]
    idle_timeout: Option<u64>,

    /// Seconds a single line write to a client may take.  0 disables it.
    #[arg(long, env = "CHAT_WRITE_TIMEOUT")]
    write_timeout: Option<u64>,

    /// Log level used when `RUST_LOG` is not set.
    #[arg(long, env = "CHAT_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    /// Loads the config file (if any) and applies the CLI overrides on top.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be loaded or the resulting
    /// bind address is not a valid IP address.
    fn into_server_config(self) -> anyhow::Result<ServerConfig> {
        let mut config = load_config(self.config.as_deref()).with_context(|| match &self.config {
            Some(path) => format!("failed to load config from {}", path.display()),
            None => "failed to build default config".to_string(),
        })?;

        if let Some(bind) = self.bind {
            config.network.bind_address = bind;
        }
        if let Some(port) = self.port {
            config.network.port = port;
        }
        if let Some(dir) = self.image_dir {
            config.storage.image_dir = dir;
        }
        if let Some(file) = self.history_file {
            config.storage.history_file = file;
        }
        if let Some(secs) = self.idle_timeout {
            config.network.idle_timeout_secs = secs;
        }
        if let Some(secs) = self.write_timeout {
            config.network.write_timeout_secs = secs;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }

        config.bind_addr()?;
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_server_config()?;

    // RUST_LOG wins; otherwise the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!(
        "chat server starting: bind={}:{}, images={}, history={}",
        config.network.bind_address,
        config.network.port,
        config.storage.image_dir.display(),
        config.storage.history_file.display()
    );

    // ── Graceful shutdown flag ─────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C; no longer accepting connections");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    run_server(config, running).await?;

    info!("chat server stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_cli_without_arguments_leaves_everything_unset() {
        let cli = Cli::parse_from(["chat-server"]);
        assert!(cli.config.is_none());
        assert!(cli.port.is_none());
        assert!(cli.bind.is_none());
    }

    #[test]
    fn test_into_server_config_defaults() {
        // Arrange: no arguments, no config file
        let cli = Cli::parse_from(["chat-server"]);

        // Act
        let config = cli.into_server_config().unwrap();

        // Assert
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.network.port, 12345);
    }

    #[test]
    fn test_cli_port_override() {
        let cli = Cli::parse_from(["chat-server", "--port", "4000"]);
        let config = cli.into_server_config().unwrap();
        assert_eq!(config.network.port, 4000);
    }

    #[test]
    fn test_cli_bind_override() {
        let cli = Cli::parse_from(["chat-server", "--bind", "127.0.0.1"]);
        let config = cli.into_server_config().unwrap();
        assert_eq!(config.bind_addr().unwrap().to_string(), "127.0.0.1:12345");
    }

    #[test]
    fn test_cli_storage_overrides() {
        let cli = Cli::parse_from([
            "chat-server",
            "--image-dir",
            "/tmp/uploads",
            "--history-file",
            "/tmp/log.txt",
        ]);
        let config = cli.into_server_config().unwrap();
        assert_eq!(config.storage.image_dir, PathBuf::from("/tmp/uploads"));
        assert_eq!(config.storage.history_file, PathBuf::from("/tmp/log.txt"));
    }

    #[test]
    fn test_cli_timeout_overrides() {
        let cli = Cli::parse_from(["chat-server", "--idle-timeout", "0", "--write-timeout", "3"]);
        let config = cli.into_server_config().unwrap();
        assert_eq!(config.idle_timeout(), None);
        assert_eq!(config.write_timeout(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_cli_log_level_override() {
        let cli = Cli::parse_from(["chat-server", "--log-level", "debug"]);
        let config = cli.into_server_config().unwrap();
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_cli_flags_override_config_file() {
        // Arrange: a config file setting port and level
        let path = std::env::temp_dir().join(format!(
            "chat_server_cli_{}.toml",
            uuid::Uuid::new_v4()
        ));
        std::fs::write(&path, "[network]\nport = 7000\n[logging]\nlevel = \"warn\"\n").unwrap();
        let cli = Cli::parse_from([
            "chat-server",
            "--config",
            path.to_str().unwrap(),
            "--port",
            "7001",
        ]);

        // Act
        let config = cli.into_server_config().unwrap();

        // Assert: flag beats file, file beats default
        assert_eq!(config.network.port, 7001);
        assert_eq!(config.logging.level, "warn");

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_config_file_returns_error() {
        let cli = Cli::parse_from(["chat-server", "--config", "/definitely/not/here.toml"]);
        assert!(cli.into_server_config().is_err());
    }

    #[test]
    fn test_invalid_bind_returns_error() {
        // Arrange: a hostname is not accepted as a bind address
        let cli = Cli::parse_from(["chat-server", "--bind", "not.an.ip"]);

        // Act
        let result = cli.into_server_config();

        // Assert: must return an error, not panic
        assert!(result.is_err());
    }
}
