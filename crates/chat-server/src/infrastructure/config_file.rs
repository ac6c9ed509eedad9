//! Loads [`ServerConfig`] from disk.

use std::path::Path;

use crate::domain::{ConfigError, ServerConfig};

/// Reads the TOML file at `path`, or returns the defaults when no path is
/// given.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if an explicitly given file cannot be read
/// (including when it does not exist), and [`ConfigError::Parse`] if the TOML
/// is malformed.
pub fn load_config(path: Option<&Path>) -> Result<ServerConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(ServerConfig::default());
    };
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    ServerConfig::from_toml_str(&content)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
