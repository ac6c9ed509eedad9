//! Domain layer for chat-server.
//!
//! Pure configuration types with no dependencies on sockets, files, or the
//! async runtime.  The wire protocol itself lives in `chat-core`, shared with
//! the client.

pub mod config;

pub use config::{ConfigError, ServerConfig};
