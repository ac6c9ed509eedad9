//! Infrastructure layer for chat-server.
//!
//! Everything that touches a socket or the file system lives here.
//!
//! # Responsibilities
//!
//! - Binding the TCP listener and spawning one task per connection
//! - Splitting a client stream into lines and raw upload payloads
//! - Writing lines back to clients with a per-write timeout
//! - Storing uploads and appending history records
//! - Reading the TOML configuration file
//!
//! # What does NOT belong here?
//!
//! - Routing decisions (that is the application layer)
//! - Line formats (that is `chat-core`)

pub mod config_file;
pub mod framing;
pub mod history_file;
pub mod image_store;
pub mod line_sink;
pub mod server;
pub mod session_task;

pub use config_file::load_config;
pub use server::{run_server, ChatServer};
