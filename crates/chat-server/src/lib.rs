//! chat-server library crate.
//!
//! A line-oriented TCP chat server.  Clients name themselves on the first
//! line, then exchange broadcast and private messages and upload files inline
//! on the same stream.
//!
//! # Architecture
//!
//! ```text
//! TCP clients (newline-delimited text + inline raw uploads)
//!         ↕
//! [chat-server]
//!   ├── domain/           ServerConfig schema
//!   ├── application/      Session, SessionRegistry, MessageRouter, HistorySink
//!   └── infrastructure/
//!         ├── server        accept loop, one task per connection
//!         ├── session_task  identity handshake, command loop, departure
//!         ├── framing       line + raw-payload reader over one buffer
//!         ├── line_sink     socket-backed LineSink
//!         ├── image_store   upload storage
//!         └── history_file  append-only history file
//! ```
//!
//! # Layer rules
//!
//! - `domain` does no I/O.
//! - `application` depends on `domain` and `chat-core`, and reaches the
//!   outside world only through the `LineSink` and `HistorySink` traits.
//! - `infrastructure` depends on all other layers plus `tokio`.

/// Domain layer: configuration schema.
pub mod domain;

/// Application layer: registry and routing.
pub mod application;

/// Infrastructure layer: sockets, files, and the session task.
pub mod infrastructure;
