//! # chat-core
//!
//! Shared library for line-chat containing the wire protocol, command parser,
//! and line formatting used by both the server and the terminal client.
//!
//! This crate has no dependency on sockets or an async runtime.  Everything
//! here is a pure function of its input, which keeps the protocol rules easy
//! to test in isolation.
//!
//! # Protocol overview
//!
//! One TCP stream per client.  The stream is newline-delimited text, except
//! that an `/image <filename> <byteLength>` command is followed immediately by
//! exactly `byteLength` raw bytes.  After those bytes, line reading resumes.
//!
//! - **`protocol`** – command parsing (client → server) and line formatting
//!   (server → client).
//! - **`domain`** – timestamps and the transfer descriptor.

pub mod domain;
pub mod protocol;

/// TCP port the server listens on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 12345;

pub use domain::{Timestamp, TransferDescriptor};
pub use protocol::command::{parse_command, parse_identity, ClientCommand, CommandError};
pub use protocol::lines::{ServerLine, IDENTITY_PROMPT};
