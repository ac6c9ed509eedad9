//! chat-client library crate.
//!
//! The protocol half of a chat client, without any GUI:
//!
//! - `application` – turning server lines into terminal text and user input
//!   into outgoing commands.  Pure functions, no I/O.
//! - `infrastructure` – the TCP connection and file uploads.

/// Application layer: rendering and input interpretation.
pub mod application;

/// Infrastructure layer: socket reader/writer and uploads.
pub mod infrastructure;
