//! Client → server command lines.
//!
//! After the identity line, every line a client sends is one of:
//!
//! ```text
//! /private <username> <text>      private message to one identity
//! /image <filename> <byteLength>  upload; exactly byteLength raw bytes follow
//! <anything else>                 plain chat, broadcast to everyone
//! ```
//!
//! Markers are matched as line *prefixes*, so `/privateX a b` is still a
//! private command whose first token happens to be `/privateX`.  Arguments are
//! split on single spaces into at most three parts; the last part keeps any
//! further spaces verbatim.
//!
//! Only the ASCII space separates tokens.  A tab is part of the token it
//! sits in, and two adjacent spaces yield an empty token: `/private  bob hi`
//! addresses the empty name with body `bob hi`.

use std::fmt;

use thiserror::Error;

use crate::domain::TransferDescriptor;

/// Prefix that marks a private message.
pub const PRIVATE_MARKER: &str = "/private";

/// Prefix that marks an inline file upload.
pub const IMAGE_MARKER: &str = "/image";

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    /// Plain text for everyone.
    Chat(String),
    /// Private message to the first session whose identity equals `target`.
    Private { target: String, body: String },
    /// Upload header; the raw payload follows on the same stream.
    Image(TransferDescriptor),
}

/// A command line that started with a known marker but was malformed.
///
/// The `Display` text is the notice sent back to the offending client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Invalid private message format. Use /private <username> <message>")]
    InvalidPrivate,
    #[error("Invalid image message format.")]
    InvalidImage,
}

/// Parses one command line received in the active state.
///
/// # Errors
///
/// Returns [`CommandError::InvalidPrivate`] when a `/private` line has fewer
/// than three parts, and [`CommandError::InvalidImage`] when an `/image` line
/// has fewer than three parts or a length that is not an unsigned integer.
pub fn parse_command(line: &str) -> Result<ClientCommand, CommandError> {
    if line.starts_with(PRIVATE_MARKER) {
        let mut parts = line.splitn(3, ' ');
        let _marker = parts.next();
        return match (parts.next(), parts.next()) {
            (Some(target), Some(body)) => Ok(ClientCommand::Private {
                target: target.to_string(),
                body: body.to_string(),
            }),
            _ => Err(CommandError::InvalidPrivate),
        };
    }

    if line.starts_with(IMAGE_MARKER) {
        let mut parts = line.splitn(3, ' ');
        let _marker = parts.next();
        let (Some(filename), Some(len)) = (parts.next(), parts.next()) else {
            return Err(CommandError::InvalidImage);
        };
        let declared_len = len.parse::<u64>().map_err(|_| CommandError::InvalidImage)?;
        return Ok(ClientCommand::Image(TransferDescriptor::new(
            filename,
            declared_len,
        )));
    }

    Ok(ClientCommand::Chat(line.to_string()))
}

/// Validates the first line of a connection as a display name.
///
/// Returns `None` for a blank line; the connection is then dropped without
/// joining.  Names are otherwise accepted as-is, surrounding whitespace
/// included, and are never checked for uniqueness.
pub fn parse_identity(line: &str) -> Option<&str> {
    if line.trim().is_empty() {
        None
    } else {
        Some(line)
    }
}

impl fmt::Display for ClientCommand {
    /// Renders the command as the line a client puts on the wire (without the
    /// trailing newline).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientCommand::Chat(text) => f.write_str(text),
            ClientCommand::Private { target, body } => {
                write!(f, "{PRIVATE_MARKER} {target} {body}")
            }
            ClientCommand::Image(desc) => {
                write!(f, "{IMAGE_MARKER} {} {}", desc.filename, desc.declared_len)
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
