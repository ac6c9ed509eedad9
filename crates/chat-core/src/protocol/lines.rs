//! Server → client lines.
//!
//! Every line the server writes is one [`ServerLine`].  The `Display` impl is
//! the wire contract; the same text is also what the history log records.
//!
//! ```text
//! Enter your username:                              identity prompt
//! [HH:mm:ss] [Global] <user>: <text>                broadcast chat
//! [HH:mm:ss] [Global] <user> has joined the chat!   join notice
//! [HH:mm:ss] [Global] <user> has left the chat.     departure notice
//! [HH:mm:ss] [Private] <from> -> <to>: <text>       private chat
//! /users <id>,<id>,...                              presence snapshot
//! [HH:mm:ss] /image <absolute path>                 image available
//! <free text>                                       notices
//! ```
//!
//! [`ServerLine::parse`] is the client-side inverse.  Display names are not
//! validated by the server, so a name containing `": "` or `" -> "` can make a
//! line ambiguous; parsing is best-effort and falls back to
//! [`ServerLine::Notice`].

use std::fmt;

use crate::domain::Timestamp;

/// Prompt sent once, right after a connection is accepted.
pub const IDENTITY_PROMPT: &str = "Enter your username:";

/// Prefix of a presence snapshot line.
pub const USERS_MARKER: &str = "/users";

const GLOBAL_TAG: &str = "[Global]";
const PRIVATE_TAG: &str = "[Private]";
const JOINED_SUFFIX: &str = " has joined the chat!";
const LEFT_SUFFIX: &str = " has left the chat.";

/// One line sent from the server to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerLine {
    Prompt,
    Chat {
        at: Timestamp,
        from: String,
        text: String,
    },
    Joined {
        at: Timestamp,
        user: String,
    },
    Left {
        at: Timestamp,
        user: String,
    },
    Private {
        at: Timestamp,
        from: String,
        to: String,
        text: String,
    },
    /// Full list of online identities.
    Users(Vec<String>),
    /// An upload finished; `path` is where the server stored it.
    ImageAvailable {
        at: Timestamp,
        path: String,
    },
    /// Free-text notice addressed to a single client.
    Notice(String),
}

impl ServerLine {
    /// Notice for a private message whose target is not online.
    pub fn user_not_found(target: &str) -> Self {
        ServerLine::Notice(format!("User {target} not found."))
    }

    /// Notice for an upload whose byte count did not match its declaration.
    pub fn transfer_mismatch() -> Self {
        ServerLine::Notice("Image transfer failed. File size mismatch.".to_string())
    }

    /// Notice for an upload that could not be stored.
    pub fn transfer_error(reason: impl fmt::Display) -> Self {
        ServerLine::Notice(format!("Error while receiving image: {reason}"))
    }

    /// Parses a line received from the server.  Never fails; anything that
    /// does not match a structured form becomes a [`ServerLine::Notice`].
    pub fn parse(line: &str) -> Self {
        if line == IDENTITY_PROMPT {
            return ServerLine::Prompt;
        }

        if let Some(rest) = line.strip_prefix(USERS_MARKER) {
            if rest.is_empty() || rest.starts_with(' ') {
                let users = rest
                    .trim_start_matches(' ')
                    .split(',')
                    .map(str::trim)
                    .filter(|u| !u.is_empty())
                    .map(str::to_string)
                    .collect();
                return ServerLine::Users(users);
            }
        }

        parse_timestamped(line).unwrap_or_else(|| ServerLine::Notice(line.to_string()))
    }
}

/// `[HH:mm:ss]` is always ten bytes; a structured line continues with a space.
fn parse_timestamped(line: &str) -> Option<ServerLine> {
    let stamp = line.get(..10)?;
    let at = Timestamp::parse_bracketed(stamp)?;
    let rest = line.get(10..)?.strip_prefix(' ')?;

    if let Some(path) = rest.strip_prefix("/image ") {
        return Some(ServerLine::ImageAvailable {
            at,
            path: path.to_string(),
        });
    }

    if let Some(body) = rest.strip_prefix(PRIVATE_TAG).and_then(|r| r.strip_prefix(' ')) {
        let (from, tail) = body.split_once(" -> ")?;
        let (to, text) = tail.split_once(": ")?;
        return Some(ServerLine::Private {
            at,
            from: from.to_string(),
            to: to.to_string(),
            text: text.to_string(),
        });
    }

    let body = rest.strip_prefix(GLOBAL_TAG)?.strip_prefix(' ')?;
    if let Some(user) = body.strip_suffix(JOINED_SUFFIX).filter(|u| !u.contains(": ")) {
        return Some(ServerLine::Joined {
            at,
            user: user.to_string(),
        });
    }
    if let Some(user) = body.strip_suffix(LEFT_SUFFIX).filter(|u| !u.contains(": ")) {
        return Some(ServerLine::Left {
            at,
            user: user.to_string(),
        });
    }
    let (from, text) = body.split_once(": ")?;
    Some(ServerLine::Chat {
        at,
        from: from.to_string(),
        text: text.to_string(),
    })
}

impl fmt::Display for ServerLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerLine::Prompt => f.write_str(IDENTITY_PROMPT),
            ServerLine::Chat { at, from, text } => write!(f, "{at} {GLOBAL_TAG} {from}: {text}"),
            ServerLine::Joined { at, user } => write!(f, "{at} {GLOBAL_TAG} {user}{JOINED_SUFFIX}"),
            ServerLine::Left { at, user } => write!(f, "{at} {GLOBAL_TAG} {user}{LEFT_SUFFIX}"),
            ServerLine::Private { at, from, to, text } => {
                write!(f, "{at} {PRIVATE_TAG} {from} -> {to}: {text}")
            }
            ServerLine::Users(users) => write!(f, "{USERS_MARKER} {}", users.join(",")),
            ServerLine::ImageAvailable { at, path } => write!(f, "{at} /image {path}"),
            ServerLine::Notice(text) => f.write_str(text),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
