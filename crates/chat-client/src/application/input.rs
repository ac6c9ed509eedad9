//! Interpretation of what the user types.

use std::path::PathBuf;

use chat_core::protocol::command::IMAGE_MARKER;

/// What to do with one line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    /// Send the line as-is: plain chat or a `/private` command.
    Line(String),
    /// Upload the local file at this path.
    Upload(PathBuf),
}

/// Maps a typed line to an [`Outgoing`] action.  Blank lines are ignored.
///
/// `/image <path>` names a *local* file; the client rewrites it into the
/// wire form `/image <file name> <size>` when uploading.
pub fn parse_input(line: &str) -> Option<Outgoing> {
    if line.trim().is_empty() {
        return None;
    }
    if let Some(rest) = line.strip_prefix(IMAGE_MARKER) {
        if let Some(path) = rest.strip_prefix(' ').map(str::trim) {
            if !path.is_empty() {
                return Some(Outgoing::Upload(PathBuf::from(path)));
            }
        }
    }
    Some(Outgoing::Line(line.to_string()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
