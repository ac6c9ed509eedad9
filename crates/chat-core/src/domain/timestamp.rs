//! Wall-clock timestamps carried on every delivered chat line.
//!
//! The wire format is `[HH:mm:ss]` in the server's local time zone.  Only the
//! time of day is transmitted; clients that need a date must supply their own.

use std::fmt;

use chrono::{Local, NaiveTime, Timelike};

/// Time of day attached to a chat line.
///
/// Rendered with [`fmt::Display`] as `[HH:mm:ss]`, brackets included, which
/// is the exact prefix used by broadcast, private, and image notice lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(NaiveTime);

impl Timestamp {
    /// Captures the current local time of day.
    pub fn now() -> Self {
        Self(Local::now().time())
    }

    /// Builds a timestamp from explicit clock components.
    ///
    /// Returns `None` when any component is out of range (e.g. `hour = 24`).
    pub fn from_hms(hour: u32, minute: u32, second: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, second).map(Self)
    }

    /// Parses the bracketed `[HH:mm:ss]` form produced by [`fmt::Display`].
    pub fn parse_bracketed(s: &str) -> Option<Self> {
        let inner = s.strip_prefix('[')?.strip_suffix(']')?;
        NaiveTime::parse_from_str(inner, "%H:%M:%S").ok().map(Self)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Sub-second precision is intentionally dropped from the wire format.
        write!(
            f,
            "[{:02}:{:02}:{:02}]",
            self.0.hour(),
            self.0.minute(),
            self.0.second()
        )
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
