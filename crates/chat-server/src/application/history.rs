//! The history seam: where delivered lines are recorded.
//!
//! The router appends each delivered broadcast or private line exactly once.
//! A failed append is logged by the caller and never stops delivery.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("I/O error appending to history at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Append-only store of delivered chat lines.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistorySink: Send + Sync {
    /// Appends one record.  Implementations add the trailing newline and must
    /// serialize concurrent appends.
    async fn append(&self, record: &str) -> Result<(), HistoryError>;
}
