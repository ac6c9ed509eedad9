//! File-backed [`HistorySink`].
//!
//! The file is opened in append mode for every record and closed again
//! afterwards, so an unwritable history path only costs the affected records;
//! it never prevents the server from starting.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::application::{HistoryError, HistorySink};

pub struct FileHistory {
    path: PathBuf,
    /// Serializes appends so records from concurrent sessions never interleave.
    lock: Mutex<()>,
}

impl FileHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> HistoryError {
        HistoryError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl HistorySink for FileHistory {
    async fn append(&self, record: &str) -> Result<(), HistoryError> {
        let _guard = self.lock.lock().await;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.io_err(e))?;

        let mut entry = String::with_capacity(record.len() + 1);
        entry.push_str(record);
        entry.push('\n');

        file.write_all(entry.as_bytes())
            .await
            .map_err(|e| self.io_err(e))?;
        file.flush().await.map_err(|e| self.io_err(e))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use uuid::Uuid;

    fn temp_file() -> PathBuf {
        std::env::temp_dir().join(format!("chat_history_test_{}.txt", Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_append_creates_file_and_adds_newline() {
        // Arrange
        let path = temp_file();
        let history = FileHistory::new(&path);

        // Act
        history.append("[10:00:00] [Global] alice: hi").await.unwrap();
        history.append("[10:00:01] [Global] bob: hey").await.unwrap();

        // Assert
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "[10:00:00] [Global] alice: hi\n[10:00:01] [Global] bob: hey\n"
        );

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_append_keeps_existing_content() {
        let path = temp_file();
        std::fs::write(&path, "from a previous run\n").unwrap();
        let history = FileHistory::new(&path);

        history.append("new line").await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "from a previous run\nnew line\n");

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_unwritable_path_returns_io_error() {
        let path = std::env::temp_dir()
            .join(format!("missing_dir_{}", Uuid::new_v4()))
            .join("history.txt");
        let history = FileHistory::new(&path);

        let err = history.append("lost").await.unwrap_err();

        let HistoryError::Io { path: reported, .. } = err;
        assert_eq!(reported, path);
    }

    #[tokio::test]
    async fn test_concurrent_appends_produce_whole_records() {
        // Arrange
        let path = temp_file();
        let history = Arc::new(FileHistory::new(&path));

        // Act: 20 tasks append at once
        let mut handles = Vec::new();
        for i in 0..20 {
            let h = Arc::clone(&history);
            handles.push(tokio::spawn(async move {
                h.append(&format!("record-{i:02}-{}", "x".repeat(200)))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // Assert: every line is one complete record
        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 20);
        for line in lines {
            assert!(line.starts_with("record-"));
            assert_eq!(line.len(), "record-00-".len() + 200);
        }

        std::fs::remove_file(&path).ok();
    }
}
