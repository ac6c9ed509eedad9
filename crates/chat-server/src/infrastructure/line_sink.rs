//! Socket-backed [`LineSink`].
//!
//! The router writes to a session from whichever task is delivering, so the
//! write half sits behind an async `Mutex`.  Each line (plus its `\n`) is
//! written with a single `write_all` while the lock is held, which keeps
//! concurrent lines from interleaving.
//!
//! The first failed or timed-out write trips the sink's [`WriteFault`], which
//! the owning session task watches to end the session.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::debug;

use crate::application::{LineSink, WriteFault};

/// Writes newline-terminated lines to any `AsyncWrite`.
///
/// The writer is held in an `Option`: `close` takes it out, so closing happens
/// at most once and later sends fail with `NotConnected`.
pub struct WriterSink<W> {
    writer: Mutex<Option<W>>,
    write_timeout: Option<Duration>,
    fault: WriteFault,
}

impl<W> WriterSink<W> {
    pub fn new(writer: W, write_timeout: Option<Duration>) -> Self {
        Self {
            writer: Mutex::new(Some(writer)),
            write_timeout,
            fault: WriteFault::new(),
        }
    }
}

#[async_trait]
impl<W> LineSink for WriterSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send_line(&self, line: &str) -> io::Result<()> {
        let result = self.write_frame(line).await;
        if result.is_err() {
            self.fault.trip();
        }
        result
    }

    async fn close(&self) {
        let taken = self.writer.lock().await.take();
        if let Some(mut writer) = taken {
            if let Err(e) = writer.shutdown().await {
                debug!("shutdown of client stream failed: {e}");
            }
        }
    }

    async fn failed(&self) {
        self.fault.wait().await;
    }
}

impl<W> WriterSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn write_frame(&self, line: &str) -> io::Result<()> {
        let mut guard = self.writer.lock().await;
        let writer = guard
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "connection closed"))?;

        let mut frame = Vec::with_capacity(line.len() + 1);
        frame.extend_from_slice(line.as_bytes());
        frame.push(b'\n');

        let write = async {
            writer.write_all(&frame).await?;
            writer.flush().await
        };

        let outcome = match self.write_timeout {
            None => Ok(write.await),
            Some(limit) => tokio::time::timeout(limit, write).await.map_err(|_| limit),
        };

        match outcome {
            Ok(result) => result,
            Err(limit) => {
                // A partial line may be on the wire; the stream is unusable.
                guard.take();
                Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("write did not complete within {limit:?}"),
                ))
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
