//! TCP connection to the chat server.
//!
//! Inbound lines are read on a dedicated task and forwarded on an `mpsc`
//! channel as [`ConnectionEvent`]s, so the main loop can wait on the server
//! and on the keyboard at the same time.  Outbound lines go through
//! [`ServerWriter`].

use std::io;

use chat_core::ServerLine;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::upload::{PreparedUpload, UploadError};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to connect to {addr}: {source}")]
    ConnectFailed {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("connection I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Events emitted by the reader task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Line(ServerLine),
    /// The server closed the stream or reading failed.  Always the last event.
    Closed,
}

/// Opens a connection to `host:port` and splits it into halves.
///
/// # Errors
///
/// Returns [`ClientError::ConnectFailed`] if the address cannot be resolved
/// or the connection is refused.
pub async fn connect(host: &str, port: u16) -> Result<(OwnedReadHalf, OwnedWriteHalf), ClientError> {
    let addr = format!("{host}:{port}");
    let stream = TcpStream::connect(&addr)
        .await
        .map_err(|source| ClientError::ConnectFailed { addr, source })?;
    if let Err(e) = stream.set_nodelay(true) {
        debug!("could not set TCP_NODELAY: {e}");
    }
    Ok(stream.into_split())
}

/// Spawns a task that parses every server line from `reader`.
///
/// The channel ends with a single [`ConnectionEvent::Closed`].
pub fn spawn_reader<R>(reader: R) -> mpsc::Receiver<ConnectionEvent>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(128);
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(ConnectionEvent::Line(ServerLine::parse(&line))).await.is_err() {
                        // receiver dropped; nobody is listening any more
                        return;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("read from server failed: {e}");
                    break;
                }
            }
        }
        let _ = tx.send(ConnectionEvent::Closed).await;
    });
    rx
}

/// Write side of the connection.
pub struct ServerWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> ServerWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Sends `line` followed by `\n`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Io`] if the write fails.
    pub async fn send_line(&mut self, line: &str) -> Result<(), ClientError> {
        let mut frame = String::with_capacity(line.len() + 1);
        frame.push_str(line);
        frame.push('\n');
        self.inner.write_all(frame.as_bytes()).await?;
        self.inner.flush().await?;
        Ok(())
    }

    /// Sends an upload's command line and payload.
    ///
    /// # Errors
    ///
    /// See [`PreparedUpload::send`].
    pub async fn send_upload(&mut self, upload: &PreparedUpload) -> Result<u64, UploadError> {
        upload.send(&mut self.inner).await
    }

    /// Closes the write direction; the server sees end of stream.
    pub async fn shutdown(&mut self) -> Result<(), ClientError> {
        self.inner.shutdown().await?;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
