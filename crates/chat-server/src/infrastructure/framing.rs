//! Framing for the mixed text/binary client stream.
//!
//! A client stream is newline-delimited text, except that an `/image` command
//! line is followed by a fixed number of raw bytes.  Both kinds of read must
//! come out of the *same* buffer: a line read may already have pulled some
//! payload bytes into the buffer, and those bytes belong to the upload, not to
//! the next line.
//!
//! [`FrameReader`] owns the only `BufReader` for the stream.  Both
//! [`FrameReader::next_line`] and [`FrameReader::copy_payload`] take
//! `&mut self`, so the line reader and the raw-byte reader can never run at
//! the same time.
//!
//! # Known fragility
//!
//! There is no terminator after a payload.  If a client declares the wrong
//! length, the surplus (or missing) bytes shift every following line.  Nothing
//! here tries to resynchronise; the declared length is authoritative.

use std::future::Future;
use std::io;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// Longest accepted line, counting the `\n` terminator.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// A failure on the client's inbound stream.  Always fatal to the session.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("no data received for {0:?}")]
    IdleTimeout(Duration),
    #[error("connection I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("line exceeds {0} bytes without a terminator")]
    LineTooLong(usize),
}

/// Failure while copying an upload payload.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// Reading from the client failed; the session cannot continue.
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    /// Writing the bytes to their destination failed.
    #[error("failed to write payload: {0}")]
    Sink(#[source] io::Error),
}

/// Line and raw-payload reader over a single buffered stream.
pub struct FrameReader<R> {
    inner: BufReader<R>,
    idle_timeout: Option<Duration>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Wraps `reader`.  Every individual read must complete within
    /// `idle_timeout` (when set) or fails with [`ConnectionError::IdleTimeout`].
    pub fn new(reader: R, idle_timeout: Option<Duration>) -> Self {
        Self {
            inner: BufReader::new(reader),
            idle_timeout,
        }
    }

    /// Reads the next line, without its `\n` or `\r\n` terminator.
    ///
    /// Returns `Ok(None)` at end of stream.  A final line without a
    /// terminator is still returned.  Invalid UTF-8 is replaced with U+FFFD.
    ///
    /// # Errors
    ///
    /// [`ConnectionError::LineTooLong`] once more than [`MAX_LINE_BYTES`]
    /// arrive without a `\n`.
    pub async fn next_line(&mut self) -> Result<Option<String>, ConnectionError> {
        let mut buf = Vec::new();
        let mut bounded = (&mut self.inner).take(MAX_LINE_BYTES as u64 + 1);
        let n = with_idle_timeout(self.idle_timeout, bounded.read_until(b'\n', &mut buf))
            .await??;
        if n == 0 {
            return Ok(None);
        }
        if n > MAX_LINE_BYTES && buf.last() != Some(&b'\n') {
            return Err(ConnectionError::LineTooLong(MAX_LINE_BYTES));
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }

    /// Copies up to `len` raw bytes from the stream into `out`.
    ///
    /// Stops early only at end of stream; the return value is the number of
    /// bytes actually copied, which the caller compares with `len`.  Bytes
    /// past `len` stay buffered for the next [`next_line`](Self::next_line).
    pub async fn copy_payload<W>(&mut self, len: u64, out: &mut W) -> Result<u64, PayloadError>
    where
        W: AsyncWrite + Unpin,
    {
        let mut copied: u64 = 0;
        while copied < len {
            let chunk = with_idle_timeout(self.idle_timeout, self.inner.fill_buf())
                .await?
                .map_err(ConnectionError::from)?;
            if chunk.is_empty() {
                break;
            }
            let remaining = len - copied;
            let take = usize::try_from(remaining).map_or(chunk.len(), |r| r.min(chunk.len()));
            out.write_all(&chunk[..take])
                .await
                .map_err(PayloadError::Sink)?;
            self.inner.consume(take);
            copied += take as u64;
        }
        out.flush().await.map_err(PayloadError::Sink)?;
        Ok(copied)
    }
}

async fn with_idle_timeout<F, T>(limit: Option<Duration>, fut: F) -> Result<T, ConnectionError>
where
    F: Future<Output = T>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| ConnectionError::IdleTimeout(limit)),
        None => Ok(fut.await),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
