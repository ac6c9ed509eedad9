//! Client side of the inline upload sub-protocol.
//!
//! An upload is the line `/image <file name> <size>` immediately followed by
//! exactly `size` raw bytes on the same stream.  Only the file name (not the
//! local directory) is sent.

use std::path::{Path, PathBuf};

use chat_core::{ClientCommand, TransferDescriptor};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest file the client will offer to upload.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not a regular file", .0.display())]
    NotAFile(PathBuf),

    /// The server splits the command on spaces, so a name containing one
    /// cannot be framed.
    #[error("file name '{0}' cannot be sent (empty, not UTF-8, or contains spaces)")]
    UnsupportedFileName(String),

    #[error("{} is {size} bytes; the limit is {limit} bytes", .path.display())]
    TooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("upload connection error: {0}")]
    Connection(#[source] std::io::Error),

    /// The file shrank after the header announced its size.
    #[error("{} ended after {sent} of {declared} announced bytes", .path.display())]
    Truncated { path: PathBuf, declared: u64, sent: u64 },
}

impl UploadError {
    /// True when the header may already be on the wire without its full
    /// payload, so the server can no longer frame the stream.
    pub fn breaks_framing(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Truncated { .. })
    }
}

/// A local file checked and ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedUpload {
    path: PathBuf,
    descriptor: TransferDescriptor,
}

impl PreparedUpload {
    /// Checks that `path` is a regular file within [`MAX_UPLOAD_BYTES`] whose
    /// name can be put on the wire.
    ///
    /// # Errors
    ///
    /// Returns an [`UploadError`] describing the first check that failed.
    pub async fn prepare(path: impl AsRef<Path>) -> Result<Self, UploadError> {
        let path = path.as_ref();
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|source| UploadError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        if !meta.is_file() {
            return Err(UploadError::NotAFile(path.to_path_buf()));
        }

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty() && !n.contains(char::is_whitespace))
            .ok_or_else(|| {
                UploadError::UnsupportedFileName(path.to_string_lossy().into_owned())
            })?;

        if meta.len() > MAX_UPLOAD_BYTES {
            return Err(UploadError::TooLarge {
                path: path.to_path_buf(),
                size: meta.len(),
                limit: MAX_UPLOAD_BYTES,
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            descriptor: TransferDescriptor::new(file_name, meta.len()),
        })
    }

    pub fn descriptor(&self) -> &TransferDescriptor {
        &self.descriptor
    }

    /// The command line announcing this upload, without its newline.
    pub fn command_line(&self) -> String {
        ClientCommand::Image(self.descriptor.clone()).to_string()
    }

    /// Writes the command line and then the file's bytes to `out`.
    ///
    /// Returns the number of payload bytes written.
    ///
    /// # Errors
    ///
    /// [`UploadError::Io`] if the file can no longer be opened; nothing has
    /// been written then.  [`UploadError::Connection`] if writing to `out`
    /// fails and [`UploadError::Truncated`] if the file yields fewer bytes
    /// than announced; after either the stream is mis-framed and must be
    /// closed.
    pub async fn send<W>(&self, out: &mut W) -> Result<u64, UploadError>
    where
        W: AsyncWrite + Unpin,
    {
        let file = tokio::fs::File::open(&self.path)
            .await
            .map_err(|source| UploadError::Io {
                path: self.path.clone(),
                source,
            })?;

        let mut header = self.command_line();
        header.push('\n');
        out.write_all(header.as_bytes())
            .await
            .map_err(UploadError::Connection)?;

        // Never send more than announced, even if the file grew meanwhile.
        let mut limited = file.take(self.descriptor.declared_len);
        let sent = tokio::io::copy(&mut limited, out)
            .await
            .map_err(UploadError::Connection)?;
        out.flush().await.map_err(UploadError::Connection)?;
        if sent != self.descriptor.declared_len {
            return Err(UploadError::Truncated {
                path: self.path.clone(),
                declared: self.descriptor.declared_len,
                sent,
            });
        }
        Ok(sent)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
