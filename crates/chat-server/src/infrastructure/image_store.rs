//! Upload storage for the inline transfer sub-protocol.
//!
//! After an `/image <filename> <byteLength>` line, the session task hands its
//! [`FrameReader`] to [`ImageStore::receive`], which streams exactly
//! `byteLength` raw bytes into `<image dir>/<filename>` and then gives the
//! reader back for line reading.
//!
//! # File names are used verbatim
//!
//! The declared name is appended to the directory path as-is.  A name such as
//! `../../x` escapes the image directory.  This matches the established
//! protocol behaviour and is deliberately left unsanitized; deployments that
//! accept untrusted clients should run the server with a dedicated, confined
//! working directory.

use std::ffi::OsString;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};

use chat_core::TransferDescriptor;
use thiserror::Error;
use tokio::io::AsyncRead;

use super::framing::{ConnectionError, FrameReader, PayloadError};

#[derive(Debug, Error)]
pub enum TransferError {
    /// The image directory could not be created or resolved at startup.
    #[error("failed to prepare image directory {}: {source}", .path.display())]
    StorageDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The destination file could not be created or written.
    #[error("{source} ({})", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The client stream failed mid-payload.
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

/// Result of a transfer that did not hit an I/O error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Exactly the declared number of bytes was stored at `path`.
    Stored { path: PathBuf, bytes: u64 },
    /// The stream ended before the declared length was reached.  The partial
    /// file is left on disk.
    SizeMismatch { declared: u64, received: u64 },
}

/// Directory where uploads are written.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    /// Creates `dir` if missing and resolves it to an absolute path, so the
    /// paths announced to clients are absolute.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::StorageDir`] if the directory cannot be created
    /// or canonicalized.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, TransferError> {
        let dir = dir.as_ref();
        let storage_dir_err = |source| TransferError::StorageDir {
            path: dir.to_path_buf(),
            source,
        };
        tokio::fs::create_dir_all(dir).await.map_err(storage_dir_err)?;
        let dir = tokio::fs::canonicalize(dir).await.map_err(storage_dir_err)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Destination for a declared file name: the directory path, a
    /// separator, then the name, joined textually.
    pub fn path_for(&self, filename: &str) -> PathBuf {
        let mut joined = OsString::from(self.dir.as_os_str());
        joined.push(MAIN_SEPARATOR.to_string());
        joined.push(filename);
        PathBuf::from(joined)
    }

    /// Streams the payload described by `desc` from `reader` into its file.
    ///
    /// # Errors
    ///
    /// - [`TransferError::Storage`] if the file cannot be created or written.
    ///   Unread payload bytes are then still on the stream.
    /// - [`TransferError::Connection`] if reading from the client fails.
    pub async fn receive<R>(
        &self,
        reader: &mut FrameReader<R>,
        desc: &TransferDescriptor,
    ) -> Result<TransferOutcome, TransferError>
    where
        R: AsyncRead + Unpin,
    {
        let path = self.path_for(&desc.filename);
        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|source| TransferError::Storage {
                path: path.clone(),
                source,
            })?;

        let received = match reader.copy_payload(desc.declared_len, &mut file).await {
            Ok(n) => n,
            Err(PayloadError::Connection(e)) => return Err(e.into()),
            Err(PayloadError::Sink(source)) => return Err(TransferError::Storage { path, source }),
        };

        if desc.is_complete(received) {
            Ok(TransferOutcome::Stored {
                path,
                bytes: received,
            })
        } else {
            Ok(TransferOutcome::SizeMismatch {
                declared: desc.declared_len,
                received,
            })
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
