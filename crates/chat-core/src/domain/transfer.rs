//! The transfer descriptor for the inline file-upload sub-protocol.

/// Describes one pending upload: the file name the client declared and the
/// exact number of raw bytes that follow the `/image` command line.
///
/// A descriptor is only meaningful while those bytes are being read.  The
/// declared length is authoritative: there is no terminator after the
/// payload, so a wrong length mis-frames every following line on the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferDescriptor {
    /// File name exactly as declared by the uploading client.
    ///
    /// Not sanitized.  It may contain path separators or `..` components.
    pub filename: String,
    /// Number of raw payload bytes the client promised to send.
    pub declared_len: u64,
}

impl TransferDescriptor {
    pub fn new(filename: impl Into<String>, declared_len: u64) -> Self {
        Self {
            filename: filename.into(),
            declared_len,
        }
    }

    /// Returns `true` when `received` matches the declared payload length.
    pub fn is_complete(&self, received: u64) -> bool {
        received == self.declared_len
    }
}
