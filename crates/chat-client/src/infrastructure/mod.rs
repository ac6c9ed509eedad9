//! Infrastructure layer for chat-client.
//!
//! - `connection` – TCP connect, the inbound reader task, and the writer.
//! - `upload` – local checks and streaming for `/image` uploads.

pub mod connection;
pub mod upload;

pub use connection::{connect, spawn_reader, ClientError, ConnectionEvent, ServerWriter};
pub use upload::{PreparedUpload, UploadError, MAX_UPLOAD_BYTES};
