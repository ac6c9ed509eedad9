//! Domain types shared by the server and the client.
//!
//! Nothing in here performs I/O; the types describe *what* travels over the
//! wire, never *how*.

pub mod timestamp;
pub mod transfer;

pub use timestamp::Timestamp;
pub use transfer::TransferDescriptor;
