//! Application layer for chat-server.
//!
//! The application layer decides *who* gets *which* line.  It knows nothing
//! about sockets or files: output goes through the [`LineSink`] trait and
//! history through the [`HistorySink`] trait, both implemented in the
//! infrastructure layer.
//!
//! # Responsibilities
//!
//! - Tracking online sessions ([`SessionRegistry`])
//! - Broadcast, private, and presence delivery ([`MessageRouter`])
//! - Defining the output and history seams

pub mod history;
pub mod registry;
pub mod router;
pub mod session;

pub use history::{HistoryError, HistorySink};
pub use registry::SessionRegistry;
pub use router::{MessageRouter, PrivateDelivery};
pub use session::{LineSink, Session, SessionId, WriteFault};
