//! The line protocol spoken between chat clients and the server.
//!
//! - **`command`** – client → server command lines (`/private`, `/image`, chat).
//! - **`lines`** – server → client lines and their exact textual layout.

pub mod command;
pub mod lines;

pub use command::{parse_command, parse_identity, ClientCommand, CommandError};
pub use lines::{ServerLine, IDENTITY_PROMPT};
