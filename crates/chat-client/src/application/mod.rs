//! Application layer for chat-client.

pub mod input;
pub mod render;

pub use input::{parse_input, Outgoing};
pub use render::render_line;
