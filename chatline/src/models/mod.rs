//! Data models for chat sessions.

mod message;
mod session;

pub use message::{Message, MessageRole};
pub use session::{Session, PLACEHOLDER_TITLE};
