//! `chat_core` holds the leaf types shared across the chat workspace:
//! the message model and the identifier generator.

pub mod id;
pub mod message;

pub use id::generate_id;
pub use message::{ChatMessage, Sender, now_millis};
