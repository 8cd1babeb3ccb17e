//! `chat_orchestrator`: drives one conversation end to end.
//!
//! The [`TurnOrchestrator`] turns a user message into backend wire
//! messages, streams the generated response back under a single reserved
//! id, and executes any tool calls embedded in the final text. The
//! [`ChatService`] glues the orchestrator to the conversation tree and
//! session storage, and the host module handles the embedding-page bridge.

pub mod attachments;
pub mod host;
pub mod service;
pub mod turn;
pub mod wire;

pub use host::{EmbedMessage, PresenceGate};
pub use service::ChatService;
pub use turn::{MessageSink, TurnConfig, TurnOrchestrator};
pub use wire::{ImageUrl, WireContent, WireMessage, WirePart};
