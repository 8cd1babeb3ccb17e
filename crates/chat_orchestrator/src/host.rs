//! Bridge to the embedding host page.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::Deserialize;

/// A message received over the host's cross-context channel. Unknown or
/// malformed payloads parse to `None` and are ignored.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EmbedMessage {
    /// The host pushes CSS the embedded chat should adopt.
    ApplyStyle { payload: String },
}

impl EmbedMessage {
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}

/// Whether the embedding host has announced itself. Conversation entry
/// points refuse to run until the presence marker has been seen.
#[derive(Debug, Default)]
pub struct PresenceGate {
    active: AtomicBool,
}

impl PresenceGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }
}
