//! The conversation message model.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::id::generate_id;

/// Who authored a message.
///
/// Tool senders carry the registered tool name, so a message produced by a
/// tool is attributed to that tool directly in the conversation stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Sender {
    User,
    Assistant,
    System,
    Tool(String),
}

impl Sender {
    pub fn as_str(&self) -> &str {
        match self {
            Sender::User => "user",
            Sender::Assistant => "assistant",
            Sender::System => "System",
            Sender::Tool(name) => name,
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Sender::User)
    }
}

// Persisted as the raw sender string ("user", "assistant", "System", or the
// tool name), matching the stored session record shape.
impl Serialize for Sender {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Sender {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "user" => Sender::User,
            "assistant" => Sender::Assistant,
            "System" => Sender::System,
            _ => Sender::Tool(raw),
        })
    }
}

/// A single immutable conversation message. Edits never mutate a message in
/// place; they mint a new one with a fresh id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    pub sender: Sender,
    /// Unix timestamp in milliseconds.
    pub timestamp: i64,
    /// Attachment URLs or data URIs, in the order the user added them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<String>,
}

impl ChatMessage {
    /// A user-authored message with a fresh id.
    pub fn user(text: impl Into<String>, attachments: Vec<String>) -> Self {
        Self {
            id: generate_id(),
            text: text.into(),
            sender: Sender::User,
            timestamp: now_millis(),
            attachments,
        }
    }

    /// A system notice (error summaries, tool failure reports).
    pub fn system(text: impl Into<String>) -> Self {
        Self::with_id(generate_id(), text, Sender::System)
    }

    /// A message attributed to a named tool.
    pub fn tool(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::with_id(generate_id(), text, Sender::Tool(name.into()))
    }

    /// A message under a caller-chosen id. Streaming responses reuse one
    /// reserved id across partial deliveries so they collapse into a single
    /// logical message.
    pub fn with_id(id: impl Into<String>, text: impl Into<String>, sender: Sender) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            sender,
            timestamp: now_millis(),
            attachments: Vec::new(),
        }
    }
}

/// Current unix time in milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
