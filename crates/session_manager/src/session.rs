//! The persisted form of one conversation.

use chat_core::ChatMessage;
use chrono::{DateTime, Utc};
use context_manager::ConversationTree;
use serde::{Deserialize, Serialize};

/// One stored session: the full branch forest plus list metadata.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSessionRecord {
    pub id: String,
    /// Every branch, each a full message history from the root.
    pub chat_data: Vec<Vec<ChatMessage>>,
    /// Which branch was active when the session was last saved.
    pub last_active_branch_index: usize,
    pub updated_at: DateTime<Utc>,
    pub title: String,
}

impl ChatSessionRecord {
    /// Rebuilds the in-memory tree from this record. An out-of-range saved
    /// branch index falls back to the first branch.
    pub fn into_tree(self) -> ConversationTree {
        ConversationTree::from_parts(self.chat_data, self.last_active_branch_index)
    }
}
