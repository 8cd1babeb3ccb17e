//! Derives session metadata from a conversation tree and drives storage.

use std::sync::Arc;

use chat_core::Sender;
use chrono::{DateTime, TimeZone, Utc};
use context_manager::ConversationTree;

use crate::error::SessionError;
use crate::session::ChatSessionRecord;
use crate::storage::SessionStorage;

pub struct SessionManager {
    storage: Arc<dyn SessionStorage>,
}

impl SessionManager {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self { storage }
    }

    /// Saves the tree under the given session id. Empty trees are not
    /// persisted (a session only exists once it has a message). Storage
    /// failures are logged and swallowed so a disk hiccup never takes down
    /// an in-flight conversation.
    pub async fn persist(&self, id: &str, tree: &ConversationTree) {
        if tree.is_empty() {
            return;
        }

        let record = ChatSessionRecord {
            id: id.to_string(),
            chat_data: tree.branches().to_vec(),
            last_active_branch_index: tree.active_branch_index(),
            updated_at: last_activity(tree.active_messages()),
            title: derive_title(tree),
        };
        if let Err(err) = self.storage.save(&record).await {
            log::error!("failed to persist session '{id}': {err}");
        }
    }

    /// Loads a session back into a tree. The saved branch index is clamped
    /// by the tree constructor if the stored value is out of range.
    pub async fn load(&self, id: &str) -> Result<ConversationTree, SessionError> {
        Ok(self.storage.load(id).await?.into_tree())
    }

    /// All stored sessions, most recently updated first.
    pub async fn list_recent(&self) -> Result<Vec<ChatSessionRecord>, SessionError> {
        let mut records = self.storage.list_all().await?;
        records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(records)
    }

    pub async fn delete(&self, id: &str) -> Result<(), SessionError> {
        self.storage.delete(id).await
    }
}

/// The list title: the text of the most recent user message on the active
/// branch, or a placeholder for conversations without one.
fn derive_title(tree: &ConversationTree) -> String {
    tree.active_messages()
        .iter()
        .rev()
        .find(|message| message.sender == Sender::User)
        .map(|message| truncate_title(&message.text))
        .unwrap_or_else(|| "New Chat".to_string())
}

const TITLE_MAX_CHARS: usize = 80;

fn truncate_title(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= TITLE_MAX_CHARS {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(TITLE_MAX_CHARS).collect();
    format!("{cut}…")
}

/// Last-activity time from the final message on the active branch,
/// falling back to now when the branch is empty or the timestamp does not
/// parse.
fn last_activity(messages: &[chat_core::ChatMessage]) -> DateTime<Utc> {
    messages
        .last()
        .and_then(|message| Utc.timestamp_millis_opt(message.timestamp).single())
        .unwrap_or_else(Utc::now)
}
