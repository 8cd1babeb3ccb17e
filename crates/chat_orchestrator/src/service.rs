//! Ties the conversation tree, session storage, and turn orchestration
//! together behind one handle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chat_core::ChatMessage;
use context_manager::{ContextError, ConversationTree, SiblingInfo};
use session_manager::SessionManager;
use tokio::sync::{RwLock, mpsc};

use crate::host::PresenceGate;
use crate::turn::{MessageSink, TurnOrchestrator};

/// One live conversation. Entry points that reach the backend are gated on
/// host presence; every mutation persists the session afterwards
/// (last-write-wins, failures swallowed by the session manager).
pub struct ChatService {
    session_id: String,
    tree: Arc<RwLock<ConversationTree>>,
    sessions: Arc<SessionManager>,
    orchestrator: Arc<TurnOrchestrator>,
    presence: Arc<PresenceGate>,
    /// Saves are suppressed until the stored session has been restored,
    /// so a half-initialized tree never clobbers a saved one.
    loaded: AtomicBool,
}

impl ChatService {
    pub fn new(
        session_id: impl Into<String>,
        sessions: Arc<SessionManager>,
        orchestrator: Arc<TurnOrchestrator>,
        presence: Arc<PresenceGate>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            tree: Arc::new(RwLock::new(ConversationTree::new())),
            sessions,
            orchestrator,
            presence,
            loaded: AtomicBool::new(false),
        }
    }

    /// Restores the stored session, if any. A missing or unreadable
    /// session starts a fresh conversation. Until this has run, saves are
    /// no-ops.
    pub async fn load(&self) {
        match self.sessions.load(&self.session_id).await {
            Ok(tree) => *self.tree.write().await = tree,
            Err(err) => log::debug!("starting fresh session '{}': {err}", self.session_id),
        }
        self.loaded.store(true, Ordering::SeqCst);
    }

    async fn save(&self) {
        if !self.loaded.load(Ordering::SeqCst) {
            return;
        }
        let tree = self.tree.read().await;
        self.sessions.persist(&self.session_id, &tree).await;
    }

    /// Sends a user message and runs the response turn. No-op when the
    /// host is absent or the message is entirely empty. The user message
    /// is appended before the backend is contacted, so it is visible (and
    /// persisted) even if the turn fails.
    pub async fn send_message(&self, text: &str, attachments: Vec<String>) {
        if !self.presence.is_active() {
            log::debug!("ignoring send: host not present");
            return;
        }
        if text.trim().is_empty() && attachments.is_empty() {
            return;
        }

        let (context, branch_index) = {
            let mut tree = self.tree.write().await;
            let context = tree.active_messages().to_vec();
            let branch_index = tree.active_branch_index();
            let message = ChatMessage::user(text, attachments.clone());
            if let Err(err) = tree.append_to_active(message) {
                log::error!("failed to append user message: {err}");
                return;
            }
            (context, branch_index)
        };
        self.save().await;

        let text_to_send = if attachments.is_empty() {
            text.to_string()
        } else {
            format!("{text} {}", attachments.join(" "))
        };
        self.run_generation(branch_index, &text_to_send, &attachments, &context)
            .await;
    }

    /// Rewrites a message in place, discarding the branch's continuation,
    /// then regenerates against the truncated prefix.
    pub async fn save_edit(
        &self,
        branch_index: usize,
        message_index: usize,
        new_text: &str,
    ) -> Result<(), ContextError> {
        if !self.presence.is_active() {
            return Ok(());
        }
        let outcome = self
            .tree
            .write()
            .await
            .save_edit_in_place(branch_index, message_index, new_text)?;
        self.save().await;
        if let Some(outcome) = outcome {
            self.run_generation(
                outcome.branch_index,
                &outcome.message.text,
                &outcome.message.attachments,
                &outcome.context,
            )
            .await;
        }
        Ok(())
    }

    /// Forks a new branch at the edited message, keeping the original
    /// branch intact, then regenerates on the fork.
    pub async fn fork_edit(
        &self,
        branch_index: usize,
        message_index: usize,
        new_text: &str,
    ) -> Result<(), ContextError> {
        if !self.presence.is_active() {
            return Ok(());
        }
        let outcome = self
            .tree
            .write()
            .await
            .fork_edit(branch_index, message_index, new_text)?;
        self.save().await;
        if let Some(outcome) = outcome {
            self.run_generation(
                outcome.branch_index,
                &outcome.message.text,
                &outcome.message.attachments,
                &outcome.context,
            )
            .await;
        }
        Ok(())
    }

    pub async fn start_edit(&self, branch_index: usize, message_index: usize) {
        let mut tree = self.tree.write().await;
        let Some(text) = tree
            .branch(branch_index)
            .and_then(|branch| branch.get(message_index))
            .map(|message| message.text.clone())
        else {
            return;
        };
        tree.start_edit(branch_index, message_index, &text);
    }

    pub async fn update_edit_draft(&self, new_text: &str) {
        self.tree.write().await.update_edit_draft(new_text);
    }

    pub async fn cancel_edit(&self) {
        self.tree.write().await.cancel_edit();
    }

    pub async fn find_siblings(&self, branch_index: usize, message_index: usize) -> SiblingInfo {
        self.tree.read().await.find_siblings(branch_index, message_index)
    }

    /// Switches to a sibling branch. The active index is persisted state,
    /// so navigation saves the session.
    pub async fn navigate_to_sibling(
        &self,
        target_position: usize,
        sibling_branch_indices: &[usize],
    ) {
        self.tree
            .write()
            .await
            .navigate_to_sibling(target_position, sibling_branch_indices);
        self.save().await;
    }

    pub async fn active_messages(&self) -> Vec<ChatMessage> {
        self.tree.read().await.active_messages().to_vec()
    }

    pub async fn branch_count(&self) -> usize {
        self.tree.read().await.branch_count()
    }

    pub async fn active_branch_index(&self) -> usize {
        self.tree.read().await.active_branch_index()
    }

    /// Runs the turn, merging every produced message into the branch that
    /// was active when the turn started, and saves once at the end.
    async fn run_generation(
        &self,
        branch_index: usize,
        text: &str,
        attachments: &[String],
        context: &[ChatMessage],
    ) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink: MessageSink = Arc::new(move |message| {
            let _ = tx.send(message);
        });

        let tree = Arc::clone(&self.tree);
        let drain = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                tree.write().await.apply_response(branch_index, message);
            }
        });

        self.orchestrator
            .dispatch_turn(text, attachments, context, sink)
            .await;
        // dispatch_turn dropped the last sink clone; the drain task ends
        // once the channel empties.
        if let Err(err) = drain.await {
            log::error!("response merge task failed: {err}");
        }
        self.save().await;
    }
}
