//! The branch forest: parallel message sequences sharing common prefixes.

use std::collections::HashSet;

use chat_core::{ChatMessage, generate_id, now_millis};

use crate::error::ContextError;

/// One linear conversation path, ordered by causal append order.
pub type Branch = Vec<ChatMessage>;

/// Transient per-instance editing state. Never persisted; at most one edit
/// session exists at a time and a later `start_edit` overwrites it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditingInfo {
    pub branch_index: usize,
    pub message_index: usize,
    pub draft_text: String,
}

/// Sibling branches discovered at a divergence point, ordered by the
/// timestamp of the diverging message.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct SiblingInfo {
    pub sibling_branch_indices: Vec<usize>,
    /// Position of the queried branch within the sibling list, -1 if absent.
    pub position_of_current: isize,
    pub total: usize,
}

impl SiblingInfo {
    fn empty() -> Self {
        Self {
            sibling_branch_indices: Vec::new(),
            position_of_current: -1,
            total: 0,
        }
    }
}

/// What an edit or fork hands back to the caller: the branch the edited
/// message landed on, the truncated prefix to use as regeneration context,
/// and the freshly minted message itself.
#[derive(Clone, Debug)]
pub struct EditOutcome {
    pub branch_index: usize,
    pub context: Vec<ChatMessage>,
    pub message: ChatMessage,
}

/// A conversation as an ordered forest of branches.
///
/// Invariants: branches are never removed or reordered, so branch indices
/// stay valid for the lifetime of the conversation; forking only appends.
#[derive(Clone, Debug)]
pub struct ConversationTree {
    branches: Vec<Branch>,
    active_branch: usize,
    editing: Option<EditingInfo>,
}

impl Default for ConversationTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationTree {
    /// A fresh conversation: one empty branch, active.
    pub fn new() -> Self {
        Self {
            branches: vec![Vec::new()],
            active_branch: 0,
            editing: None,
        }
    }

    /// Rebuilds a tree from a persisted session record. An out-of-range
    /// saved index is clamped into bounds rather than rejected.
    pub fn from_parts(branches: Vec<Branch>, last_active_index: usize) -> Self {
        let branches = if branches.is_empty() {
            vec![Vec::new()]
        } else {
            branches
        };
        let active_branch = last_active_index.min(branches.len() - 1);
        Self {
            branches,
            active_branch,
            editing: None,
        }
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn branch(&self, index: usize) -> Option<&Branch> {
        self.branches.get(index)
    }

    pub fn branch_count(&self) -> usize {
        self.branches.len()
    }

    pub fn active_branch_index(&self) -> usize {
        self.active_branch
    }

    pub fn active_messages(&self) -> &[ChatMessage] {
        &self.branches[self.active_branch]
    }

    pub fn editing(&self) -> Option<&EditingInfo> {
        self.editing.as_ref()
    }

    /// True when every branch is empty (nothing worth persisting yet).
    pub fn is_empty(&self) -> bool {
        self.branches.iter().all(|b| b.is_empty())
    }

    /// Pushes a message onto the active branch.
    pub fn append_to_active(&mut self, message: ChatMessage) -> Result<(), ContextError> {
        let len = self.branches.len();
        let branch = self
            .branches
            .get_mut(self.active_branch)
            .ok_or(ContextError::BranchOutOfBounds {
                index: self.active_branch,
                len,
            })?;
        tracing::debug!(
            branch = self.active_branch,
            message_id = %message.id,
            sender = message.sender.as_str(),
            "appending message to active branch"
        );
        branch.push(message);
        Ok(())
    }

    /// Merges a (possibly partial) response into the given branch: when the
    /// branch's last message carries the same id the message is replaced,
    /// otherwise it is appended. Repeated partial deliveries under one
    /// reserved id therefore collapse into a single growing message.
    pub fn apply_response(&mut self, branch_index: usize, message: ChatMessage) {
        let Some(branch) = self.branches.get_mut(branch_index) else {
            tracing::warn!(branch = branch_index, "dropping response for unknown branch");
            return;
        };
        match branch.last_mut() {
            Some(last) if last.id == message.id => *last = message,
            _ => branch.push(message),
        }
    }

    /// Begins editing a message. When the target branch is not the active
    /// one, the active branch switches to it (a viewing-context change, not
    /// a fork). A later `start_edit` silently replaces any pending edit.
    pub fn start_edit(&mut self, branch_index: usize, message_index: usize, original_text: &str) {
        if branch_index >= self.branches.len() {
            return;
        }
        if branch_index != self.active_branch {
            self.active_branch = branch_index;
        }
        self.editing = Some(EditingInfo {
            branch_index,
            message_index,
            draft_text: original_text.to_string(),
        });
    }

    pub fn update_edit_draft(&mut self, new_text: &str) {
        if let Some(editing) = self.editing.as_mut() {
            editing.draft_text = new_text.to_string();
        }
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Replaces the message at `message_index` in place: the branch is
    /// truncated to that index, discarding the edited message and everything
    /// after it, and a fresh-id message with `new_text` is appended. The
    /// previous continuation of the branch is destroyed.
    ///
    /// Returns `Ok(None)` without touching anything when `new_text` trims
    /// empty.
    pub fn save_edit_in_place(
        &mut self,
        branch_index: usize,
        message_index: usize,
        new_text: &str,
    ) -> Result<Option<EditOutcome>, ContextError> {
        if new_text.trim().is_empty() {
            return Ok(None);
        }
        let len = self.branches.len();
        let branch = self
            .branches
            .get_mut(branch_index)
            .ok_or(ContextError::BranchOutOfBounds { index: branch_index, len })?;
        let branch_len = branch.len();
        let original = branch
            .get(message_index)
            .ok_or(ContextError::MessageOutOfBounds {
                index: message_index,
                len: branch_len,
            })?
            .clone();

        branch.truncate(message_index);
        let context = branch.clone();
        let edited = ChatMessage {
            id: generate_id(),
            text: new_text.to_string(),
            sender: original.sender.clone(),
            timestamp: now_millis(),
            attachments: original.attachments.clone(),
        };
        branch.push(edited.clone());
        self.editing = None;

        tracing::info!(
            branch = branch_index,
            message_index,
            "edited message in place, discarded prior continuation"
        );
        Ok(Some(EditOutcome {
            branch_index,
            context,
            message: edited,
        }))
    }

    /// Forks at `message_index`: clones the prefix of the source branch up
    /// to (exclusive of) the edited message, appends a fresh-id message with
    /// `new_text`, and pushes the result as a new branch at the end of the
    /// forest. The active branch switches to the fork; the source branch is
    /// untouched.
    pub fn fork_edit(
        &mut self,
        branch_index: usize,
        message_index: usize,
        new_text: &str,
    ) -> Result<Option<EditOutcome>, ContextError> {
        if new_text.trim().is_empty() {
            return Ok(None);
        }
        let source = self
            .branches
            .get(branch_index)
            .ok_or(ContextError::BranchOutOfBounds {
                index: branch_index,
                len: self.branches.len(),
            })?;
        let original = source
            .get(message_index)
            .ok_or(ContextError::MessageOutOfBounds {
                index: message_index,
                len: source.len(),
            })?;

        let context: Vec<ChatMessage> = source[..message_index].to_vec();
        let edited = ChatMessage {
            id: generate_id(),
            text: new_text.to_string(),
            sender: original.sender.clone(),
            timestamp: now_millis(),
            attachments: original.attachments.clone(),
        };
        let mut forked = context.clone();
        forked.push(edited.clone());

        self.branches.push(forked);
        let new_index = self.branches.len() - 1;
        self.active_branch = new_index;
        self.editing = None;

        tracing::info!(
            source_branch = branch_index,
            new_branch = new_index,
            message_index,
            "forked conversation branch"
        );
        Ok(Some(EditOutcome {
            branch_index: new_index,
            context,
            message: edited,
        }))
    }

    /// Finds all branches that diverge from the given branch exactly at
    /// `message_index`: their message-id prefix up to the index matches and
    /// they carry a user-authored message at it. Branches sharing the same
    /// diverging message id are counted once, with the queried branch
    /// preferred as the representative. The result is ordered by the
    /// timestamp of the diverging message.
    ///
    /// Only user messages participate: querying an assistant or tool
    /// message yields an empty result.
    pub fn find_siblings(&self, branch_index: usize, message_index: usize) -> SiblingInfo {
        let Some(current) = self.branches.get(branch_index) else {
            return SiblingInfo::empty();
        };
        let Some(at) = current.get(message_index) else {
            return SiblingInfo::empty();
        };
        if !at.sender.is_user() {
            return SiblingInfo::empty();
        }

        let stem: Vec<&str> = current[..message_index].iter().map(|m| m.id.as_str()).collect();

        // (branch index, id of the message at the divergence point)
        let mut candidates: Vec<(usize, &str)> = Vec::new();
        for (index, candidate) in self.branches.iter().enumerate() {
            let Some(fork_message) = candidate.get(message_index) else {
                continue;
            };
            if !fork_message.sender.is_user() {
                continue;
            }
            let prefix_matches = candidate[..message_index]
                .iter()
                .map(|m| m.id.as_str())
                .eq(stem.iter().copied());
            if prefix_matches {
                candidates.push((index, fork_message.id.as_str()));
            }
        }

        let mut unique: Vec<usize> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        if let Some(&(index, id)) = candidates.iter().find(|(i, _)| *i == branch_index) {
            unique.push(index);
            seen.insert(id);
        }
        for &(index, id) in &candidates {
            if seen.insert(id) {
                unique.push(index);
            }
        }

        unique.sort_by_key(|&i| self.branches[i][message_index].timestamp);

        let position_of_current = unique
            .iter()
            .position(|&i| i == branch_index)
            .map(|p| p as isize)
            .unwrap_or(-1);

        SiblingInfo {
            total: unique.len(),
            sibling_branch_indices: unique,
            position_of_current,
        }
    }

    /// Switches the active branch to the sibling at `target_position` in a
    /// previously computed sibling list and clears any pending edit.
    /// Out-of-range positions are ignored.
    pub fn navigate_to_sibling(&mut self, target_position: usize, sibling_branch_indices: &[usize]) {
        let Some(&target_branch) = sibling_branch_indices.get(target_position) else {
            return;
        };
        if target_branch >= self.branches.len() {
            tracing::warn!(branch = target_branch, "sibling list references unknown branch");
            return;
        }
        self.active_branch = target_branch;
        self.editing = None;
    }
}
