use thiserror::Error;

/// Errors that can occur while manipulating a [`crate::ConversationTree`].
///
/// Out-of-bounds indices signal an internal-invariant violation rather than
/// a user error: branch indices are append-only and never invalidated.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ContextError {
    #[error("branch index {index} out of bounds (branch count {len})")]
    BranchOutOfBounds { index: usize, len: usize },

    #[error("message index {index} out of bounds (branch length {len})")]
    MessageOutOfBounds { index: usize, len: usize },
}
