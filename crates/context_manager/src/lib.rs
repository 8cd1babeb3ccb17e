//! `context_manager` is a crate for managing branching, multi-turn
//! conversations: a forest of edit-induced branches sharing common
//! prefixes, with sibling discovery for left/right navigation between
//! alternative histories.

pub mod error;
pub mod tree;

pub use error::ContextError;
pub use tree::{Branch, ConversationTree, EditOutcome, EditingInfo, SiblingInfo};
