//! `session_manager`: durable storage for chat sessions.
//!
//! A session is the serialized branch forest of one conversation plus the
//! metadata the session list renders (title, last-activity time). Sessions
//! are written through an async storage trait with a file-backed default
//! implementation, one JSON document per session id.

pub mod error;
pub mod grouping;
pub mod manager;
pub mod session;
pub mod storage;

pub use error::SessionError;
pub use grouping::{SessionGroup, group_by_day};
pub use manager::SessionManager;
pub use session::ChatSessionRecord;
pub use storage::{FileSessionStorage, SessionStorage};
