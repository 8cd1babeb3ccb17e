//! Session persistence behind an async trait, with a file-backed default.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::SessionError;
use crate::session::ChatSessionRecord;

/// Durable storage for session records, keyed by session id.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn save(&self, record: &ChatSessionRecord) -> Result<(), SessionError>;
    async fn load(&self, id: &str) -> Result<ChatSessionRecord, SessionError>;
    async fn list_all(&self) -> Result<Vec<ChatSessionRecord>, SessionError>;
    async fn delete(&self, id: &str) -> Result<(), SessionError>;
}

/// One pretty-printed JSON document per session under a base directory.
pub struct FileSessionStorage {
    base_dir: PathBuf,
}

impl FileSessionStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn session_path(&self, id: &str) -> PathBuf {
        // Session ids are generated alphanumerics; strip anything else so a
        // crafted id cannot escape the base directory.
        let safe: String = id.chars().filter(|c| c.is_alphanumeric()).collect();
        self.base_dir.join(format!("{safe}.json"))
    }

    async fn read_record(path: &Path) -> Result<ChatSessionRecord, SessionError> {
        let bytes = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl SessionStorage for FileSessionStorage {
    async fn save(&self, record: &ChatSessionRecord) -> Result<(), SessionError> {
        tokio::fs::create_dir_all(&self.base_dir).await?;
        let json = serde_json::to_string_pretty(record)?;
        tokio::fs::write(self.session_path(&record.id), json).await?;
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<ChatSessionRecord, SessionError> {
        let path = self.session_path(id);
        if !path.exists() {
            return Err(SessionError::NotFound(id.to_string()));
        }
        Self::read_record(&path).await
    }

    async fn list_all(&self) -> Result<Vec<ChatSessionRecord>, SessionError> {
        if !self.base_dir.exists() {
            return Ok(Vec::new());
        }
        let mut records = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.base_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read_record(&path).await {
                Ok(record) => records.push(record),
                Err(err) => log::warn!("skipping unreadable session file {path:?}: {err}"),
            }
        }
        Ok(records)
    }

    async fn delete(&self, id: &str) -> Result<(), SessionError> {
        let path = self.session_path(id);
        if !path.exists() {
            return Err(SessionError::NotFound(id.to_string()));
        }
        tokio::fs::remove_file(path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_core::ChatMessage;
    use chrono::Utc;
    use tempfile::tempdir;

    fn record(id: &str, title: &str) -> ChatSessionRecord {
        ChatSessionRecord {
            id: id.to_string(),
            chat_data: vec![vec![ChatMessage::user("hello", Vec::new())]],
            last_active_branch_index: 0,
            updated_at: Utc::now(),
            title: title.to_string(),
        }
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let storage = FileSessionStorage::new(dir.path());

        storage.save(&record("abc123", "First chat")).await.unwrap();
        let loaded = storage.load("abc123").await.unwrap();
        assert_eq!(loaded.id, "abc123");
        assert_eq!(loaded.title, "First chat");
        assert_eq!(loaded.chat_data[0][0].text, "hello");
    }

    #[tokio::test]
    async fn load_of_unknown_id_is_not_found() {
        let dir = tempdir().unwrap();
        let storage = FileSessionStorage::new(dir.path());
        assert!(matches!(
            storage.load("nope").await,
            Err(SessionError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn list_all_skips_non_session_files() {
        let dir = tempdir().unwrap();
        let storage = FileSessionStorage::new(dir.path());
        storage.save(&record("one", "One")).await.unwrap();
        storage.save(&record("two", "Two")).await.unwrap();
        tokio::fs::write(dir.path().join("junk.txt"), "not a session")
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("broken.json"), "{")
            .await
            .unwrap();

        let mut ids: Vec<String> = storage
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn delete_removes_the_session() {
        let dir = tempdir().unwrap();
        let storage = FileSessionStorage::new(dir.path());
        storage.save(&record("gone", "Gone")).await.unwrap();
        storage.delete("gone").await.unwrap();
        assert!(matches!(
            storage.load("gone").await,
            Err(SessionError::NotFound(_))
        ));
        assert!(matches!(
            storage.delete("gone").await,
            Err(SessionError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn path_traversal_in_ids_is_neutralized() {
        let dir = tempdir().unwrap();
        let storage = FileSessionStorage::new(dir.path());
        let mut rec = record("abc", "Safe");
        rec.id = "../escape".to_string();
        storage.save(&rec).await.unwrap();
        // The record lands inside the base directory under a sanitized name.
        assert!(dir.path().join("escape.json").exists());
    }
}
