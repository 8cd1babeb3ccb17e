//! Persisted tool-state records: which manifest URLs to reload on startup
//! and the per-tool enablement overrides saved against each of them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;

use crate::error::StateStoreError;

/// Saved enablement for one tool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolState {
    pub enabled: bool,
}

/// One persisted manifest record: the manifest URL plus the enablement
/// overrides saved for tools loaded from it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSourceRecord {
    pub url: String,
    #[serde(default)]
    pub tools: BTreeMap<String, ToolState>,
}

/// Persistence boundary for tool state.
#[async_trait]
pub trait ToolStateStore: Send + Sync {
    /// All saved manifest records.
    async fn load_all(&self) -> Result<Vec<ToolSourceRecord>, StateStoreError>;

    /// Records a manifest URL so it reloads on next startup. Idempotent:
    /// an existing record (and its saved tool states) is left untouched.
    async fn add_url(&self, url: &str) -> Result<(), StateStoreError>;

    /// Saves the enabled flag for one tool under its manifest URL. A no-op
    /// when the URL has no record.
    async fn set_tool_state(
        &self,
        url: &str,
        tool_name: &str,
        enabled: bool,
    ) -> Result<(), StateStoreError>;

    /// Deletes a manifest record and all its saved tool states.
    async fn delete_url(&self, url: &str) -> Result<(), StateStoreError>;
}

/// File-backed tool-state store: one JSON document mapping manifest URLs to
/// their records.
pub struct FileToolStateStore {
    path: PathBuf,
    /// Manifest URL seeded into `load_all` when absent, so a default tool
    /// set is always reloaded on startup.
    default_url: Option<String>,
    // Serializes read-modify-write cycles on the backing file.
    write_guard: Mutex<()>,
}

impl FileToolStateStore {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            path: base_path.as_ref().join("tools.json"),
            default_url: None,
            write_guard: Mutex::new(()),
        }
    }

    pub fn with_default_url<P: AsRef<Path>>(base_path: P, default_url: impl Into<String>) -> Self {
        Self {
            default_url: Some(default_url.into()),
            ..Self::new(base_path)
        }
    }

    async fn read_records(&self) -> Result<BTreeMap<String, ToolSourceRecord>, StateStoreError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&contents)?)
    }

    async fn write_records(
        &self,
        records: &BTreeMap<String, ToolSourceRecord>,
    ) -> Result<(), StateStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let contents = serde_json::to_string_pretty(records)?;
        fs::write(&self.path, contents).await?;
        Ok(())
    }
}

#[async_trait]
impl ToolStateStore for FileToolStateStore {
    async fn load_all(&self) -> Result<Vec<ToolSourceRecord>, StateStoreError> {
        let _guard = self.write_guard.lock().await;
        let mut records = self.read_records().await?;
        if let Some(default_url) = &self.default_url {
            if !records.contains_key(default_url) {
                records.insert(
                    default_url.clone(),
                    ToolSourceRecord {
                        url: default_url.clone(),
                        tools: BTreeMap::new(),
                    },
                );
                self.write_records(&records).await?;
            }
        }
        Ok(records.into_values().collect())
    }

    async fn add_url(&self, url: &str) -> Result<(), StateStoreError> {
        let _guard = self.write_guard.lock().await;
        let mut records = self.read_records().await?;
        if !records.contains_key(url) {
            records.insert(
                url.to_string(),
                ToolSourceRecord {
                    url: url.to_string(),
                    tools: BTreeMap::new(),
                },
            );
            self.write_records(&records).await?;
        }
        Ok(())
    }

    async fn set_tool_state(
        &self,
        url: &str,
        tool_name: &str,
        enabled: bool,
    ) -> Result<(), StateStoreError> {
        let _guard = self.write_guard.lock().await;
        let mut records = self.read_records().await?;
        if let Some(record) = records.get_mut(url) {
            record
                .tools
                .insert(tool_name.to_string(), ToolState { enabled });
            self.write_records(&records).await?;
        }
        Ok(())
    }

    async fn delete_url(&self, url: &str) -> Result<(), StateStoreError> {
        let _guard = self.write_guard.lock().await;
        let mut records = self.read_records().await?;
        if records.remove(url).is_some() {
            self.write_records(&records).await?;
        }
        Ok(())
    }
}
