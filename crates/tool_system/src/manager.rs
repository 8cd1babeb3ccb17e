//! The process-wide tool registry with dynamic manifest loading.
//!
//! Explicitly constructed and passed by reference (no global state), so
//! tests can run independent instances side by side.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::error::ManifestError;
use crate::loader::{ManifestFetcher, ModuleLoader, resolve_module_url};
use crate::state::ToolStateStore;
use crate::types::{Tool, ToolSpec};

/// Snapshot of one registered tool, carried in update notifications.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolSummary {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub source_url: Option<String>,
    pub enabled: bool,
}

/// Broadcast whenever the registry changes. Carries the full new snapshot
/// so subscribers need not re-query the manager.
#[derive(Clone, Debug)]
pub struct ToolsUpdated {
    pub tools: Vec<ToolSummary>,
}

/// Aggregates tools from built-in specs and remote manifests, persists
/// per-tool enablement, and notifies subscribers of registry changes.
pub struct ToolManager {
    tools: RwLock<HashMap<String, Arc<Tool>>>,
    state_store: Arc<dyn ToolStateStore>,
    fetcher: Arc<dyn ManifestFetcher>,
    loader: Arc<dyn ModuleLoader>,
    updates: broadcast::Sender<ToolsUpdated>,
}

impl ToolManager {
    pub fn new(
        state_store: Arc<dyn ToolStateStore>,
        fetcher: Arc<dyn ManifestFetcher>,
        loader: Arc<dyn ModuleLoader>,
    ) -> Self {
        let (updates, _) = broadcast::channel(16);
        Self {
            tools: RwLock::new(HashMap::new()),
            state_store,
            fetcher,
            loader,
            updates,
        }
    }

    /// Subscribes to registry-change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ToolsUpdated> {
        self.updates.subscribe()
    }

    /// Loads every previously-saved manifest URL, applies the saved
    /// per-tool enablement overrides on top of the freshly-loaded defaults,
    /// and emits a single notification for the whole batch. Intended to run
    /// once at startup. Per-URL failures are logged and skipped.
    pub async fn load_from_saved_urls(&self) {
        match self.state_store.load_all().await {
            Err(err) => log::warn!("failed to read saved tool state: {err}"),
            Ok(records) => {
                for record in records {
                    if let Err(err) = self.load_tools(&record.url, false).await {
                        log::error!("failed to load tools from '{}': {err}", record.url);
                        continue;
                    }
                    for (name, state) in &record.tools {
                        if let Some(tool) = self.get(name) {
                            tool.set_enabled(state.enabled);
                        }
                    }
                }
            }
        }
        self.notify();
    }

    /// Fetches a manifest, resolves its tool module, and registers every
    /// spec the module exports, tagged with the manifest URL. One malformed
    /// spec never aborts the rest of the batch. Emits one notification
    /// after the batch; records the URL for reload when `persist` is true.
    pub async fn load_from_url(&self, url: &str, persist: bool) -> Result<(), ManifestError> {
        let result = self.load_tools(url, persist).await;
        if result.is_ok() {
            self.notify();
        }
        result
    }

    async fn load_tools(&self, url: &str, persist: bool) -> Result<(), ManifestError> {
        let manifest: Value = self.fetcher.fetch(url).await?;
        let module_url = resolve_module_url(url, &manifest)?;
        let specs = self.loader.load(&module_url).await?;

        let mut registered = 0usize;
        for spec in specs {
            let name = spec.name.clone();
            match Tool::new(spec, Some(url.to_string()), Some(Arc::clone(&self.state_store))) {
                Ok(tool) => {
                    self.insert(Arc::new(tool));
                    registered += 1;
                }
                Err(err) => {
                    log::error!("failed to construct tool '{name}' from '{url}': {err}");
                }
            }
        }
        log::info!("loaded {registered} tools from '{url}'");

        if persist {
            if let Err(err) = self.state_store.add_url(url).await {
                log::warn!("failed to persist manifest url '{url}': {err}");
            }
        }
        Ok(())
    }

    /// Registers a built-in tool spec (no source URL, enablement is not
    /// persisted).
    pub fn register_builtin(&self, spec: ToolSpec) -> Result<(), crate::error::ToolError> {
        let tool = Tool::new(spec, None, None)?;
        self.register(Arc::new(tool));
        Ok(())
    }

    /// Inserts a tool into the name-keyed registry. A previous entry under
    /// the same name is overwritten (last registration wins). Emits a
    /// notification.
    pub fn register(&self, tool: Arc<Tool>) {
        self.insert(tool);
        self.notify();
    }

    fn insert(&self, tool: Arc<Tool>) {
        let mut tools = self.tools.write().expect("tool registry lock poisoned");
        if tools.contains_key(tool.name()) {
            log::warn!("tool '{}' is already registered; overwriting", tool.name());
        }
        tools.insert(tool.name().to_string(), tool);
    }

    /// Removes every tool loaded from the given manifest URL and deletes
    /// its persisted record. Irreversible without re-loading the manifest.
    pub async fn delete_tools_from_url(&self, url: &str) {
        {
            let mut tools = self.tools.write().expect("tool registry lock poisoned");
            tools.retain(|_, tool| tool.source_url() != Some(url));
        }
        if let Err(err) = self.state_store.delete_url(url).await {
            log::warn!("failed to delete manifest record '{url}': {err}");
        }
        self.notify();
    }

    pub fn get(&self, name: &str) -> Option<Arc<Tool>> {
        self.tools
            .read()
            .expect("tool registry lock poisoned")
            .get(name)
            .cloned()
    }

    pub fn get_all(&self) -> Vec<Arc<Tool>> {
        self.tools
            .read()
            .expect("tool registry lock poisoned")
            .values()
            .cloned()
            .collect()
    }

    pub fn tool_count(&self) -> usize {
        self.tools.read().expect("tool registry lock poisoned").len()
    }

    fn snapshot(&self) -> Vec<ToolSummary> {
        let mut summaries: Vec<ToolSummary> = self
            .get_all()
            .iter()
            .map(|tool| ToolSummary {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                tags: tool.tags().to_vec(),
                source_url: tool.source_url().map(str::to_string),
                enabled: tool.enabled(),
            })
            .collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        summaries
    }

    fn notify(&self) {
        // A send error only means nobody is subscribed right now.
        let _ = self.updates.send(ToolsUpdated {
            tools: self.snapshot(),
        });
    }
}
