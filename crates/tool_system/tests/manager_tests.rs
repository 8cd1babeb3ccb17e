//! Integration tests for the tool manager: manifest loading, persisted
//! enablement, registration semantics, and change notifications.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tool_system::state::{ToolSourceRecord, ToolState};
use tool_system::{
    HttpManifestFetcher, InvocationContext, ManifestError, StaticModuleLoader, ToolCallback,
    ToolError, ToolManager, ToolOutput, ToolSpec, ToolStateStore, StateStoreError,
};

struct Echo;

#[async_trait]
impl ToolCallback for Echo {
    async fn invoke(&self, args: Value, _cx: &InvocationContext) -> Result<ToolOutput, ToolError> {
        let text = args.get("text").and_then(Value::as_str).unwrap_or_default();
        Ok(ToolOutput::text(text))
    }
}

fn echo_spec(name: &str) -> ToolSpec {
    ToolSpec {
        name: name.to_string(),
        description: format!("Echo tool '{name}'."),
        params: json!({ "text": { "type": "string", "description": "Text to echo" } }),
        tags: Vec::new(),
        callback: Arc::new(Echo),
    }
}

/// In-memory state store that records every mutation for assertions.
#[derive(Default)]
struct RecordingStateStore {
    records: Mutex<BTreeMap<String, ToolSourceRecord>>,
    set_state_calls: AtomicUsize,
}

#[async_trait]
impl ToolStateStore for RecordingStateStore {
    async fn load_all(&self) -> Result<Vec<ToolSourceRecord>, StateStoreError> {
        Ok(self.records.lock().await.values().cloned().collect())
    }

    async fn add_url(&self, url: &str) -> Result<(), StateStoreError> {
        self.records
            .lock()
            .await
            .entry(url.to_string())
            .or_insert_with(|| ToolSourceRecord {
                url: url.to_string(),
                tools: BTreeMap::new(),
            });
        Ok(())
    }

    async fn set_tool_state(
        &self,
        url: &str,
        tool_name: &str,
        enabled: bool,
    ) -> Result<(), StateStoreError> {
        self.set_state_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(record) = self.records.lock().await.get_mut(url) {
            record
                .tools
                .insert(tool_name.to_string(), ToolState { enabled });
        }
        Ok(())
    }

    async fn delete_url(&self, url: &str) -> Result<(), StateStoreError> {
        self.records.lock().await.remove(url);
        Ok(())
    }
}

fn manager_with(
    store: Arc<RecordingStateStore>,
    loader: StaticModuleLoader,
) -> ToolManager {
    ToolManager::new(store, Arc::new(HttpManifestFetcher::new()), Arc::new(loader))
}

async fn serve_manifest(server: &MockServer, manifest_path: &str, js: &str) {
    Mock::given(method("GET"))
        .and(path(manifest_path.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "js": js })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn load_from_url_registers_tools_and_persists_the_url() {
    let server = MockServer::start().await;
    serve_manifest(&server, "/i/chat/tools.json", "tools.js").await;

    let manifest_url = format!("{}/i/chat/tools.json", server.uri());
    let module_url = format!("{}/i/chat/tools.js", server.uri());

    let mut loader = StaticModuleLoader::new();
    loader.register(module_url, || vec![echo_spec("echo"), echo_spec("shout")]);

    let store = Arc::new(RecordingStateStore::default());
    let manager = manager_with(Arc::clone(&store), loader);

    manager.load_from_url(&manifest_url, true).await.unwrap();

    assert_eq!(manager.tool_count(), 2);
    let tool = manager.get("echo").unwrap();
    assert_eq!(tool.source_url(), Some(manifest_url.as_str()));
    assert!(tool.enabled());

    let records = store.load_all().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].url, manifest_url);
}

#[tokio::test]
async fn failed_fetch_surfaces_status_and_loads_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let store = Arc::new(RecordingStateStore::default());
    let manager = manager_with(Arc::clone(&store), StaticModuleLoader::new());

    let err = manager
        .load_from_url(&format!("{}/missing.json", server.uri()), true)
        .await
        .unwrap_err();
    assert!(matches!(err, ManifestError::Status(404)));
    assert_eq!(manager.tool_count(), 0);
    assert!(store.load_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn manifest_without_js_field_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bad.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "script": "x.js" })))
        .mount(&server)
        .await;

    let manager = manager_with(Arc::new(RecordingStateStore::default()), StaticModuleLoader::new());
    let err = manager
        .load_from_url(&format!("{}/bad.json", server.uri()), false)
        .await
        .unwrap_err();
    assert!(matches!(err, ManifestError::MissingScript));
}

#[tokio::test]
async fn one_malformed_spec_does_not_abort_the_batch() {
    let server = MockServer::start().await;
    serve_manifest(&server, "/tools.json", "tools.js").await;
    let manifest_url = format!("{}/tools.json", server.uri());
    let module_url = format!("{}/tools.js", server.uri());

    let mut loader = StaticModuleLoader::new();
    loader.register(module_url, || {
        let mut broken = echo_spec("");
        broken.description = "has no name".to_string();
        vec![echo_spec("good"), broken, echo_spec("also_good")]
    });

    let manager = manager_with(Arc::new(RecordingStateStore::default()), loader);
    manager.load_from_url(&manifest_url, false).await.unwrap();

    assert_eq!(manager.tool_count(), 2);
    assert!(manager.get("good").is_some());
    assert!(manager.get("also_good").is_some());
}

#[tokio::test]
async fn saved_urls_reload_with_their_enablement_overrides() {
    let server = MockServer::start().await;
    serve_manifest(&server, "/tools.json", "tools.js").await;
    let manifest_url = format!("{}/tools.json", server.uri());
    let module_url = format!("{}/tools.js", server.uri());

    let store = Arc::new(RecordingStateStore::default());
    store.add_url(&manifest_url).await.unwrap();
    // Pre-existing record marks "echo" as disabled.
    store.set_tool_state(&manifest_url, "echo", false).await.unwrap();

    let mut loader = StaticModuleLoader::new();
    loader.register(module_url, || vec![echo_spec("echo"), echo_spec("shout")]);
    let manager = manager_with(Arc::clone(&store), loader);

    let mut updates = manager.subscribe();
    manager.load_from_saved_urls().await;

    assert!(!manager.get("echo").unwrap().enabled());
    assert!(manager.get("shout").unwrap().enabled());

    // Exactly one notification for the whole startup batch.
    let event = updates.try_recv().unwrap();
    assert_eq!(event.tools.len(), 2);
    assert!(updates.try_recv().is_err());
}

#[tokio::test]
async fn duplicate_registration_keeps_the_second_entry() {
    let manager = manager_with(Arc::new(RecordingStateStore::default()), StaticModuleLoader::new());

    manager.register_builtin(echo_spec("dup")).unwrap();
    let mut replacement = echo_spec("dup");
    replacement.description = "Replacement description.".to_string();
    manager.register_builtin(replacement).unwrap();

    assert_eq!(manager.tool_count(), 1);
    assert_eq!(manager.get("dup").unwrap().description(), "Replacement description.");
}

#[tokio::test]
async fn delete_tools_from_url_removes_only_that_source() {
    let server = MockServer::start().await;
    serve_manifest(&server, "/a/tools.json", "tools.js").await;
    serve_manifest(&server, "/b/tools.json", "tools.js").await;
    let url_a = format!("{}/a/tools.json", server.uri());
    let url_b = format!("{}/b/tools.json", server.uri());

    let mut loader = StaticModuleLoader::new();
    loader.register(format!("{}/a/tools.js", server.uri()), || vec![echo_spec("from_a")]);
    loader.register(format!("{}/b/tools.js", server.uri()), || vec![echo_spec("from_b")]);

    let store = Arc::new(RecordingStateStore::default());
    let manager = manager_with(Arc::clone(&store), loader);
    manager.load_from_url(&url_a, true).await.unwrap();
    manager.load_from_url(&url_b, true).await.unwrap();

    manager.delete_tools_from_url(&url_a).await;

    assert!(manager.get("from_a").is_none());
    assert!(manager.get("from_b").is_some());
    let records = store.load_all().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].url, url_b);
}

#[tokio::test]
async fn toggling_twice_restores_state_and_persists_both_flips() {
    let server = MockServer::start().await;
    serve_manifest(&server, "/tools.json", "tools.js").await;
    let manifest_url = format!("{}/tools.json", server.uri());
    let module_url = format!("{}/tools.js", server.uri());

    let mut loader = StaticModuleLoader::new();
    loader.register(module_url, || vec![echo_spec("echo")]);
    let store = Arc::new(RecordingStateStore::default());
    let manager = manager_with(Arc::clone(&store), loader);
    manager.load_from_url(&manifest_url, true).await.unwrap();

    let tool = manager.get("echo").unwrap();
    let initially_enabled = tool.enabled();

    assert_eq!(tool.toggle(), !initially_enabled);
    assert_eq!(tool.toggle(), initially_enabled);

    // Persistence is fire-and-forget; wait for both writes to land.
    let mut waited = Duration::ZERO;
    while store.set_state_calls.load(Ordering::SeqCst) < 2 && waited < Duration::from_secs(2) {
        tokio::time::sleep(Duration::from_millis(10)).await;
        waited += Duration::from_millis(10);
    }
    assert_eq!(store.set_state_calls.load(Ordering::SeqCst), 2);
    assert_eq!(tool.enabled(), initially_enabled);
}

#[tokio::test]
async fn registry_changes_broadcast_snapshots() {
    let manager = manager_with(Arc::new(RecordingStateStore::default()), StaticModuleLoader::new());
    let mut updates = manager.subscribe();

    manager.register_builtin(echo_spec("one")).unwrap();
    manager.register_builtin(echo_spec("two")).unwrap();

    let first = updates.try_recv().unwrap();
    assert_eq!(first.tools.len(), 1);
    let second = updates.try_recv().unwrap();
    assert_eq!(second.tools.len(), 2);
    assert_eq!(second.tools[0].name, "one");
    assert_eq!(second.tools[1].name, "two");
}
