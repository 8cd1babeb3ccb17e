//! The tool contract: spec, callback, and the registered `Tool` entry.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ToolError;
use crate::state::ToolStateStore;
use crate::types::schema::ParamSchema;

/// Sink for streamed partial text from a long-running tool. Each call
/// carries the full text accumulated so far, not a delta to append.
pub type DeltaSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Per-invocation context handed to a tool callback.
#[derive(Clone, Default)]
pub struct InvocationContext {
    pub on_delta: Option<DeltaSink>,
}

impl InvocationContext {
    pub fn streaming(on_delta: DeltaSink) -> Self {
        Self {
            on_delta: Some(on_delta),
        }
    }

    /// Forwards a partial-text chunk to the sink, if one is attached.
    pub fn emit_delta(&self, text: &str) {
        if let Some(sink) = &self.on_delta {
            sink(text);
        }
    }
}

/// One block of a tool's result, matching the backend capability contract
/// `{ "content": [{ "text": ... }] }`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    pub text: String,
}

/// A tool's structured result.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct ToolOutput {
    pub content: Vec<ContentBlock>,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock { text: text.into() }],
        }
    }

    pub fn first_text(&self) -> Option<&str> {
        self.content.first().map(|block| block.text.as_str())
    }
}

/// Result of asking a tool to execute. `Disabled` is a distinguishable
/// sentinel, not an error: callers must check for it rather than assume
/// execution occurred.
#[derive(Debug)]
pub enum ToolOutcome {
    Completed(ToolOutput),
    Disabled,
}

/// The invocation capability behind a tool.
#[async_trait]
pub trait ToolCallback: Send + Sync {
    /// Invoked with arguments already validated against the tool's schema.
    async fn invoke(&self, args: Value, cx: &InvocationContext) -> Result<ToolOutput, ToolError>;
}

/// The data-described form of a tool, as produced by a built-in list or a
/// loaded tool module.
#[derive(Clone)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// Raw parameter schema: a JSON object mapping parameter names to
    /// shape descriptors. Normalized at construction.
    pub params: Value,
    pub tags: Vec<String>,
    pub callback: Arc<dyn ToolCallback>,
}

/// A registered tool: validated spec plus mutable enablement.
pub struct Tool {
    name: String,
    description: String,
    schema: ParamSchema,
    callback: Arc<dyn ToolCallback>,
    tags: Vec<String>,
    /// The manifest URL the tool came from; `None` for built-ins.
    source_url: Option<String>,
    enabled: AtomicBool,
    state_store: Option<Arc<dyn ToolStateStore>>,
}

impl fmt::Debug for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("tags", &self.tags)
            .field("source_url", &self.source_url)
            .field("enabled", &self.enabled())
            .finish()
    }
}

impl Tool {
    /// Validates and normalizes a spec into a registered tool. The name and
    /// description are required; the schema and callback are guaranteed by
    /// the spec's types.
    pub fn new(
        spec: ToolSpec,
        source_url: Option<String>,
        state_store: Option<Arc<dyn ToolStateStore>>,
    ) -> Result<Self, ToolError> {
        if spec.name.trim().is_empty() {
            return Err(ToolError::Configuration("tool name is required".to_string()));
        }
        if spec.description.trim().is_empty() {
            return Err(ToolError::Configuration(format!(
                "tool '{}' is missing a description",
                spec.name
            )));
        }
        let schema = ParamSchema::normalize(&spec.name, &spec.params);
        Ok(Self {
            name: spec.name,
            description: spec.description,
            schema,
            callback: spec.callback,
            tags: spec.tags,
            source_url,
            enabled: AtomicBool::new(true),
            state_store,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn source_url(&self) -> Option<&str> {
        self.source_url.as_deref()
    }

    pub fn enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Overrides the enablement flag without persisting (used when applying
    /// saved state on top of freshly loaded defaults).
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Parameter names and descriptions, for prompt rendering.
    pub fn described_params(&self) -> Vec<(String, String)> {
        self.schema.described_params()
    }

    /// Executes the tool. Disabled tools resolve immediately with the
    /// [`ToolOutcome::Disabled`] sentinel; otherwise the arguments are
    /// validated against the schema and the callback invoked.
    pub async fn execute(
        &self,
        args: Value,
        cx: &InvocationContext,
    ) -> Result<ToolOutcome, ToolError> {
        if !self.enabled() {
            return Ok(ToolOutcome::Disabled);
        }
        let map: Map<String, Value> = match args {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            _ => {
                return Err(ToolError::InvalidArguments {
                    fields: vec!["arguments (expected object)".to_string()],
                });
            }
        };
        self.schema.validate(&map)?;
        let output = self.callback.invoke(Value::Object(map), cx).await?;
        Ok(ToolOutcome::Completed(output))
    }

    /// Flips the enabled flag. For manifest-loaded tools the new state is
    /// persisted fire-and-forget, keyed by (source url, name); persistence
    /// failure never rolls back the in-memory toggle.
    pub fn toggle(&self) -> bool {
        let now_enabled = !self.enabled.fetch_xor(true, Ordering::SeqCst);
        if let (Some(url), Some(store)) = (&self.source_url, &self.state_store) {
            let store = Arc::clone(store);
            let url = url.clone();
            let name = self.name.clone();
            tokio::spawn(async move {
                if let Err(err) = store.set_tool_state(&url, &name, now_enabled).await {
                    log::warn!("failed to persist enabled state for tool '{name}': {err}");
                }
            });
        }
        now_enabled
    }
}
