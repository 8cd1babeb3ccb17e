//! `tool_system`: the pluggable tool-calling mechanism.
//!
//! Tools are data-described capabilities: a name, a description, a
//! parameter schema, and an async callback. They are aggregated by a
//! [`ToolManager`] from built-in specs and from remote JSON manifests whose
//! referenced modules resolve against a statically-registered plugin table.
//! The codec module turns free-form assistant text into structured tool
//! calls and renders the system prompt that teaches the backend to emit
//! them.

pub mod builtins;
pub mod codec;
pub mod error;
pub mod executor;
pub mod loader;
pub mod manager;
pub mod state;
pub mod types;

pub use codec::{ToolCallRequest, ToolPromptInfo, build_system_prompt, parse_tool_calls};
pub use error::{ManifestError, StateStoreError, ToolError};
pub use executor::{DISABLED_RESULT, ToolCallReport, execute_tool_calls};
pub use loader::{HttpManifestFetcher, ManifestFetcher, ModuleLoader, StaticModuleLoader};
pub use manager::{ToolManager, ToolSummary, ToolsUpdated};
pub use state::{FileToolStateStore, ToolSourceRecord, ToolState, ToolStateStore};
pub use types::{
    ContentBlock, DeltaSink, InvocationContext, ParamSchema, Tool, ToolCallback, ToolOutcome,
    ToolOutput, ToolSpec,
};
