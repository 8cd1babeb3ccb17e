//! Error taxonomy for the tool system.

use thiserror::Error;

/// Failures scoped to a single tool: construction, argument validation, or
/// execution. One tool failing never aborts a batch.
#[derive(Error, Debug)]
pub enum ToolError {
    /// The tool spec is malformed. Fatal to that tool's construction only.
    #[error("invalid tool configuration: {0}")]
    Configuration(String),

    /// Arguments did not satisfy the parameter schema. Surfaced as the
    /// tool's result, never thrown past the orchestrator.
    #[error("invalid arguments: {}", fields.join(", "))]
    InvalidArguments { fields: Vec<String> },

    #[error("tool execution failed: {0}")]
    ExecutionFailed(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Failures while loading a remote tool manifest. Logged, loading of that
/// URL aborted, other manifests unaffected.
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("manifest fetch failed with status {0}")]
    Status(u16),

    #[error("manifest must contain a string 'js' field naming the tool module")]
    MissingScript,

    #[error("invalid manifest url: {0}")]
    BadUrl(#[from] url::ParseError),

    #[error("no tool module registered for '{0}'")]
    UnknownModule(String),
}

/// Failures reading or writing the persisted tool-state records. Logged and
/// abandoned; in-memory state remains authoritative.
#[derive(Error, Debug)]
pub enum StateStoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
