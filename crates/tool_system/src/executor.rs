//! Executes parsed tool calls against the registry and folds results back
//! into the conversation stream.

use chat_core::ChatMessage;
use serde_json::Value;

use crate::codec::ToolCallRequest;
use crate::manager::ToolManager;
use crate::types::{InvocationContext, ToolOutcome, ToolOutput};

/// Text a disabled tool reports instead of executing.
pub const DISABLED_RESULT: &str = "This tool is currently disabled.";

/// Outcome of one dispatched tool call.
#[derive(Clone, Debug)]
pub struct ToolCallReport {
    pub tool: String,
    pub success: bool,
    pub result: Option<ToolOutput>,
    pub error: Option<String>,
}

impl ToolCallReport {
    fn success(tool: &str, result: ToolOutput) -> Self {
        Self {
            tool: tool.to_string(),
            success: true,
            result: Some(result),
            error: None,
        }
    }

    fn failure(tool: &str, error: impl Into<String>) -> Self {
        Self {
            tool: tool.to_string(),
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }
}

/// Executes each call in order. A failed call produces a failure report and
/// never aborts the rest. Every successful call with textual content emits
/// one conversation message attributed to the tool via `sink`.
pub async fn execute_tool_calls(
    manager: &ToolManager,
    calls: &[ToolCallRequest],
    sink: &(dyn Fn(ChatMessage) + Sync),
) -> Vec<ToolCallReport> {
    let mut reports = Vec::with_capacity(calls.len());

    for call in calls {
        let Some(tool) = manager.get(&call.name) else {
            log::warn!("tool not found: {}", call.name);
            reports.push(ToolCallReport::failure(
                &call.name,
                format!("Tool '{}' not found", call.name),
            ));
            continue;
        };

        log::debug!("executing tool call '{}'", call.name);
        let args = Value::Object(call.parameters.clone());
        match tool.execute(args, &InvocationContext::default()).await {
            Ok(ToolOutcome::Disabled) => {
                reports.push(ToolCallReport::success(
                    &call.name,
                    ToolOutput::text(DISABLED_RESULT),
                ));
            }
            Ok(ToolOutcome::Completed(output)) => {
                if let Some(text) = output.first_text() {
                    sink(ChatMessage::tool(call.name.clone(), text));
                }
                reports.push(ToolCallReport::success(&call.name, output));
            }
            Err(err) => {
                log::error!("error executing tool '{}': {err}", call.name);
                reports.push(ToolCallReport::failure(&call.name, err.to_string()));
            }
        }
    }

    reports
}
