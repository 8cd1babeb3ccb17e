//! Built-in tool specs registered without a source manifest.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::ToolError;
use crate::types::{InvocationContext, ToolCallback, ToolOutput, ToolSpec};

struct ClockCallback;

#[async_trait]
impl ToolCallback for ClockCallback {
    async fn invoke(&self, _args: Value, _cx: &InvocationContext) -> Result<ToolOutput, ToolError> {
        Ok(ToolOutput::text(chrono::Utc::now().to_rfc3339()))
    }
}

/// A local clock tool: no parameters, reports the current UTC time.
pub fn clock_tool() -> ToolSpec {
    ToolSpec {
        name: "Clock".to_string(),
        description: "Returns the current UTC date and time.".to_string(),
        params: json!({}),
        tags: Vec::new(),
        callback: Arc::new(ClockCallback),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Tool, ToolOutcome};

    #[tokio::test]
    async fn clock_tool_reports_a_timestamp() {
        let tool = Tool::new(clock_tool(), None, None).unwrap();
        let outcome = tool
            .execute(json!({}), &InvocationContext::default())
            .await
            .unwrap();
        match outcome {
            ToolOutcome::Completed(output) => {
                let text = output.first_text().unwrap();
                assert!(text.contains('T'));
            }
            ToolOutcome::Disabled => panic!("clock starts enabled"),
        }
    }
}
