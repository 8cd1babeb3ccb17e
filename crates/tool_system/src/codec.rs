//! The tool-call protocol codec.
//!
//! Encoding side: a deterministic system-prompt block that enumerates the
//! available tools and shows the backend the exact JSON shape a tool call
//! must take. Decoding side: a forgiving scanner that pulls embedded JSON
//! out of free-form markdown and recognizes `tool_calls` payloads. Parse
//! failures are never errors; they mean "no tool calls found".

use serde_json::{Map, Value};

/// One structured tool invocation recovered from assistant text.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolCallRequest {
    pub name: String,
    pub parameters: Map<String, Value>,
}

/// What the prompt builder needs to know about one tool.
#[derive(Clone, Debug)]
pub struct ToolPromptInfo {
    pub name: String,
    pub description: String,
    /// (parameter name, description) pairs.
    pub params: Vec<(String, String)>,
}

/// Renders the system instruction block teaching the backend how to emit
/// tool calls. Pure string templating, deterministic for a given tool list.
pub fn build_system_prompt(tools: &[ToolPromptInfo]) -> String {
    let tool_descriptions = tools
        .iter()
        .map(|tool| {
            let params = tool
                .params
                .iter()
                .map(|(name, description)| {
                    let description = if description.is_empty() {
                        "string"
                    } else {
                        description
                    };
                    format!("  - {name}: {description}")
                })
                .collect::<Vec<_>>()
                .join("\n");
            format!(
                "- **{}**: {}\n  Parameters:\n{}",
                tool.name, tool.description, params
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        r#"System Instructions: You are a helpful assistant with access to tools. Always respond in markdown plain text code block. When you need to use a tool, add a JSON code block containing the tool call to the markdown response. Only output markdown plain text code block inside a markdown response. So output markdown in markdown.

Available Tools:
{tool_descriptions}

Tool Call Format:
When you want to use a tool, include a Markdown code block containing a JSON code block in your response like this:

Markdown Output Example:
# Sample Markdown with JSON Block

This is a sample Markdown document demonstrating how to include a JSON code block.

## Tool Calls
```json
{{
  "tool_calls": [
    {{
      "name": "tool_name",
      "parameters": {{
        "param1": "value1",
        "param2": "value2"
      }}
    }}
  ]
}}
```

You can call multiple tools by adding more objects to the tool_calls array. Always provide a natural language response explaining what you're doing, then include the tool call JSON block in Markdown format.

Rules:
1. Only use tools that are available in the list above
2. Ensure all required parameters are provided
3. Provide helpful context before making tool calls
4. If no tools are needed, respond normally without JSON blocks"#
    )
}

/// Extracts the first parseable JSON value embedded in `text`: fenced
/// ```json blocks are tried first (in order of appearance), then bare
/// brace-matched objects. Returns `None` when nothing parses.
pub fn extract_json(text: &str) -> Option<Value> {
    for block in fenced_json_blocks(text) {
        if let Ok(value) = serde_json::from_str::<Value>(block.trim()) {
            return Some(value);
        }
    }
    for candidate in brace_matched_objects(text) {
        if let Ok(value) = serde_json::from_str::<Value>(candidate) {
            return Some(value);
        }
    }
    None
}

/// Parses assistant text for embedded tool calls. Returns an empty vec on
/// absent or malformed JSON; entries without a string `name` are skipped.
pub fn parse_tool_calls(text: &str) -> Vec<ToolCallRequest> {
    let Some(Value::Object(root)) = extract_json(text) else {
        return Vec::new();
    };
    let Some(Value::Array(calls)) = root.get("tool_calls") else {
        return Vec::new();
    };

    calls
        .iter()
        .filter_map(|call| {
            let name = call.get("name")?.as_str()?.to_string();
            let parameters = match call.get("parameters") {
                Some(Value::Object(map)) => map.clone(),
                Some(other) => {
                    log::warn!("ignoring non-object parameters for tool call '{name}': {other}");
                    Map::new()
                }
                None => Map::new(),
            };
            Some(ToolCallRequest { name, parameters })
        })
        .collect()
}

/// The contents of every ```json fenced block in `text`, in order.
fn fenced_json_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("```json") {
        let body = &rest[start + "```json".len()..];
        match body.find("```") {
            Some(end) => {
                blocks.push(&body[..end]);
                rest = &body[end + 3..];
            }
            None => break,
        }
    }
    blocks
}

/// Candidate brace-balanced object slices, string- and escape-aware, one
/// per `{` that opens at nesting depth zero.
fn brace_matched_objects(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut candidates = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'{' {
            if let Some(end) = matching_brace(text, i) {
                candidates.push(&text[i..=end]);
                i = end + 1;
                continue;
            }
        }
        i += 1;
    }
    candidates
}

/// Index of the `}` closing the `{` at `start`, honoring JSON string
/// literals and escape sequences. `None` when unbalanced.
fn matching_brace(text: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }
    None
}
