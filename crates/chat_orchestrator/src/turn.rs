//! One user turn against the text-generation backend.

use std::sync::Arc;

use chat_core::{ChatMessage, Sender, generate_id};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use tool_system::{
    InvocationContext, ToolManager, ToolOutcome, ToolPromptInfo, build_system_prompt,
    execute_tool_calls, parse_tool_calls,
};

use crate::attachments;
use crate::wire::{WireMessage, WirePart};

/// Messages from image-producing tools are collapsed in the outgoing
/// context: the backend gets a placeholder instead of megabytes of data
/// URIs.
static IMAGE_GENERATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new("(?i)image generator").expect("static regex"));

/// Receives every conversation message a turn produces, in order.
pub type MessageSink = Arc<dyn Fn(ChatMessage) + Send + Sync>;

/// Which registered tool generates text, and with which model.
#[derive(Clone, Debug)]
pub struct TurnConfig {
    pub generator_tool: String,
    pub model: String,
}

pub struct TurnOrchestrator {
    tools: Arc<ToolManager>,
    config: TurnConfig,
    http: reqwest::Client,
}

impl TurnOrchestrator {
    pub fn new(tools: Arc<ToolManager>, config: TurnConfig) -> Self {
        Self {
            tools,
            config,
            http: reqwest::Client::new(),
        }
    }

    pub fn tools(&self) -> &Arc<ToolManager> {
        &self.tools
    }

    /// Runs one turn. Every outcome is delivered through `sink` as
    /// conversation messages; failures become a `❌`-prefixed message from
    /// `Sender::System` rather than an error return.
    pub async fn dispatch_turn(
        &self,
        user_text: &str,
        attachments: &[String],
        context: &[ChatMessage],
        sink: MessageSink,
    ) {
        if let Err(err) = self.run_turn(user_text, attachments, context, &sink).await {
            log::error!("turn failed: {err:#}");
            sink(ChatMessage::system(format!("❌ {err}")));
        }
    }

    async fn run_turn(
        &self,
        user_text: &str,
        attachments: &[String],
        context: &[ChatMessage],
        sink: &MessageSink,
    ) -> anyhow::Result<()> {
        // Notes-to-self are kept in the history but never sent anywhere.
        if user_text.starts_with("@note") {
            return Ok(());
        }

        let Some(generator) = self.tools.get(&self.config.generator_tool) else {
            log::warn!(
                "text generation tool '{}' is not registered",
                self.config.generator_tool
            );
            return Ok(());
        };
        if !generator.has_tag("Text Generation") {
            log::warn!(
                "tool '{}' is not tagged for text generation",
                generator.name()
            );
            return Ok(());
        }

        let messages = self
            .build_wire_messages(user_text, attachments, context)
            .await;

        // Every partial and the final text share one reserved id, so the
        // tree's apply_response collapses them into a single message.
        let reserved_id = generate_id();
        let responder = Sender::Tool(generator.name().to_string());

        let cx = {
            let sink = Arc::clone(sink);
            let id = reserved_id.clone();
            let responder = responder.clone();
            InvocationContext::streaming(Arc::new(move |partial: &str| {
                sink(ChatMessage::with_id(id.clone(), partial, responder.clone()));
            }))
        };

        let args = json!({ "model": self.config.model, "messages": messages });
        let output = match generator.execute(args, &cx).await? {
            ToolOutcome::Completed(output) => output,
            ToolOutcome::Disabled => {
                anyhow::bail!(
                    "text generation tool '{}' is disabled",
                    generator.name()
                );
            }
        };
        let final_text = output.first_text().unwrap_or_default().to_string();
        sink(ChatMessage::with_id(reserved_id, &final_text, responder));

        let calls = parse_tool_calls(&final_text);
        if calls.is_empty() {
            return Ok(());
        }
        let reports = execute_tool_calls(&self.tools, &calls, &|message| sink(message)).await;
        let failures: Vec<String> = reports
            .iter()
            .filter(|report| !report.success)
            .map(|report| {
                format!(
                    "{}: {}",
                    report.tool,
                    report.error.as_deref().unwrap_or("unknown error")
                )
            })
            .collect();
        if !failures.is_empty() {
            sink(ChatMessage::system(format!(
                "⚠️ Some tool calls failed — {}",
                failures.join("; ")
            )));
        }
        Ok(())
    }

    /// The backend payload: system prompt, prior context, then the user
    /// turn (a content-part array when attachments resolved, else plain
    /// text).
    async fn build_wire_messages(
        &self,
        user_text: &str,
        attachments: &[String],
        context: &[ChatMessage],
    ) -> Vec<WireMessage> {
        let mut prompt_tools: Vec<ToolPromptInfo> = self
            .tools
            .get_all()
            .iter()
            .filter(|tool| !tool.has_tag("Text Generation"))
            .map(|tool| ToolPromptInfo {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                params: tool.described_params(),
            })
            .collect();
        prompt_tools.sort_by(|a, b| a.name.cmp(&b.name));

        let mut messages = vec![WireMessage::text("system", build_system_prompt(&prompt_tools))];

        for message in context {
            let role = if message.sender == Sender::User {
                "user"
            } else {
                "assistant"
            };
            let text = if is_image_generator(&message.sender) {
                "[Images...]".to_string()
            } else {
                message.text.clone()
            };
            messages.push(WireMessage::text(role, text));
        }

        let inlined = attachments::encode_all(&self.http, attachments).await;
        if inlined.is_empty() {
            messages.push(WireMessage::text("user", user_text));
        } else {
            let mut parts = vec![WirePart::Text {
                text: user_text.to_string(),
            }];
            parts.extend(inlined.into_iter().map(WirePart::image));
            messages.push(WireMessage::parts("user", parts));
        }
        messages
    }
}

fn is_image_generator(sender: &Sender) -> bool {
    match sender {
        Sender::Tool(name) => IMAGE_GENERATOR.is_match(name),
        _ => false,
    }
}
