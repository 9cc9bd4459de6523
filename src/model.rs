use anyhow::{Result, anyhow};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{Config, ModelProvider};
use crate::providers;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

/// A tool invocation requested through the provider's structured tool-call API.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// Function schema advertised to providers with structured tool calls.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    /// Set on assistant messages that requested tools.
    pub tool_calls: Vec<NativeToolCall>,
    /// Set on tool messages; names the call being answered.
    pub tool_call_id: Option<String>,
}

impl Message {
    fn with_role(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::Assistant, content)
    }

    pub fn assistant_tool_calls(content: impl Into<String>, calls: Vec<NativeToolCall>) -> Self {
        Self {
            tool_calls: calls,
            ..Self::with_role(MessageRole::Assistant, content)
        }
    }

    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(call_id.into()),
            ..Self::with_role(MessageRole::Tool, content)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReply {
    pub content: String,
    pub tool_calls: Vec<NativeToolCall>,
}

impl ModelReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }
}

/// Receives reply text as it arrives from a streaming provider.
pub trait DeltaSink {
    fn push(&self, delta: &str);
}

pub async fn chat(
    client: &Client,
    cfg: &Config,
    messages: &[Message],
    tools: &[ToolDefinition],
    sink: Option<&dyn DeltaSink>,
) -> Result<ModelReply> {
    let Some(provider) = cfg.provider() else {
        warn!(provider = %cfg.model_provider, "unsupported model provider configured");
        return Err(anyhow!(
            "Unsupported MODEL_PROVIDER='{}'. Supported providers: openai, ollama.",
            cfg.model_provider
        ));
    };

    debug!(
        provider = provider.as_str(),
        model = %cfg.model,
        message_count = messages.len(),
        tool_count = tools.len(),
        streaming = sink.is_some(),
        "dispatching model chat request"
    );
    match provider {
        ModelProvider::OpenAi => providers::openai::chat(client, cfg, messages, tools, sink).await,
        ModelProvider::Ollama => providers::ollama::chat(client, cfg, messages)
            .await
            .map(ModelReply::text),
    }
}
