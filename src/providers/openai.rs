use anyhow::{Context, Result, anyhow};
use futures::StreamExt;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::model::{DeltaSink, Message, MessageRole, ModelReply, NativeToolCall, ToolDefinition};
use crate::providers::http_errors::model_api_request_error;
use crate::providers::{ensure_success, read_json_response};

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<CompletionMessage<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Serialize)]
struct CompletionMessage<'a> {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunction<'a>,
}

#[derive(Debug, Serialize)]
struct WireFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

#[derive(Debug, Serialize)]
struct WireToolCall<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunctionCall<'a>,
}

#[derive(Debug, Serialize)]
struct WireFunctionCall<'a> {
    name: &'a str,
    /// The API expects the arguments object encoded as a JSON string.
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionReply,
}

#[derive(Debug, Deserialize)]
struct CompletionReply {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ReplyToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ReplyToolCall {
    id: String,
    function: ReplyFunction,
}

#[derive(Debug, Deserialize)]
struct ReplyFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
struct ToolCallDelta {
    #[serde(default)]
    index: usize,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<FunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct FunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

fn completions_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

/// Keeps the first 7 and last 4 characters of a key for log lines.
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 11 {
        return "***".to_string();
    }
    let head: String = chars[..7].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}***{tail}")
}

fn wire_message(msg: &Message) -> CompletionMessage<'_> {
    let requested_tools = msg.role == MessageRole::Assistant && !msg.tool_calls.is_empty();
    CompletionMessage {
        role: msg.role.as_str(),
        content: (!requested_tools || !msg.content.is_empty()).then_some(msg.content.as_str()),
        tool_calls: msg
            .tool_calls
            .iter()
            .map(|call| WireToolCall {
                id: &call.id,
                kind: "function",
                function: WireFunctionCall {
                    name: &call.name,
                    arguments: call.arguments.to_string(),
                },
            })
            .collect(),
        tool_call_id: msg.tool_call_id.as_deref(),
    }
}

fn build_request<'a>(
    model: &'a str,
    messages: &'a [Message],
    tools: &'a [ToolDefinition],
    stream: bool,
) -> CompletionRequest<'a> {
    CompletionRequest {
        model,
        messages: messages.iter().map(wire_message).collect(),
        tools: tools
            .iter()
            .map(|tool| WireTool {
                kind: "function",
                function: WireFunction {
                    name: tool.name,
                    description: tool.description,
                    parameters: &tool.parameters,
                },
            })
            .collect(),
        stream,
    }
}

// Arguments that are not valid JSON are handed on as a raw string so the tool
// reports them as invalid instead of the whole turn failing.
fn decode_arguments(raw: String) -> Value {
    serde_json::from_str(&raw).unwrap_or(Value::String(raw))
}

fn first_reply(parsed: CompletionResponse) -> Result<ModelReply> {
    let message = parsed
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message)
        .ok_or_else(|| anyhow!("Model response contained no choices"))?;

    let tool_calls: Vec<NativeToolCall> = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| NativeToolCall {
            id: call.id,
            name: call.function.name,
            arguments: decode_arguments(call.function.arguments),
        })
        .collect();

    if message.content.is_none() && tool_calls.is_empty() {
        return Err(anyhow!("Model response contained no message content"));
    }
    Ok(ModelReply {
        content: message.content.unwrap_or_default(),
        tool_calls,
    })
}

/// Splits a server-sent-events byte stream into `data:` payloads.
///
/// Bytes are buffered until a full line arrives, so chunk boundaries may fall
/// anywhere, including inside a multi-byte character.
#[derive(Debug, Default)]
struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(payload) = data_payload(&line) {
                payloads.push(payload);
            }
        }
        payloads
    }

    fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        data_payload(&rest)
    }
}

fn data_payload(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let payload = line.trim_end_matches(['\r', '\n']).strip_prefix("data:")?;
    Some(payload.trim().to_string())
}

#[derive(Debug, Default)]
struct PartialToolCall {
    id: String,
    name: String,
    arguments: String,
}

/// Rebuilds a full reply from streamed completion chunks.
#[derive(Debug, Default)]
struct StreamAccumulator {
    decoder: SseDecoder,
    content: String,
    tool_calls: Vec<PartialToolCall>,
    done: bool,
}

impl StreamAccumulator {
    fn feed(&mut self, bytes: &[u8], sink: &dyn DeltaSink) -> Result<()> {
        for payload in self.decoder.feed(bytes) {
            self.apply(&payload, sink)?;
        }
        Ok(())
    }

    fn apply(&mut self, payload: &str, sink: &dyn DeltaSink) -> Result<()> {
        if self.done || payload.is_empty() {
            return Ok(());
        }
        if payload == "[DONE]" {
            self.done = true;
            return Ok(());
        }

        let chunk: StreamChunk =
            serde_json::from_str(payload).context("Failed to parse model stream chunk")?;
        for choice in chunk.choices {
            if let Some(text) = choice.delta.content.filter(|text| !text.is_empty()) {
                sink.push(&text);
                self.content.push_str(&text);
            }
            for delta in choice.delta.tool_calls.unwrap_or_default() {
                if self.tool_calls.len() <= delta.index {
                    self.tool_calls
                        .resize_with(delta.index + 1, PartialToolCall::default);
                }
                let slot = &mut self.tool_calls[delta.index];
                if let Some(id) = delta.id {
                    slot.id = id;
                }
                if let Some(function) = delta.function {
                    if let Some(name) = function.name {
                        slot.name.push_str(&name);
                    }
                    if let Some(arguments) = function.arguments {
                        slot.arguments.push_str(&arguments);
                    }
                }
            }
        }
        Ok(())
    }

    fn finish(mut self, sink: &dyn DeltaSink) -> Result<ModelReply> {
        if let Some(payload) = self.decoder.finish() {
            self.apply(&payload, sink)?;
        }
        Ok(ModelReply {
            content: self.content,
            tool_calls: self
                .tool_calls
                .into_iter()
                .filter(|call| !call.name.is_empty())
                .map(|call| NativeToolCall {
                    id: call.id,
                    name: call.name,
                    arguments: decode_arguments(call.arguments),
                })
                .collect(),
        })
    }
}

async fn read_stream(
    response: Response,
    sink: &dyn DeltaSink,
    api_url: &str,
    timeout_secs: u64,
) -> Result<ModelReply> {
    let mut body = std::pin::pin!(response.bytes_stream());
    let mut accumulator = StreamAccumulator::default();
    while let Some(chunk) = body.next().await {
        let bytes = chunk.map_err(|err| model_api_request_error(err, api_url, timeout_secs))?;
        accumulator.feed(&bytes, sink)?;
        if accumulator.done {
            break;
        }
    }
    accumulator.finish(sink)
}

pub async fn chat(
    client: &Client,
    cfg: &Config,
    messages: &[Message],
    tools: &[ToolDefinition],
    sink: Option<&dyn DeltaSink>,
) -> Result<ModelReply> {
    let api_key = cfg.api_key.as_deref().ok_or_else(|| {
        anyhow!("OPENAI_API_KEY is not set. Add it to the environment or a .env file.")
    })?;
    let api_url = completions_url(&cfg.model_base_url);
    debug!(
        api_url = %api_url,
        model = %cfg.model,
        api_key = %mask_key(api_key),
        message_count = messages.len(),
        tool_count = tools.len(),
        stream = sink.is_some(),
        "sending openai chat completion request"
    );

    let response = client
        .post(&api_url)
        .bearer_auth(api_key)
        .json(&build_request(&cfg.model, messages, tools, sink.is_some()))
        .send()
        .await
        .map_err(|err| {
            warn!(api_url = %api_url, model = %cfg.model, error = %err, "openai request failed");
            model_api_request_error(err, &api_url, cfg.model_timeout_secs)
        })?;

    let reply = match sink {
        Some(sink) => {
            let response = ensure_success(response, "openai", &api_url).await?;
            read_stream(response, sink, &api_url, cfg.model_timeout_secs).await?
        }
        None => {
            let parsed: CompletionResponse =
                read_json_response(response, "openai", &api_url).await?;
            first_reply(parsed)?
        }
    };
    debug!(
        model = %cfg.model,
        response_len = reply.content.len(),
        tool_calls = reply.tool_calls.len(),
        "received openai chat completion"
    );
    Ok(reply)
}
