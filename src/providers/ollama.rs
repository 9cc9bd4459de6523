use anyhow::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Config;
use crate::model::Message;
use crate::providers::http_errors::model_api_request_error;
use crate::providers::read_json_response;

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    stream: bool,
    messages: Vec<OllamaMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct OllamaMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaReply,
}

#[derive(Debug, Deserialize)]
struct OllamaReply {
    content: String,
}

fn chat_url(base_url: &str) -> String {
    format!("{}/api/chat", base_url.trim_end_matches('/'))
}

fn build_request<'a>(model: &'a str, messages: &'a [Message]) -> OllamaChatRequest<'a> {
    OllamaChatRequest {
        model,
        stream: false,
        messages: messages
            .iter()
            .map(|msg| OllamaMessage {
                role: msg.role.as_str(),
                content: &msg.content,
            })
            .collect(),
    }
}

pub async fn chat(client: &Client, cfg: &Config, messages: &[Message]) -> Result<String> {
    let api_url = chat_url(&cfg.model_base_url);
    debug!(
        api_url = %api_url,
        model = %cfg.model,
        message_count = messages.len(),
        "sending ollama chat request"
    );

    let response = client
        .post(&api_url)
        .json(&build_request(&cfg.model, messages))
        .send()
        .await
        .map_err(|err| {
            warn!(api_url = %api_url, model = %cfg.model, error = %err, "ollama request failed");
            model_api_request_error(err, &api_url, cfg.model_timeout_secs)
        })?;

    let parsed: OllamaChatResponse = read_json_response(response, "ollama", &api_url).await?;
    debug!(
        model = %cfg.model,
        response_len = parsed.message.content.len(),
        "received ollama chat response"
    );
    Ok(parsed.message.content)
}
