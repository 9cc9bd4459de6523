pub(crate) mod http_errors;
pub mod ollama;
pub mod openai;

use anyhow::{Context, Result, anyhow};
use reqwest::Response;
use serde::de::DeserializeOwned;
use tracing::warn;

/// Passes 2xx responses through and turns anything else into an error that carries the body text.
pub(crate) async fn ensure_success(
    response: Response,
    provider: &'static str,
    api_url: &str,
) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read response body>".to_string());
    warn!(
        provider,
        api_url = %api_url,
        status = %status,
        response_body_len = body.len(),
        "model API returned non-success status"
    );
    Err(anyhow!(
        "Model request failed with status {}: {}",
        status,
        body
    ))
}

pub(crate) async fn read_json_response<T: DeserializeOwned>(
    response: Response,
    provider: &'static str,
    api_url: &str,
) -> Result<T> {
    ensure_success(response, provider, api_url)
        .await?
        .json()
        .await
        .context("Failed to parse model chat response")
}
