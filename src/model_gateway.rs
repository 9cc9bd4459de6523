use anyhow::Result;
use reqwest::Client;
use std::future::Future;
use std::pin::Pin;

use crate::config::Config;
use crate::model::{self, DeltaSink, Message, ModelReply, ToolDefinition};

pub struct ModelGatewayRequest<'a> {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    /// When set, providers that can stream forward reply text here as it arrives.
    pub sink: Option<&'a dyn DeltaSink>,
}

pub type ModelGatewayFuture<'a> = Pin<Box<dyn Future<Output = Result<ModelReply>> + 'a>>;

/// Seam between the conversation loop and whatever answers chat requests.
pub trait ModelGateway {
    fn chat<'a>(&'a self, request: ModelGatewayRequest<'a>) -> ModelGatewayFuture<'a>;
}

/// Routes requests to the provider selected by `MODEL_PROVIDER`.
pub struct HostModelGateway<'a> {
    client: &'a Client,
    cfg: &'a Config,
}

impl<'a> HostModelGateway<'a> {
    pub fn new(client: &'a Client, cfg: &'a Config) -> Self {
        Self { client, cfg }
    }
}

impl ModelGateway for HostModelGateway<'_> {
    fn chat<'b>(&'b self, request: ModelGatewayRequest<'b>) -> ModelGatewayFuture<'b> {
        Box::pin(async move {
            model::chat(
                self.client,
                self.cfg,
                &request.messages,
                &request.tools,
                request.sink,
            )
            .await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{HostModelGateway, ModelGateway, ModelGatewayRequest};
    use crate::config::test_config;
    use crate::model::Message;

    #[tokio::test]
    async fn host_gateway_preserves_provider_errors() {
        let client = reqwest::Client::new();
        let mut cfg = test_config();
        cfg.model_provider = "nonexistent".to_string();
        let gateway = HostModelGateway::new(&client, &cfg);

        let err = gateway
            .chat(ModelGatewayRequest {
                messages: vec![Message::user("ping")],
                tools: Vec::new(),
                sink: None,
            })
            .await
            .expect_err("gateway chat should fail");

        let msg = format!("{err:#}");
        assert!(
            msg.contains("Unsupported MODEL_PROVIDER='nonexistent'"),
            "unexpected error message: {msg}"
        );
    }
}
