pub mod tools;

use anyhow::Result;
use tracing::{debug, info};

use crate::model::{DeltaSink, Message, MessageRole, ModelReply};
use crate::model_gateway::{ModelGateway, ModelGatewayRequest};
use tools::{ToolCall, ToolRunner};

const MAX_HISTORY_MESSAGES: usize = 40;
const MAX_TOOL_ROUNDS: usize = 3;

/// How tools are offered to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolProtocol {
    /// Schemas travel in the request; calls come back as structured `tool_calls`.
    Native,
    /// Usage instructions go in the system prompt; calls come back as a JSON reply.
    Text,
}

pub struct Agent<G, R> {
    gateway: G,
    runner: R,
    protocol: ToolProtocol,
    history: Vec<Message>,
    system_messages: Vec<Message>,
}

impl<G, R> Agent<G, R>
where
    G: ModelGateway,
    R: ToolRunner,
{
    pub fn new(gateway: G, runner: R, system_prompt: &str, protocol: ToolProtocol) -> Self {
        let system_messages = build_system_messages(system_prompt, protocol);
        let history = system_messages.clone();
        Self {
            gateway,
            runner,
            protocol,
            history,
            system_messages,
        }
    }

    pub fn reset(&mut self) {
        self.history = self.system_messages.clone();
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub async fn run_turn(&mut self, user_input: &str) -> Result<String> {
        self.turn(user_input, None).await
    }

    /// Like [`Agent::run_turn`], but reply text is forwarded to `sink` as the
    /// provider streams it.
    pub async fn run_turn_streaming(
        &mut self,
        user_input: &str,
        sink: &dyn DeltaSink,
    ) -> Result<String> {
        self.turn(user_input, Some(sink)).await
    }

    async fn turn(&mut self, user_input: &str, sink: Option<&dyn DeltaSink>) -> Result<String> {
        self.push(Message::user(user_input));

        let mut reply = self.ask_model(sink).await?;
        for _ in 0..MAX_TOOL_ROUNDS {
            if !self.answer_tool_request(&reply).await {
                break;
            }
            reply = self.ask_model(sink).await?;
        }

        self.push(Message::assistant(reply.content.clone()));
        Ok(reply.content)
    }

    /// Runs whatever tools `reply` asked for and records the exchange.
    /// Returns false when the reply is a plain answer.
    async fn answer_tool_request(&mut self, reply: &ModelReply) -> bool {
        if !reply.tool_calls.is_empty() {
            self.push(Message::assistant_tool_calls(
                reply.content.clone(),
                reply.tool_calls.clone(),
            ));
            for native in &reply.tool_calls {
                let call = ToolCall {
                    name: native.name.clone(),
                    arguments: native.arguments.clone(),
                };
                let result = self.run_tool(&call).await;
                self.push(Message::tool_result(native.id.clone(), result));
            }
            return true;
        }

        let Some(call) = tools::parse_tool_call(&reply.content) else {
            return false;
        };
        self.push(Message::assistant(reply.content.clone()));
        let result = self.run_tool(&call).await;
        self.push(Message::user(format!(
            "Tool '{}' result: {}",
            call.name, result
        )));
        true
    }

    async fn ask_model(&self, sink: Option<&dyn DeltaSink>) -> Result<ModelReply> {
        let tools = match self.protocol {
            ToolProtocol::Native => tools::definitions(),
            ToolProtocol::Text => Vec::new(),
        };
        self.gateway
            .chat(ModelGatewayRequest {
                messages: self.history.clone(),
                tools,
                sink,
            })
            .await
    }

    async fn run_tool(&self, call: &ToolCall) -> String {
        info!(tool_name = %call.name, "model requested tool call");
        match self.runner.execute(call).await {
            Ok(output) => output.content,
            Err(err) => {
                debug!(tool_name = %call.name, error = %err, "tool call failed");
                format!("ERROR: {err}")
            }
        }
    }

    fn push(&mut self, message: Message) {
        self.history.push(message);
        self.trim_history();
    }

    fn trim_history(&mut self) {
        if self.history.len() <= MAX_HISTORY_MESSAGES {
            return;
        }

        let keep_tail = MAX_HISTORY_MESSAGES.saturating_sub(self.system_messages.len());
        let mut tail_start = self.history.len().saturating_sub(keep_tail);
        // A tool result must not outlive the assistant message that requested it.
        while tail_start < self.history.len() && self.history[tail_start].role == MessageRole::Tool
        {
            tail_start += 1;
        }
        let mut trimmed = self.system_messages.clone();
        trimmed.extend_from_slice(&self.history[tail_start..]);
        self.history = trimmed;
    }
}

fn build_system_messages(system_prompt: &str, protocol: ToolProtocol) -> Vec<Message> {
    let mut messages = Vec::new();

    if !system_prompt.trim().is_empty() {
        messages.push(Message::system(system_prompt));
    }

    if protocol == ToolProtocol::Text {
        messages.push(Message::system(tools::usage_instructions()));
    }
    messages
}
