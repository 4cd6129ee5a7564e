use std::sync::Arc;

use serde_json::{Map, Value};

use crate::config::BridgeConfig;
use crate::error::Result;
use crate::events::{
    AgentAction, AgentFinish, ChatMessage, LlmResult, PipelineEvent, PrefixHints, Serialized,
    StageError,
};
use crate::sink::{deliver, MessageSink};
use crate::state::{BridgeState, Commands};

/// Dispatcher for callers running inside an async context.
pub struct AsyncDispatcher<S: MessageSink + ?Sized> {
    state: BridgeState,
    sink: Arc<S>,
}

impl<S: MessageSink + ?Sized> AsyncDispatcher<S> {
    pub fn new(config: BridgeConfig, sink: Arc<S>) -> Self {
        Self::from_state(BridgeState::new(config), sink)
    }

    pub fn from_state(state: BridgeState, sink: Arc<S>) -> Self {
        Self { state, sink }
    }

    pub fn state(&self) -> &BridgeState {
        &self.state
    }

    pub fn sink(&self) -> &Arc<S> {
        &self.sink
    }

    async fn flush(&self, commands: Commands) -> Result<()> {
        for command in commands {
            deliver(self.sink.as_ref(), command).await?;
        }
        Ok(())
    }

    pub async fn model_start(&mut self, params: Option<&Value>, prompts: &[String]) -> Result<()> {
        let commands = self.state.on_model_start(params, prompts)?;
        self.flush(commands).await
    }

    pub async fn chat_model_start(
        &mut self,
        params: Option<&Value>,
        messages: &[Vec<ChatMessage>],
    ) -> Result<()> {
        let commands = self.state.on_chat_model_start(params, messages)?;
        self.flush(commands).await
    }

    pub async fn model_token(&mut self, token: &str) -> Result<()> {
        let commands = self.state.on_model_token(token);
        self.flush(commands).await
    }

    pub async fn model_end(&mut self, result: &LlmResult) -> Result<()> {
        let commands = self.state.on_model_end(result);
        self.flush(commands).await
    }

    pub async fn model_error(&mut self, error: &StageError) -> Result<()> {
        let commands = self.state.on_model_error(error);
        self.flush(commands).await
    }

    pub async fn chain_start(&mut self, serialized: &Serialized, _inputs: &Value) -> Result<()> {
        let commands = self.state.on_chain_start(serialized);
        self.flush(commands).await
    }

    pub async fn chain_end(&mut self, outputs: &Map<String, Value>) -> Result<()> {
        let commands = self.state.on_chain_end(outputs);
        self.flush(commands).await
    }

    pub async fn chain_error(&mut self, error: &StageError) -> Result<()> {
        let commands = self.state.on_stage_error(error);
        self.flush(commands).await
    }

    pub async fn tool_start(&mut self, serialized: &Serialized, _input: &str) -> Result<()> {
        let commands = self.state.on_tool_start(serialized);
        self.flush(commands).await
    }

    pub async fn tool_end(&mut self, output: &str, _hints: &PrefixHints) -> Result<()> {
        let commands = self.state.on_tool_end(output);
        self.flush(commands).await
    }

    pub async fn tool_error(&mut self, error: &StageError) -> Result<()> {
        let commands = self.state.on_stage_error(error);
        self.flush(commands).await
    }

    pub async fn agent_action(&mut self, _action: &AgentAction) -> Result<()> {
        Ok(())
    }

    pub async fn agent_finish(&mut self, _finish: &AgentFinish) -> Result<()> {
        Ok(())
    }

    pub async fn text(&mut self, _text: &str) -> Result<()> {
        Ok(())
    }

    pub async fn handle(&mut self, event: &PipelineEvent) -> Result<()> {
        match event {
            PipelineEvent::ModelStart {
                prompts,
                invocation_params,
                ..
            } => self.model_start(invocation_params.as_ref(), prompts).await,
            PipelineEvent::ChatModelStart {
                messages,
                invocation_params,
                ..
            } => {
                self.chat_model_start(invocation_params.as_ref(), messages)
                    .await
            }
            PipelineEvent::ModelToken { token } => self.model_token(token).await,
            PipelineEvent::ModelEnd { response } => self.model_end(response).await,
            PipelineEvent::ModelError { error } => self.model_error(error).await,
            PipelineEvent::ChainStart { serialized, inputs } => {
                self.chain_start(serialized, inputs).await
            }
            PipelineEvent::ChainEnd { outputs } => self.chain_end(outputs).await,
            PipelineEvent::ChainError { error } => self.chain_error(error).await,
            PipelineEvent::ToolStart { serialized, input } => {
                self.tool_start(serialized, input).await
            }
            PipelineEvent::ToolEnd { output, hints } => self.tool_end(output, hints).await,
            PipelineEvent::ToolError { error } => self.tool_error(error).await,
            PipelineEvent::AgentAction { action } => self.agent_action(action).await,
            PipelineEvent::AgentFinish { finish } => self.agent_finish(finish).await,
            PipelineEvent::Text { text } => self.text(text).await,
        }
    }
}
