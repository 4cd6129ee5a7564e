use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::runtime::Handle;

use crate::config::BridgeConfig;
use crate::error::Result;
use crate::events::{
    AgentAction, AgentFinish, ChatMessage, LlmResult, PipelineEvent, PrefixHints, Serialized,
    StageError,
};
use crate::sink::{deliver, MessageSink};
use crate::state::{BridgeState, Commands};

/// Dispatcher for synchronous call sites.
///
/// Sink operations are driven to completion on `runtime` before each call
/// returns. Calling it from inside an async context panics, as
/// [`Handle::block_on`] does.
///
/// `Handle::block_on` does not drive the IO and timer drivers of a
/// `current_thread` runtime. A sink that does real IO needs a multi-thread
/// runtime, or another thread parked in `Runtime::block_on` for the
/// `current_thread` one.
pub struct BlockingDispatcher<S: MessageSink + ?Sized> {
    state: BridgeState,
    sink: Arc<S>,
    runtime: Handle,
}

impl<S: MessageSink + ?Sized> BlockingDispatcher<S> {
    pub fn new(config: BridgeConfig, sink: Arc<S>, runtime: Handle) -> Self {
        Self::from_state(BridgeState::new(config), sink, runtime)
    }

    pub fn from_state(state: BridgeState, sink: Arc<S>, runtime: Handle) -> Self {
        Self {
            state,
            sink,
            runtime,
        }
    }

    pub fn state(&self) -> &BridgeState {
        &self.state
    }

    pub fn sink(&self) -> &Arc<S> {
        &self.sink
    }

    fn flush(&self, commands: Commands) -> Result<()> {
        for command in commands {
            self.runtime.block_on(deliver(self.sink.as_ref(), command))?;
        }
        Ok(())
    }

    pub fn model_start(&mut self, params: Option<&Value>, prompts: &[String]) -> Result<()> {
        let commands = self.state.on_model_start(params, prompts)?;
        self.flush(commands)
    }

    pub fn chat_model_start(
        &mut self,
        params: Option<&Value>,
        messages: &[Vec<ChatMessage>],
    ) -> Result<()> {
        let commands = self.state.on_chat_model_start(params, messages)?;
        self.flush(commands)
    }

    pub fn model_token(&mut self, token: &str) -> Result<()> {
        let commands = self.state.on_model_token(token);
        self.flush(commands)
    }

    pub fn model_end(&mut self, result: &LlmResult) -> Result<()> {
        let commands = self.state.on_model_end(result);
        self.flush(commands)
    }

    pub fn model_error(&mut self, error: &StageError) -> Result<()> {
        let commands = self.state.on_model_error(error);
        self.flush(commands)
    }

    pub fn chain_start(&mut self, serialized: &Serialized, _inputs: &Value) -> Result<()> {
        let commands = self.state.on_chain_start(serialized);
        self.flush(commands)
    }

    pub fn chain_end(&mut self, outputs: &Map<String, Value>) -> Result<()> {
        let commands = self.state.on_chain_end(outputs);
        self.flush(commands)
    }

    pub fn chain_error(&mut self, error: &StageError) -> Result<()> {
        let commands = self.state.on_stage_error(error);
        self.flush(commands)
    }

    pub fn tool_start(&mut self, serialized: &Serialized, _input: &str) -> Result<()> {
        let commands = self.state.on_tool_start(serialized);
        self.flush(commands)
    }

    pub fn tool_end(&mut self, output: &str, _hints: &PrefixHints) -> Result<()> {
        let commands = self.state.on_tool_end(output);
        self.flush(commands)
    }

    pub fn tool_error(&mut self, error: &StageError) -> Result<()> {
        let commands = self.state.on_stage_error(error);
        self.flush(commands)
    }

    pub fn agent_action(&mut self, _action: &AgentAction) -> Result<()> {
        Ok(())
    }

    pub fn agent_finish(&mut self, _finish: &AgentFinish) -> Result<()> {
        Ok(())
    }

    pub fn text(&mut self, _text: &str) -> Result<()> {
        Ok(())
    }

    pub fn handle(&mut self, event: &PipelineEvent) -> Result<()> {
        match event {
            PipelineEvent::ModelStart {
                prompts,
                invocation_params,
                ..
            } => self.model_start(invocation_params.as_ref(), prompts),
            PipelineEvent::ChatModelStart {
                messages,
                invocation_params,
                ..
            } => self.chat_model_start(invocation_params.as_ref(), messages),
            PipelineEvent::ModelToken { token } => self.model_token(token),
            PipelineEvent::ModelEnd { response } => self.model_end(response),
            PipelineEvent::ModelError { error } => self.model_error(error),
            PipelineEvent::ChainStart { serialized, inputs } => {
                self.chain_start(serialized, inputs)
            }
            PipelineEvent::ChainEnd { outputs } => self.chain_end(outputs),
            PipelineEvent::ChainError { error } => self.chain_error(error),
            PipelineEvent::ToolStart { serialized, input } => self.tool_start(serialized, input),
            PipelineEvent::ToolEnd { output, hints } => self.tool_end(output, hints),
            PipelineEvent::ToolError { error } => self.tool_error(error),
            PipelineEvent::AgentAction { action } => self.agent_action(action),
            PipelineEvent::AgentFinish { finish } => self.agent_finish(finish),
            PipelineEvent::Text { text } => self.text(text),
        }
    }
}
