//! Event handling shared by both dispatcher variants.
//!
//! Every handler mutates the session state and returns the sink commands the
//! event produced, in delivery order. Nothing here touches the sink.

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::config::BridgeConfig;
use crate::detector::FinalAnswerDetector;
use crate::error::SettingsError;
use crate::events::{ChatMessage, LlmResult, Serialized, StageError};
use crate::prompts::{PendingPrompt, PromptRegister};
use crate::settings::extract_settings;
use crate::sink::{OutgoingMessage, SinkCommand};
use crate::stream::{Routed, StreamController, StreamState};
use crate::tracker::CallSequence;

pub type Commands = Vec<SinkCommand>;

#[derive(Debug, Clone)]
pub struct BridgeState {
    session_id: String,
    config: BridgeConfig,
    sequence: CallSequence,
    prompts: PromptRegister,
    detector: FinalAnswerDetector,
    streams: StreamController,
}

impl BridgeState {
    pub fn new(config: BridgeConfig) -> Self {
        Self::with_session_id(config, Uuid::new_v4().to_string())
    }

    pub fn with_session_id(config: BridgeConfig, session_id: impl Into<String>) -> Self {
        let detector =
            FinalAnswerDetector::new(config.answer_prefix_tokens.clone(), config.strip_tokens);
        Self {
            session_id: session_id.into(),
            sequence: CallSequence::new(config.default_author.clone()),
            prompts: PromptRegister::new(),
            detector,
            streams: StreamController::new(),
            config,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn depth(&self) -> usize {
        self.sequence.depth()
    }

    pub fn frames(&self) -> &[String] {
        self.sequence.frames()
    }

    pub fn pending_prompts(&self) -> usize {
        self.prompts.pending()
    }

    pub fn stream_state(&self) -> StreamState {
        self.streams.state()
    }

    pub fn answer_reached(&self) -> bool {
        self.detector.is_reached()
    }

    pub fn has_streamed_final_answer(&self) -> bool {
        self.streams.has_streamed_final_answer()
    }

    // ========== Model events ==========

    pub fn on_model_start(
        &mut self,
        params: Option<&Value>,
        prompts: &[String],
    ) -> Result<Commands, SettingsError> {
        let settings = extract_settings(params)?;
        let prompt = prompts.first().cloned().unwrap_or_default();
        self.prompts.add(prompt, settings);
        Ok(Commands::new())
    }

    pub fn on_chat_model_start(
        &mut self,
        params: Option<&Value>,
        messages: &[Vec<ChatMessage>],
    ) -> Result<Commands, SettingsError> {
        let settings = extract_settings(params)?;
        let prompt = messages
            .first()
            .map(|conversation| {
                conversation
                    .iter()
                    .map(|message| message.content.as_str())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default();
        self.prompts.add(prompt, settings);
        Ok(Commands::new())
    }

    pub fn on_model_token(&mut self, token: &str) -> Commands {
        let mut commands = Commands::new();

        if self.streams.main().is_none() {
            self.open_main_stream(&mut commands);
        }

        let routed = self.streams.route();
        match routed {
            Routed::Main(stream) | Routed::Final(stream) => {
                commands.push(SinkCommand::AppendToken {
                    stream,
                    token: token.to_string(),
                });
            }
            Routed::Dropped => {}
        }

        if !self.config.stream_final_answer || matches!(routed, Routed::Final(_)) {
            return commands;
        }

        let was_reached = self.detector.is_reached();
        if self.detector.observe(token) && !was_reached {
            self.open_final_stream(&mut commands);
        }

        commands
    }

    pub fn on_model_end(&mut self, result: &LlmResult) -> Commands {
        let mut commands = Commands::new();

        self.prompts.pop_to_last();

        if let Some(total) = result.total_tokens() {
            commands.push(SinkCommand::UpdateTokenCount { total });
        }

        if let Some(stream) = self.streams.take_final() {
            log::debug!("[{}] final answer stream {} sent", self.session_id, stream);
            commands.push(SinkCommand::Finalize { stream });
        }

        commands
    }

    pub fn on_model_error(&mut self, error: &StageError) -> Commands {
        log::debug!("[{}] model error left to the enclosing call: {}", self.session_id, error);
        Commands::new()
    }

    // ========== Chain and tool events ==========

    pub fn on_chain_start(&mut self, serialized: &Serialized) -> Commands {
        self.start_frame(serialized.chain_name())
    }

    pub fn on_tool_start(&mut self, serialized: &Serialized) -> Commands {
        self.start_frame(serialized.tool_name())
    }

    pub fn on_chain_end(&mut self, outputs: &Map<String, Value>) -> Commands {
        let mut commands = Commands::new();

        match outputs.iter().next() {
            Some((key, value)) if !key.is_empty() => {
                let content = match value {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                let prompt = self.take_last_prompt();
                self.emit_message(content, prompt, &mut commands);
            }
            _ => self.finalize_main(&mut commands),
        }

        self.end_frame();
        commands
    }

    pub fn on_tool_end(&mut self, output: &str) -> Commands {
        let mut commands = Commands::new();
        let prompt = self.take_last_prompt();
        self.emit_message(output.to_string(), prompt, &mut commands);
        self.end_frame();
        commands
    }

    /// Shared by chain and tool errors.
    pub fn on_stage_error(&mut self, error: &StageError) -> Commands {
        let mut commands = Commands::new();

        if error.is_interrupted() {
            log::debug!(
                "[{}] stage interrupted, leaving frame {:?} in place",
                self.session_id,
                self.sequence.frames().last()
            );
            return commands;
        }

        self.emit_error(error.to_string(), &mut commands);
        self.end_frame();
        commands
    }

    // ========== Internals ==========

    fn start_frame(&mut self, name: &str) -> Commands {
        let mut commands = Commands::new();
        self.sequence.push(name);
        log::debug!(
            "[{}] frame {} started at depth {}",
            self.session_id,
            name,
            self.sequence.depth()
        );
        // The empty placeholder lets the UI anchor the frame's details.
        self.emit_message(String::new(), None, &mut commands);
        commands
    }

    fn end_frame(&mut self) {
        if let Some(name) = self.sequence.pop() {
            log::debug!("[{}] frame {} ended", self.session_id, name);
        }
    }

    fn take_last_prompt(&mut self) -> Option<PendingPrompt> {
        self.prompts.pop_to_last();
        self.prompts.consume_last()
    }

    fn open_main_stream(&mut self, commands: &mut Commands) {
        let (author, indent) = self.sequence.current_author_and_depth();
        if self.config.is_ignored(author) {
            log::debug!(
                "[{}] dropping stream authored by ignored frame {}",
                self.session_id,
                author
            );
            return;
        }
        let author = author.to_string();

        let pending = self.take_last_prompt();
        let stream = self.streams.open_main();
        if self.streams.final_answer().is_none() {
            self.detector.reset();
        }

        log::debug!(
            "[{}] main stream {} opened for {} at indent {}",
            self.session_id,
            stream,
            author,
            indent
        );
        commands.push(SinkCommand::OpenStream {
            stream,
            message: build_message(author, indent, String::new(), pending),
        });
    }

    fn open_final_stream(&mut self, commands: &mut Commands) {
        let stream = self.streams.open_final();
        log::debug!(
            "[{}] final answer reached, stream {} opened",
            self.session_id,
            stream
        );
        commands.push(SinkCommand::OpenStream {
            stream,
            message: build_message(self.config.default_author.clone(), 0, String::new(), None),
        });

        if self.config.stream_prefix {
            commands.extend(
                self.detector
                    .window()
                    .filter(|token| !token.is_empty())
                    .map(|token| SinkCommand::AppendToken {
                        stream,
                        token: token.to_string(),
                    }),
            );
        }
    }

    fn emit_message(
        &mut self,
        content: String,
        prompt: Option<PendingPrompt>,
        commands: &mut Commands,
    ) {
        let (author, indent) = self.sequence.current_author_and_depth();
        if self.config.is_ignored(author) {
            return;
        }

        if self.streams.main().is_some() {
            self.finalize_main(commands);
        } else {
            let message = build_message(author.to_string(), indent, content, prompt);
            commands.push(SinkCommand::Send(message));
        }
    }

    fn finalize_main(&mut self, commands: &mut Commands) {
        if let Some(stream) = self.streams.take_main() {
            log::debug!("[{}] main stream {} sent", self.session_id, stream);
            commands.push(SinkCommand::Finalize { stream });
        }
    }

    fn emit_error(&mut self, content: String, commands: &mut Commands) {
        let (author, _) = self.sequence.current_author_and_depth();
        if !self.config.is_ignored(author) {
            log::warn!("[{}] stage {} failed: {}", self.session_id, author, content);
            commands.push(SinkCommand::SendError {
                author: author.to_string(),
                content,
            });
        }

        if let Some(stream) = self.streams.take_main() {
            log::debug!("[{}] main stream {} abandoned after error", self.session_id, stream);
            commands.push(SinkCommand::Discard { stream });
        }
    }
}

fn build_message(
    author: String,
    indent: usize,
    content: String,
    pending: Option<PendingPrompt>,
) -> OutgoingMessage {
    let (prompt, settings) = match pending {
        Some(pending) => (Some(pending.prompt), pending.settings),
        None => (None, None),
    };
    OutgoingMessage {
        author,
        indent,
        content,
        prompt,
        settings,
    }
}
