//! chain-bridge - Pipeline lifecycle to chat message bridge
//!
//! Observes nested model, tool and chain calls and turns their start, token,
//! end and error notifications into ordered message operations on a
//! [`MessageSink`]: placeholders for new frames, streamed messages, a
//! separate final answer stream, and error messages.

pub mod config;
pub mod detector;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod prompts;
pub mod settings;
pub mod sink;
pub mod state;
pub mod stream;
pub mod tracker;

pub use config::BridgeConfig;
pub use detector::FinalAnswerDetector;
pub use dispatcher::{AsyncDispatcher, BlockingDispatcher};
pub use error::{BridgeError, ConfigError, SettingsError, SinkError};
pub use events::{
    AgentAction, AgentFinish, ChatMessage, LlmResult, PipelineEvent, PrefixHints, Serialized,
    StageError,
};
pub use prompts::{PendingPrompt, PromptRegister};
pub use settings::{extract_settings, LlmSettings, ProviderKind};
pub use sink::{
    ChannelSink, MessageSink, OutgoingMessage, SentMessage, SinkCommand, SinkEvent, StreamId,
};
pub use state::BridgeState;
pub use stream::{StreamController, StreamState};
pub use tracker::CallSequence;
