//! Lifecycle notifications emitted by the orchestration pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identity of the component a stage belongs to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Serialized {
    /// Path-like identifier, e.g. `["langchain", "chains", "llm", "LLMChain"]`.
    #[serde(default)]
    pub id: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Serialized {
    pub fn from_id<I, T>(id: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            id: id.into_iter().map(Into::into).collect(),
            name: None,
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: Vec::new(),
            name: Some(name.into()),
        }
    }

    /// Frame name of a composite call: the last id segment.
    pub fn chain_name(&self) -> &str {
        self.id
            .last()
            .map(String::as_str)
            .or(self.name.as_deref())
            .unwrap_or_default()
    }

    /// Frame name of a tool call.
    pub fn tool_name(&self) -> &str {
        self.name
            .as_deref()
            .or_else(|| self.id.last().map(String::as_str))
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmResult {
    #[serde(default)]
    pub generations: Vec<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_output: Option<Value>,
}

impl LlmResult {
    /// `llm_output.token_usage.total_tokens`, when the provider reported it.
    pub fn total_tokens(&self) -> Option<u64> {
        self.llm_output
            .as_ref()?
            .get("token_usage")?
            .get("total_tokens")?
            .as_u64()
    }
}

/// Error carried by a stage error notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageError {
    /// The run was cancelled from outside. Whoever cancelled it owns the
    /// cleanup.
    Interrupted,
    Failed { message: String },
}

impl StageError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupted => f.write_str("Interrupted"),
            Self::Failed { message } => f.write_str(message),
        }
    }
}

/// Prefixes an agent uses around a tool observation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrefixHints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_prefix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentAction {
    pub tool: String,
    #[serde(default)]
    pub tool_input: Value,
    #[serde(default)]
    pub log: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentFinish {
    #[serde(default)]
    pub return_values: Map<String, Value>,
    #[serde(default)]
    pub log: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    ModelStart {
        #[serde(default)]
        serialized: Serialized,
        #[serde(default)]
        prompts: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        invocation_params: Option<Value>,
    },
    ChatModelStart {
        #[serde(default)]
        serialized: Serialized,
        messages: Vec<Vec<ChatMessage>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        invocation_params: Option<Value>,
    },
    ModelToken {
        token: String,
    },
    ModelEnd {
        #[serde(default)]
        response: LlmResult,
    },
    ModelError {
        error: StageError,
    },
    ChainStart {
        serialized: Serialized,
        #[serde(default)]
        inputs: Value,
    },
    ChainEnd {
        #[serde(default)]
        outputs: Map<String, Value>,
    },
    ChainError {
        error: StageError,
    },
    ToolStart {
        serialized: Serialized,
        #[serde(default)]
        input: String,
    },
    ToolEnd {
        output: String,
        #[serde(flatten)]
        hints: PrefixHints,
    },
    ToolError {
        error: StageError,
    },
    AgentAction {
        action: AgentAction,
    },
    AgentFinish {
        finish: AgentFinish,
    },
    Text {
        text: String,
    },
}

impl PipelineEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ModelStart { .. } => "model_start",
            Self::ChatModelStart { .. } => "chat_model_start",
            Self::ModelToken { .. } => "model_token",
            Self::ModelEnd { .. } => "model_end",
            Self::ModelError { .. } => "model_error",
            Self::ChainStart { .. } => "chain_start",
            Self::ChainEnd { .. } => "chain_end",
            Self::ChainError { .. } => "chain_error",
            Self::ToolStart { .. } => "tool_start",
            Self::ToolEnd { .. } => "tool_end",
            Self::ToolError { .. } => "tool_error",
            Self::AgentAction { .. } => "agent_action",
            Self::AgentFinish { .. } => "agent_finish",
            Self::Text { .. } => "text",
        }
    }
}
