use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::detector::DEFAULT_ANSWER_PREFIX_TOKENS;
use crate::error::ConfigError;

pub const DEFAULT_AUTHOR: &str = "Chatbot";

const ENV_DEFAULT_AUTHOR: &str = "CHAIN_BRIDGE_DEFAULT_AUTHOR";
const ENV_STREAM_FINAL_ANSWER: &str = "CHAIN_BRIDGE_STREAM_FINAL_ANSWER";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Author of messages emitted outside any call frame, and of the final
    /// answer stream.
    pub default_author: String,
    /// Orchestration wrappers that must never show up as a message author.
    pub ignore_list: Vec<String>,
    pub answer_prefix_tokens: Vec<String>,
    /// Ignore surrounding whitespace when matching answer prefix tokens.
    pub strip_tokens: bool,
    pub stream_final_answer: bool,
    /// Also stream the answer prefix tokens into the final answer.
    pub stream_prefix: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            default_author: DEFAULT_AUTHOR.to_string(),
            ignore_list: vec!["AgentExecutor".to_string()],
            answer_prefix_tokens: DEFAULT_ANSWER_PREFIX_TOKENS
                .iter()
                .map(|token| token.to_string())
                .collect(),
            strip_tokens: true,
            stream_final_answer: false,
            stream_prefix: false,
        }
    }
}

fn parse_bool_env(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

impl BridgeConfig {
    /// Load a config file. `.toml` files are parsed as TOML, anything else as
    /// JSON. Missing fields keep their defaults.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        if is_toml {
            Ok(toml::from_str(&content)?)
        } else {
            Ok(serde_json::from_str(&content)?)
        }
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(author) = std::env::var(ENV_DEFAULT_AUTHOR) {
            if !author.trim().is_empty() {
                self.default_author = author;
            }
        }
        if let Ok(value) = std::env::var(ENV_STREAM_FINAL_ANSWER) {
            self.stream_final_answer = parse_bool_env(&value);
        }
    }

    pub fn with_default_author(mut self, author: impl Into<String>) -> Self {
        self.default_author = author.into();
        self
    }

    pub fn with_ignore_list<I, T>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.ignore_list = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_answer_prefix_tokens<I, T>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.answer_prefix_tokens = tokens.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_strip_tokens(mut self, strip: bool) -> Self {
        self.strip_tokens = strip;
        self
    }

    pub fn with_stream_final_answer(mut self, enabled: bool) -> Self {
        self.stream_final_answer = enabled;
        self
    }

    pub fn with_stream_prefix(mut self, enabled: bool) -> Self {
        self.stream_prefix = enabled;
        self
    }

    pub fn is_ignored(&self, author: &str) -> bool {
        self.ignore_list.iter().any(|name| name == author)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_agent_conventions() {
        let config = BridgeConfig::default();
        assert_eq!(config.default_author, "Chatbot");
        assert!(config.is_ignored("AgentExecutor"));
        assert!(!config.is_ignored("LLMChain"));
        assert_eq!(config.answer_prefix_tokens, vec!["Final", "Answer", ":"]);
        assert!(config.strip_tokens);
        assert!(!config.stream_final_answer);
    }

    #[test]
    fn loads_partial_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "default_author = \"Assistant\"\nstream_final_answer = true\nanswer_prefix_tokens = [\"Answer\", \":\"]"
        )
        .unwrap();

        let config = BridgeConfig::from_path(file.path()).unwrap();
        assert_eq!(config.default_author, "Assistant");
        assert!(config.stream_final_answer);
        assert_eq!(config.answer_prefix_tokens, vec!["Answer", ":"]);
        assert_eq!(config.ignore_list, vec!["AgentExecutor"]);
    }

    #[test]
    fn loads_json_by_default() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"ignore_list": [], "strip_tokens": false}}"#).unwrap();

        let config = BridgeConfig::from_path(file.path()).unwrap();
        assert!(config.ignore_list.is_empty());
        assert!(!config.strip_tokens);
        assert_eq!(config.default_author, "Chatbot");
    }

    #[test]
    fn invalid_file_is_reported() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "strip_tokens = \"maybe\"").unwrap();

        assert!(matches!(
            BridgeConfig::from_path(file.path()),
            Err(ConfigError::Toml(_))
        ));
        assert!(matches!(
            BridgeConfig::from_path("/nonexistent/bridge.toml"),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn env_overrides_replace_file_values() {
        std::env::set_var(ENV_DEFAULT_AUTHOR, "Assistant");
        std::env::set_var(ENV_STREAM_FINAL_ANSWER, "yes");
        let mut config = BridgeConfig::default().with_stream_prefix(true);
        config.apply_env_overrides();

        assert_eq!(config.default_author, "Assistant");
        assert!(config.stream_final_answer);
        assert!(config.stream_prefix);

        std::env::set_var(ENV_DEFAULT_AUTHOR, "  ");
        std::env::set_var(ENV_STREAM_FINAL_ANSWER, "off");
        let mut config = BridgeConfig::default().with_stream_final_answer(true);
        config.apply_env_overrides();

        assert_eq!(config.default_author, "Chatbot");
        assert!(!config.stream_final_answer);

        std::env::remove_var(ENV_DEFAULT_AUTHOR);
        std::env::remove_var(ENV_STREAM_FINAL_ANSWER);
    }

    #[test]
    fn bool_env_values() {
        assert!(parse_bool_env("TRUE"));
        assert!(parse_bool_env(" on "));
        assert!(!parse_bool_env("0"));
        assert!(!parse_bool_env("nope"));
    }
}
