//! Normalization of provider invocation parameters.
//!
//! Pipelines hand over an opaque parameter record when a model call starts.
//! Only two shapes are understood: plain completion models and chat models.
//! Anything else is silently ignored.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SettingsError;

const TYPE_KEY: &str = "_type";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Completion,
    Chat,
}

impl ProviderKind {
    fn from_discriminator(value: &str) -> Option<Self> {
        match value {
            "completion" | "openai" => Some(Self::Completion),
            "chat" | "openai-chat" => Some(Self::Chat),
            _ => None,
        }
    }
}

/// Model configuration attached to prompts and messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmSettings {
    pub provider: ProviderKind,
    pub model_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
}

/// Extract [`LlmSettings`] from a provider invocation record.
///
/// Returns `Ok(None)` when no record is given or its `_type` is not a known
/// provider shape. A known shape with a missing key is an error: it means the
/// upstream integration is not the one this bridge was written against.
pub fn extract_settings(params: Option<&Value>) -> Result<Option<LlmSettings>, SettingsError> {
    let Some(Value::Object(params)) = params else {
        return Ok(None);
    };

    let Some(kind) = params
        .get(TYPE_KEY)
        .and_then(Value::as_str)
        .and_then(ProviderKind::from_discriminator)
    else {
        return Ok(None);
    };

    let model_name = required(params, "model_name")
        .and_then(|value| string_value("model_name", value))?;
    let stop = required(params, "stop").and_then(stop_value)?;

    let settings = match kind {
        ProviderKind::Chat => LlmSettings {
            provider: kind,
            model_name,
            stop,
            temperature: None,
            max_tokens: None,
            top_p: None,
            frequency_penalty: None,
            presence_penalty: None,
        },
        ProviderKind::Completion => LlmSettings {
            provider: kind,
            model_name,
            stop,
            temperature: float_value("temperature", required(params, "temperature")?)?,
            max_tokens: int_value("max_tokens", required(params, "max_tokens")?)?,
            top_p: float_value("top_p", required(params, "top_p")?)?,
            frequency_penalty: float_value(
                "frequency_penalty",
                required(params, "frequency_penalty")?,
            )?,
            presence_penalty: float_value(
                "presence_penalty",
                required(params, "presence_penalty")?,
            )?,
        },
    };

    Ok(Some(settings))
}

fn required<'a>(
    params: &'a Map<String, Value>,
    key: &'static str,
) -> Result<&'a Value, SettingsError> {
    params.get(key).ok_or(SettingsError::MissingKey(key))
}

fn invalid(key: &'static str, expected: &str, value: &Value) -> SettingsError {
    SettingsError::InvalidValue {
        key,
        reason: format!("expected {expected}, got {value}"),
    }
}

fn string_value(key: &'static str, value: &Value) -> Result<String, SettingsError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| invalid(key, "a string", value))
}

fn stop_value(value: &Value) -> Result<Option<Vec<String>>, SettingsError> {
    match value {
        Value::Null => Ok(None),
        Value::String(single) => Ok(Some(vec![single.clone()])),
        Value::Array(items) => items
            .iter()
            .map(|item| string_value("stop", item))
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        other => Err(invalid("stop", "a string or a list of strings", other)),
    }
}

fn float_value(key: &'static str, value: &Value) -> Result<Option<f64>, SettingsError> {
    match value {
        Value::Null => Ok(None),
        other => other
            .as_f64()
            .map(Some)
            .ok_or_else(|| invalid(key, "a number", other)),
    }
}

fn int_value(key: &'static str, value: &Value) -> Result<Option<i64>, SettingsError> {
    match value {
        Value::Null => Ok(None),
        other => other
            .as_i64()
            .map(Some)
            .ok_or_else(|| invalid(key, "an integer", other)),
    }
}
