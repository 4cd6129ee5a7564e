use std::path::PathBuf;

use thiserror::Error;

use crate::sink::StreamId;

/// Failures while normalizing provider invocation parameters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SettingsError {
    #[error("Missing invocation parameter: {0}")]
    MissingKey(&'static str),

    #[error("Invalid value for invocation parameter {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

/// Failures reported by a message sink.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SinkError {
    #[error("Message sink is closed")]
    Closed,

    #[error("Unknown stream: {0}")]
    UnknownStream(StreamId),

    #[error("Transport error: {0}")]
    Transport(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
