#![allow(dead_code)]

use chain_bridge::{BridgeConfig, Serialized, SinkEvent};
use serde_json::{json, Map, Value};
use tokio::sync::mpsc::UnboundedReceiver;

pub fn drain(rx: &mut UnboundedReceiver<SinkEvent>) -> Vec<SinkEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Id-free rendering of a sink event so runs can be compared.
pub fn describe(event: &SinkEvent) -> String {
    match event {
        SinkEvent::MessageSent { message, .. } => format!(
            "send {}@{} {:?} prompt={:?}",
            message.author, message.indent, message.content, message.prompt
        ),
        SinkEvent::StreamOpened { message, .. } => format!(
            "open {}@{} prompt={:?}",
            message.author, message.indent, message.prompt
        ),
        SinkEvent::Token { token, .. } => format!("token {token:?}"),
        SinkEvent::StreamSent { .. } => "stream_sent".to_string(),
        SinkEvent::StreamDiscarded { .. } => "stream_discarded".to_string(),
        SinkEvent::ErrorSent {
            author, content, ..
        } => format!("error {author} {content:?}"),
        SinkEvent::TokenCountUpdated { total } => format!("tokens {total}"),
    }
}

pub fn describe_all(events: &[SinkEvent]) -> Vec<String> {
    events.iter().map(describe).collect()
}

pub fn chain(name: &str) -> Serialized {
    Serialized::from_id(["langchain", "chains", name])
}

pub fn chat_params() -> Value {
    json!({"_type": "chat", "model_name": "gpt-3.5-turbo", "stop": null})
}

pub fn outputs(key: &str, value: &str) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(key.to_string(), Value::String(value.to_string()));
    map
}

pub fn final_answer_config() -> BridgeConfig {
    BridgeConfig::default().with_stream_final_answer(true)
}
