//! Message sink interface.
//!
//! The bridge never renders anything itself. Every observable effect is a
//! [`SinkCommand`] delivered, in order, to a [`MessageSink`].

use std::fmt;

use async_trait::async_trait;
use dashmap::DashSet;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::SinkError;
use crate::settings::LlmSettings;

/// Identifies an in-progress streamed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamId(Uuid);

impl StreamId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for StreamId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub author: String,
    pub indent: usize,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<LlmSettings>,
}

/// Record returned by the sink for a message that has been sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentMessage {
    pub id: Uuid,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkCommand {
    Send(OutgoingMessage),
    OpenStream {
        stream: StreamId,
        message: OutgoingMessage,
    },
    AppendToken {
        stream: StreamId,
        token: String,
    },
    Finalize {
        stream: StreamId,
    },
    /// Drop an unfinished stream without sending it.
    Discard {
        stream: StreamId,
    },
    SendError {
        author: String,
        content: String,
    },
    UpdateTokenCount {
        total: u64,
    },
}

#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Send a complete message.
    async fn create_and_send(&self, message: OutgoingMessage) -> Result<SentMessage, SinkError>;

    /// Start a message whose content will arrive token by token.
    async fn open_stream(&self, stream: StreamId, message: OutgoingMessage)
        -> Result<(), SinkError>;

    async fn append_token(&self, stream: StreamId, token: &str) -> Result<(), SinkError>;

    /// Send a streamed message. No tokens may be appended afterwards.
    async fn finalize(&self, stream: StreamId) -> Result<SentMessage, SinkError>;

    /// Abandon a stream that will never be finalized, e.g. after its call
    /// failed.
    async fn discard_stream(&self, stream: StreamId) -> Result<(), SinkError>;

    async fn send_error(&self, author: &str, content: &str) -> Result<SentMessage, SinkError>;

    async fn update_token_count(&self, total: u64) -> Result<(), SinkError>;
}

/// Deliver one command to a sink.
pub async fn deliver<S>(sink: &S, command: SinkCommand) -> Result<(), SinkError>
where
    S: MessageSink + ?Sized,
{
    match command {
        SinkCommand::Send(message) => {
            let sent = sink.create_and_send(message).await?;
            log::trace!("message {} sent", sent.id);
        }
        SinkCommand::OpenStream { stream, message } => sink.open_stream(stream, message).await?,
        SinkCommand::AppendToken { stream, token } => sink.append_token(stream, &token).await?,
        SinkCommand::Finalize { stream } => {
            let sent = sink.finalize(stream).await?;
            log::trace!("stream {} sent as message {}", stream, sent.id);
        }
        SinkCommand::Discard { stream } => sink.discard_stream(stream).await?,
        SinkCommand::SendError { author, content } => {
            let sent = sink.send_error(&author, &content).await?;
            log::trace!("error message {} sent", sent.id);
        }
        SinkCommand::UpdateTokenCount { total } => sink.update_token_count(total).await?,
    }
    Ok(())
}

/// What a [`ChannelSink`] forwards to its receiver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkEvent {
    MessageSent {
        id: Uuid,
        message: OutgoingMessage,
    },
    StreamOpened {
        stream: StreamId,
        message: OutgoingMessage,
    },
    Token {
        stream: StreamId,
        token: String,
    },
    StreamSent {
        stream: StreamId,
        id: Uuid,
    },
    StreamDiscarded {
        stream: StreamId,
    },
    ErrorSent {
        id: Uuid,
        author: String,
        content: String,
    },
    TokenCountUpdated {
        total: u64,
    },
}

/// Sink that forwards every operation over an unbounded channel, for UI
/// layers running on another task.
#[derive(Debug)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SinkEvent>,
    open_streams: DashSet<StreamId>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SinkEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = Self {
            tx,
            open_streams: DashSet::new(),
        };
        (sink, rx)
    }

    pub fn open_stream_count(&self) -> usize {
        self.open_streams.len()
    }

    fn forward(&self, event: SinkEvent) -> Result<(), SinkError> {
        self.tx.send(event).map_err(|_| SinkError::Closed)
    }
}

#[async_trait]
impl MessageSink for ChannelSink {
    async fn create_and_send(&self, message: OutgoingMessage) -> Result<SentMessage, SinkError> {
        let id = Uuid::new_v4();
        self.forward(SinkEvent::MessageSent { id, message })?;
        Ok(SentMessage { id })
    }

    async fn open_stream(
        &self,
        stream: StreamId,
        message: OutgoingMessage,
    ) -> Result<(), SinkError> {
        self.forward(SinkEvent::StreamOpened { stream, message })?;
        self.open_streams.insert(stream);
        Ok(())
    }

    async fn append_token(&self, stream: StreamId, token: &str) -> Result<(), SinkError> {
        if !self.open_streams.contains(&stream) {
            return Err(SinkError::UnknownStream(stream));
        }
        self.forward(SinkEvent::Token {
            stream,
            token: token.to_string(),
        })
    }

    async fn finalize(&self, stream: StreamId) -> Result<SentMessage, SinkError> {
        if self.open_streams.remove(&stream).is_none() {
            return Err(SinkError::UnknownStream(stream));
        }
        let id = stream.as_uuid();
        self.forward(SinkEvent::StreamSent { stream, id })?;
        Ok(SentMessage { id })
    }

    async fn discard_stream(&self, stream: StreamId) -> Result<(), SinkError> {
        if self.open_streams.remove(&stream).is_none() {
            return Err(SinkError::UnknownStream(stream));
        }
        self.forward(SinkEvent::StreamDiscarded { stream })
    }

    async fn send_error(&self, author: &str, content: &str) -> Result<SentMessage, SinkError> {
        let id = Uuid::new_v4();
        self.forward(SinkEvent::ErrorSent {
            id,
            author: author.to_string(),
            content: content.to_string(),
        })?;
        Ok(SentMessage { id })
    }

    async fn update_token_count(&self, total: u64) -> Result<(), SinkError> {
        self.forward(SinkEvent::TokenCountUpdated { total })
    }
}
