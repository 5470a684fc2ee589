//! # Wire DTOs
//!
//! JSON shapes of the public API. Field names are camelCase.

use chrono::{DateTime, Utc};
use domains::{
    Channels, InboxEntry, Message, MessageType, ReceiverMethod, SendMessage, SendOutcome,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub receiver_identifier: String,
    pub receiver_method: ReceiverMethod,
    pub message_type: MessageType,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub is_anonymous: bool,
    #[serde(default)]
    pub channels: Channels,
}

impl From<SendMessageRequest> for SendMessage {
    fn from(req: SendMessageRequest) -> Self {
        SendMessage {
            receiver_identifier: req.receiver_identifier,
            receiver_method: req.receiver_method,
            message_type: req.message_type,
            title: req.title,
            content: req.content,
            is_anonymous: req.is_anonymous,
            channels: req.channels,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentMessageData {
    pub id: Uuid,
    pub receiver: String,
    pub receiver_found: bool,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub title: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    pub success: bool,
    pub is_match: bool,
    pub message: String,
    pub data: SentMessageData,
}

impl From<SendOutcome> for SendMessageResponse {
    fn from(outcome: SendOutcome) -> Self {
        let message = if outcome.is_match {
            "It's a match! You both sent each other the same kind of message."
        } else {
            "Message sent successfully"
        };
        Self {
            success: true,
            is_match: outcome.is_match,
            message: message.to_string(),
            data: SentMessageData {
                id: outcome.message.id,
                receiver: outcome.message.receiver_identifier,
                receiver_found: outcome.receiver_found,
                message_type: outcome.message.message_type,
                title: outcome.message.title,
                sent_at: outcome.message.created_at,
            },
        }
    }
}

/// A row of the sender's own history. The resolved receiver id is not exposed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentMessageView {
    pub id: Uuid,
    pub receiver_identifier: String,
    pub receiver_method: ReceiverMethod,
    pub receiver_found: bool,
    pub message_type: MessageType,
    pub title: String,
    pub content: String,
    pub is_anonymous: bool,
    pub channels: Channels,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Message> for SentMessageView {
    fn from(m: Message) -> Self {
        Self {
            receiver_found: m.receiver_found(),
            id: m.id,
            receiver_identifier: m.receiver_identifier,
            receiver_method: m.receiver_method,
            message_type: m.message_type,
            title: m.title,
            content: m.content,
            is_anonymous: m.is_anonymous,
            channels: m.channels,
            read: m.read,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ListResponse<T> {
    pub success: bool,
    pub count: usize,
    pub messages: Vec<T>,
}

impl<T> ListResponse<T> {
    pub fn new(messages: Vec<T>) -> Self {
        Self { success: true, count: messages.len(), messages }
    }
}

pub type InboxResponse = ListResponse<InboxEntry>;
pub type SentResponse = ListResponse<SentMessageView>;

#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub content: String,
}

/// `{success, message}`, used for acknowledgements and errors alike.
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    pub message: String,
}

impl StatusResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into() }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into() }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub success: bool,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}
