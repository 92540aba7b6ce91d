//! Wire Types
//!
//! JSON payloads exchanged with WebSocket clients and between backends.
//!
//! # Client Frames
//!
//! - `InboundFrame` - `{"message": "..."}` sent by a connected client
//! - `OutboundPush` - `{"message": "...", "from_id": 1}` pushed to a recipient
//! - `Ack` - `{"status": "ok"}` or `{"status": "not_sent"}` written back to the
//!   sender after each inbound frame
//!
//! # Backend Frames
//!
//! - `MessageRedirect` - body of `POST /internal/redirect`

use serde::{Deserialize, Serialize};

use crate::shared::error::SharedError;

/// Stable user identifier issued by the account collaborator.
pub type UserId = i64;

/// Text frame sent by a client over its WebSocket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundFrame {
    pub message: String,
}

impl InboundFrame {
    /// Decode a raw text frame.
    ///
    /// Malformed frames are reported as `SharedError::SerializationError`;
    /// callers skip them rather than ending the session.
    pub fn decode(raw: &str) -> Result<Self, SharedError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// A message pushed to the recipient's socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundPush {
    pub message: String,
    /// Sender of the message. Absent when the push arrived through a redirect
    /// from a backend that did not tag it.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub from_id: Option<UserId>,
}

impl OutboundPush {
    pub fn new(message: impl Into<String>, from_id: Option<UserId>) -> Self {
        Self {
            message: message.into(),
            from_id,
        }
    }

    pub fn encode(&self) -> Result<String, SharedError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Persistence outcome reported to the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckStatus {
    Ok,
    NotSent,
}

/// Acknowledgment frame written after each inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub status: AckStatus,
}

impl Ack {
    pub const fn ok() -> Self {
        Self {
            status: AckStatus::Ok,
        }
    }

    pub const fn not_sent() -> Self {
        Self {
            status: AckStatus::NotSent,
        }
    }

    pub fn encode(&self) -> String {
        match self.status {
            AckStatus::Ok => r#"{"status":"ok"}"#.to_string(),
            AckStatus::NotSent => r#"{"status":"not_sent"}"#.to_string(),
        }
    }
}

/// Envelope forwarded to the backend that owns the recipient's connection.
///
/// No idempotency token is carried: redirects are at-most-once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRedirect {
    pub message: String,
    pub to_user_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub from_user_id: Option<UserId>,
}

impl MessageRedirect {
    pub fn new(message: impl Into<String>, to_user_id: UserId, from_user_id: Option<UserId>) -> Self {
        Self {
            message: message.into(),
            to_user_id,
            from_user_id,
        }
    }

    /// Push delivered to the recipient once the redirect lands.
    pub fn into_push(self) -> OutboundPush {
        OutboundPush::new(self.message, self.from_user_id)
    }
}
