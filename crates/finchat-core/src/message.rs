//! The message model shared by history, storage, and the wire.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::ids::MessageId;

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// Composed locally by the user.
    User,
    /// Produced by the bot backend.
    Bot,
}

/// A single chat message as rendered, persisted, and carried on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Immutable identifier, fixed at creation.
    pub id: MessageId,
    /// Visible content. Never empty.
    pub text: String,
    /// Author, fixed at creation.
    pub sender: Sender,
    /// RFC3339. Client-assigned for user messages, server-assigned for bot
    /// messages.
    pub timestamp: String,
    /// True only while a user message awaits transmission because the
    /// connection was down when it was composed.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub pending: bool,
}

impl Message {
    /// Create a user message stamped with the current time.
    pub fn user(text: impl Into<String>, pending: bool) -> Self {
        Self {
            id: MessageId::generate(),
            text: text.into(),
            sender: Sender::User,
            timestamp: now_timestamp(),
            pending,
        }
    }

    /// Check the schema invariants: non-empty id and text, parseable
    /// timestamp, and the pending flag reserved for user messages.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.id.as_str().is_empty() {
            return Err(CoreError::EmptyId);
        }
        if self.text.is_empty() {
            return Err(CoreError::EmptyText);
        }
        if chrono::DateTime::parse_from_rfc3339(&self.timestamp).is_err() {
            return Err(CoreError::InvalidTimestamp(self.timestamp.clone()));
        }
        if self.pending && self.sender != Sender::User {
            return Err(CoreError::PendingBotMessage);
        }
        Ok(())
    }
}

/// Current instant as an RFC3339 UTC string with millisecond precision.
pub fn now_timestamp() -> String {
    chrono::Utc::now()
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
