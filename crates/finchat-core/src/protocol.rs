//! Wire protocol DTOs.
//!
//! WebSocket frames carry a JSON envelope `{ "type": ..., "payload": ... }`.
//! The HTTP DTOs cover the login exchange that issues the connection token.

use serde::{Deserialize, Serialize};

use crate::message::Message;

/// Client -> server events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientEvent {
    /// User-composed text for the bot.
    #[serde(rename = "user-message")]
    UserMessage { text: String },
}

/// Server -> client events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerEvent {
    /// A reply from the bot.
    #[serde(rename = "bot-message")]
    BotMessage(Message),
    /// Instruction to wipe the local history.
    #[serde(rename = "clear-chat")]
    ClearChat,
}

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub password: String,
}

/// Response of `POST /auth/login`. The token is present only on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}
