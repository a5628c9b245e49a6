//! Core domain errors.

use thiserror::Error;

/// Schema violations in the message model.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// Message id is empty.
    #[error("message id is empty")]
    EmptyId,

    /// Message text is empty.
    #[error("message text is empty")]
    EmptyText,

    /// Timestamp is not valid RFC3339.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Only user messages may carry the pending flag.
    #[error("bot message marked pending")]
    PendingBotMessage,
}
