//! Error types for the client runtime.

use thiserror::Error;

/// Errors surfaced by the client runtime.
///
/// None of these are fatal to a running session: connection errors feed the
/// retry loop, storage errors degrade to an empty or unsaved history, and
/// auth errors are shown inline so the user can resubmit.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Login rejected by the auth endpoint.
    #[error("login rejected")]
    AuthRejected,

    /// HTTP transport failure while talking to the auth endpoint.
    #[error("auth request failed: {0}")]
    AuthTransport(#[from] reqwest::Error),

    /// WebSocket handshake or transport failure.
    #[error("websocket error: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),

    /// A send was attempted without a live connection.
    #[error("not connected")]
    NotConnected,

    /// A message failed schema validation.
    #[error("invalid message: {0}")]
    InvalidMessage(#[from] finchat_core::CoreError),

    /// Storage I/O failure.
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Storage (de)serialization failure.
    #[error("storage format error: {0}")]
    StorageFormat(#[from] serde_json::Error),
}
