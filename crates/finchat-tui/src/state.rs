//! UI state snapshot for rendering.

use finchat_core::Message;

/// Snapshot of data for rendering (no async, no locks).
#[derive(Default)]
pub struct UiState {
    /// Conversation history in insertion order.
    pub messages: Vec<Message>,

    /// Input buffer under composition.
    pub input: String,

    /// Whether the socket is live.
    pub connected: bool,

    /// Transient status line (reply outstanding, connect errors).
    pub status: Option<String>,
}
