//! Finchat client runtime.
//!
//! Everything between the presentation layer and the backend: the WebSocket
//! connection manager, the message reconciler (visible history plus the
//! offline queue), the on-disk message store, and the HTTP auth client.
//!
//! The reconciler is the single source of truth for what the user sees and
//! what has or hasn't reached the backend. The connection manager owns the
//! single logical socket and republishes its lifecycle as events. The
//! session loop wires the two together on one task.

pub mod auth;
pub mod config;
pub mod connection;
pub mod error;
pub mod reconciler;
pub mod session;
pub mod store;

#[cfg(test)]
mod testutil;

// Re-export main types
pub use auth::{AuthClient, TokenCache};
pub use config::Config;
pub use connection::{Connection, ConnectionEvent};
pub use error::ClientError;
pub use reconciler::{ComposeOutcome, Reconciler, Transport};
pub use session::{ChatSession, SessionCommand, SessionUpdate};
pub use store::MessageStore;
