//! Finchat Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - Network/WebSocket
//! - Storage
//! - Runtime specifics
//!
//! All types here represent the message model and wire protocol shared by
//! the client components.

pub mod error;
pub mod ids;
pub mod message;
pub mod protocol;

// Re-export commonly used types
pub use error::CoreError;
pub use ids::MessageId;
pub use message::{now_timestamp, Message, Sender};
pub use protocol::{ClientEvent, LoginRequest, LoginResponse, ServerEvent};
