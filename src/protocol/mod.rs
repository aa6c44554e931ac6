//! Wire protocol message types.
//!
//! This module defines the message format exchanged with the messaging
//! backend over the persistent channel.
//!
//! # Protocol Overview
//!
//! Every frame is a JSON envelope:
//!
//! ```json
//! { "event": "new-message", "data": { ... } }
//! ```
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | [`ServerEvent`] | Backend → Client | Lifecycle, acks, conversation events, pong |
//! | [`ClientRequest`] | Client → Backend | Subscribe, unsubscribe, mark read, ping |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `event` | Inbound envelope parsing into [`ServerEvent`] |
//! | `request` | Outbound [`ClientRequest`] serialization |

// ============================================================================
// Submodules
// ============================================================================

/// Inbound event types.
pub mod event;

/// Outbound request types.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use event::{Envelope, ServerEvent};
pub use request::ClientRequest;
