//! Channel transport layer.
//!
//! This module abstracts the persistent bidirectional channel between the
//! host application and the messaging backend.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐                              ┌─────────────────┐
//! │  RealtimeClient  │        WebSocket             │  Messaging      │
//! │                  │◄────────────────────────────►│  backend        │
//! │  Transport::open │    wss://host/?tenantId=..   │                 │
//! │  → Channel       │                              │                 │
//! └──────────────────┘                              └─────────────────┘
//! ```
//!
//! # Channel Lifecycle
//!
//! 1. `Transport::open` - Establish the channel for a tenant
//! 2. `Channel::outbound` - Send [`ClientRequest`](crate::protocol::ClientRequest)s
//! 3. `Channel::inbound` - Receive [`ServerEvent`](crate::protocol::ServerEvent)s
//! 4. Inbound ends (or yields `Disconnect`) when the channel dies
//! 5. Dropping the outbound sender closes the channel from our side
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `channel` | [`Transport`] trait and [`Channel`] handle |
//! | `websocket` | WebSocket transport and its IO loop |

// ============================================================================
// Submodules
// ============================================================================

/// Transport trait and channel handle.
pub mod channel;

/// WebSocket transport.
pub mod websocket;

// ============================================================================
// Re-exports
// ============================================================================

pub use channel::{Channel, Transport};
pub use websocket::WebSocketTransport;
