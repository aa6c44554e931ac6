//! Hotel realtime - Connection manager for the back-office messaging UI.
//!
//! This library keeps a chat-style UI synchronized with the messaging
//! backend over one persistent bidirectional channel per session.
//!
//! # Architecture
//!
//! The client follows a controller/listener model:
//!
//! - **Channel**: one WebSocket per tenant, opened through a [`Transport`]
//! - **Controller**: [`RealtimeClient`] reconnects with capped exponential
//!   backoff and gives up after a bounded number of attempts
//! - **Listeners**: the host registers callbacks per [`EventKind`]
//!
//! Key design principles:
//!
//! - Degraded connectivity is always signalled: the channel is live, a
//!   reconnect is in progress, or [`RealtimeEvent::FallbackMode`] tells the
//!   host to poll
//! - Topic subscriptions survive reconnects and are replayed
//! - Payloads are opaque and relayed verbatim
//! - Event-driven architecture (the crate never polls)
//!
//! # Quick Start
//!
//! ```no_run
//! use hotel_realtime::{EventKind, RealtimeClient, RealtimeEvent, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = RealtimeClient::builder()
//!         .websocket_url("wss://realtime.example.com/socket")
//!         .validation_url("https://api.example.com/realtime/validate")
//!         .build()?;
//!
//!     client.add_event_listener(EventKind::NewMessage, |event| {
//!         if let RealtimeEvent::NewMessage(payload) = event {
//!             println!("New message: {payload}");
//!         }
//!     });
//!
//!     client.connect("hotel-42").await?;
//!     client.subscribe_to_topic("instance-7", true).await?;
//!
//!     println!("{:?}", client.status());
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`realtime`] | Client, registry, listener bus, health and fallback |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Wire message types |
//! | [`transport`] | Channel transport seam and WebSocket implementation |

// ============================================================================
// Modules
// ============================================================================

/// Connection manager: client, subscriptions, listeners, health, fallback.
///
/// Use [`RealtimeClient::builder()`] to create a configured client.
pub mod realtime;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for tenants, topics, channels and peers.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// Wire protocol message types.
///
/// Inbound events and outbound requests in their JSON envelope.
pub mod protocol;

/// Channel transport layer.
///
/// The [`Transport`] seam and its WebSocket implementation.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use realtime::{
    AllowAllValidator, ConnectionState, ConnectionStatus, EventKind, FallbackNotice,
    HealthSample, HttpTopicValidator, ListenerHandle, Quality, RealtimeClient,
    RealtimeClientBuilder, RealtimeEvent, RealtimeOptions, Status, TopicValidator,
    ValidationOutcome, ValidationPolicy,
};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ChannelId, ListenerId, PeerId, TenantId, TopicId};

// Transport types
pub use transport::{Channel, Transport, WebSocketTransport};
