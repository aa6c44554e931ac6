//! Real-time connection manager.
//!
//! Keeps one persistent channel to the messaging backend alive, multiplexes
//! topic subscriptions over it and tells the host when to fall back to
//! polling.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`RealtimeClient`] | Lifecycle controller and public API |
//! | [`RealtimeClientBuilder`] | Fluent configuration builder |
//! | [`RealtimeOptions`] | Backoff, health and fallback tunables |
//! | [`SubscriptionRegistry`] | Pending and confirmed topics |
//! | [`EventBus`] | Listener fan-out with panic isolation |
//! | [`TopicValidator`] | Pre-subscription authorization seam |
//! | [`Status`] | Point-in-time snapshot |
//!
//! # Example
//!
//! ```ignore
//! use hotel_realtime::{ConnectionStatus, EventKind, RealtimeClient, RealtimeEvent};
//!
//! let client = RealtimeClient::builder()
//!     .websocket_url("wss://realtime.example.com/socket")
//!     .build()?;
//!
//! client.add_event_listener(EventKind::FallbackMode, |event| {
//!     if let RealtimeEvent::FallbackMode(notice) = event {
//!         // start or stop polling
//!     }
//! });
//!
//! client.connect("hotel-42").await?;
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder for the client.
pub mod builder;

/// Listener registry and dispatch.
pub mod bus;

/// Lifecycle controller.
pub mod client;

/// Application-facing event types.
pub mod events;

/// Fallback signalling.
mod fallback;

/// Ping/pong probing.
mod health;

/// Client options.
pub mod options;

/// Subscribed topics.
pub mod registry;

/// Connection state, quality and status snapshot.
pub mod state;

/// Topic validation.
pub mod validation;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::RealtimeClientBuilder;
pub use bus::{EventBus, Listener, ListenerHandle};
pub use client::RealtimeClient;
pub use events::{ConnectionStatus, EventKind, FallbackNotice, HealthSample, RealtimeEvent};
pub use options::{RealtimeOptions, ValidationPolicy};
pub use registry::SubscriptionRegistry;
pub use state::{ConnectionState, Quality, Status, backoff_delay};
pub use validation::{
    AllowAllValidator, HttpTopicValidator, TopicValidator, ValidationOutcome, ValidationResponse,
};
