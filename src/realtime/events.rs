//! Application-facing event types.
//!
//! Every event a listener can receive is a variant of [`RealtimeEvent`];
//! listeners register per [`EventKind`] and pattern-match the payload.
//!
//! | Kind | Source |
//! |------|--------|
//! | `NewMessage`, `MessageUpdate`, `ConnectionUpdate`, `ContactUpdate`, `MessagesMarkedRead`, `Passthrough` | Relayed verbatim from the backend |
//! | `SubscriptionConfirmed`, `UnsubscriptionConfirmed` | Backend acknowledgements |
//! | `ConnectionStatus` | Lifecycle controller |
//! | `ConnectionHealth` | Health monitor |
//! | `FallbackMode` | Fallback coordinator |

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::identifiers::{ChannelId, TopicId};
use crate::protocol::ServerEvent;

use super::state::Quality;

// ============================================================================
// EventKind
// ============================================================================

/// Discriminant used to register listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// New inbound message.
    NewMessage,
    /// Message status / delivery update.
    MessageUpdate,
    /// Remote peer connection-state change.
    ConnectionUpdate,
    /// Contact metadata update.
    ContactUpdate,
    /// Read-receipt acknowledgement.
    MessagesMarkedRead,
    /// Anything else the transport delivers.
    Passthrough,
    /// Subscription acknowledged.
    SubscriptionConfirmed,
    /// Unsubscription acknowledged.
    UnsubscriptionConfirmed,
    /// Lifecycle change of our own channel.
    ConnectionStatus,
    /// Health probe sample.
    ConnectionHealth,
    /// Fallback mode toggled.
    FallbackMode,
}

// ============================================================================
// Payload Types
// ============================================================================

/// Lifecycle change of the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ConnectionStatus {
    /// Channel opened.
    Connected {
        /// Id of the new channel.
        channel_id: ChannelId,
    },
    /// Channel lost or closed.
    Disconnected {
        /// Why.
        reason: String,
    },
    /// Automatic reconnect attempt scheduled.
    Reconnecting {
        /// 1-indexed attempt number.
        attempt: u32,
        /// Attempts before giving up.
        max_attempts: u32,
    },
    /// Attempts exhausted. Terminal until `reconnect()`.
    Failed {
        /// Attempts made.
        attempts: u32,
    },
}

/// One health probe result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSample {
    /// Round trip in milliseconds; `None` if the probe timed out.
    pub latency_ms: Option<u64>,
    /// Resulting classification.
    pub quality: Quality,
}

/// Fallback mode change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackNotice {
    /// Host should poll while `true`.
    pub enabled: bool,
    /// Only manual `reconnect()` will restore the channel.
    pub permanent: bool,
    /// Why fallback changed.
    pub reason: String,
    /// Polling cadence suggested to the host.
    pub suggested_poll_interval: Duration,
}

// ============================================================================
// RealtimeEvent
// ============================================================================

/// Event delivered to listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum RealtimeEvent {
    /// New inbound message.
    NewMessage(Value),
    /// Message status / delivery update.
    MessageUpdate(Value),
    /// Remote peer connection-state change.
    ConnectionUpdate(Value),
    /// Contact metadata update.
    ContactUpdate(Value),
    /// Read-receipt acknowledgement.
    MessagesMarkedRead(Value),
    /// Any other backend event, untouched.
    Passthrough {
        /// Event name.
        event: String,
        /// Event payload.
        data: Value,
    },
    /// Subscription acknowledged.
    SubscriptionConfirmed {
        /// Topic.
        topic_id: TopicId,
    },
    /// Unsubscription acknowledged.
    UnsubscriptionConfirmed {
        /// Topic.
        topic_id: TopicId,
    },
    /// Lifecycle change.
    ConnectionStatus(ConnectionStatus),
    /// Health sample.
    ConnectionHealth(HealthSample),
    /// Fallback mode change.
    FallbackMode(FallbackNotice),
}

impl RealtimeEvent {
    /// Returns the listener kind for this event.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::NewMessage(_) => EventKind::NewMessage,
            Self::MessageUpdate(_) => EventKind::MessageUpdate,
            Self::ConnectionUpdate(_) => EventKind::ConnectionUpdate,
            Self::ContactUpdate(_) => EventKind::ContactUpdate,
            Self::MessagesMarkedRead(_) => EventKind::MessagesMarkedRead,
            Self::Passthrough { .. } => EventKind::Passthrough,
            Self::SubscriptionConfirmed { .. } => EventKind::SubscriptionConfirmed,
            Self::UnsubscriptionConfirmed { .. } => EventKind::UnsubscriptionConfirmed,
            Self::ConnectionStatus(_) => EventKind::ConnectionStatus,
            Self::ConnectionHealth(_) => EventKind::ConnectionHealth,
            Self::FallbackMode(_) => EventKind::FallbackMode,
        }
    }

    /// Maps a relayable backend event to its application event.
    ///
    /// Returns `None` for frames the core consumes itself (lifecycle and `pong`).
    #[must_use]
    pub fn relay(event: ServerEvent) -> Option<Self> {
        let relayed = match event {
            ServerEvent::NewMessage(data) => Self::NewMessage(data),
            ServerEvent::MessageUpdate(data) => Self::MessageUpdate(data),
            ServerEvent::ConnectionUpdate(data) => Self::ConnectionUpdate(data),
            ServerEvent::ContactUpdate(data) => Self::ContactUpdate(data),
            ServerEvent::MessagesMarkedRead(data) => Self::MessagesMarkedRead(data),
            ServerEvent::SubscriptionConfirmed { topic_id } => {
                Self::SubscriptionConfirmed { topic_id }
            }
            ServerEvent::UnsubscriptionConfirmed { topic_id } => {
                Self::UnsubscriptionConfirmed { topic_id }
            }
            ServerEvent::Other { event, data } => Self::Passthrough { event, data },
            ServerEvent::Connect
            | ServerEvent::Disconnect { .. }
            | ServerEvent::ConnectError { .. }
            | ServerEvent::Pong { .. } => return None,
        };

        Some(relayed)
    }
}

// ============================================================================
// Tests
// ============================================================================
