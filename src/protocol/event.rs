//! Inbound event types.
//!
//! Events are frames sent from the messaging backend to the client. The core
//! only inspects lifecycle, acknowledgement and `pong` frames; conversation
//! payloads are passed through to listeners unchanged.
//!
//! # Event Names
//!
//! | Group | Events |
//! |-------|--------|
//! | Lifecycle | `connect`, `disconnect`, `connect_error` |
//! | Subscriptions | `subscription-confirmed`, `unsubscription-confirmed` |
//! | Conversations | `new-message`, `message-update`, `connection-update`, `contact-update`, `messages-marked-read` |
//! | Health | `pong` |
//!
//! Any other event name is kept as [`ServerEvent::Other`].

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{Error, Result};
use crate::identifiers::TopicId;

// ============================================================================
// Envelope
// ============================================================================

/// Raw frame as it travels on the wire.
///
/// # Format
///
/// ```json
/// {
///   "event": "subscription-confirmed",
///   "data": { "topicId": "instance-7" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Event name.
    pub event: String,

    /// Event payload (`null` when absent).
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    /// Creates a new envelope.
    #[inline]
    #[must_use]
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }
}

// ============================================================================
// ServerEvent
// ============================================================================

/// Parsed inbound event.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// Backend accepted the channel.
    Connect,

    /// Channel closed by the backend or the transport.
    Disconnect {
        /// Why the channel closed.
        reason: String,
    },

    /// Channel-level error reported by the transport.
    ConnectError {
        /// Error description.
        error: String,
    },

    /// Backend acknowledged a `subscribe-instance` request.
    SubscriptionConfirmed {
        /// Topic now subscribed.
        topic_id: TopicId,
    },

    /// Backend acknowledged an `unsubscribe-instance` request.
    UnsubscriptionConfirmed {
        /// Topic no longer subscribed.
        topic_id: TopicId,
    },

    /// New inbound message.
    NewMessage(Value),

    /// Message status / delivery update.
    MessageUpdate(Value),

    /// Connection state change of a remote peer (e.g. a messaging instance).
    ConnectionUpdate(Value),

    /// Contact metadata update.
    ContactUpdate(Value),

    /// Read-receipt acknowledgement.
    MessagesMarkedRead(Value),

    /// Reply to a `ping` probe.
    Pong {
        /// The timestamp carried by the matching ping.
        timestamp: i64,
    },

    /// Any other event.
    Other {
        /// Event name.
        event: String,
        /// Event payload.
        data: Value,
    },
}

// ============================================================================
// ServerEvent - Parsing
// ============================================================================

impl ServerEvent {
    /// Parses a text frame.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the frame is not a JSON envelope
    /// - [`Error::Protocol`] if a known event lacks its required field
    pub fn parse(text: &str) -> Result<Self> {
        let envelope: Envelope = serde_json::from_str(text)?;
        Self::from_envelope(envelope)
    }

    /// Converts an envelope into a typed event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if a known event lacks its required field.
    pub fn from_envelope(envelope: Envelope) -> Result<Self> {
        let Envelope { event, data } = envelope;

        let parsed = match event.as_str() {
            "connect" => Self::Connect,

            "disconnect" => Self::Disconnect {
                reason: text_field(&data, "reason").unwrap_or_else(|| "unknown".to_string()),
            },

            "connect_error" => Self::ConnectError {
                error: text_field(&data, "message").unwrap_or_else(|| "unknown".to_string()),
            },

            "subscription-confirmed" => Self::SubscriptionConfirmed {
                topic_id: topic_field(&data, &event)?,
            },

            "unsubscription-confirmed" => Self::UnsubscriptionConfirmed {
                topic_id: topic_field(&data, &event)?,
            },

            "new-message" => Self::NewMessage(data),
            "message-update" => Self::MessageUpdate(data),
            "connection-update" => Self::ConnectionUpdate(data),
            "contact-update" => Self::ContactUpdate(data),
            "messages-marked-read" => Self::MessagesMarkedRead(data),

            "pong" => {
                let timestamp = data
                    .as_i64()
                    .or_else(|| data.get("timestamp").and_then(Value::as_i64))
                    .ok_or_else(|| Error::protocol("pong without timestamp"))?;
                Self::Pong { timestamp }
            }

            _ => Self::Other { event, data },
        };

        Ok(parsed)
    }

    /// Returns the wire name of this event.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Connect => "connect",
            Self::Disconnect { .. } => "disconnect",
            Self::ConnectError { .. } => "connect_error",
            Self::SubscriptionConfirmed { .. } => "subscription-confirmed",
            Self::UnsubscriptionConfirmed { .. } => "unsubscription-confirmed",
            Self::NewMessage(_) => "new-message",
            Self::MessageUpdate(_) => "message-update",
            Self::ConnectionUpdate(_) => "connection-update",
            Self::ContactUpdate(_) => "contact-update",
            Self::MessagesMarkedRead(_) => "messages-marked-read",
            Self::Pong { .. } => "pong",
            Self::Other { event, .. } => event.as_str(),
        }
    }

    /// Converts the event back into its wire envelope.
    #[must_use]
    pub fn to_envelope(&self) -> Envelope {
        let data = match self {
            Self::Connect => Value::Null,
            Self::Disconnect { reason } => json!({ "reason": reason }),
            Self::ConnectError { error } => json!({ "message": error }),
            Self::SubscriptionConfirmed { topic_id }
            | Self::UnsubscriptionConfirmed { topic_id } => json!({ "topicId": topic_id }),
            Self::NewMessage(data)
            | Self::MessageUpdate(data)
            | Self::ConnectionUpdate(data)
            | Self::ContactUpdate(data)
            | Self::MessagesMarkedRead(data)
            | Self::Other { data, .. } => data.clone(),
            Self::Pong { timestamp } => json!({ "timestamp": timestamp }),
        };

        Envelope::new(self.name(), data)
    }
}

// ============================================================================
// Field Helpers
// ============================================================================

/// Reads a string either from a bare string payload or from `key`.
fn text_field(data: &Value, key: &str) -> Option<String> {
    data.as_str()
        .or_else(|| data.get(key).and_then(Value::as_str))
        .map(str::to_string)
}

/// Reads the topic of an acknowledgement.
///
/// The backend sends either a bare string, `{ "topicId": .. }` or the older
/// `{ "instanceId": .. }`.
fn topic_field(data: &Value, event: &str) -> Result<TopicId> {
    data.as_str()
        .or_else(|| data.get("topicId").and_then(Value::as_str))
        .or_else(|| data.get("instanceId").and_then(Value::as_str))
        .map(TopicId::from)
        .ok_or_else(|| Error::protocol(format!("{event} without topic id")))
}

// ============================================================================
// Tests
// ============================================================================
