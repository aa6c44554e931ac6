//! Outbound request types.
//!
//! Requests are fire-and-forget frames; acknowledgements (if any) arrive as
//! [`ServerEvent`](super::ServerEvent)s.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::identifiers::{PeerId, TenantId, TopicId};

// ============================================================================
// ClientRequest
// ============================================================================

/// A request from the client to the messaging backend.
///
/// # Format
///
/// ```json
/// {
///   "event": "subscribe-instance",
///   "data": { "topicId": "inst-1", "tenantId": "hotel-1" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ClientRequest {
    /// Start receiving events for a topic.
    SubscribeInstance {
        /// Topic to subscribe to.
        topic_id: TopicId,
        /// Tenant the topic must belong to.
        tenant_id: TenantId,
    },

    /// Stop receiving events for a topic.
    UnsubscribeInstance {
        /// Topic to unsubscribe from.
        topic_id: TopicId,
    },

    /// Mark a peer's messages on a topic as read.
    MarkMessagesRead {
        /// Topic the conversation belongs to.
        topic_id: TopicId,
        /// Remote contact.
        peer_id: PeerId,
    },

    /// Round-trip health probe.
    Ping {
        /// Send time in milliseconds since the Unix epoch.
        timestamp: i64,
    },
}

impl ClientRequest {
    /// Returns the wire name of this request.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::SubscribeInstance { .. } => "subscribe-instance",
            Self::UnsubscribeInstance { .. } => "unsubscribe-instance",
            Self::MarkMessagesRead { .. } => "mark-messages-read",
            Self::Ping { .. } => "ping",
        }
    }

    /// Serializes the request as a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if serialization fails.
    pub fn to_text(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
