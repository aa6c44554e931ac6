//! Transport trait and channel handle.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::identifiers::{ChannelId, TenantId};
use crate::protocol::{ClientRequest, ServerEvent};

// ============================================================================
// Transport
// ============================================================================

/// Opens persistent channels to the messaging backend.
///
/// Implementations own the wire; the client only sees typed frames. A
/// transport must not retry on its own: reconnection is driven by the client.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Opens a channel scoped to `tenant_id`.
    ///
    /// Resolves once the channel is usable.
    ///
    /// # Errors
    ///
    /// Returns a connection error if the channel cannot be established.
    async fn open(&self, tenant_id: &TenantId) -> Result<Channel>;
}

// ============================================================================
// Channel
// ============================================================================

/// An opened channel.
///
/// The inbound stream ends when the channel dies. Dropping `outbound`
/// asks the transport to close the channel.
pub struct Channel {
    /// Channel identifier.
    pub id: ChannelId,
    /// Requests to the backend.
    pub outbound: mpsc::UnboundedSender<ClientRequest>,
    /// Events from the backend.
    pub inbound: mpsc::UnboundedReceiver<ServerEvent>,
}

impl Channel {
    /// Creates a channel from its parts.
    #[inline]
    #[must_use]
    pub fn new(
        id: ChannelId,
        outbound: mpsc::UnboundedSender<ClientRequest>,
        inbound: mpsc::UnboundedReceiver<ServerEvent>,
    ) -> Self {
        Self {
            id,
            outbound,
            inbound,
        }
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.id)
            .field("closed", &self.outbound.is_closed())
            .finish_non_exhaustive()
    }
}
