//! WebSocket transport.
//!
//! Opens one WebSocket per channel and runs an IO loop task that:
//!
//! - Parses incoming text frames into [`ServerEvent`]s
//! - Serializes outgoing [`ClientRequest`]s
//! - Reports the close reason as a final [`ServerEvent::Disconnect`]

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::{ChannelId, TenantId};
use crate::protocol::{ClientRequest, ServerEvent};

use super::channel::{Channel, Transport};

// ============================================================================
// Constants
// ============================================================================

/// Query parameter carrying the tenant scope.
const TENANT_QUERY_PARAM: &str = "tenantId";

// ============================================================================
// Types
// ============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// WebSocketTransport
// ============================================================================

/// Transport that opens a WebSocket per channel.
///
/// # Example
///
/// ```ignore
/// use hotel_realtime::transport::WebSocketTransport;
///
/// let transport = WebSocketTransport::new("wss://realtime.example.com/ws")?;
/// ```
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    /// Base endpoint without tenant scope.
    url: Url,
}

impl WebSocketTransport {
    /// Creates a transport for the given endpoint.
    ///
    /// # Errors
    ///
    /// - [`Error::Url`] if the endpoint does not parse
    /// - [`Error::Config`] if the scheme is not `ws` or `wss`
    pub fn new(url: &str) -> Result<Self> {
        let url = Url::parse(url)?;

        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(Error::config(format!(
                "WebSocket endpoint must use ws:// or wss://, got {}",
                url.scheme()
            )));
        }

        Ok(Self { url })
    }

    /// Returns the endpoint for a tenant.
    #[must_use]
    pub fn endpoint(&self, tenant_id: &TenantId) -> Url {
        let mut url = self.url.clone();
        url.query_pairs_mut()
            .append_pair(TENANT_QUERY_PARAM, tenant_id.as_str());
        url
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn open(&self, tenant_id: &TenantId) -> Result<Channel> {
        let endpoint = self.endpoint(tenant_id);

        debug!(url = %endpoint, "Opening WebSocket");

        let (ws_stream, _response) = connect_async(endpoint.as_str())
            .await
            .map_err(|e| Error::connection(format!("WebSocket handshake failed: {e}")))?;

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let channel_id = ChannelId::generate();

        tokio::spawn(run_io_loop(
            ws_stream,
            outbound_rx,
            inbound_tx,
            channel_id.clone(),
        ));

        info!(channel_id = %channel_id, tenant_id = %tenant_id, "WebSocket channel open");

        Ok(Channel::new(channel_id, outbound_tx, inbound_rx))
    }
}

// ============================================================================
// IO Loop
// ============================================================================

/// Pumps frames between the socket and the channel halves until either side closes.
async fn run_io_loop(
    ws_stream: WsStream,
    mut outbound_rx: mpsc::UnboundedReceiver<ClientRequest>,
    inbound_tx: mpsc::UnboundedSender<ServerEvent>,
    channel_id: ChannelId,
) {
    let (mut ws_write, mut ws_read) = ws_stream.split();

    let reason = loop {
        tokio::select! {
            // Frames from the backend
            message = ws_read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        trace!(channel_id = %channel_id, len = text.len(), "Frame received");

                        match ServerEvent::parse(&text) {
                            // The socket being open already means connected
                            Ok(ServerEvent::Connect) => {}

                            Ok(event) => {
                                if inbound_tx.send(event).is_err() {
                                    break "client dropped channel".to_string();
                                }
                            }

                            Err(e) => {
                                warn!(channel_id = %channel_id, error = %e, "Dropping malformed frame");
                            }
                        }
                    }

                    Some(Ok(Message::Close(frame))) => {
                        break frame
                            .map(|f| f.reason.to_string())
                            .filter(|r| !r.is_empty())
                            .unwrap_or_else(|| "closed by server".to_string());
                    }

                    Some(Err(e)) => {
                        break format!("transport error: {e}");
                    }

                    None => {
                        break "stream ended".to_string();
                    }

                    // Ignore Binary, Ping, Pong, Frame
                    _ => {}
                }
            }

            // Requests from the client
            request = outbound_rx.recv() => {
                match request {
                    Some(request) => {
                        let json = match request.to_text() {
                            Ok(json) => json,
                            Err(e) => {
                                warn!(error = %e, request = request.name(), "Failed to encode request");
                                continue;
                            }
                        };

                        if let Err(e) = ws_write.send(Message::Text(json.into())).await {
                            break format!("send failed: {e}");
                        }

                        trace!(channel_id = %channel_id, request = request.name(), "Request sent");
                    }

                    None => {
                        let _ = ws_write.close().await;
                        break "client disconnect".to_string();
                    }
                }
            }
        }
    };

    debug!(channel_id = %channel_id, reason = %reason, "WebSocket IO loop terminated");

    let _ = inbound_tx.send(ServerEvent::Disconnect { reason });
}

// ============================================================================
// Tests
// ============================================================================
