//! Shared fixtures for integration tests.
//!
//! [`MockTransport`] hands out in-memory channels; each open produces a
//! [`MockPeer`] that plays the backend side.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;

use hotel_realtime::protocol::{ClientRequest, ServerEvent};
use hotel_realtime::{
    Channel, ChannelId, Error, EventKind, RealtimeClient, RealtimeEvent, RealtimeOptions, Result,
    TenantId, TopicId, Transport,
};

// ============================================================================
// Tracing
// ============================================================================

/// Installs a test-writer subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// MockPeer
// ============================================================================

/// Backend side of one opened channel.
pub struct MockPeer {
    pub channel_id: ChannelId,
    pub tenant_id: TenantId,
    inbound: mpsc::UnboundedSender<ServerEvent>,
    outbound: mpsc::UnboundedReceiver<ClientRequest>,
}

impl MockPeer {
    /// Pushes an event to the client.
    pub fn send(&self, event: ServerEvent) {
        let _ = self.inbound.send(event);
    }

    /// Simulates a transport drop.
    pub fn close(&self, reason: &str) {
        self.send(ServerEvent::Disconnect {
            reason: reason.to_string(),
        });
    }

    /// Acknowledges a subscription.
    pub fn confirm(&self, topic_id: &str) {
        self.send(ServerEvent::SubscriptionConfirmed {
            topic_id: TopicId::from(topic_id),
        });
    }

    /// Returns `true` once the client dropped its end.
    pub fn is_closed(&self) -> bool {
        self.inbound.is_closed()
    }

    /// Takes every request received so far.
    pub fn drain(&mut self) -> Vec<ClientRequest> {
        let mut requests = Vec::new();
        while let Ok(request) = self.outbound.try_recv() {
            requests.push(request);
        }
        requests
    }

    /// Takes the topics of every `subscribe-instance` received so far.
    pub fn drain_subscriptions(&mut self) -> Vec<TopicId> {
        let mut topics: Vec<TopicId> = self
            .drain()
            .into_iter()
            .filter_map(|request| match request {
                ClientRequest::SubscribeInstance { topic_id, .. } => Some(topic_id),
                _ => None,
            })
            .collect();
        topics.sort();
        topics
    }

    /// Waits for the next ping, skipping other requests.
    pub async fn next_ping(&mut self) -> i64 {
        loop {
            match self.outbound.recv().await {
                Some(ClientRequest::Ping { timestamp }) => return timestamp,
                Some(_) => continue,
                None => panic!("channel closed before ping"),
            }
        }
    }
}

// ============================================================================
// MockTransport
// ============================================================================

#[derive(Default)]
struct MockState {
    failing: bool,
    open_delay: Option<Duration>,
    opens: Vec<Instant>,
    peers: Vec<MockPeer>,
}

/// In-memory transport. Clones share state.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent open fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.state.lock().failing = failing;
    }

    /// Delays every subsequent open.
    pub fn set_open_delay(&self, delay: Duration) {
        self.state.lock().open_delay = Some(delay);
    }

    /// Number of open attempts so far, failed ones included.
    pub fn open_count(&self) -> usize {
        self.state.lock().opens.len()
    }

    /// Clock readings of every open attempt.
    pub fn open_times(&self) -> Vec<Instant> {
        self.state.lock().opens.clone()
    }

    /// Takes the most recently opened peer.
    pub fn take_peer(&self) -> MockPeer {
        self.state
            .lock()
            .peers
            .pop()
            .expect("no channel was opened")
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn open(&self, tenant_id: &TenantId) -> Result<Channel> {
        let delay = {
            let mut state = self.state.lock();
            state.opens.push(Instant::now());
            state.open_delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        if state.failing {
            return Err(Error::connection("mock transport refused"));
        }

        let channel_id = ChannelId::from(format!("mock-{}", state.opens.len()));
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        state.peers.push(MockPeer {
            channel_id: channel_id.clone(),
            tenant_id: tenant_id.clone(),
            inbound: inbound_tx,
            outbound: outbound_rx,
        });

        Ok(Channel::new(channel_id, outbound_tx, inbound_rx))
    }
}

// ============================================================================
// Client Helpers
// ============================================================================

/// Options without health probes, so tests only see the traffic they drive.
pub fn quiet_options() -> RealtimeOptions {
    RealtimeOptions::new().without_health_monitor()
}

/// Builds a client over `transport`.
pub fn client_with(transport: &MockTransport, options: RealtimeOptions) -> RealtimeClient {
    RealtimeClient::builder()
        .transport(transport.clone())
        .options(options)
        .build()
        .expect("client")
}

/// Records every event of the given kinds, in dispatch order.
pub fn record(client: &RealtimeClient, kinds: &[EventKind]) -> Arc<Mutex<Vec<RealtimeEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    for &kind in kinds {
        let sink = Arc::clone(&events);
        client.add_event_listener(kind, move |event| sink.lock().push(event.clone()));
    }
    events
}

/// Lets spawned tasks run without moving the clock.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}
