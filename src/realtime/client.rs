//! Connection lifecycle controller.
//!
//! [`RealtimeClient`] owns the channel, the subscription registry, the
//! listener bus and the background tasks that keep them in step.
//!
//! # Tasks
//!
//! | Task | Lives while | Role |
//! |------|-------------|------|
//! | Reader | channel is open | Relays inbound events, detects channel loss |
//! | Health | channel is open | Ping/pong probes |
//! | Reconnect | an attempt is scheduled | Sleeps the backoff delay, reopens |
//!
//! Every lifecycle operation starts a new *epoch*. A task or an awaited open
//! carries the epoch it started in and drops its effects if a newer one began,
//! so an explicit `disconnect()` always wins over an in-flight connect.

// ============================================================================
// Imports
// ============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, error, info, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{ChannelId, PeerId, TenantId, TopicId};
use crate::protocol::{ClientRequest, ServerEvent};
use crate::transport::{Channel, Transport};

use super::builder::RealtimeClientBuilder;
use super::bus::{EventBus, ListenerHandle};
use super::events::{ConnectionStatus, EventKind, FallbackNotice, HealthSample, RealtimeEvent};
use super::fallback::FallbackCoordinator;
use super::health::{self, HealthMonitor, ProbeSettings};
use super::options::RealtimeOptions;
use super::registry::SubscriptionRegistry;
use super::state::{ConnectionRecord, ConnectionState, Status, backoff_delay};
use super::validation::{TopicValidator, resolve_validation};

// ============================================================================
// Constants
// ============================================================================

const REASON_CLIENT_DISCONNECT: &str = "client disconnect";
const REASON_TRANSPORT_CLOSED: &str = "transport closed";
const REASON_ATTEMPTS_EXHAUSTED: &str = "reconnection attempts exhausted";
const REASON_HOST_REQUEST: &str = "requested by host";
const REASON_CHANNEL_RESTORED: &str = "channel restored";
const REASON_MANUAL_RECONNECT: &str = "manual reconnect";
const REASON_TENANT_SWITCH: &str = "tenant switch";

// ============================================================================
// Tasks
// ============================================================================

/// Background task handles and the outbound half of the live channel.
#[derive(Debug, Default)]
struct Tasks {
    outbound: Option<mpsc::UnboundedSender<ClientRequest>>,
    reader: Option<JoinHandle<()>>,
    health: Option<JoinHandle<()>>,
    reconnect: Option<JoinHandle<()>>,
}

impl Tasks {
    /// Detaches the channel. Dropping the sender closes it.
    fn take_channel(&mut self) -> Vec<JoinHandle<()>> {
        self.outbound = None;
        self.reader.take().into_iter().chain(self.health.take()).collect()
    }

    fn take_all(&mut self) -> Vec<JoinHandle<()>> {
        let mut handles = self.take_channel();
        handles.extend(self.reconnect.take());
        handles
    }
}

fn abort_all(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        handle.abort();
    }
}

// ============================================================================
// Shared
// ============================================================================

struct Shared {
    transport: Arc<dyn Transport>,
    validator: Arc<dyn TopicValidator>,
    options: RealtimeOptions,
    fallback: FallbackCoordinator,

    record: Mutex<ConnectionRecord>,
    registry: SubscriptionRegistry,
    bus: Arc<EventBus>,

    /// Lock order: `tasks` before `record`.
    tasks: Mutex<Tasks>,
    epoch: AtomicU64,
}

impl Drop for Shared {
    fn drop(&mut self) {
        abort_all(self.tasks.get_mut().take_all());
    }
}

/// Result of one reconnection decision, broadcast after locks are released.
enum ReconnectStep {
    Scheduled { attempt: u32, delay_ms: u64 },
    GiveUp { attempts: u32, notice: FallbackNotice },
}

impl Shared {
    // ------------------------------------------------------------------------
    // Epochs
    // ------------------------------------------------------------------------

    #[inline]
    fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    #[inline]
    fn is_current(&self, epoch: u64) -> bool {
        self.current_epoch() == epoch
    }

    /// Starts a new epoch. Callers hold the `tasks` lock.
    #[inline]
    fn advance_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    // ------------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------------

    fn emit(&self, event: RealtimeEvent) {
        let delivered = self.bus.dispatch(&event);
        trace!(kind = ?event.kind(), delivered, "Event dispatched");
    }

    fn emit_status(&self, status: ConnectionStatus) {
        self.emit(RealtimeEvent::ConnectionStatus(status));
    }

    /// Sends on the live channel.
    fn send(&self, request: ClientRequest) -> Result<()> {
        let tasks = self.tasks.lock();
        send_on(&tasks, request)
    }

    /// Emits the notice and status of a teardown started by a lifecycle call.
    fn emit_teardown(&self, notice: FallbackNotice) {
        let reason = notice.reason.clone();
        self.emit(RealtimeEvent::FallbackMode(notice));
        self.emit_status(ConnectionStatus::Disconnected { reason });
    }

    /// Detaches a live channel and raises fallback. Callers hold both locks.
    ///
    /// Returns `None` if no channel was live.
    fn close_live_channel(
        &self,
        record: &mut ConnectionRecord,
        reason: &str,
    ) -> Option<FallbackNotice> {
        if !record.is_connected {
            return None;
        }

        record.mark_disconnected(ConnectionState::Connecting);
        Some(self.fallback.enable(record, false, reason))
    }

    // ------------------------------------------------------------------------
    // Opening
    // ------------------------------------------------------------------------

    async fn open_channel(&self, tenant_id: &TenantId) -> Result<Channel> {
        let timeout = self.options.connect_timeout;

        match time::timeout(timeout, self.transport.open(tenant_id)).await {
            Ok(result) => result,
            Err(_) => Err(Error::connection_timeout(
                u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            )),
        }
    }

    /// Makes `channel` the live channel if `epoch` is still current.
    fn install_channel(self: &Arc<Self>, epoch: u64, channel: Channel) -> Result<()> {
        let Channel {
            id,
            outbound,
            inbound,
        } = channel;

        let (tenant_id, restored) = {
            let mut tasks = self.tasks.lock();
            if !self.is_current(epoch) {
                debug!(channel_id = %id, "Discarding channel opened for a stale epoch");
                return Err(Error::ConnectionAborted);
            }

            let mut record = self.record.lock();
            record.mark_connected(id.clone());
            let restored = self.fallback.disable(&mut record, REASON_CHANNEL_RESTORED);
            let tenant_id = record.tenant_id.clone();
            drop(record);

            // Replay before publishing `outbound`: a concurrent subscribe
            // either lands in this snapshot or sends on its own, never both.
            if let Some(tenant_id) = tenant_id.as_ref() {
                self.replay_subscriptions(&outbound, tenant_id);
            }

            let monitor = Arc::new(HealthMonitor::new());

            tasks.reader = Some(tokio::spawn(read_channel(
                Arc::downgrade(self),
                epoch,
                inbound,
                Arc::clone(&monitor),
            )));

            tasks.health = ProbeSettings::from_options(&self.options).map(|settings| {
                let shared = Arc::downgrade(self);
                tokio::spawn(health::run_probes(
                    monitor,
                    outbound.clone(),
                    settings,
                    move |sample| {
                        if let Some(shared) = shared.upgrade() {
                            shared.apply_health_sample(epoch, sample);
                        }
                    },
                ))
            });

            tasks.outbound = Some(outbound);

            (tenant_id, restored)
        };

        info!(channel_id = %id, tenant_id = ?tenant_id, "Channel connected");

        self.emit_status(ConnectionStatus::Connected { channel_id: id });
        if let Some(notice) = restored {
            self.emit(RealtimeEvent::FallbackMode(notice));
        }

        Ok(())
    }

    /// Re-issues every registered topic once. Blind: no re-validation.
    /// Callers hold the `tasks` lock.
    fn replay_subscriptions(
        &self,
        outbound: &mpsc::UnboundedSender<ClientRequest>,
        tenant_id: &TenantId,
    ) {
        let topics = self.registry.replay_set();
        if topics.is_empty() {
            return;
        }

        debug!(count = topics.len(), "Replaying subscriptions");

        for topic_id in topics {
            let _ = outbound.send(ClientRequest::SubscribeInstance {
                topic_id,
                tenant_id: tenant_id.clone(),
            });
        }
    }

    // ------------------------------------------------------------------------
    // Loss and Reconnection
    // ------------------------------------------------------------------------

    /// Handles the end of the live channel.
    fn handle_channel_lost(self: &Arc<Self>, epoch: u64, reason: String) {
        let notice = {
            let mut tasks = self.tasks.lock();
            if !self.is_current(epoch) {
                return;
            }

            // The reader calls this as its last step; aborting it is harmless
            abort_all(tasks.take_channel());

            let mut record = self.record.lock();
            record.mark_disconnected(ConnectionState::Disconnected);
            self.fallback.enable(&mut record, false, &reason)
        };

        warn!(reason = %reason, "Channel lost");

        self.emit(RealtimeEvent::FallbackMode(notice));
        self.emit_status(ConnectionStatus::Disconnected { reason });
        self.schedule_reconnect(epoch);
    }

    /// Handles a failed open before any channel existed.
    fn handle_open_failed(self: &Arc<Self>, epoch: u64, error: &Error) {
        let notice = {
            let _tasks = self.tasks.lock();
            if !self.is_current(epoch) {
                return;
            }

            let mut record = self.record.lock();
            record.mark_disconnected(ConnectionState::Disconnected);
            self.fallback.enable(&mut record, false, &error.to_string())
        };

        self.emit(RealtimeEvent::FallbackMode(notice));
        self.schedule_reconnect(epoch);
    }

    /// Schedules the next attempt, or gives up after `max_attempts`.
    fn schedule_reconnect(self: &Arc<Self>, epoch: u64) {
        let max_attempts = self.options.max_attempts;

        let step = {
            let mut tasks = self.tasks.lock();
            if !self.is_current(epoch) {
                return;
            }

            let mut record = self.record.lock();

            if record.reconnect_attempts >= max_attempts {
                record.state = ConnectionState::FailedPermanent;
                let notice = self
                    .fallback
                    .enable(&mut record, true, REASON_ATTEMPTS_EXHAUSTED);

                ReconnectStep::GiveUp {
                    attempts: record.reconnect_attempts,
                    notice,
                }
            } else {
                record.reconnect_attempts += 1;
                let attempt = record.reconnect_attempts;
                record.state = ConnectionState::Reconnecting { attempt };
                drop(record);

                let delay = backoff_delay(attempt, self.options.base_delay, self.options.max_delay);
                let shared = Arc::downgrade(self);

                // Replaces the handle of the task that may be calling us; only
                // lifecycle operations abort it.
                tasks.reconnect = Some(tokio::spawn(async move {
                    time::sleep(delay).await;
                    if let Some(shared) = shared.upgrade() {
                        shared.attempt_reconnect(epoch).await;
                    }
                }));

                ReconnectStep::Scheduled {
                    attempt,
                    delay_ms: u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                }
            }
        };

        match step {
            ReconnectStep::Scheduled { attempt, delay_ms } => {
                info!(attempt, max_attempts, delay_ms, "Reconnect scheduled");
                self.emit_status(ConnectionStatus::Reconnecting {
                    attempt,
                    max_attempts,
                });
            }
            ReconnectStep::GiveUp { attempts, notice } => {
                error!(attempts, "Reconnection abandoned, staying in fallback");
                self.emit(RealtimeEvent::FallbackMode(notice));
                self.emit_status(ConnectionStatus::Failed { attempts });
            }
        }
    }

    async fn attempt_reconnect(self: &Arc<Self>, epoch: u64) {
        if !self.is_current(epoch) {
            return;
        }

        let Some(tenant_id) = self.record.lock().tenant_id.clone() else {
            return;
        };

        debug!(tenant_id = %tenant_id, "Reconnect attempt");

        match self.open_channel(&tenant_id).await {
            Ok(channel) => {
                let _ = self.install_channel(epoch, channel);
            }
            Err(e) => {
                if self.is_current(epoch) {
                    warn!(error = %e, "Reconnect attempt failed");
                    self.schedule_reconnect(epoch);
                }
            }
        }
    }

    // ------------------------------------------------------------------------
    // Health
    // ------------------------------------------------------------------------

    fn apply_health_sample(&self, epoch: u64, sample: HealthSample) {
        {
            let _tasks = self.tasks.lock();
            if !self.is_current(epoch) {
                return;
            }

            let mut record = self.record.lock();
            if record.is_connected && !record.fallback_active {
                record.quality = sample.quality;
            }
        }

        self.emit(RealtimeEvent::ConnectionHealth(sample));
    }
}

/// Hands `request` to the live channel. Callers hold the `tasks` lock.
fn send_on(tasks: &Tasks, request: ClientRequest) -> Result<()> {
    let name = request.name();
    let Some(outbound) = tasks.outbound.as_ref() else {
        return Err(Error::not_connected(name));
    };

    let result = outbound.send(request).map_err(|_| Error::ConnectionClosed);
    trace!(request = name, sent = result.is_ok(), "Outbound request");
    result
}

// ============================================================================
// Reader Task
// ============================================================================

/// Relays inbound events until the channel ends.
async fn read_channel(
    shared: Weak<Shared>,
    epoch: u64,
    mut inbound: mpsc::UnboundedReceiver<ServerEvent>,
    monitor: Arc<HealthMonitor>,
) {
    let reason = loop {
        let Some(event) = inbound.recv().await else {
            break REASON_TRANSPORT_CLOSED.to_string();
        };

        let Some(client) = shared.upgrade() else {
            return;
        };
        if !client.is_current(epoch) {
            return;
        }

        trace!(event = event.name(), "Inbound event");

        match event {
            ServerEvent::Disconnect { reason } => break reason,
            ServerEvent::ConnectError { error } => break error,
            ServerEvent::Connect => {}
            ServerEvent::Pong { timestamp } => {
                monitor.on_pong(timestamp);
            }
            ServerEvent::SubscriptionConfirmed { topic_id } => {
                client.registry.confirm(&topic_id);
                client.emit(RealtimeEvent::SubscriptionConfirmed { topic_id });
            }
            other => {
                if let Some(relayed) = RealtimeEvent::relay(other) {
                    client.emit(relayed);
                }
            }
        }
    };

    if let Some(client) = shared.upgrade() {
        client.handle_channel_lost(epoch, reason);
    }
}

// ============================================================================
// RealtimeClient
// ============================================================================

/// Real-time connection manager.
///
/// Cheap to clone; clones share one connection. Build with
/// [`RealtimeClient::builder`].
///
/// # Example
///
/// ```ignore
/// use hotel_realtime::{EventKind, RealtimeClient, RealtimeEvent};
///
/// let client = RealtimeClient::builder()
///     .websocket_url("wss://realtime.example.com/socket")
///     .validation_url("https://api.example.com/realtime/validate")
///     .build()?;
///
/// client.add_event_listener(EventKind::NewMessage, |event| {
///     if let RealtimeEvent::NewMessage(payload) = event {
///         println!("{payload}");
///     }
/// });
///
/// client.connect("hotel-42").await?;
/// client.subscribe_to_topic("instance-7", true).await?;
/// ```
#[derive(Clone)]
pub struct RealtimeClient {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for RealtimeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeClient")
            .field("state", &self.shared.record.lock().state)
            .field("topics", &self.shared.registry.len())
            .field("bus", &self.shared.bus)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// RealtimeClient - Construction
// ============================================================================

impl RealtimeClient {
    /// Creates a builder.
    #[inline]
    #[must_use]
    pub fn builder() -> RealtimeClientBuilder {
        RealtimeClientBuilder::new()
    }

    pub(crate) fn from_parts(
        transport: Arc<dyn Transport>,
        validator: Arc<dyn TopicValidator>,
        options: RealtimeOptions,
    ) -> Self {
        let fallback = FallbackCoordinator::new(options.fallback_poll_interval);

        Self {
            shared: Arc::new(Shared {
                transport,
                validator,
                options,
                fallback,
                record: Mutex::new(ConnectionRecord::new()),
                registry: SubscriptionRegistry::new(),
                bus: EventBus::new(),
                tasks: Mutex::new(Tasks::default()),
                epoch: AtomicU64::new(0),
            }),
        }
    }

    /// Returns the options in use.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &RealtimeOptions {
        &self.shared.options
    }
}

// ============================================================================
// RealtimeClient - Lifecycle
// ============================================================================

impl RealtimeClient {
    /// Opens the channel for `tenant_id`.
    ///
    /// Resolves immediately if already connected to the same tenant. A
    /// different tenant starts a fresh session: the current channel is torn
    /// down (raising fallback) and subscriptions of the old tenant are
    /// dropped. A pending reconnect timer is cancelled.
    ///
    /// On failure, fallback is enabled and automatic reconnection starts in
    /// the background; only this call sees the error.
    ///
    /// # Errors
    ///
    /// - [`Error::Connection`] / [`Error::WebSocket`] if the open fails
    /// - [`Error::ConnectionTimeout`] if it exceeds the connect timeout
    /// - [`Error::ConnectionAborted`] if `disconnect()` or another `connect()`
    ///   superseded this call
    pub async fn connect(&self, tenant_id: impl Into<TenantId>) -> Result<()> {
        let tenant_id = tenant_id.into();
        let shared = &self.shared;

        let (epoch, stale, closed) = {
            let mut tasks = shared.tasks.lock();
            let mut record = shared.record.lock();

            if record.is_connected && record.tenant_id.as_ref() == Some(&tenant_id) {
                debug!(tenant_id = %tenant_id, "Already connected");
                return Ok(());
            }

            let switching = record
                .tenant_id
                .as_ref()
                .is_some_and(|current| *current != tenant_id);

            let mut closed = None;
            if switching {
                info!(
                    from = ?record.tenant_id,
                    to = %tenant_id,
                    "Switching tenant, dropping current session"
                );
                shared.registry.clear();
                closed = shared.close_live_channel(&mut record, REASON_TENANT_SWITCH);
            }

            record.tenant_id = Some(tenant_id.clone());
            record.state = ConnectionState::Connecting;

            let epoch = shared.advance_epoch();
            (epoch, tasks.take_all(), closed)
        };

        abort_all(stale);

        if let Some(notice) = closed {
            shared.emit_teardown(notice);
        }

        info!(tenant_id = %tenant_id, "Connecting");

        match shared.open_channel(&tenant_id).await {
            Ok(channel) => shared.install_channel(epoch, channel),
            Err(e) => {
                if !shared.is_current(epoch) {
                    return Err(Error::ConnectionAborted);
                }
                warn!(tenant_id = %tenant_id, error = %e, "Connect failed");
                shared.handle_open_failed(epoch, &e);
                Err(e)
            }
        }
    }

    /// Tears down the channel and resets the session.
    ///
    /// Cancels any pending reconnect, stops health probing, raises fallback
    /// and emits `Disconnected`, then forgets every subscription and
    /// listener. Never reconnects.
    pub fn disconnect(&self) {
        let shared = &self.shared;

        let (handles, notice) = {
            let mut tasks = shared.tasks.lock();
            shared.advance_epoch();
            let handles = tasks.take_all();

            let mut record = shared.record.lock();
            let active = record.is_connected || record.state != ConnectionState::Disconnected;

            *record = ConnectionRecord::new();
            let notice =
                active.then(|| shared.fallback.enable(&mut record, false, REASON_CLIENT_DISCONNECT));

            (handles, notice)
        };

        abort_all(handles);

        if let Some(notice) = notice {
            info!("Disconnected by client");
            shared.emit(RealtimeEvent::FallbackMode(notice));
            shared.emit_status(ConnectionStatus::Disconnected {
                reason: REASON_CLIENT_DISCONNECT.to_string(),
            });
        }

        shared.registry.clear();
        shared.bus.clear();
    }

    /// Manual reconnect.
    ///
    /// Resets the attempt counter and permanent fallback, closes any live
    /// channel (raising fallback until the new one opens; subscriptions are
    /// kept) and connects to the last tenant.
    /// This is the only way out of [`ConnectionState::FailedPermanent`].
    ///
    /// # Errors
    ///
    /// - [`Error::NoTenant`] if `connect()` was never called
    /// - Any error of [`connect`](Self::connect)
    pub async fn reconnect(&self) -> Result<()> {
        let shared = &self.shared;

        let (tenant_id, handles, closed) = {
            let mut tasks = shared.tasks.lock();
            let mut record = shared.record.lock();

            let tenant_id = record.tenant_id.clone().ok_or(Error::NoTenant)?;

            shared.advance_epoch();
            record.reconnect_attempts = 0;
            record.fallback_permanent = false;
            let closed = shared.close_live_channel(&mut record, REASON_MANUAL_RECONNECT);
            record.state = ConnectionState::Connecting;

            (tenant_id, tasks.take_all(), closed)
        };

        abort_all(handles);

        if let Some(notice) = closed {
            shared.emit_teardown(notice);
        }

        info!(tenant_id = %tenant_id, "Manual reconnect");
        self.connect(tenant_id).await
    }
}

// ============================================================================
// RealtimeClient - Subscriptions
// ============================================================================

impl RealtimeClient {
    /// Subscribes to a topic.
    ///
    /// Returns `Ok(true)` if the topic is (or already was) registered and
    /// `Ok(false)` if validation rejected it. While disconnected the topic is
    /// recorded and sent on the next connect.
    ///
    /// # Errors
    ///
    /// - [`Error::NoTenant`] if `connect()` was never called
    /// - [`Error::ConnectionAborted`] if the session was reset or switched to
    ///   another tenant during validation
    pub async fn subscribe_to_topic(
        &self,
        topic_id: impl Into<TopicId>,
        validate: bool,
    ) -> Result<bool> {
        let topic_id = topic_id.into();
        let shared = &self.shared;

        if shared.registry.contains(&topic_id) {
            debug!(topic_id = %topic_id, "Already subscribed");
            return Ok(true);
        }

        let tenant_id = shared
            .record
            .lock()
            .tenant_id
            .clone()
            .ok_or(Error::NoTenant)?;

        if validate {
            let result = shared.validator.validate(&topic_id, &tenant_id).await;
            if !resolve_validation(&topic_id, result, shared.options.validation_policy) {
                return Ok(false);
            }
        }

        // Registration and send happen under `tasks` so a replay running in
        // `install_channel` cannot interleave with them.
        let sent = {
            let tasks = shared.tasks.lock();

            if shared.record.lock().tenant_id.as_ref() != Some(&tenant_id) {
                debug!(topic_id = %topic_id, "Session changed during subscribe");
                return Err(Error::ConnectionAborted);
            }

            if !shared.registry.request(topic_id.clone()) {
                return Ok(true);
            }

            send_on(
                &tasks,
                ClientRequest::SubscribeInstance {
                    topic_id: topic_id.clone(),
                    tenant_id,
                },
            )
            .is_ok()
        };

        debug!(topic_id = %topic_id, sent, "Subscription requested");
        Ok(true)
    }

    /// Unsubscribes from a topic.
    ///
    /// The topic is forgotten immediately without waiting for the backend.
    /// Returns `true` if it was registered.
    pub fn unsubscribe_from_topic(&self, topic_id: impl Into<TopicId>) -> bool {
        let topic_id = topic_id.into();

        if !self.shared.registry.remove(&topic_id) {
            return false;
        }

        let sent = self
            .shared
            .send(ClientRequest::UnsubscribeInstance {
                topic_id: topic_id.clone(),
            })
            .is_ok();

        debug!(topic_id = %topic_id, sent, "Unsubscribed");
        true
    }

    /// Tells the backend the conversation with `peer_id` was read.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if no channel is open
    /// - [`Error::ConnectionClosed`] if the channel closed before the loss
    ///   was processed
    pub fn mark_messages_as_read(
        &self,
        topic_id: impl Into<TopicId>,
        peer_id: impl Into<PeerId>,
    ) -> Result<()> {
        self.shared.send(ClientRequest::MarkMessagesRead {
            topic_id: topic_id.into(),
            peer_id: peer_id.into(),
        })
    }
}

// ============================================================================
// RealtimeClient - Events and Status
// ============================================================================

impl RealtimeClient {
    /// Registers a listener for one event kind.
    ///
    /// Listeners for the same kind run in registration order. A panicking
    /// listener is logged and skipped.
    pub fn add_event_listener<F>(&self, kind: EventKind, listener: F) -> ListenerHandle
    where
        F: Fn(&RealtimeEvent) + Send + Sync + 'static,
    {
        self.shared.bus.add_listener(kind, listener)
    }

    /// Forces fallback mode, e.g. when the host detects stale data.
    pub fn enable_fallback_mode(&self, permanent: bool) {
        let notice = {
            let mut record = self.shared.record.lock();
            self.shared
                .fallback
                .enable(&mut record, permanent, REASON_HOST_REQUEST)
        };

        self.shared.emit(RealtimeEvent::FallbackMode(notice));
    }

    /// Returns a status snapshot.
    #[must_use]
    pub fn status(&self) -> Status {
        let record = self.shared.record.lock().clone();

        Status {
            is_connected: record.is_connected,
            channel_id: record.channel_id,
            subscribed_topics: self.shared.registry.confirmed(),
            tenant_id: record.tenant_id,
            fallback_active: record.fallback_active,
            fallback_permanent: record.fallback_permanent,
            quality: record.quality,
            last_connected_at: record.last_connected_at,
            reconnect_attempts: record.reconnect_attempts,
            state: record.state,
        }
    }

    /// Returns `true` if the channel is live.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.shared.record.lock().is_connected
    }

    /// Returns the live channel id.
    #[inline]
    #[must_use]
    pub fn channel_id(&self) -> Option<ChannelId> {
        self.shared.record.lock().channel_id.clone()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;

    use crate::realtime::validation::AllowAllValidator;

    struct RefusingTransport;

    #[async_trait]
    impl Transport for RefusingTransport {
        async fn open(&self, _: &TenantId) -> Result<Channel> {
            Err(Error::connection("refused"))
        }
    }

    fn client() -> RealtimeClient {
        RealtimeClient::from_parts(
            Arc::new(RefusingTransport),
            Arc::new(AllowAllValidator),
            RealtimeOptions::new(),
        )
    }

    #[test]
    fn test_tasks_take_all_empties() {
        let mut tasks = Tasks {
            outbound: Some(mpsc::unbounded_channel().0),
            ..Tasks::default()
        };
        assert!(tasks.take_all().is_empty());
        assert!(tasks.outbound.is_none());
    }

    #[test]
    fn test_fresh_status() {
        let status = client().status();
        assert!(!status.is_connected);
        assert!(status.channel_id.is_none());
        assert!(status.tenant_id.is_none());
        assert_eq!(status.state, ConnectionState::Disconnected);
        assert!(status.subscribed_topics.is_empty());
    }

    #[tokio::test]
    async fn test_subscribe_without_tenant() {
        let result = client().subscribe_to_topic("inst-1", false).await;
        assert!(matches!(result, Err(Error::NoTenant)));
    }

    #[tokio::test]
    async fn test_reconnect_without_tenant() {
        assert!(matches!(client().reconnect().await, Err(Error::NoTenant)));
    }

    #[test]
    fn test_mark_read_requires_channel() {
        let result = client().mark_messages_as_read("inst-1", "+33600000000");
        assert!(matches!(result, Err(Error::NotConnected { .. })));
    }

    #[test]
    fn test_disconnect_on_fresh_client_is_silent() {
        let client = client();
        let seen = Arc::new(Mutex::new(0usize));

        let counter = Arc::clone(&seen);
        client.add_event_listener(EventKind::ConnectionStatus, move |_| {
            *counter.lock() += 1;
        });

        client.disconnect();
        assert_eq!(*seen.lock(), 0);
        assert!(!client.status().fallback_active);
    }

    #[test]
    fn test_enable_fallback_mode() {
        let client = client();
        let notices = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&notices);
        client.add_event_listener(EventKind::FallbackMode, move |event| {
            if let RealtimeEvent::FallbackMode(notice) = event {
                sink.lock().push(notice.clone());
            }
        });

        client.enable_fallback_mode(false);

        let status = client.status();
        assert!(status.fallback_active);
        assert!(!status.fallback_permanent);

        let notices = notices.lock();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].enabled);
        assert_eq!(notices[0].reason, REASON_HOST_REQUEST);
    }
}
