//! Health / quality monitor.
//!
//! While a channel is live, a probe task sends `ping { timestamp }` every
//! interval and waits a bounded time for the matching `pong`. Each probe
//! yields one [`HealthSample`]. Probes are advisory: a missing pong lowers
//! quality but never closes the channel.
//!
//! The round trip is measured on tokio's monotonic clock; the wall-clock
//! timestamp only correlates the pong with its ping.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

use crate::protocol::ClientRequest;

use super::events::HealthSample;
use super::options::RealtimeOptions;
use super::state::Quality;

// ============================================================================
// ProbeSettings
// ============================================================================

/// Probe cadence and thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ProbeSettings {
    pub interval: Duration,
    pub timeout: Duration,
    pub poor_threshold: Duration,
}

impl ProbeSettings {
    /// Returns `None` when health monitoring is disabled.
    pub(crate) fn from_options(options: &RealtimeOptions) -> Option<Self> {
        options.health_interval.map(|interval| Self {
            interval,
            timeout: options.probe_timeout,
            poor_threshold: options.poor_latency_threshold,
        })
    }
}

// ============================================================================
// HealthMonitor
// ============================================================================

#[derive(Debug)]
struct PendingProbe {
    timestamp: i64,
    reply: oneshot::Sender<()>,
}

/// Correlates pongs with the outstanding probe of one channel.
#[derive(Debug, Default)]
pub(crate) struct HealthMonitor {
    pending: Mutex<Option<PendingProbe>>,
}

impl HealthMonitor {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers a probe, replacing any unanswered one.
    fn arm(&self, timestamp: i64) -> oneshot::Receiver<()> {
        let (reply, answer) = oneshot::channel();
        *self.pending.lock() = Some(PendingProbe { timestamp, reply });
        answer
    }

    fn disarm(&self) {
        self.pending.lock().take();
    }

    /// Completes the outstanding probe if `timestamp` matches it.
    ///
    /// Returns `false` for late, duplicate or unsolicited pongs.
    pub(crate) fn on_pong(&self, timestamp: i64) -> bool {
        let mut pending = self.pending.lock();

        match pending.take() {
            Some(probe) if probe.timestamp == timestamp => {
                let _ = probe.reply.send(());
                true
            }
            other => {
                *pending = other;
                trace!(timestamp, "Ignoring unmatched pong");
                false
            }
        }
    }
}

// ============================================================================
// Probe Loop
// ============================================================================

/// Sends probes until the channel refuses a ping.
///
/// The first probe goes out one interval after start. `on_sample` runs once
/// per probe, on the probe task.
pub(crate) async fn run_probes<F>(
    monitor: Arc<HealthMonitor>,
    outbound: mpsc::UnboundedSender<ClientRequest>,
    settings: ProbeSettings,
    on_sample: F,
) where
    F: Fn(HealthSample) + Send + 'static,
{
    let mut ticker = time::interval_at(Instant::now() + settings.interval, settings.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let timestamp = Utc::now().timestamp_millis();
        let answer = monitor.arm(timestamp);
        let started = Instant::now();

        if outbound.send(ClientRequest::Ping { timestamp }).is_err() {
            debug!("Channel closed, stopping health probes");
            monitor.disarm();
            return;
        }

        let sample = match time::timeout(settings.timeout, answer).await {
            Ok(Ok(())) => {
                let latency = started.elapsed();
                HealthSample {
                    latency_ms: Some(u64::try_from(latency.as_millis()).unwrap_or(u64::MAX)),
                    quality: Quality::from_latency(latency, settings.poor_threshold),
                }
            }
            Ok(Err(_)) => {
                // Probe replaced or dropped; nothing to report
                continue;
            }
            Err(_) => {
                monitor.disarm();
                warn!(
                    timeout_ms = u64::try_from(settings.timeout.as_millis()).unwrap_or(u64::MAX),
                    "Health probe unanswered"
                );
                HealthSample {
                    latency_ms: None,
                    quality: Quality::Poor,
                }
            }
        };

        trace!(?sample, "Health sample");
        on_sample(sample);
    }
}

// ============================================================================
// Tests
// ============================================================================
