//! Connection state machine and status snapshot.
//!
//! ```text
//! Disconnected ─connect()─► Connecting ─ok─► Connected
//!       ▲                        │               │ transport drop
//!       │ disconnect()           │ err           ▼
//!       └──────────────── Reconnecting{n} ◄──────┘
//!                               │ n == max_attempts, fails
//!                               ▼
//!                         FailedPermanent ─reconnect()─► Connecting
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::identifiers::{ChannelId, TenantId, TopicId};

// ============================================================================
// Backoff
// ============================================================================

/// Delay before reconnect attempt `attempt` (1-indexed).
///
/// `min(base * 2^(attempt - 1), max)`. Attempt `0` is treated as `1`.
#[must_use]
pub fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let exponent = attempt.saturating_sub(1).min(31);
    base.checked_mul(1u32 << exponent)
        .map_or(max, |delay| delay.min(max))
}

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ConnectionState {
    /// No channel and nothing scheduled.
    Disconnected,
    /// A caller-initiated open is in flight.
    Connecting,
    /// Channel is live.
    Connected,
    /// Automatic reconnect attempt `attempt` is scheduled or in flight.
    Reconnecting {
        /// 1-indexed attempt number.
        attempt: u32,
    },
    /// Attempts exhausted; only `reconnect()` leaves this state.
    FailedPermanent,
}

impl ConnectionState {
    /// Returns `true` if the channel is live.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

// ============================================================================
// Quality
// ============================================================================

/// Advisory classification of channel responsiveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// Round trips below the threshold.
    Good,
    /// Slow or unanswered probes, or reconnecting.
    Poor,
    /// Channel unusable; fallback active.
    Failed,
}

impl Quality {
    /// Classifies a measured round trip.
    #[inline]
    #[must_use]
    pub fn from_latency(latency: Duration, poor_threshold: Duration) -> Self {
        if latency < poor_threshold {
            Self::Good
        } else {
            Self::Poor
        }
    }
}

// ============================================================================
// ConnectionRecord
// ============================================================================

/// Mutable connection bookkeeping owned by the client.
#[derive(Debug, Clone)]
pub(crate) struct ConnectionRecord {
    pub is_connected: bool,
    pub channel_id: Option<ChannelId>,
    pub tenant_id: Option<TenantId>,
    pub last_connected_at: Option<DateTime<Utc>>,
    pub reconnect_attempts: u32,
    pub quality: Quality,
    pub fallback_active: bool,
    pub fallback_permanent: bool,
    pub state: ConnectionState,
}

impl ConnectionRecord {
    pub(crate) const fn new() -> Self {
        Self {
            is_connected: false,
            channel_id: None,
            tenant_id: None,
            last_connected_at: None,
            reconnect_attempts: 0,
            quality: Quality::Failed,
            fallback_active: false,
            fallback_permanent: false,
            state: ConnectionState::Disconnected,
        }
    }

    /// Records a successful open. Fallback flags are left to the coordinator.
    pub(crate) fn mark_connected(&mut self, channel_id: ChannelId) {
        self.is_connected = true;
        self.channel_id = Some(channel_id);
        self.last_connected_at = Some(Utc::now());
        self.reconnect_attempts = 0;
        self.quality = Quality::Good;
        self.state = ConnectionState::Connected;
    }

    /// Records channel loss. Keeps `channel_id` in step with `is_connected`.
    pub(crate) fn mark_disconnected(&mut self, state: ConnectionState) {
        self.is_connected = false;
        self.channel_id = None;
        self.state = state;
    }
}

// ============================================================================
// Status
// ============================================================================

/// Point-in-time snapshot returned by
/// [`RealtimeClient::status`](crate::RealtimeClient::status).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    /// Channel is live.
    pub is_connected: bool,
    /// Id of the live channel.
    pub channel_id: Option<ChannelId>,
    /// Confirmed topics, sorted.
    pub subscribed_topics: Vec<TopicId>,
    /// Tenant of the current or last session.
    pub tenant_id: Option<TenantId>,
    /// Host should be polling.
    pub fallback_active: bool,
    /// Reconnection gave up; only `reconnect()` clears this.
    pub fallback_permanent: bool,
    /// Latest quality classification.
    pub quality: Quality,
    /// Time of the last successful open.
    pub last_connected_at: Option<DateTime<Utc>>,
    /// Automatic attempts since the last successful open.
    pub reconnect_attempts: u32,
    /// Lifecycle state.
    pub state: ConnectionState,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    const BASE: Duration = Duration::from_millis(1000);
    const MAX: Duration = Duration::from_millis(30_000);

    #[test]
    fn test_backoff_sequence() {
        let delays: Vec<u128> = (1..=5)
            .map(|n| backoff_delay(n, BASE, MAX).as_millis())
            .collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 16000]);
    }

    #[test]
    fn test_backoff_is_capped() {
        assert_eq!(backoff_delay(6, BASE, MAX), MAX);
        assert_eq!(backoff_delay(40, BASE, MAX), MAX);
        assert_eq!(backoff_delay(u32::MAX, BASE, MAX), MAX);
    }

    #[test]
    fn test_backoff_attempt_zero_is_base() {
        assert_eq!(backoff_delay(0, BASE, MAX), BASE);
    }

    #[test]
    fn test_quality_from_latency() {
        let threshold = Duration::from_millis(1000);
        assert_eq!(
            Quality::from_latency(Duration::from_millis(120), threshold),
            Quality::Good
        );
        assert_eq!(
            Quality::from_latency(Duration::from_millis(999), threshold),
            Quality::Good
        );
        assert_eq!(
            Quality::from_latency(Duration::from_millis(1000), threshold),
            Quality::Poor
        );
    }

    #[test]
    fn test_record_invariant() {
        let mut record = ConnectionRecord::new();
        record.mark_connected(ChannelId::from("ch-1"));
        assert!(record.is_connected);
        assert_eq!(record.quality, Quality::Good);

        record.mark_disconnected(ConnectionState::Disconnected);
        assert!(!record.is_connected);
        assert!(record.channel_id.is_none());
    }

    #[test]
    fn test_status_serializes_camel_case() {
        let status = Status {
            is_connected: false,
            channel_id: None,
            subscribed_topics: vec![TopicId::from("inst-1")],
            tenant_id: Some(TenantId::from("hotel-1")),
            fallback_active: true,
            fallback_permanent: false,
            quality: Quality::Failed,
            last_connected_at: None,
            reconnect_attempts: 2,
            state: ConnectionState::Reconnecting { attempt: 2 },
        };

        let json = serde_json::to_value(&status).expect("serialize");
        assert_eq!(json["fallbackActive"], true);
        assert_eq!(json["quality"], "failed");
        assert_eq!(json["subscribedTopics"][0], "inst-1");
        assert_eq!(json["state"]["state"], "reconnecting");
        assert_eq!(json["state"]["attempt"], 2);
    }

    proptest! {
        #[test]
        fn prop_backoff_monotonic_and_bounded(attempt in 1u32..64) {
            let current = backoff_delay(attempt, BASE, MAX);
            let next = backoff_delay(attempt + 1, BASE, MAX);
            prop_assert!(current >= BASE);
            prop_assert!(current <= MAX);
            prop_assert!(next >= current);
        }
    }
}
