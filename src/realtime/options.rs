//! Connection manager options.
//!
//! Tunables for reconnection backoff, health probing, validation policy and
//! fallback polling hints.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use hotel_realtime::RealtimeOptions;
//!
//! let options = RealtimeOptions::new()
//!     .with_max_attempts(8)
//!     .with_max_delay(Duration::from_secs(60))
//!     .with_health_interval(Duration::from_secs(15));
//!
//! options.validate()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};

// ============================================================================
// Defaults
// ============================================================================

/// First reconnect delay.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Reconnect delay ceiling.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(30_000);

/// Automatic reconnect attempts before permanent fallback.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Bound on a single channel open.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

/// Interval between health probes.
pub const DEFAULT_HEALTH_INTERVAL: Duration = Duration::from_secs(30);

/// Wait for a pong before classifying the probe as poor.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Latency at or above which quality is poor.
pub const DEFAULT_POOR_LATENCY_THRESHOLD: Duration = Duration::from_millis(1000);

/// Polling cadence suggested to the host while in fallback.
pub const DEFAULT_FALLBACK_POLL_INTERVAL: Duration = Duration::from_secs(10);

// ============================================================================
// ValidationPolicy
// ============================================================================

/// What to do when the topic validation call itself fails.
///
/// A definitive `isValid: false` answer always rejects the topic; this
/// only governs network errors, timeouts and malformed answers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValidationPolicy {
    /// Treat the topic as valid and subscribe anyway.
    #[default]
    FailOpen,
    /// Reject the topic.
    FailClosed,
}

// ============================================================================
// RealtimeOptions
// ============================================================================

/// Connection manager configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealtimeOptions {
    /// Delay before the first reconnect attempt.
    pub base_delay: Duration,

    /// Upper bound for any reconnect delay.
    pub max_delay: Duration,

    /// Reconnect attempts before giving up and entering permanent fallback.
    pub max_attempts: u32,

    /// Timeout applied to each channel open.
    pub connect_timeout: Duration,

    /// Probe interval; `None` disables health monitoring.
    pub health_interval: Option<Duration>,

    /// Time to wait for a pong.
    pub probe_timeout: Duration,

    /// Round trips at or above this are classified as poor.
    pub poor_latency_threshold: Duration,

    /// Behavior when topic validation errors out.
    pub validation_policy: ValidationPolicy,

    /// Polling cadence suggested in fallback notices.
    pub fallback_poll_interval: Duration,
}

impl Default for RealtimeOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl RealtimeOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            health_interval: Some(DEFAULT_HEALTH_INTERVAL),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            poor_latency_threshold: DEFAULT_POOR_LATENCY_THRESHOLD,
            validation_policy: ValidationPolicy::FailOpen,
            fallback_poll_interval: DEFAULT_FALLBACK_POLL_INTERVAL,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl RealtimeOptions {
    /// Sets the first reconnect delay.
    #[inline]
    #[must_use]
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Sets the reconnect delay ceiling.
    #[inline]
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the number of automatic reconnect attempts.
    #[inline]
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the channel open timeout.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the health probe interval.
    #[inline]
    #[must_use]
    pub fn with_health_interval(mut self, interval: Duration) -> Self {
        self.health_interval = Some(interval);
        self
    }

    /// Disables health probing.
    #[inline]
    #[must_use]
    pub fn without_health_monitor(mut self) -> Self {
        self.health_interval = None;
        self
    }

    /// Sets how long to wait for a pong.
    #[inline]
    #[must_use]
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Sets the latency threshold for poor quality.
    #[inline]
    #[must_use]
    pub fn with_poor_latency_threshold(mut self, threshold: Duration) -> Self {
        self.poor_latency_threshold = threshold;
        self
    }

    /// Sets the validation failure policy.
    #[inline]
    #[must_use]
    pub fn with_validation_policy(mut self, policy: ValidationPolicy) -> Self {
        self.validation_policy = policy;
        self
    }

    /// Sets the polling cadence suggested while in fallback.
    #[inline]
    #[must_use]
    pub fn with_fallback_poll_interval(mut self, interval: Duration) -> Self {
        self.fallback_poll_interval = interval;
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl RealtimeOptions {
    /// Checks the options for consistency.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        if self.base_delay.is_zero() {
            return Err(Error::config("Reconnect base delay must be > 0"));
        }
        if self.max_delay < self.base_delay {
            return Err(Error::config(
                "Reconnect max delay must be >= reconnect base delay",
            ));
        }
        if self.connect_timeout.is_zero() {
            return Err(Error::config("Connect timeout must be > 0"));
        }
        if let Some(interval) = self.health_interval {
            if interval.is_zero() {
                return Err(Error::config("Health interval must be > 0"));
            }
            if self.probe_timeout.is_zero() || self.probe_timeout > interval {
                return Err(Error::config(
                    "Probe timeout must be > 0 and <= health interval",
                ));
            }
        }
        if self.fallback_poll_interval.is_zero() {
            return Err(Error::config("Fallback poll interval must be > 0"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
