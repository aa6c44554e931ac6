//! Fallback coordinator.
//!
//! Tells dependent code when to stop trusting the channel and fetch data by
//! polling instead. The coordinator only flips flags on the connection record
//! and produces the [`FallbackNotice`] to broadcast; it never polls.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tracing::{info, warn};

use super::events::FallbackNotice;
use super::state::{ConnectionRecord, Quality};

// ============================================================================
// FallbackCoordinator
// ============================================================================

/// Computes fallback transitions.
///
/// Callers hold the record lock while calling in, then dispatch the returned
/// notice after releasing it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FallbackCoordinator {
    poll_interval: Duration,
}

impl FallbackCoordinator {
    #[inline]
    pub(crate) const fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    /// Activates fallback. Permanence is sticky until [`disable`](Self::disable).
    pub(crate) fn enable(
        &self,
        record: &mut ConnectionRecord,
        permanent: bool,
        reason: &str,
    ) -> FallbackNotice {
        record.fallback_active = true;
        record.fallback_permanent |= permanent;
        record.quality = Quality::Failed;

        warn!(permanent = record.fallback_permanent, reason, "Fallback mode enabled");

        FallbackNotice {
            enabled: true,
            permanent: record.fallback_permanent,
            reason: reason.to_string(),
            suggested_poll_interval: self.poll_interval,
        }
    }

    /// Deactivates fallback.
    ///
    /// Returns `None` if fallback was not active, so nothing is broadcast.
    pub(crate) fn disable(
        &self,
        record: &mut ConnectionRecord,
        reason: &str,
    ) -> Option<FallbackNotice> {
        let was_active = record.fallback_active;
        record.fallback_active = false;
        record.fallback_permanent = false;

        if !was_active {
            return None;
        }

        info!(reason, "Fallback mode disabled");

        Some(FallbackNotice {
            enabled: false,
            permanent: false,
            reason: reason.to_string(),
            suggested_poll_interval: self.poll_interval,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
