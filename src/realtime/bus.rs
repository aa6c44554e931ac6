//! Event dispatch bus.
//!
//! Decouples channel events from application listeners. Several listeners
//! may register for the same [`EventKind`]; each is invoked in registration
//! order and independently removable through its [`ListenerHandle`].
//!
//! A panicking listener is caught and logged; the remaining listeners for the
//! same event still run.

// ============================================================================
// Imports
// ============================================================================

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{error, trace};

use crate::identifiers::ListenerId;

use super::events::{EventKind, RealtimeEvent};

// ============================================================================
// Types
// ============================================================================

/// Listener callback.
pub type Listener = Arc<dyn Fn(&RealtimeEvent) + Send + Sync>;

type ListenerMap = FxHashMap<EventKind, Vec<(ListenerId, Listener)>>;

// ============================================================================
// EventBus
// ============================================================================

/// Fan-out of [`RealtimeEvent`]s to registered listeners.
#[derive(Default)]
pub struct EventBus {
    listeners: Mutex<ListenerMap>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.lock();
        let total: usize = listeners.values().map(Vec::len).sum();
        f.debug_struct("EventBus")
            .field("kinds", &listeners.len())
            .field("listeners", &total)
            .finish()
    }
}

impl EventBus {
    /// Creates an empty bus.
    #[inline]
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers `listener` for events of `kind`.
    ///
    /// Returns a handle that removes exactly this registration.
    pub fn add_listener<F>(self: &Arc<Self>, kind: EventKind, listener: F) -> ListenerHandle
    where
        F: Fn(&RealtimeEvent) + Send + Sync + 'static,
    {
        let id = ListenerId::next();

        self.listeners
            .lock()
            .entry(kind)
            .or_default()
            .push((id, Arc::new(listener)));

        trace!(?kind, listener = %id, "Listener registered");

        ListenerHandle {
            bus: Arc::downgrade(self),
            kind,
            id,
        }
    }

    /// Removes one registration.
    ///
    /// Returns `false` if it was already gone.
    pub fn remove_listener(&self, kind: EventKind, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();

        let Some(entries) = listeners.get_mut(&kind) else {
            return false;
        };

        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        let removed = entries.len() != before;

        if entries.is_empty() {
            listeners.remove(&kind);
        }

        removed
    }

    /// Removes every listener.
    pub fn clear(&self) {
        self.listeners.lock().clear();
    }

    /// Returns the number of listeners registered for `kind`.
    #[must_use]
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners.lock().get(&kind).map_or(0, Vec::len)
    }

    /// Delivers `event` to every listener of its kind.
    ///
    /// The listener list is snapshotted first, so listeners may register or
    /// remove listeners while being invoked. Returns how many listeners
    /// completed without panicking.
    pub fn dispatch(&self, event: &RealtimeEvent) -> usize {
        let kind = event.kind();

        let snapshot: Vec<(ListenerId, Listener)> = match self.listeners.lock().get(&kind) {
            Some(entries) => entries.clone(),
            None => return 0,
        };

        let mut delivered = 0;

        for (id, listener) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(()) => delivered += 1,
                Err(payload) => {
                    error!(
                        ?kind,
                        listener = %id,
                        panic = panic_message(payload.as_ref()),
                        "Listener panicked"
                    );
                }
            }
        }

        delivered
    }
}

/// Extracts a printable panic message.
fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

// ============================================================================
// ListenerHandle
// ============================================================================

/// Handle returned by listener registration.
///
/// Dropping the handle keeps the listener registered; call
/// [`remove`](Self::remove) to unregister it.
#[derive(Debug, Clone)]
pub struct ListenerHandle {
    bus: Weak<EventBus>,
    kind: EventKind,
    id: ListenerId,
}

impl ListenerHandle {
    /// Returns the listener ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Returns the kind this listener is registered for.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Unregisters the listener.
    ///
    /// Returns `false` if it was already removed or the bus is gone.
    pub fn remove(self) -> bool {
        self.bus
            .upgrade()
            .is_some_and(|bus| bus.remove_listener(self.kind, self.id))
    }
}

// ============================================================================
// Tests
// ============================================================================
