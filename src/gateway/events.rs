//! Unauthorized event bus.
//!
//! A typed observer list carrying the "session cannot be recovered" signal.
//! Emissions are debounced to one per rendering frame so a burst of
//! simultaneous 401s produces a single reaction.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::time::Instant;

use crate::sync::LockExt;

/// One rendering frame at 60 Hz.
pub const DEFAULT_FRAME: Duration = Duration::from_millis(16);

type Listener = Arc<dyn Fn() + Send + Sync>;

struct BusInner {
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_id: AtomicU64,
    frame: Duration,
    last_dispatch: Mutex<Option<Instant>>,
}

/// Process-wide (per gateway) unauthorized signal. Cloning shares the bus.
#[derive(Clone)]
pub struct UnauthorizedBus {
    inner: Arc<BusInner>,
}

impl Default for UnauthorizedBus {
    fn default() -> Self {
        Self::new()
    }
}

impl UnauthorizedBus {
    pub fn new() -> Self {
        Self::with_frame(DEFAULT_FRAME)
    }

    pub fn with_frame(frame: Duration) -> Self {
        Self {
            inner: Arc::new(BusInner {
                listeners: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
                frame,
                last_dispatch: Mutex::new(None),
            }),
        }
    }

    /// Broadcast the signal. Returns `false` when suppressed because a dispatch
    /// already happened within the current frame.
    pub fn emit_unauthorized(&self) -> bool {
        {
            let now = Instant::now();
            let mut last = self.inner.last_dispatch.lock_or_recover();
            if let Some(previous) = *last {
                if now.duration_since(previous) < self.inner.frame {
                    tracing::trace!("Unauthorized signal debounced");
                    return false;
                }
            }
            *last = Some(now);
        }

        // Snapshot so listeners may (un)subscribe while being called.
        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .lock_or_recover()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        tracing::debug!(listeners = listeners.len(), "Dispatching unauthorized signal");
        for listener in listeners {
            listener();
        }
        true
    }

    /// Register a listener. It stays registered until the returned handle is
    /// dropped or [`Subscription::unsubscribe`] is called.
    pub fn on_unauthorized<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .listeners
            .lock_or_recover()
            .push((id, Arc::new(callback)));
        Subscription {
            bus: Arc::downgrade(&self.inner),
            id: Some(id),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock_or_recover().len()
    }
}

/// Registration handle returned by [`UnauthorizedBus::on_unauthorized`].
#[must_use = "dropping a Subscription unregisters the listener"]
pub struct Subscription {
    bus: Weak<BusInner>,
    id: Option<u64>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.remove();
    }

    /// Keep the listener registered for the lifetime of the bus.
    pub fn detach(mut self) {
        self.id = None;
    }

    fn remove(&mut self) {
        let Some(id) = self.id.take() else {
            return;
        };
        if let Some(bus) = self.bus.upgrade() {
            bus.listeners
                .lock_or_recover()
                .retain(|(listener_id, _)| *listener_id != id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.remove();
    }
}
