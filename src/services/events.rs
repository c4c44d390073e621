//! Process-wide publish/subscribe channel keyed by event name.
//!
//! Publishing is synchronous: every listener currently subscribed to the
//! event is invoked in subscription order before `publish` returns. There is
//! no persistence and no replay. A panicking listener is logged and does not
//! prevent later listeners from running.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use strum::{AsRefStr, Display, EnumString};

/// Names of the invalidation events exchanged between screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum EventName {
    /// A garment was added, edited or deleted.
    InventoryChanged,
    /// An outfit job completed or a garment was added.
    HomeRefresh,
    /// The stored region was edited.
    RegionChanged,
    /// The very first garment registration succeeded.
    FirstUploadDone,
}

/// An event with its payload, which is either absent or a single primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    InventoryChanged,
    HomeRefresh,
    RegionChanged(String),
    FirstUploadDone,
}

impl AppEvent {
    pub fn name(&self) -> EventName {
        match self {
            AppEvent::InventoryChanged => EventName::InventoryChanged,
            AppEvent::HomeRefresh => EventName::HomeRefresh,
            AppEvent::RegionChanged(_) => EventName::RegionChanged,
            AppEvent::FirstUploadDone => EventName::FirstUploadDone,
        }
    }
}

/// Publishing side of the bus, injected into anything that mutates data.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: AppEvent);
}

type Listener = Arc<dyn Fn(&AppEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: HashMap<EventName, Vec<(u64, Listener)>>,
}

impl Registry {
    fn remove(&mut self, name: EventName, id: u64) {
        if let Some(listeners) = self.listeners.get_mut(&name) {
            listeners.retain(|(listener_id, _)| *listener_id != id);
        }
    }
}

/// In-process event bus. Clones share the same subscriber registry.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for `name`.
    ///
    /// The listener stays registered until the returned [`Subscription`] is
    /// dropped or explicitly unsubscribed.
    #[must_use = "dropping the subscription unsubscribes the listener"]
    pub fn subscribe<F>(&self, name: EventName, listener: F) -> Subscription
    where
        F: Fn(&AppEvent) + Send + Sync + 'static,
    {
        let mut registry = self.lock_registry();
        let id = registry.next_id;
        registry.next_id += 1;
        registry
            .listeners
            .entry(name)
            .or_default()
            .push((id, Arc::new(listener)));

        tracing::debug!(event = %name, subscription_id = id, "Listener subscribed");

        Subscription {
            registry: Arc::downgrade(&self.registry),
            name,
            id,
            active: true,
        }
    }

    pub fn subscriber_count(&self, name: EventName) -> usize {
        self.lock_registry().listeners.get(&name).map_or(0, Vec::len)
    }

    fn lock_registry(&self) -> MutexGuard<'_, Registry> {
        match self.registry.lock() {
            Ok(registry) => registry,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn is_registered(&self, name: EventName, id: u64) -> bool {
        self.lock_registry()
            .listeners
            .get(&name)
            .is_some_and(|ls| ls.iter().any(|(listener_id, _)| *listener_id == id))
    }
}

impl EventSink for EventBus {
    fn publish(&self, event: AppEvent) {
        let name = event.name();
        // Snapshot under the lock so listeners may subscribe or unsubscribe
        // while being invoked.
        let listeners: Vec<(u64, Listener)> = self
            .lock_registry()
            .listeners
            .get(&name)
            .map(|ls| ls.iter().map(|(id, l)| (*id, Arc::clone(l))).collect())
            .unwrap_or_default();

        metrics::counter!("events_published_total", "event" => name.to_string()).increment(1);
        tracing::debug!(event = %name, listeners = listeners.len(), "Publishing event");

        for (id, listener) in listeners {
            // Released by an earlier listener during this publish.
            if !self.is_registered(name, id) {
                continue;
            }
            if catch_unwind(AssertUnwindSafe(|| listener(&event))).is_err() {
                tracing::error!(event = %name, "Event listener panicked");
            }
        }
    }
}

/// Scoped registration of one listener.
///
/// Holds only a weak back-reference to the bus; dropping it removes the
/// listener, so release happens on every exit path.
pub struct Subscription {
    registry: Weak<Mutex<Registry>>,
    name: EventName,
    id: u64,
    active: bool,
}

impl Subscription {
    pub fn event(&self) -> EventName {
        self.name
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(registry) = self.registry.upgrade() {
            let mut registry = match registry.lock() {
                Ok(registry) => registry,
                Err(poisoned) => poisoned.into_inner(),
            };
            registry.remove(self.name, self.id);
            tracing::debug!(event = %self.name, subscription_id = self.id, "Listener unsubscribed");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}
