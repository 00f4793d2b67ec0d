//! Last-value channel with replay-on-subscribe.

use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::error;

/// Callback invoked with each published value.
pub type Observer<V> = Box<dyn FnMut(&V) + Send>;

/// Identifies one registration on a channel.
pub type SubscriptionId = u64;

/// Holds the last published value of one kind and its observers.
pub(crate) struct Channel<V> {
    current: Option<V>,
    observers: Vec<(SubscriptionId, Observer<V>)>,
}

impl<V> Default for Channel<V> {
    fn default() -> Self {
        Self {
            current: None,
            observers: Vec::new(),
        }
    }
}

impl<V> Channel<V> {
    /// Registers `observer`, replaying the current value to it first if one exists.
    pub(crate) fn subscribe(&mut self, id: SubscriptionId, mut observer: Observer<V>) {
        if let Some(value) = &self.current {
            notify(id, &mut observer, value);
        }
        self.observers.push((id, observer));
    }

    /// Removes a registration; returns whether it was present.
    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(registered, _)| *registered != id);
        self.observers.len() != before
    }

    /// Stores `value` and hands it to every observer in registration order.
    pub(crate) fn publish(&mut self, value: V) {
        let value = &*self.current.insert(value);
        for (id, observer) in self.observers.iter_mut() {
            notify(*id, observer, value);
        }
    }

    /// Mutates the stored value in place, then republishes it.
    pub(crate) fn modify(&mut self, change: impl FnOnce(&mut V)) -> bool {
        let Some(value) = self.current.as_mut() else {
            return false;
        };
        change(&mut *value);
        let value = &*value;
        for (id, observer) in self.observers.iter_mut() {
            notify(*id, observer, value);
        }
        true
    }

    pub(crate) fn current(&self) -> Option<&V> {
        self.current.as_ref()
    }

    pub(crate) fn observer_count(&self) -> usize {
        self.observers.len()
    }
}

/// Runs one observer; a panic is logged and contained so later observers still run.
fn notify<V>(id: SubscriptionId, observer: &mut Observer<V>, value: &V) {
    if catch_unwind(AssertUnwindSafe(|| observer(value))).is_err() {
        error!(subscription = id, "Observer panicked; value not delivered to it");
    }
}
