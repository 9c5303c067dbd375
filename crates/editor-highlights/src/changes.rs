//! Change notification plumbing.
//!
//! Producers own a [`Listeners`] registry and call [`Listeners::fire`]; consumers subscribe with a
//! callback and keep the returned [`ListenerId`] to unsubscribe when they go away. Callbacks may
//! be fired from any thread.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// "Highlights changed in `[start, end)`" notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightsChange {
    /// Start offset of the affected area.
    pub start: usize,
    /// End offset (exclusive) of the affected area; `usize::MAX` means "to the end".
    pub end: usize,
}

impl HighlightsChange {
    /// Create a change record.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// A change covering the whole document.
    pub fn everything() -> Self {
        Self::new(0, usize::MAX)
    }
}

/// Subscription handle returned by [`Listeners::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Callback type stored by [`Listeners`].
pub type ListenerCallback<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// A thread-safe registry of callbacks for events of type `E`.
pub struct Listeners<E> {
    callbacks: Mutex<Vec<(ListenerId, ListenerCallback<E>)>>,
    next_id: AtomicU64,
}

impl<E> Listeners<E> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            callbacks: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register `callback`.
    pub fn subscribe<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(callback)));
        id
    }

    /// Remove a callback; returns `false` if `id` was not registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut callbacks = self
            .callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let before = callbacks.len();
        callbacks.retain(|(existing, _)| *existing != id);
        callbacks.len() != before
    }

    /// Number of registered callbacks.
    pub fn len(&self) -> usize {
        self.callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if nobody is subscribed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke every callback with `event`.
    ///
    /// Callbacks run outside the registry lock, so they may subscribe or unsubscribe.
    pub fn fire(&self, event: &E) {
        let snapshot: Vec<ListenerCallback<E>> = self
            .callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in snapshot {
            callback(event);
        }
    }
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Listeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("len", &self.len())
            .finish()
    }
}

/// Registry for [`HighlightsChange`] notifications.
pub type ChangeSupport = Listeners<HighlightsChange>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_fire_unsubscribe() {
        let support = ChangeSupport::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let id = support.subscribe(move |change| {
            seen_clone.lock().unwrap().push(*change);
        });

        support.fire(&HighlightsChange::new(3, 7));
        assert_eq!(support.len(), 1);
        assert!(support.unsubscribe(id));
        assert!(!support.unsubscribe(id));
        support.fire(&HighlightsChange::new(8, 9));

        assert_eq!(*seen.lock().unwrap(), vec![HighlightsChange::new(3, 7)]);
        assert!(support.is_empty());
    }
}
