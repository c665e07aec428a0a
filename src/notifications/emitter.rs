//! Callback-based event emitter

use crate::core::sync::lock_recover;
use std::sync::{Arc, Mutex};

/// Identifies one subscription for later removal
pub type SubscriptionId = u64;

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct EmitterInner<T> {
    listeners: Vec<(SubscriptionId, Listener<T>)>,
    next_id: SubscriptionId,
}

/// Synchronous multi-listener event channel
///
/// Emission iterates a snapshot of the listener list, so a listener may
/// subscribe or unsubscribe (itself included) while an emission is in
/// flight; such changes take effect from the next emission.
pub struct Emitter<T> {
    inner: Arc<Mutex<EmitterInner<T>>>,
}

impl<T> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Default for Emitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Emitter<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(EmitterInner {
                listeners: Vec::new(),
                next_id: 1,
            })),
        }
    }

    /// Register a listener; returns the id used to unsubscribe
    pub fn on(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> SubscriptionId {
        let mut inner = lock_recover(&self.inner);
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener; true if it was still registered
    pub fn off(&self, id: SubscriptionId) -> bool {
        let mut inner = lock_recover(&self.inner);
        let before = inner.listeners.len();
        inner.listeners.retain(|(listener_id, _)| *listener_id != id);
        inner.listeners.len() != before
    }

    /// Notify every listener, in subscription order, on the current thread
    pub fn emit(&self, value: &T) {
        let snapshot: Vec<Listener<T>> = {
            let inner = lock_recover(&self.inner);
            inner
                .listeners
                .iter()
                .map(|(_, listener)| listener.clone())
                .collect()
        };
        for listener in snapshot {
            (*listener)(value);
        }
    }

    pub fn clear(&self) {
        lock_recover(&self.inner).listeners.clear();
    }

    pub fn listener_count(&self) -> usize {
        lock_recover(&self.inner).listeners.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_emit_notifies_in_subscription_order() {
        let emitter: Emitter<u32> = Emitter::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let sink = order.clone();
            emitter.on(move |value| sink.lock().unwrap().push((tag, *value)));
        }

        emitter.emit(&7);

        assert_eq!(
            *order.lock().unwrap(),
            vec![("first", 7), ("second", 7), ("third", 7)]
        );
    }

    #[test]
    fn test_off_removes_listener() {
        let emitter: Emitter<u32> = Emitter::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let sink = calls.clone();
        let id = emitter.on(move |_| {
            sink.fetch_add(1, Ordering::SeqCst);
        });

        emitter.emit(&1);
        assert!(emitter.off(id));
        assert!(!emitter.off(id));
        emitter.emit(&2);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_during_emission_is_safe() {
        let emitter: Emitter<u32> = Emitter::new();
        let calls = Arc::new(AtomicUsize::new(0));

        // the first listener unsubscribes the second mid-emission; the
        // snapshot still delivers the current emission to both
        let self_removing = emitter.clone();
        let second_id = Arc::new(Mutex::new(None::<SubscriptionId>));
        let shared_id = second_id.clone();
        emitter.on(move |_| {
            if let Some(id) = *shared_id.lock().unwrap() {
                self_removing.off(id);
            }
        });

        let sink = calls.clone();
        let id = emitter.on(move |_| {
            sink.fetch_add(1, Ordering::SeqCst);
        });
        *second_id.lock().unwrap() = Some(id);

        emitter.emit(&1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        emitter.emit(&2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(emitter.listener_count(), 1);
    }

    #[test]
    fn test_subscribe_during_emission_takes_effect_next_time() {
        let emitter: Emitter<u32> = Emitter::new();
        let late_calls = Arc::new(AtomicUsize::new(0));

        let registrar = emitter.clone();
        let sink = late_calls.clone();
        let registered = Arc::new(AtomicUsize::new(0));
        let once = registered.clone();
        emitter.on(move |_| {
            if once.fetch_add(1, Ordering::SeqCst) == 0 {
                let sink = sink.clone();
                registrar.on(move |_| {
                    sink.fetch_add(1, Ordering::SeqCst);
                });
            }
        });

        emitter.emit(&1);
        assert_eq!(late_calls.load(Ordering::SeqCst), 0);

        emitter.emit(&2);
        assert_eq!(late_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clear_drops_all_listeners() {
        let emitter: Emitter<u32> = Emitter::new();
        emitter.on(|_| {});
        emitter.on(|_| {});
        assert_eq!(emitter.listener_count(), 2);

        emitter.clear();
        assert_eq!(emitter.listener_count(), 0);
    }
}
