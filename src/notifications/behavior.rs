//! Behavior emitter
//!
//! Emitter variant that retains its last value: new subscribers are replayed
//! the retained value synchronously, derived sub-streams project and dedupe,
//! and timer-wrapped subscriptions provide debounced (trailing-edge) and
//! throttled (leading-edge) delivery.

use crate::core::sync::lock_recover;
use crate::notifications::emitter::{Emitter, SubscriptionId};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub struct BehaviorEmitter<T> {
    emitter: Emitter<T>,
    last: Arc<Mutex<Option<T>>>,
}

impl<T> Clone for BehaviorEmitter<T> {
    fn clone(&self) -> Self {
        Self {
            emitter: self.emitter.clone(),
            last: self.last.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Default for BehaviorEmitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync + 'static> BehaviorEmitter<T> {
    pub fn new() -> Self {
        Self {
            emitter: Emitter::new(),
            last: Arc::new(Mutex::new(None)),
        }
    }

    /// Subscribe; the retained value, if any, is replayed synchronously
    /// before the subscription is recorded
    pub fn on(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> SubscriptionId {
        let listener = Arc::new(listener);
        if let Some(value) = self.value() {
            (*listener)(&value);
        }
        let shared = listener.clone();
        self.emitter.on(move |value| (*shared)(value))
    }

    pub fn off(&self, id: SubscriptionId) -> bool {
        self.emitter.off(id)
    }

    /// Last emitted value, if any
    pub fn value(&self) -> Option<T> {
        lock_recover(&self.last).clone()
    }

    pub fn emit(&self, value: T) {
        *lock_recover(&self.last) = Some(value.clone());
        self.emitter.emit(&value);
    }

    pub fn clear(&self) {
        self.emitter.clear();
    }

    pub fn listener_count(&self) -> usize {
        self.emitter.listener_count()
    }

    /// Subscribe with trailing-edge debounce: each emission (re)schedules
    /// delivery of the latest value after `window` of quiet
    ///
    /// Requires a running tokio runtime.
    pub fn on_debounced(
        &self,
        listener: impl Fn(&T) + Send + Sync + 'static,
        window: Duration,
    ) -> SubscriptionId {
        let listener = Arc::new(listener);
        let pending: Arc<Mutex<Option<tokio::task::JoinHandle<()>>>> =
            Arc::new(Mutex::new(None));
        self.on(move |value| {
            let value = value.clone();
            let listener = listener.clone();
            let mut slot = lock_recover(&pending);
            if let Some(handle) = slot.take() {
                handle.abort();
            }
            *slot = Some(tokio::spawn(async move {
                tokio::time::sleep(window).await;
                (*listener)(&value);
            }));
        })
    }

    /// Subscribe with leading-edge throttle: emissions inside `window` of
    /// the last delivery are dropped
    pub fn on_throttled(
        &self,
        listener: impl Fn(&T) + Send + Sync + 'static,
        window: Duration,
    ) -> SubscriptionId {
        let last_fired: Arc<Mutex<Option<Instant>>> = Arc::new(Mutex::new(None));
        self.on(move |value| {
            let mut last = lock_recover(&last_fired);
            let due = last.map_or(true, |at| at.elapsed() >= window);
            if due {
                *last = Some(Instant::now());
                drop(last);
                listener(value);
            }
        })
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> BehaviorEmitter<T> {
    /// Emit only when the value differs from the retained one
    pub fn emit_if_changed(&self, value: T) {
        let changed = lock_recover(&self.last).as_ref() != Some(&value);
        if changed {
            self.emit(value);
        }
    }

    /// Derived sub-stream: projects each emission through `selector` and
    /// dedupes consecutive equal projections
    pub fn select<U>(
        &self,
        selector: impl Fn(&T) -> U + Send + Sync + 'static,
    ) -> BehaviorEmitter<U>
    where
        U: Clone + PartialEq + Send + Sync + 'static,
    {
        let derived: BehaviorEmitter<U> = BehaviorEmitter::new();
        let downstream = derived.clone();
        self.on(move |value| downstream.emit_if_changed(selector(value)));
        derived
    }
}
