//! Pointer Handler Buckets
//!
//! Handler sets bind to modes (live only while one of those modes is
//! active) or to "always" (live regardless of mode), each within a scope:
//! the whole viewer or a single page. Queries merge always-handlers with
//! the active mode's handlers and invoke every contributing callback in
//! registration order.

use std::sync::Arc;

/// Abstract pointer event payload
///
/// Coordinates are viewer-relative for global-scope handlers and
/// page-relative for page-scope handlers; the DOM adapter does the
/// translation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerEventData {
    pub x: f64,
    pub y: f64,
    pub page_index: Option<usize>,
}

pub type PointerCallback = Arc<dyn Fn(&PointerEventData) + Send + Sync>;
pub type LifecycleCallback = Arc<dyn Fn() + Send + Sync>;

/// One handler set; every callback is optional
#[derive(Clone, Default)]
pub struct PointerEventHandlers {
    pub on_pointer_down: Option<PointerCallback>,
    pub on_pointer_up: Option<PointerCallback>,
    pub on_pointer_move: Option<PointerCallback>,
    pub on_pointer_enter: Option<PointerCallback>,
    pub on_pointer_leave: Option<PointerCallback>,
    pub on_pointer_cancel: Option<PointerCallback>,
    /// Fired when this handler set becomes live after a mode change
    pub on_handler_active_start: Option<LifecycleCallback>,
    /// Fired when this handler set stops being live before a mode change
    pub on_handler_active_end: Option<LifecycleCallback>,
}

impl PointerEventHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pointer_down(mut self, callback: impl Fn(&PointerEventData) + Send + Sync + 'static) -> Self {
        self.on_pointer_down = Some(Arc::new(callback));
        self
    }

    pub fn with_pointer_up(mut self, callback: impl Fn(&PointerEventData) + Send + Sync + 'static) -> Self {
        self.on_pointer_up = Some(Arc::new(callback));
        self
    }

    pub fn with_pointer_move(mut self, callback: impl Fn(&PointerEventData) + Send + Sync + 'static) -> Self {
        self.on_pointer_move = Some(Arc::new(callback));
        self
    }

    pub fn with_pointer_enter(mut self, callback: impl Fn(&PointerEventData) + Send + Sync + 'static) -> Self {
        self.on_pointer_enter = Some(Arc::new(callback));
        self
    }

    pub fn with_pointer_leave(mut self, callback: impl Fn(&PointerEventData) + Send + Sync + 'static) -> Self {
        self.on_pointer_leave = Some(Arc::new(callback));
        self
    }

    pub fn with_pointer_cancel(mut self, callback: impl Fn(&PointerEventData) + Send + Sync + 'static) -> Self {
        self.on_pointer_cancel = Some(Arc::new(callback));
        self
    }

    pub fn with_active_start(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_handler_active_start = Some(Arc::new(callback));
        self
    }

    pub fn with_active_end(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_handler_active_end = Some(Arc::new(callback));
        self
    }
}

impl std::fmt::Debug for PointerEventHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PointerEventHandlers")
            .field("on_pointer_down", &self.on_pointer_down.is_some())
            .field("on_pointer_up", &self.on_pointer_up.is_some())
            .field("on_pointer_move", &self.on_pointer_move.is_some())
            .finish()
    }
}

/// Event scope a handler set or query applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventScope {
    Global,
    Page(usize),
}

impl EventScope {
    /// Same scope tier: global vs page, ignoring the page index
    pub fn same_tier(&self, declared: ModeScope) -> bool {
        matches!(
            (self, declared),
            (EventScope::Global, ModeScope::Global) | (EventScope::Page(_), ModeScope::Page)
        )
    }
}

/// Scope tier a mode declares for its handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeScope {
    Global,
    Page,
}

/// Registration token returned by handler registration; pass to
/// `unregister` to remove the binding
pub type HandlerToken = u64;

pub(crate) struct ModeHandlerEntry {
    pub token: HandlerToken,
    pub modes: Vec<String>,
    pub scope: EventScope,
    pub handlers: PointerEventHandlers,
}

pub(crate) struct AlwaysHandlerEntry {
    pub token: HandlerToken,
    pub scope: EventScope,
    pub handlers: PointerEventHandlers,
}

/// Instance-owned handler registrations, in registration order
#[derive(Default)]
pub(crate) struct HandlerBuckets {
    pub mode_entries: Vec<ModeHandlerEntry>,
    pub always_entries: Vec<AlwaysHandlerEntry>,
    next_token: HandlerToken,
}

impl HandlerBuckets {
    pub fn next_token(&mut self) -> HandlerToken {
        self.next_token += 1;
        self.next_token
    }

    /// All handler sets bound to a mode, any scope, in registration order
    pub fn sets_for_mode(&self, mode_id: &str) -> Vec<PointerEventHandlers> {
        self.mode_entries
            .iter()
            .filter(|entry| entry.modes.iter().any(|m| m == mode_id))
            .map(|entry| entry.handlers.clone())
            .collect()
    }

    /// All always-handler sets, any scope, in registration order
    pub fn always_sets(&self) -> Vec<PointerEventHandlers> {
        self.always_entries
            .iter()
            .map(|entry| entry.handlers.clone())
            .collect()
    }

    /// Remove by token; true if a binding was dropped
    pub fn remove(&mut self, token: HandlerToken) -> bool {
        let before = self.mode_entries.len() + self.always_entries.len();
        self.mode_entries.retain(|entry| entry.token != token);
        self.always_entries.retain(|entry| entry.token != token);
        self.mode_entries.len() + self.always_entries.len() != before
    }

    pub fn clear(&mut self) {
        self.mode_entries.clear();
        self.always_entries.clear();
    }
}

/// Merged view over the handler sets live for one scope query
///
/// Each pointer event invokes every contributing callback in registration
/// order. The set list is a snapshot: registrations made during dispatch
/// apply from the next query.
#[derive(Clone, Default)]
pub struct MergedHandlers {
    sets: Vec<PointerEventHandlers>,
}

impl MergedHandlers {
    pub(crate) fn new(sets: Vec<PointerEventHandlers>) -> Self {
        Self { sets }
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn pointer_down(&self, event: &PointerEventData) {
        for set in &self.sets {
            if let Some(callback) = &set.on_pointer_down {
                (**callback)(event);
            }
        }
    }

    pub fn pointer_up(&self, event: &PointerEventData) {
        for set in &self.sets {
            if let Some(callback) = &set.on_pointer_up {
                (**callback)(event);
            }
        }
    }

    pub fn pointer_move(&self, event: &PointerEventData) {
        for set in &self.sets {
            if let Some(callback) = &set.on_pointer_move {
                (**callback)(event);
            }
        }
    }

    pub fn pointer_enter(&self, event: &PointerEventData) {
        for set in &self.sets {
            if let Some(callback) = &set.on_pointer_enter {
                (**callback)(event);
            }
        }
    }

    pub fn pointer_leave(&self, event: &PointerEventData) {
        for set in &self.sets {
            if let Some(callback) = &set.on_pointer_leave {
                (**callback)(event);
            }
        }
    }

    pub fn pointer_cancel(&self, event: &PointerEventData) {
        for set in &self.sets {
            if let Some(callback) = &set.on_pointer_cancel {
                (**callback)(event);
            }
        }
    }
}

/// Fire `on_handler_active_start` across a snapshot of handler sets
pub(crate) fn fire_active_start(sets: &[PointerEventHandlers]) {
    for set in sets {
        if let Some(callback) = &set.on_handler_active_start {
            (**callback)();
        }
    }
}

/// Fire `on_handler_active_end` across a snapshot of handler sets
pub(crate) fn fire_active_end(sets: &[PointerEventHandlers]) {
    for set in sets {
        if let Some(callback) = &set.on_handler_active_end {
            (**callback)();
        }
    }
}
