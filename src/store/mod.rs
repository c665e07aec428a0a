//! Two-Tier State Store
//!
//! One core reducer owns the viewer core state; each plugin registers its
//! own reducer over a private slice. Dispatch can target the core only, a
//! single plugin, or broadcast to every plugin reducer. Global and
//! per-plugin subscription channels deliver `(action, new, old)` triples
//! synchronously in the dispatching tick.

// Internal modules - all access should go through api module
pub(crate) mod action;
pub(crate) mod error;
pub(crate) mod manager;
pub(crate) mod plugin_store;
pub(crate) mod state;

// Public API module - the only public interface for the store system
pub mod api;
