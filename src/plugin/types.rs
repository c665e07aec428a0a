//! Type definitions for the plugin system

/// Lifecycle status of a registered plugin
///
/// `Registered` covers the window between bookkeeping insertion and a
/// successful `initialize`; a failed `initialize` purges the entry instead
/// of transitioning. A failed `post_initialize` flags the entry `Error` but
/// keeps it registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum PluginStatus {
    Registered,
    Active,
    Error,
}

/// Registry lifecycle phase; `destroyed` is tracked separately as a
/// terminal absorbing flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryPhase {
    Uninitialized,
    Initializing,
    Initialized,
}
