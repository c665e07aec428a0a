pub mod core;
pub mod engine;
pub mod interaction;
pub mod notifications;
pub mod plugin;
pub mod store;
pub mod task;

include!(concat!(env!("OUT_DIR"), "/version.rs"));

/// Parse the plugin API version string from the build script into u32
pub fn get_plugin_api_version() -> u32 {
    PLUGIN_API_VERSION.parse().unwrap_or(20250801)
}
