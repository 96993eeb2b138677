//! Built-in plugin implementations wired together by [`crate::Agent`].

mod database_plugin;
mod forwarding;
mod http_plugin;
mod log_plugin;
mod timing_plugin;
mod ws_plugin;

pub use database_plugin::DatabasePlugin;
pub use http_plugin::HttpPlugin;
pub use log_plugin::{DebugProbeLogLayer, LogPlugin};
pub use timing_plugin::PageTimingPlugin;
pub use ws_plugin::WebSocketPlugin;
