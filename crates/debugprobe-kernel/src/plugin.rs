//! The `Plugin` trait and its lifecycle state.

use crate::context::PluginContext;
use crate::error::Result;
use async_trait::async_trait;
use debugprobe_types::{PluginCommand, PluginCommandResponse};
use std::fmt;

/// A plugin's lifecycle state. Transitions are driven only by the kernel;
/// a plugin never mutates its own state except via the verbs below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    /// Registered, but `start_all` has not yet run.
    Uninitialized,
    /// Initialized and stopped (reachable from `running` via `disable`).
    Stopped,
    /// `initialize` + `start` are in flight.
    Starting,
    /// Actively capturing/intervening.
    Running,
    /// Temporarily suspended; configuration is retained.
    Paused,
    /// `stop` is in flight.
    Stopping,
    /// The plugin faulted; other plugins continue unaffected.
    Error,
}

impl fmt::Display for PluginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uninitialized => "uninitialized",
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Stopping => "stopping",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Snapshot of one plugin's identity and current state, returned by
/// `Kernel::get_plugin_infos`.
#[derive(Debug, Clone)]
pub struct PluginInfo {
    /// Plugin id.
    pub id: String,
    /// Human-readable display name.
    pub display_name: String,
    /// Plugin version string.
    pub version: String,
    /// Current lifecycle state.
    pub state: PluginState,
    /// Declared dependency ids.
    pub dependencies: Vec<String>,
}

/// A capture or intervention module owned by the kernel.
///
/// Implementations install their `EventBus` callbacks in `start` and
/// remove them in `stop`.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Unique, stable id. Exactly one plugin exists per id within a
    /// kernel.
    fn id(&self) -> &str;

    /// Human-readable name shown in the Hub.
    fn display_name(&self) -> &str {
        self.id()
    }

    /// Plugin version string.
    fn version(&self) -> &str {
        "0.1.0"
    }

    /// Ids of plugins that must be started before this one.
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// Called once per `start_all`, before `start`.
    async fn initialize(&mut self, ctx: PluginContext) -> Result<()>;

    /// Install event-bus callbacks and begin active capture.
    async fn start(&mut self) -> Result<()>;

    /// Remove event-bus callbacks and stop active capture. Must not fail
    /// the overall `stop_all` teardown.
    async fn stop(&mut self) -> Result<()>;

    /// Suspend capture while retaining configuration.
    async fn pause(&mut self) -> Result<()> {
        Ok(())
    }

    /// Resume capture from a paused state.
    async fn resume(&mut self) -> Result<()> {
        Ok(())
    }

    /// Handle a Hub-originated command routed to this plugin.
    async fn handle_command(&mut self, command: PluginCommand) -> PluginCommandResponse;
}
