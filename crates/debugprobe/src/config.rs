//! `AgentConfig` — the top-level configuration for the agent.
//!
//! Deserializable from TOML/JSON/env via `serde`, with `#[serde(default)]`
//! on every field so a host app only needs to override what it cares
//! about. Precedence (host app's responsibility to apply, not this
//! struct's): runtime override > host-bundle metadata > built-in default.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

fn default_hub_host() -> String {
    "127.0.0.1".to_string()
}

fn default_hub_port() -> u16 {
    9527
}

fn default_true() -> bool {
    true
}

fn default_flush_batch_size() -> usize {
    20
}

fn default_flush_interval_ms() -> u64 {
    200
}

fn default_reconnect_initial_ms() -> u64 {
    1_000
}

fn default_reconnect_max_ms() -> u64 {
    30_000
}

fn default_command_deadline_ms() -> u64 {
    30_000
}

fn default_queue_capacity() -> usize {
    10_000
}

/// Top-level agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Hub host to dial.
    pub hub_host: String,
    /// Hub port to dial.
    pub hub_port: u16,
    /// Shared registration token.
    pub token: String,
    /// Whether the agent is enabled at all; `false` makes
    /// [`crate::Agent::start`] a no-op.
    pub is_enabled: bool,
    /// Verbose host-side logging toggle, surfaced to the host's own log
    /// configuration (not the agent's `tracing` setup).
    pub verbose_logging: bool,
    /// Per-plugin enabled flags, keyed by plugin id. A plugin absent
    /// from this map defaults to enabled.
    pub plugin_enabled: HashMap<String, bool>,
    /// Maximum events flushed in a single outbound batch.
    pub flush_batch_size: usize,
    /// How often the outbound queue is drained absent other activity.
    pub flush_interval_ms: u64,
    /// Initial reconnect backoff delay.
    pub reconnect_initial_ms: u64,
    /// Reconnect backoff cap.
    pub reconnect_max_ms: u64,
    /// How long a dispatched plugin command may run before the bridge
    /// gives up on it.
    pub command_deadline_ms: u64,
    /// Maximum events the outbound queue retains before dropping the
    /// oldest.
    pub queue_capacity: usize,
    /// Path to the outbound queue's SQLite file. `None` keeps the queue
    /// purely in-memory (e.g. for tests).
    pub queue_path: Option<std::path::PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            hub_host: default_hub_host(),
            hub_port: default_hub_port(),
            token: String::new(),
            is_enabled: default_true(),
            verbose_logging: false,
            plugin_enabled: HashMap::new(),
            flush_batch_size: default_flush_batch_size(),
            flush_interval_ms: default_flush_interval_ms(),
            reconnect_initial_ms: default_reconnect_initial_ms(),
            reconnect_max_ms: default_reconnect_max_ms(),
            command_deadline_ms: default_command_deadline_ms(),
            queue_capacity: default_queue_capacity(),
            queue_path: None,
        }
    }
}

impl AgentConfig {
    /// Whether `plugin_id` should start enabled, per `plugin_enabled`
    /// (defaulting to enabled when absent).
    pub fn is_plugin_enabled(&self, plugin_id: &str) -> bool {
        self.plugin_enabled.get(plugin_id).copied().unwrap_or(true)
    }

    pub(crate) fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    pub(crate) fn reconnect_initial(&self) -> Duration {
        Duration::from_millis(self.reconnect_initial_ms)
    }

    pub(crate) fn reconnect_max(&self) -> Duration {
        Duration::from_millis(self.reconnect_max_ms)
    }

    pub(crate) fn command_deadline(&self) -> Duration {
        Duration::from_millis(self.command_deadline_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_constants() {
        let config = AgentConfig::default();
        assert_eq!(config.hub_port, 9527);
        assert!(config.is_enabled);
        assert!(!config.verbose_logging);
    }

    #[test]
    fn unlisted_plugin_defaults_to_enabled() {
        let config = AgentConfig::default();
        assert!(config.is_plugin_enabled("http"));
    }

    #[test]
    fn listed_plugin_honors_explicit_flag() {
        let mut config = AgentConfig::default();
        config.plugin_enabled.insert("http".to_string(), false);
        assert!(!config.is_plugin_enabled("http"));
    }

    #[test]
    fn deserializes_from_partial_json_with_defaults() {
        let config: AgentConfig =
            serde_json::from_str(r#"{"hub_host": "hub.example.com"}"#).unwrap();
        assert_eq!(config.hub_host, "hub.example.com");
        assert_eq!(config.hub_port, 9527);
    }
}
