//! The host-implemented settings persistence boundary.
//!
//! Keychain/OS-preferences storage is explicitly out of scope; this
//! module only defines the keys and the trait a host app's thin
//! persistence layer implements.

use async_trait::async_trait;

/// Preference key for the configured Hub host.
pub const KEY_HUB_HOST: &str = "DebugProbe.hubHost";
/// Preference key for the configured Hub port.
pub const KEY_HUB_PORT: &str = "DebugProbe.hubPort";
/// Preference key for the shared registration token.
pub const KEY_TOKEN: &str = "DebugProbe.token";
/// Preference key for whether the agent is enabled at all.
pub const KEY_IS_ENABLED: &str = "DebugProbe.isEnabled";
/// Preference key for verbose host-side logging.
pub const KEY_VERBOSE_LOGGING: &str = "DebugProbe.verboseLogging";

/// Preference key for a given plugin's enabled flag, e.g.
/// `DebugProbe.plugin.http.enabled`.
pub fn plugin_enabled_key(plugin_id: &str) -> String {
    format!("DebugProbe.plugin.{plugin_id}.enabled")
}

/// A host-implemented key-value preference store. The agent never reads
/// or writes a platform keychain or preferences API directly; it only
/// calls through this trait, which the host app backs with its own
/// thin persistence layer.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Fetch a string-valued preference, if set.
    async fn get_string(&self, key: &str) -> Option<String>;

    /// Fetch a bool-valued preference, if set.
    async fn get_bool(&self, key: &str) -> Option<bool>;

    /// Persist a string-valued preference.
    async fn set_string(&self, key: &str, value: &str);

    /// Persist a bool-valued preference.
    async fn set_bool(&self, key: &str, value: bool);
}

/// An in-memory [`SettingsStore`], useful for tests and hosts with no
/// durable preferences layer of their own.
#[derive(Default)]
pub struct InMemorySettingsStore {
    strings: parking_lot::RwLock<std::collections::HashMap<String, String>>,
    bools: parking_lot::RwLock<std::collections::HashMap<String, bool>>,
}

impl InMemorySettingsStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn get_string(&self, key: &str) -> Option<String> {
        self.strings.read().get(key).cloned()
    }

    async fn get_bool(&self, key: &str) -> Option<bool> {
        self.bools.read().get(key).copied()
    }

    async fn set_string(&self, key: &str, value: &str) {
        self.strings.write().insert(key.to_string(), value.to_string());
    }

    async fn set_bool(&self, key: &str, value: bool) {
        self.bools.write().insert(key.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_store_round_trips() {
        let store = InMemorySettingsStore::new();
        assert_eq!(store.get_string(KEY_HUB_HOST).await, None);
        store.set_string(KEY_HUB_HOST, "hub.local").await;
        assert_eq!(store.get_string(KEY_HUB_HOST).await.as_deref(), Some("hub.local"));

        store.set_bool(KEY_IS_ENABLED, true).await;
        assert_eq!(store.get_bool(KEY_IS_ENABLED).await, Some(true));
    }

    #[test]
    fn plugin_enabled_key_is_namespaced_per_plugin() {
        assert_eq!(plugin_enabled_key("http"), "DebugProbe.plugin.http.enabled");
    }
}
