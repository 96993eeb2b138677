//! `PluginContext` — provided to each plugin at `initialize`; its
//! lifetime equals the kernel's running lifetime.

use debugprobe_types::{DeviceInfo, Event, PluginCommandResponse};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// A pluggable key-value configuration store. Values are encoded with
/// `bincode` so any `Serialize`/`Deserialize` type can be stored without
/// committing the store itself to a particular value type.
#[derive(Clone, Default)]
pub struct ConfigStore {
    inner: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl ConfigStore {
    /// Create an empty, in-memory config store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value under `key`, overwriting any previous value.
    pub fn set<T: serde::Serialize>(&self, key: &str, value: &T) -> Result<(), ConfigStoreError> {
        let encoded = bincode::serialize(value)?;
        self.inner.write().insert(key.to_string(), encoded);
        Ok(())
    }

    /// Fetch and decode the value stored under `key`, if any.
    pub fn get<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>, ConfigStoreError> {
        match self.inner.read().get(key) {
            Some(bytes) => Ok(Some(bincode::deserialize(bytes)?)),
            None => Ok(None),
        }
    }

    /// Remove the value stored under `key`, if any.
    pub fn remove(&self, key: &str) {
        self.inner.write().remove(key);
    }
}

/// Errors from encoding/decoding config values.
#[derive(Debug, thiserror::Error)]
pub enum ConfigStoreError {
    /// `bincode` failed to encode or decode a value.
    #[error("config value codec error: {0}")]
    Codec(#[from] Box<bincode::ErrorKind>),
}

/// One-way channel a plugin uses to publish events toward the bridge.
#[derive(Clone)]
pub struct EventEmitter {
    sender: mpsc::UnboundedSender<Event>,
}

impl EventEmitter {
    /// Wrap a raw channel sender.
    pub fn new(sender: mpsc::UnboundedSender<Event>) -> Self {
        Self { sender }
    }

    /// Publish `event`. Silently drops the event if the receiving end
    /// (the bridge) has already shut down.
    pub fn emit(&self, event: Event) {
        if self.sender.send(event).is_err() {
            tracing::debug!("event emitted after bridge shutdown; dropped");
        }
    }
}

/// One-way channel a plugin uses to publish command responses toward the
/// bridge, for commands whose handling outlives the synchronous
/// `handle_command` call (e.g. a long-running export).
#[derive(Clone)]
pub struct CommandResponseEmitter {
    sender: mpsc::UnboundedSender<PluginCommandResponse>,
}

impl CommandResponseEmitter {
    /// Wrap a raw channel sender.
    pub fn new(sender: mpsc::UnboundedSender<PluginCommandResponse>) -> Self {
        Self { sender }
    }

    /// Publish a command response out of band.
    pub fn emit(&self, response: PluginCommandResponse) {
        if self.sender.send(response).is_err() {
            tracing::debug!("command response emitted after bridge shutdown; dropped");
        }
    }
}

/// Everything a plugin needs at `initialize`, valid for as long as the
/// kernel is running.
#[derive(Clone)]
pub struct PluginContext {
    /// Immutable host device record.
    pub device: Arc<DeviceInfo>,
    /// Pluggable key-value configuration store.
    pub config: ConfigStore,
    /// Emitter for captured events.
    pub event_out: EventEmitter,
    /// Emitter for out-of-band command responses.
    pub command_response_out: CommandResponseEmitter,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_store_round_trips() {
        let store = ConfigStore::new();
        store.set("flush_interval_ms", &200u64).unwrap();
        let value: Option<u64> = store.get("flush_interval_ms").unwrap();
        assert_eq!(value, Some(200));
        assert_eq!(store.get::<u64>("missing").unwrap(), None);
    }
}
