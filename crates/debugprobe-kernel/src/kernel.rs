//! The plugin kernel.

use crate::context::{CommandResponseEmitter, ConfigStore, EventEmitter, PluginContext};
use crate::error::{KernelError, Result};
use crate::event_bus::EventBus;
use crate::plugin::{Plugin, PluginInfo, PluginState};
use debugprobe_types::{DeviceInfo, Event, PluginCommand, PluginCommandResponse};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

struct Entry {
    plugin: Arc<Mutex<Box<dyn Plugin>>>,
    dependencies: Vec<String>,
    state: PluginState,
}

/// Registers plugins, resolves start order, drives their lifecycle, and
/// routes Hub commands to them.
pub struct Kernel {
    registry: Mutex<HashMap<String, Entry>>,
    start_order: Mutex<Vec<String>>,
    started: Mutex<bool>,
    event_bus: Arc<EventBus>,
    event_rx: Mutex<Option<mpsc::UnboundedReceiver<Event>>>,
    command_response_rx: Mutex<Option<mpsc::UnboundedReceiver<PluginCommandResponse>>>,
    event_tx: mpsc::UnboundedSender<Event>,
    command_response_tx: mpsc::UnboundedSender<PluginCommandResponse>,
}

impl Kernel {
    /// Create a new, empty kernel.
    pub fn new() -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_response_tx, command_response_rx) = mpsc::unbounded_channel();
        Self {
            registry: Mutex::new(HashMap::new()),
            start_order: Mutex::new(Vec::new()),
            started: Mutex::new(false),
            event_bus: Arc::new(EventBus::new()),
            event_rx: Mutex::new(Some(event_rx)),
            command_response_rx: Mutex::new(Some(command_response_rx)),
            event_tx,
            command_response_tx,
        }
    }

    /// The shared event-bus instance plugins install callbacks into.
    pub fn event_bus(&self) -> Arc<EventBus> {
        self.event_bus.clone()
    }

    /// Take ownership of the channel carrying events emitted by plugins,
    /// for the bridge to drain. Callable once.
    pub async fn take_event_receiver(&self) -> Option<mpsc::UnboundedReceiver<Event>> {
        self.event_rx.lock().await.take()
    }

    /// Take ownership of the channel carrying out-of-band command
    /// responses. Callable once.
    pub async fn take_command_response_receiver(
        &self,
    ) -> Option<mpsc::UnboundedReceiver<PluginCommandResponse>> {
        self.command_response_rx.lock().await.take()
    }

    /// Register a plugin. Legal only before `start_all`.
    pub async fn register(&self, plugin: Box<dyn Plugin>) -> Result<()> {
        let started = *self.started.lock().await;
        if started {
            return Err(KernelError::InvalidConfiguration {
                id: plugin.id().to_string(),
                message: "cannot register a plugin after start_all has run".to_string(),
            });
        }

        let id = plugin.id().to_string();
        let dependencies = plugin.dependencies();
        let mut registry = self.registry.lock().await;
        if registry.contains_key(&id) {
            return Err(KernelError::DuplicatePluginId(id));
        }
        registry.insert(
            id,
            Entry {
                plugin: Arc::new(Mutex::new(plugin)),
                dependencies,
                state: PluginState::Uninitialized,
            },
        );
        Ok(())
    }

    /// Depth-first topological sort with tri-color marking.
    fn resolve_start_order(registry: &HashMap<String, Entry>) -> Result<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Grey,
            Black,
        }

        let mut color: HashMap<String, Color> =
            registry.keys().map(|id| (id.clone(), Color::White)).collect();
        let mut order = Vec::with_capacity(registry.len());

        fn visit(
            id: &str,
            registry: &HashMap<String, Entry>,
            color: &mut HashMap<String, Color>,
            order: &mut Vec<String>,
        ) -> Result<()> {
            match color.get(id) {
                Some(Color::Black) => return Ok(()),
                Some(Color::Grey) => return Err(KernelError::CircularDependency(id.to_string())),
                _ => {}
            }
            color.insert(id.to_string(), Color::Grey);
            let entry = registry
                .get(id)
                .expect("id came from the registry's own key set");
            for dep in &entry.dependencies {
                if !registry.contains_key(dep) {
                    return Err(KernelError::MissingDependency {
                        plugin: id.to_string(),
                        dependency: dep.clone(),
                    });
                }
                visit(dep, registry, color, order)?;
            }
            color.insert(id.to_string(), Color::Black);
            order.push(id.to_string());
            Ok(())
        }

        let mut ids: Vec<String> = registry.keys().cloned().collect();
        ids.sort();
        for id in ids {
            visit(&id, registry, &mut color, &mut order)?;
        }
        Ok(order)
    }

    /// Build the context, compute start order, then sequentially
    /// `initialize` + `start` each plugin. Idempotent while already
    /// running.
    pub async fn start_all(&self, device: DeviceInfo) -> Result<()> {
        {
            let started = *self.started.lock().await;
            if started {
                tracing::warn!("start_all called while kernel already running; ignoring");
                return Ok(());
            }
        }

        let order = {
            let registry = self.registry.lock().await;
            Self::resolve_start_order(&registry)?
        };

        let device = Arc::new(device);
        let config = ConfigStore::new();
        let event_out = EventEmitter::new(self.event_tx.clone());
        let command_response_out = CommandResponseEmitter::new(self.command_response_tx.clone());

        for id in &order {
            let plugin_arc = {
                let registry = self.registry.lock().await;
                registry
                    .get(id)
                    .expect("id came from resolve_start_order over this registry")
                    .plugin
                    .clone()
            };
            let ctx = PluginContext {
                device: device.clone(),
                config: config.clone(),
                event_out: event_out.clone(),
                command_response_out: command_response_out.clone(),
            };

            self.set_state(id, PluginState::Starting).await;
            let mut plugin = plugin_arc.lock().await;
            if let Err(e) = plugin.initialize(ctx).await {
                self.set_state(id, PluginState::Error).await;
                return Err(KernelError::StartFailed {
                    id: id.clone(),
                    cause: e.to_string(),
                });
            }
            if let Err(e) = plugin.start().await {
                self.set_state(id, PluginState::Error).await;
                return Err(KernelError::StartFailed {
                    id: id.clone(),
                    cause: e.to_string(),
                });
            }
            drop(plugin);
            self.set_state(id, PluginState::Running).await;
        }

        *self.start_order.lock().await = order;
        *self.started.lock().await = true;
        Ok(())
    }

    /// Stop plugins in reverse start order, swallowing per-plugin errors.
    pub async fn stop_all(&self) {
        let order = self.start_order.lock().await.clone();
        for id in order.iter().rev() {
            self.set_state(id, PluginState::Stopping).await;
            let plugin_arc = {
                let registry = self.registry.lock().await;
                registry.get(id).map(|e| e.plugin.clone())
            };
            if let Some(plugin_arc) = plugin_arc {
                let mut plugin = plugin_arc.lock().await;
                if let Err(e) = plugin.stop().await {
                    tracing::warn!(plugin = %id, error = %e, "plugin failed to stop cleanly");
                }
            }
            self.set_state(id, PluginState::Stopped).await;
        }
        *self.start_order.lock().await = Vec::new();
        *self.started.lock().await = false;
    }

    /// Pause every plugin currently running, in forward start order.
    pub async fn pause_all(&self) {
        let order = self.start_order.lock().await.clone();
        for id in &order {
            self.transition_if(id, PluginState::Running, PluginState::Paused, |p| p.pause())
                .await;
        }
    }

    /// Resume every paused plugin, in forward start order.
    pub async fn resume_all(&self) {
        let order = self.start_order.lock().await.clone();
        for id in &order {
            self.transition_if(id, PluginState::Paused, PluginState::Running, |p| p.resume())
                .await;
        }
    }

    async fn transition_if<F, Fut>(&self, id: &str, from: PluginState, to: PluginState, f: F)
    where
        F: FnOnce(&mut Box<dyn Plugin>) -> Fut,
        Fut: std::future::Future<Output = Result<()>>,
    {
        let current = {
            let registry = self.registry.lock().await;
            registry.get(id).map(|e| e.state)
        };
        if current != Some(from) {
            return;
        }
        let plugin_arc = {
            let registry = self.registry.lock().await;
            registry.get(id).map(|e| e.plugin.clone())
        };
        if let Some(plugin_arc) = plugin_arc {
            let mut plugin = plugin_arc.lock().await;
            match f(&mut plugin).await {
                Ok(()) => {
                    drop(plugin);
                    self.set_state(id, to).await;
                }
                Err(e) => {
                    tracing::warn!(plugin = %id, error = %e, "plugin lifecycle transition failed");
                }
            }
        }
    }

    /// Request-level enable/disable toggle: enabling resumes (or starts)
    /// the plugin; disabling pauses it, never stops it, so configuration
    /// survives.
    pub async fn set_plugin_enabled(&self, id: &str, enabled: bool) -> Result<()> {
        let state = {
            let registry = self.registry.lock().await;
            registry
                .get(id)
                .map(|e| e.state)
                .ok_or_else(|| KernelError::PluginNotFound(id.to_string()))?
        };

        if enabled {
            match state {
                PluginState::Paused => {
                    self.transition_if(id, PluginState::Paused, PluginState::Running, |p| {
                        p.resume()
                    })
                    .await
                }
                PluginState::Stopped => {
                    self.transition_if(id, PluginState::Stopped, PluginState::Running, |p| {
                        p.start()
                    })
                    .await
                }
                _ => {}
            }
        } else if state == PluginState::Running {
            self.transition_if(id, PluginState::Running, PluginState::Paused, |p| p.pause())
                .await;
        }
        Ok(())
    }

    /// Dispatch a Hub command to the plugin it names.
    pub async fn route_command(&self, command: PluginCommand) -> PluginCommandResponse {
        let plugin_arc = {
            let registry = self.registry.lock().await;
            registry.get(&command.plugin_id).map(|e| e.plugin.clone())
        };
        match plugin_arc {
            Some(plugin_arc) => {
                let mut plugin = plugin_arc.lock().await;
                plugin.handle_command(command).await
            }
            None => PluginCommandResponse::failure(&command, "PluginNotFound"),
        }
    }

    /// Snapshot of every registered plugin's identity and state.
    pub async fn get_plugin_infos(&self) -> Vec<PluginInfo> {
        let registry = self.registry.lock().await;
        registry
            .iter()
            .map(|(id, entry)| PluginInfo {
                id: id.clone(),
                display_name: id.clone(),
                version: "0.1.0".to_string(),
                state: entry.state,
                dependencies: entry.dependencies.clone(),
            })
            .collect()
    }

    async fn set_state(&self, id: &str, state: PluginState) {
        let mut registry = self.registry.lock().await;
        if let Some(entry) = registry.get_mut(id) {
            entry.state = state;
        }
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct NoopPlugin {
        id: String,
        deps: Vec<String>,
    }

    #[async_trait]
    impl Plugin for NoopPlugin {
        fn id(&self) -> &str {
            &self.id
        }
        fn dependencies(&self) -> Vec<String> {
            self.deps.clone()
        }
        async fn initialize(&mut self, _ctx: PluginContext) -> Result<()> {
            Ok(())
        }
        async fn start(&mut self) -> Result<()> {
            Ok(())
        }
        async fn stop(&mut self) -> Result<()> {
            Ok(())
        }
        async fn handle_command(&mut self, command: PluginCommand) -> PluginCommandResponse {
            PluginCommandResponse::success(&command, None)
        }
    }

    fn device() -> DeviceInfo {
        DeviceInfo::new("d1", "model", "os", "1.0", "app", "1.0")
    }

    #[tokio::test]
    async fn starts_dependencies_before_dependents() {
        let kernel = Kernel::new();
        kernel
            .register(Box::new(NoopPlugin {
                id: "b".to_string(),
                deps: vec!["a".to_string()],
            }))
            .await
            .unwrap();
        kernel
            .register(Box::new(NoopPlugin {
                id: "a".to_string(),
                deps: vec![],
            }))
            .await
            .unwrap();

        kernel.start_all(device()).await.unwrap();
        let order = kernel.start_order.lock().await.clone();
        let pos_a = order.iter().position(|id| id == "a").unwrap();
        let pos_b = order.iter().position(|id| id == "b").unwrap();
        assert!(pos_a < pos_b);
    }

    #[tokio::test]
    async fn detects_cycles() {
        let kernel = Kernel::new();
        kernel
            .register(Box::new(NoopPlugin {
                id: "a".to_string(),
                deps: vec!["b".to_string()],
            }))
            .await
            .unwrap();
        kernel
            .register(Box::new(NoopPlugin {
                id: "b".to_string(),
                deps: vec!["a".to_string()],
            }))
            .await
            .unwrap();

        let err = kernel.start_all(device()).await.unwrap_err();
        assert!(matches!(err, KernelError::CircularDependency(_)));
    }

    #[tokio::test]
    async fn missing_dependency_is_reported() {
        let kernel = Kernel::new();
        kernel
            .register(Box::new(NoopPlugin {
                id: "a".to_string(),
                deps: vec!["ghost".to_string()],
            }))
            .await
            .unwrap();

        let err = kernel.start_all(device()).await.unwrap_err();
        assert!(matches!(err, KernelError::MissingDependency { .. }));
    }

    #[tokio::test]
    async fn duplicate_registration_fails() {
        let kernel = Kernel::new();
        kernel
            .register(Box::new(NoopPlugin {
                id: "a".to_string(),
                deps: vec![],
            }))
            .await
            .unwrap();
        let err = kernel
            .register(Box::new(NoopPlugin {
                id: "a".to_string(),
                deps: vec![],
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, KernelError::DuplicatePluginId(_)));
    }

    #[tokio::test]
    async fn route_command_to_unknown_plugin_fails() {
        let kernel = Kernel::new();
        let response = kernel
            .route_command(PluginCommand {
                plugin_id: "ghost".to_string(),
                command_id: "c1".to_string(),
                command_type: "get_status".to_string(),
                payload: None,
            })
            .await;
        assert!(!response.success);
        assert_eq!(response.command_id, "c1");
    }

    #[tokio::test]
    async fn second_start_all_is_idempotent() {
        let kernel = Kernel::new();
        kernel
            .register(Box::new(NoopPlugin {
                id: "a".to_string(),
                deps: vec![],
            }))
            .await
            .unwrap();
        kernel.start_all(device()).await.unwrap();
        kernel.start_all(device()).await.unwrap();
    }
}
