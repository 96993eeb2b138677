//! `debugprobe` — the top-level facade crate: `Agent`, built-in plugin
//! wiring, settings.
//!
//! `Agent` owns the kernel, the shared rule engines, the bridge, and
//! the five built-in plugins (HTTP, WebSocket, log, database, page
//! timing), and exposes each plugin's host-facing API (the pipelines a
//! capture shim drives, the inspector a database shim registers
//! against, the `tracing::Layer` a host subscriber installs) through
//! accessor methods. [`Agent::start`] is the one place this workspace
//! uses `anyhow` rather than a per-crate `thiserror` enum.

pub mod config;
pub mod error;
mod plugins;
pub mod settings;

pub use config::AgentConfig;
pub use error::AgentError;
pub use plugins::{DatabasePlugin, DebugProbeLogLayer, HttpPlugin, LogPlugin, PageTimingPlugin, WebSocketPlugin};
pub use settings::{InMemorySettingsStore, SettingsStore};

use debugprobe_bridge::{BridgeClient, BridgeConfig};
use debugprobe_inspector::Inspector;
use debugprobe_kernel::Kernel;
use debugprobe_rules::{BreakpointEngine, ChaosEngine, MockEngine};
use debugprobe_types::bridge::AdvertisedPlugin;
use debugprobe_types::{DeviceInfo, PluginCommand, PluginCommandResponse};
use parking_lot::Mutex;
use std::sync::Arc;

fn bridge_config_from(config: &AgentConfig) -> BridgeConfig {
    BridgeConfig {
        host: config.hub_host.clone(),
        port: config.hub_port,
        token: config.token.clone(),
        queue_path: config.queue_path.clone(),
        queue_capacity: config.queue_capacity,
        flush_batch_size: config.flush_batch_size,
        flush_interval: config.flush_interval(),
        reconnect_initial: config.reconnect_initial(),
        reconnect_max: config.reconnect_max(),
        command_deadline: config.command_deadline(),
        ..BridgeConfig::default()
    }
}

/// The embeddable DebugProbe agent.
///
/// Built with [`AgentConfig`], started once with the host's
/// [`DeviceInfo`], and kept alive for the process's lifetime (or until
/// [`Agent::stop`]).
pub struct Agent {
    config: AgentConfig,
    kernel: Arc<Kernel>,
    mock_engine: Arc<MockEngine>,
    chaos_engine: Arc<ChaosEngine>,
    breakpoint_engine: Arc<BreakpointEngine>,
    inspector: Arc<Inspector>,
    bridge: Arc<BridgeClient>,
    http_pipeline: Mutex<Option<Arc<debugprobe_pipeline::HttpPipeline>>>,
    ws_pipeline: Mutex<Option<Arc<debugprobe_pipeline::WsPipeline>>>,
    timing_recorder: Mutex<Option<Arc<debugprobe_timing::TimingRecorder>>>,
    log_layer: Mutex<Option<DebugProbeLogLayer>>,
    running: Mutex<bool>,
}

const PLUGIN_IDS: [&str; 5] = ["http", "websocket", "log", "database", "page_timing"];

impl Agent {
    /// Build an agent. Does not connect to the Hub or register any
    /// plugins yet; call [`Agent::start`] for that.
    pub fn new(config: AgentConfig) -> anyhow::Result<Self> {
        let kernel = Arc::new(Kernel::new());
        let advertised: Vec<AdvertisedPlugin> = PLUGIN_IDS
            .iter()
            .map(|id| AdvertisedPlugin {
                id: id.to_string(),
                display_name: id.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            })
            .collect();

        let bridge_config = bridge_config_from(&config);
        let device = DeviceInfo::new(
            "pending".to_string(),
            "pending".to_string(),
            "pending".to_string(),
            "pending".to_string(),
            "pending".to_string(),
            "pending".to_string(),
        );
        let bridge = Arc::new(BridgeClient::new(bridge_config, kernel.clone(), device, advertised)?);

        Ok(Self {
            config,
            kernel,
            mock_engine: Arc::new(MockEngine::new()),
            chaos_engine: Arc::new(ChaosEngine::new()),
            breakpoint_engine: Arc::new(BreakpointEngine::new()),
            inspector: Arc::new(Inspector::new()),
            bridge,
            http_pipeline: Mutex::new(None),
            ws_pipeline: Mutex::new(None),
            timing_recorder: Mutex::new(None),
            log_layer: Mutex::new(None),
            running: Mutex::new(false),
        })
    }

    /// The SQLite inspector a host shim registers its databases
    /// against, before or after `start`.
    pub fn inspector(&self) -> Arc<Inspector> {
        self.inspector.clone()
    }

    /// The HTTP capture pipeline a host network shim drives, once
    /// `start` has run.
    pub fn http_pipeline(&self) -> Option<Arc<debugprobe_pipeline::HttpPipeline>> {
        self.http_pipeline.lock().clone()
    }

    /// The WebSocket capture pipeline a host network shim drives, once
    /// `start` has run.
    pub fn ws_pipeline(&self) -> Option<Arc<debugprobe_pipeline::WsPipeline>> {
        self.ws_pipeline.lock().clone()
    }

    /// The page-timing recorder a host UI shim drives, once `start` has
    /// run.
    pub fn timing_recorder(&self) -> Option<Arc<debugprobe_timing::TimingRecorder>> {
        self.timing_recorder.lock().clone()
    }

    /// A fresh `tracing_subscriber::Layer` the host registers on its
    /// own subscriber, once `start` has run. Each call returns an
    /// independent handle to the same underlying event bus.
    pub fn log_layer(&self) -> Option<DebugProbeLogLayer> {
        self.log_layer
            .lock()
            .as_ref()
            .map(|_| DebugProbeLogLayer::new(self.kernel.event_bus()))
    }

    /// Route a Hub-originated command to the plugin it targets.
    pub async fn route_command(&self, command: PluginCommand) -> PluginCommandResponse {
        self.kernel.route_command(command).await
    }

    /// Construct, register, and start the five built-in plugins, then
    /// start the kernel and spawn the bridge's connect/reconnect loop.
    ///
    /// A no-op returning [`AgentError::Disabled`] if
    /// [`AgentConfig::is_enabled`] is `false`; fails with
    /// [`AgentError::AlreadyRunning`] if called twice.
    pub async fn start(&self, device: DeviceInfo) -> anyhow::Result<()> {
        if !self.config.is_enabled {
            return Err(AgentError::Disabled.into());
        }
        {
            let mut running = self.running.lock();
            if *running {
                return Err(AgentError::AlreadyRunning.into());
            }
            *running = true;
        }

        let event_bus = self.kernel.event_bus();
        let priority_tx = self.bridge.priority_sender();

        let http_plugin = HttpPlugin::new(
            event_bus.clone(),
            self.mock_engine.clone(),
            self.chaos_engine.clone(),
            self.breakpoint_engine.clone(),
            priority_tx,
        );
        *self.http_pipeline.lock() = Some(http_plugin.pipeline());

        let ws_plugin = WebSocketPlugin::new(event_bus.clone(), self.mock_engine.clone());
        *self.ws_pipeline.lock() = Some(ws_plugin.pipeline());

        let log_plugin = LogPlugin::new(event_bus.clone());
        *self.log_layer.lock() = Some(log_plugin.tracing_layer());

        let database_plugin = DatabasePlugin::new(self.inspector.clone());

        let timing_plugin = PageTimingPlugin::new(event_bus.clone());
        *self.timing_recorder.lock() = Some(timing_plugin.recorder());

        self.kernel.register(Box::new(http_plugin)).await?;
        self.kernel.register(Box::new(ws_plugin)).await?;
        self.kernel.register(Box::new(log_plugin)).await?;
        self.kernel.register(Box::new(database_plugin)).await?;
        self.kernel.register(Box::new(timing_plugin)).await?;

        for id in PLUGIN_IDS {
            if !self.config.is_plugin_enabled(id) {
                self.kernel.set_plugin_enabled(id, false).await?;
            }
        }

        self.kernel.start_all(device).await?;

        let bridge = self.bridge.clone();
        tokio::spawn(async move {
            bridge.run().await;
        });

        Ok(())
    }

    /// Stop the bridge and tear down every registered plugin. Safe to
    /// call even if `start` was never called.
    pub async fn stop(&self) {
        self.bridge.stop();
        self.kernel.stop_all().await;
        *self.running.lock() = false;
    }
}
