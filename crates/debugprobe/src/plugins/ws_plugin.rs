//! The WebSocket capture-and-intervene plugin.
//!
//! Shares its [`MockEngine`] with [`crate::plugins::HttpPlugin`]:
//! `TargetType::WsOutgoing`/`WsIncoming` rules live in the same rule set
//! as HTTP request/response rules. Unlike the HTTP plugin, rule
//! management commands are not exposed here — the Hub manages the
//! shared mock rule set through the HTTP plugin.
//!
//! `WsPipeline` only decides whether a frame is replaced; it never
//! publishes captured sessions/frames itself. A host capture shim
//! reports the actual session lifecycle and frame traffic back through
//! [`WebSocketPlugin::record_event`].

use crate::plugins::forwarding::WsEventForwarder;
use async_trait::async_trait;
use debugprobe_kernel::{EventBus, EventEmitter, Plugin, PluginContext, Result as KernelResult};
use debugprobe_pipeline::WsPipeline;
use debugprobe_rules::MockEngine;
use debugprobe_types::{PluginCommand, PluginCommandResponse, WsEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The WebSocket plugin: the capture pipeline over the shared mock
/// engine.
pub struct WebSocketPlugin {
    event_bus: Arc<EventBus>,
    pipeline: Arc<WsPipeline>,
    event_out: Option<EventEmitter>,
    active: AtomicBool,
}

impl WebSocketPlugin {
    /// Build the plugin over `mock_engine`, which must be the same
    /// instance installed into [`crate::plugins::HttpPlugin`].
    pub fn new(event_bus: Arc<EventBus>, mock_engine: Arc<MockEngine>) -> Self {
        Self {
            event_bus,
            pipeline: Arc::new(WsPipeline::new(mock_engine)),
            event_out: None,
            active: AtomicBool::new(true),
        }
    }

    /// The pipeline a host capture shim consults for outgoing/incoming
    /// mock-frame decisions.
    pub fn pipeline(&self) -> Arc<WsPipeline> {
        self.pipeline.clone()
    }

    /// Report a captured session lifecycle transition or frame. Called
    /// by the host capture shim after it acts on a [`WsPipeline`]
    /// decision.
    pub async fn record_event(&self, event: WsEvent) {
        if let Some(callback) = self.event_bus.ws().await {
            callback.on_ws_event(event).await;
        }
    }
}

#[async_trait]
impl Plugin for WebSocketPlugin {
    fn id(&self) -> &str {
        "websocket"
    }

    fn display_name(&self) -> &str {
        "WebSocket Capture"
    }

    async fn initialize(&mut self, ctx: PluginContext) -> KernelResult<()> {
        self.event_out = Some(ctx.event_out);
        Ok(())
    }

    async fn start(&mut self) -> KernelResult<()> {
        if let Some(event_out) = self.event_out.clone() {
            self.event_bus
                .install_ws(Arc::new(WsEventForwarder(event_out)))
                .await;
        }
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&mut self) -> KernelResult<()> {
        self.event_bus.remove_ws().await;
        self.active.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn pause(&mut self) -> KernelResult<()> {
        self.active.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn resume(&mut self) -> KernelResult<()> {
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn handle_command(&mut self, command: PluginCommand) -> PluginCommandResponse {
        match command.command_type.as_str() {
            "enable" => {
                self.active.store(true, Ordering::SeqCst);
                PluginCommandResponse::success(&command, None)
            }
            "disable" => {
                self.active.store(false, Ordering::SeqCst);
                PluginCommandResponse::success(&command, None)
            }
            "get_status" => PluginCommandResponse::success(
                &command,
                Some(serde_json::json!({ "active": self.active.load(Ordering::SeqCst) })),
            ),
            other => PluginCommandResponse::failure(&command, format!("unknown command_type: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use debugprobe_types::ws::WsSession;
    use std::sync::atomic::AtomicUsize;

    struct CountingWs(Arc<AtomicUsize>);

    #[async_trait]
    impl debugprobe_kernel::WsCallback for CountingWs {
        async fn on_ws_event(&self, _event: WsEvent) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn record_event_forwards_to_whatever_is_installed() {
        let bus = Arc::new(EventBus::new());
        let count = Arc::new(AtomicUsize::new(0));
        bus.install_ws(Arc::new(CountingWs(count.clone()))).await;

        let plugin = WebSocketPlugin::new(bus, Arc::new(MockEngine::new()));
        plugin
            .record_event(WsEvent::SessionCreated(WsSession {
                id: debugprobe_types::EventId::new_v4(),
                session_id: uuid::Uuid::new_v4(),
                url: "wss://x/socket".to_string(),
                created_at: chrono::Utc::now(),
            }))
            .await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn disable_then_enable_round_trips_get_status() {
        let bus = Arc::new(EventBus::new());
        let mut plugin = WebSocketPlugin::new(bus, Arc::new(MockEngine::new()));

        let command = PluginCommand {
            plugin_id: "websocket".to_string(),
            command_id: "c1".to_string(),
            command_type: "disable".to_string(),
            payload: None,
        };
        plugin.handle_command(command).await;

        let status = plugin
            .handle_command(PluginCommand {
                plugin_id: "websocket".to_string(),
                command_id: "c2".to_string(),
                command_type: "get_status".to_string(),
                payload: None,
            })
            .await;
        assert_eq!(status.payload.unwrap()["active"], serde_json::json!(false));
    }
}
