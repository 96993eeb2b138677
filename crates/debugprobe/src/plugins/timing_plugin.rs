//! The page-visit timing plugin.
//!
//! Thin lifecycle wrapper around `debugprobe_timing::TimingRecorder`,
//! which does the actual bookkeeping and emits through the `EventBus`'s
//! page-timing slot. The host UI shim calls the `mark_*`/`add_marker`
//! methods directly through [`PageTimingPlugin::recorder`].

use crate::plugins::forwarding::PageTimingEventForwarder;
use async_trait::async_trait;
use debugprobe_kernel::{EventBus, EventEmitter, Plugin, PluginContext, Result as KernelResult};
use debugprobe_timing::TimingRecorder;
use debugprobe_types::{PluginCommand, PluginCommandResponse};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct PageTimingPlugin {
    event_bus: Arc<EventBus>,
    recorder: Arc<TimingRecorder>,
    event_out: Option<EventEmitter>,
    active: AtomicBool,
}

impl PageTimingPlugin {
    pub fn new(event_bus: Arc<EventBus>) -> Self {
        let recorder = Arc::new(TimingRecorder::new(event_bus.clone()));
        Self {
            event_bus,
            recorder,
            event_out: None,
            active: AtomicBool::new(true),
        }
    }

    /// The recorder a host UI capture shim drives directly.
    pub fn recorder(&self) -> Arc<TimingRecorder> {
        self.recorder.clone()
    }
}

#[async_trait]
impl Plugin for PageTimingPlugin {
    fn id(&self) -> &str {
        "page_timing"
    }

    fn display_name(&self) -> &str {
        "Page Timing"
    }

    async fn initialize(&mut self, ctx: PluginContext) -> KernelResult<()> {
        self.event_out = Some(ctx.event_out);
        Ok(())
    }

    async fn start(&mut self) -> KernelResult<()> {
        if let Some(event_out) = self.event_out.clone() {
            self.event_bus
                .install_page_timing(Arc::new(PageTimingEventForwarder(event_out)))
                .await;
        }
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&mut self) -> KernelResult<()> {
        self.event_bus.remove_page_timing().await;
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
                Some(serde_json::json!({
                    "active": self.active.load(Ordering::SeqCst),
                    "open_visit_count": self.recorder.open_visit_count(),
                })),
            ),
            other => PluginCommandResponse::failure(&command, format!("unknown command_type: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_status_reports_open_visit_count() {
        let bus = Arc::new(EventBus::new());
        let mut plugin = PageTimingPlugin::new(bus);
        plugin.start().await.unwrap();

        let visit_id = plugin.recorder().mark_page_start(debugprobe_timing::PageVisitStart {
            page_id: "p1".to_string(),
            page_name: "Home".to_string(),
            route: None,
            is_cold_start: false,
            is_push: None,
            parent_page_id: None,
        });

        let status = plugin
            .handle_command(PluginCommand {
                plugin_id: "page_timing".to_string(),
                command_id: "c1".to_string(),
                command_type: "get_status".to_string(),
                payload: None,
            })
            .await;
        assert_eq!(status.payload.unwrap()["open_visit_count"], serde_json::json!(1));

        plugin.recorder().mark_page_end(visit_id).await;
    }
}
