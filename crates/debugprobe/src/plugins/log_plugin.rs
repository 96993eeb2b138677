//! Host application log capture.
//!
//! Two capture paths feed the same [`EventBus`] log slot: a
//! [`tracing_subscriber::Layer`] that turns every `tracing` event the
//! host app emits into a [`LogEvent`], and an explicit
//! [`LogPlugin::log_record`] call for capture shims that don't go
//! through `tracing` at all (e.g. a bridged platform log API).

use crate::plugins::forwarding::LogEventForwarder;
use async_trait::async_trait;
use debugprobe_kernel::{EventBus, EventEmitter, Plugin, PluginContext, Result as KernelResult};
use debugprobe_types::{EventId, LogEvent, LogLevel, PluginCommand, PluginCommandResponse};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::Subscriber;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

/// Turns `tracing::Level` into the agent's own severity scale.
fn level_from_tracing(level: &tracing::Level) -> LogLevel {
    match *level {
        tracing::Level::TRACE => LogLevel::Verbose,
        tracing::Level::DEBUG => LogLevel::Debug,
        tracing::Level::INFO => LogLevel::Info,
        tracing::Level::WARN => LogLevel::Warning,
        tracing::Level::ERROR => LogLevel::Error,
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: Vec<(String, String)>,
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let rendered = format!("{value:?}");
        if field.name() == "message" {
            self.message = Some(rendered);
        } else {
            self.fields.push((field.name().to_string(), rendered));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.push((field.name().to_string(), value.to_string()));
        }
    }
}

/// A `tracing_subscriber::Layer` that converts every `tracing::Event`
/// into a [`LogEvent`] and pushes it straight into the `EventBus`'s log
/// slot, bypassing [`PluginContext`] entirely (the layer runs outside
/// any async context the kernel controls).
pub struct DebugProbeLogLayer {
    event_bus: Arc<EventBus>,
}

impl DebugProbeLogLayer {
    pub fn new(event_bus: Arc<EventBus>) -> Self {
        Self { event_bus }
    }
}

impl<S> Layer<S> for DebugProbeLogLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let log_event = LogEvent {
            id: EventId::new_v4(),
            timestamp: chrono::Utc::now(),
            level: level_from_tracing(metadata.level()),
            source: "tracing".to_string(),
            subsystem: metadata.target().to_string(),
            category: metadata.name().to_string(),
            thread: std::thread::current()
                .name()
                .unwrap_or("unknown")
                .to_string(),
            file: metadata.file().map(str::to_string),
            function: None,
            line: metadata.line(),
            message: visitor.message.unwrap_or_default(),
            tags: visitor.fields.into_iter().map(|(k, v)| format!("{k}={v}")).collect(),
            trace_id: None,
        };

        let event_bus = self.event_bus.clone();
        tokio::spawn(async move {
            if let Some(callback) = event_bus.log().await {
                callback.on_log_event(log_event).await;
            }
        });
    }
}

/// The log plugin: installs the `EventBus` log forwarder and hands out
/// a [`DebugProbeLogLayer`] for the host to register with its own
/// `tracing_subscriber::Registry`.
pub struct LogPlugin {
    event_bus: Arc<EventBus>,
    event_out: Option<EventEmitter>,
    active: AtomicBool,
}

impl LogPlugin {
    pub fn new(event_bus: Arc<EventBus>) -> Self {
        Self {
            event_bus,
            event_out: None,
            active: AtomicBool::new(true),
        }
    }

    /// A `tracing_subscriber::Layer` the host registers on its own
    /// subscriber to capture `tracing` output through this plugin.
    pub fn tracing_layer(&self) -> DebugProbeLogLayer {
        DebugProbeLogLayer::new(self.event_bus.clone())
    }

    /// Publish a log record captured outside `tracing`, e.g. from a
    /// platform logging bridge.
    pub async fn log_record(&self, record: LogEvent) {
        if let Some(callback) = self.event_bus.log().await {
            callback.on_log_event(record).await;
        }
    }
}

#[async_trait]
impl Plugin for LogPlugin {
    fn id(&self) -> &str {
        "log"
    }

    fn display_name(&self) -> &str {
        "Log Capture"
    }

    async fn initialize(&mut self, ctx: PluginContext) -> KernelResult<()> {
        self.event_out = Some(ctx.event_out);
        Ok(())
    }

    async fn start(&mut self) -> KernelResult<()> {
        if let Some(event_out) = self.event_out.clone() {
            self.event_bus
                .install_log(Arc::new(LogEventForwarder(event_out)))
                .await;
        }
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&mut self) -> KernelResult<()> {
        self.event_bus.remove_log().await;
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
    use std::sync::atomic::AtomicUsize;

    struct CountingLog(Arc<AtomicUsize>);

    #[async_trait]
    impl debugprobe_kernel::LogCallback for CountingLog {
        async fn on_log_event(&self, _event: LogEvent) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn log_event(message: &str) -> LogEvent {
        LogEvent {
            id: EventId::new_v4(),
            timestamp: chrono::Utc::now(),
            level: LogLevel::Info,
            source: "app".to_string(),
            subsystem: "networking".to_string(),
            category: "general".to_string(),
            thread: "main".to_string(),
            file: None,
            function: None,
            line: None,
            message: message.to_string(),
            tags: Vec::new(),
            trace_id: None,
        }
    }

    #[tokio::test]
    async fn log_record_forwards_to_whatever_is_installed() {
        let bus = Arc::new(EventBus::new());
        let count = Arc::new(AtomicUsize::new(0));
        bus.install_log(Arc::new(CountingLog(count.clone()))).await;

        let plugin = LogPlugin::new(bus);
        plugin.log_record(log_event("hello")).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn disabled_plugin_still_reports_inactive_status() {
        let bus = Arc::new(EventBus::new());
        let mut plugin = LogPlugin::new(bus);
        plugin
            .handle_command(PluginCommand {
                plugin_id: "log".to_string(),
                command_id: "c1".to_string(),
                command_type: "disable".to_string(),
                payload: None,
            })
            .await;

        let status = plugin
            .handle_command(PluginCommand {
                plugin_id: "log".to_string(),
                command_id: "c2".to_string(),
                command_type: "get_status".to_string(),
                payload: None,
            })
            .await;
        assert_eq!(status.payload.unwrap()["active"], serde_json::json!(false));
    }
}
