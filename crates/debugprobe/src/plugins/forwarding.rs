//! Small adapters that forward captured artifacts from an `EventBus`
//! callback slot into a plugin's [`PluginContext::event_out`].
//!
//! A plugin installs the relevant forwarder in `start` and removes it
//! in `stop`, the same as it would a rule engine; this keeps the
//! pipelines (`HttpPipeline`, `WsPipeline`, ...) ignorant of the bridge
//! entirely, consulting only the `EventBus`.

use async_trait::async_trait;
use debugprobe_kernel::{EventEmitter, HttpCallback, LogCallback, PageTimingCallback, WsCallback};
use debugprobe_types::{Event, HttpEvent, LogEvent, PageTimingEvent, WsEvent};

pub struct HttpEventForwarder(pub EventEmitter);

#[async_trait]
impl HttpCallback for HttpEventForwarder {
    async fn on_http_event(&self, event: HttpEvent) {
        self.0.emit(Event::Http(event));
    }
}

pub struct WsEventForwarder(pub EventEmitter);

#[async_trait]
impl WsCallback for WsEventForwarder {
    async fn on_ws_event(&self, event: WsEvent) {
        self.0.emit(Event::WebSocket(event));
    }
}

pub struct LogEventForwarder(pub EventEmitter);

#[async_trait]
impl LogCallback for LogEventForwarder {
    async fn on_log_event(&self, event: LogEvent) {
        self.0.emit(Event::Log(event));
    }
}

pub struct PageTimingEventForwarder(pub EventEmitter);

#[async_trait]
impl PageTimingCallback for PageTimingEventForwarder {
    async fn on_page_timing_event(&self, event: PageTimingEvent) {
        self.0.emit(Event::PageTiming(event));
    }
}
