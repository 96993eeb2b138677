//! `EventBus`
//!
//! Capture shims publish raw artifacts and consult rule engines through
//! this registry. Each slot is a single interior-mutable cell, installed
//! by a plugin's `start` and removed by its `stop`; concurrent installers
//! are serialized by the slot's own lock.

use async_trait::async_trait;
use debugprobe_types::{
    ChaosRequestOutcome, HttpRequest, HttpResponse, LogEvent, MockRequestOutcome,
    PageTimingEvent, RequestBreakpointResult, ResponseBreakpointResult, WsEvent,
};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Receives every captured HTTP exchange once the pipeline has finished
/// applying interventions.
#[async_trait]
pub trait HttpCallback: Send + Sync {
    /// Called once per completed (or short-circuited) HTTP exchange.
    async fn on_http_event(&self, event: debugprobe_types::HttpEvent);
}

/// Receives host application log records.
#[async_trait]
pub trait LogCallback: Send + Sync {
    /// Called once per captured log record.
    async fn on_log_event(&self, event: LogEvent);
}

/// Receives WebSocket session and frame events.
#[async_trait]
pub trait WsCallback: Send + Sync {
    /// Called once per session lifecycle transition or captured frame.
    async fn on_ws_event(&self, event: WsEvent);
}

/// Receives page-timing summaries.
#[async_trait]
pub trait PageTimingCallback: Send + Sync {
    /// Called once a page visit closes.
    async fn on_page_timing_event(&self, event: PageTimingEvent);
}

/// Consulted synchronously (from the EventBus's perspective) by the
/// pipeline's mock-request stage. A matched rule — whether its nominal
/// target type is `http-request` or `http-response` — is decided here,
/// before the request ever reaches the network, since only this stage
/// can short-circuit without a real round-trip.
#[async_trait]
pub trait MockCallback: Send + Sync {
    /// Evaluate the mock rule set against an outbound request.
    async fn match_request(&self, request: HttpRequest) -> MockRequestOutcome;
}

/// Consulted by the pipeline's chaos stages.
#[async_trait]
pub trait ChaosCallback: Send + Sync {
    /// Evaluate the chaos rule set against an outbound request.
    async fn match_request(&self, request: &HttpRequest) -> ChaosRequestOutcome;

    /// Possibly corrupt a response body (chaos response stage).
    async fn corrupt_response(&self, request: &HttpRequest, response: HttpResponse) -> HttpResponse;
}

/// Consulted by the pipeline's breakpoint stages.
#[async_trait]
pub trait BreakpointCallback: Send + Sync {
    /// Evaluate the breakpoint rule set against an outbound request,
    /// suspending if a rule matches.
    async fn match_request(&self, request: HttpRequest) -> RequestBreakpointResult;

    /// Evaluate the breakpoint rule set against an inbound response,
    /// correlated with the request that produced it.
    async fn match_response(&self, request: &HttpRequest, response: HttpResponse) -> ResponseBreakpointResult;

    /// Whether any enabled response-stage breakpoint rule could match
    /// `request` — used by the pipeline to skip full-body buffering when
    /// false.
    async fn has_response_rule(&self, request: &HttpRequest) -> bool;
}

type Slot<T> = RwLock<Option<Arc<T>>>;

/// Process-wide (well: agent-wide) registry of typed callback slots.
#[derive(Default)]
pub struct EventBus {
    http: Slot<dyn HttpCallback>,
    log: Slot<dyn LogCallback>,
    ws: Slot<dyn WsCallback>,
    page_timing: Slot<dyn PageTimingCallback>,
    mock: Slot<dyn MockCallback>,
    chaos: Slot<dyn ChaosCallback>,
    breakpoint: Slot<dyn BreakpointCallback>,
}

macro_rules! slot_accessors {
    ($install:ident, $remove:ident, $get:ident, $field:ident, $trait:ident) => {
        /// Install a callback into this slot, replacing any previous one.
        pub async fn $install(&self, callback: Arc<dyn $trait>) {
            *self.$field.write().await = Some(callback);
        }

        /// Remove whatever callback currently occupies this slot.
        pub async fn $remove(&self) {
            *self.$field.write().await = None;
        }

        /// Fetch the currently installed callback, if any.
        pub async fn $get(&self) -> Option<Arc<dyn $trait>> {
            self.$field.read().await.clone()
        }
    };
}

impl EventBus {
    /// Create an empty event bus with no callbacks installed.
    pub fn new() -> Self {
        Self::default()
    }

    slot_accessors!(install_http, remove_http, http, http, HttpCallback);
    slot_accessors!(install_log, remove_log, log, log, LogCallback);
    slot_accessors!(install_ws, remove_ws, ws, ws, WsCallback);
    slot_accessors!(
        install_page_timing,
        remove_page_timing,
        page_timing,
        page_timing,
        PageTimingCallback
    );
    slot_accessors!(install_mock, remove_mock, mock, mock, MockCallback);
    slot_accessors!(install_chaos, remove_chaos, chaos, chaos, ChaosCallback);
    slot_accessors!(
        install_breakpoint,
        remove_breakpoint,
        breakpoint,
        breakpoint,
        BreakpointCallback
    );
}
