//! The `Event` sum type

use crate::http::HttpEvent;
use crate::log::LogEvent;
use crate::paging::PageTimingEvent;
use crate::ws::WsEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for any emitted event.
pub type EventId = Uuid;

/// A statistics snapshot event (queue depth, reconnect count, etc.) —
/// ambient observability, not a capture artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsEvent {
    /// Event id.
    pub id: EventId,
    /// Emission timestamp.
    pub timestamp: DateTime<Utc>,
    /// Free-form numeric counters, keyed by name.
    pub counters: std::collections::HashMap<String, u64>,
}

/// A performance sample (frame time, memory, CPU) — captured by a host
/// shim and forwarded unmodified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceEvent {
    /// Event id.
    pub id: EventId,
    /// Emission timestamp.
    pub timestamp: DateTime<Utc>,
    /// Metric name, e.g. "fps", "memory_mb".
    pub metric: String,
    /// Metric value.
    pub value: f64,
}

/// The top-level event sum type streamed to the Hub.
///
/// Each variant carries its own id/timestamp via its inner struct; events
/// are immutable once constructed and emitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    /// HTTP request/response pair.
    Http(HttpEvent),
    /// Host application log record.
    Log(LogEvent),
    /// WebSocket session lifecycle or frame.
    WebSocket(WsEvent),
    /// Page visit timing summary.
    PageTiming(PageTimingEvent),
    /// Aggregate counters.
    Stats(StatsEvent),
    /// Performance sample.
    Performance(PerformanceEvent),
}

impl Event {
    /// The id of the wrapped event, regardless of variant.
    pub fn id(&self) -> EventId {
        match self {
            Self::Http(e) => e.request.id,
            Self::Log(e) => e.id,
            Self::WebSocket(e) => e.id(),
            Self::PageTiming(e) => e.visit_id,
            Self::Stats(e) => e.id,
            Self::Performance(e) => e.id,
        }
    }
}
