//! Ambient transport metrics: dropped/delivered event counters and
//! reconnect counts for the bridge, independent of any full metrics
//! subsystem.

use std::sync::atomic::{AtomicU64, Ordering};

/// Running counters for the bridge transport.
#[derive(Default)]
pub struct BridgeMetrics {
    /// Events dropped from the outbound queue due to overflow.
    pub events_dropped: AtomicU64,
    /// Events successfully acknowledged by the Hub.
    pub events_delivered: AtomicU64,
    /// Number of times the bridge has entered `Failed` and backed off.
    pub reconnect_count: AtomicU64,
}

/// A point-in-time copy of [`BridgeMetrics`]' counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// See [`BridgeMetrics::events_dropped`].
    pub events_dropped: u64,
    /// See [`BridgeMetrics::events_delivered`].
    pub events_delivered: u64,
    /// See [`BridgeMetrics::reconnect_count`].
    pub reconnect_count: u64,
}

impl BridgeMetrics {
    /// All counters start at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the current counter values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            events_delivered: self.events_delivered.load(Ordering::Relaxed),
            reconnect_count: self.reconnect_count.load(Ordering::Relaxed),
        }
    }
}
