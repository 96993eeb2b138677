//! The Hub-facing transport for the DebugProbe agent.
//!
//! Owns the durable outbound event queue, the WebSocket connection to
//! the Hub, the registration handshake, reconnect-with-backoff, and
//! command/breakpoint dispatch into the plugin kernel.

pub mod backoff;
pub mod client;
pub mod error;
pub mod metrics;
pub mod queue;
pub mod state;

pub use backoff::Backoff;
pub use client::{breakpoint_hit_frame, plugin_state_changed_frame, BridgeClient, BridgeConfig};
pub use error::{BridgeError, Result};
pub use metrics::{BridgeMetrics, MetricsSnapshot};
pub use queue::{OutboundQueue, QueuedEvent};
pub use state::ConnectionState;
