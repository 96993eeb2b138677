//! Capture-and-intervene pipeline for HTTP and WebSocket traffic.

pub mod http_pipeline;
pub mod ws_pipeline;

pub use http_pipeline::{HttpPipeline, RequestOutcome};
pub use ws_pipeline::{WsFrameDecision, WsPipeline};
