//! HTTP capture types

use crate::event::EventId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Category of a network failure, real or chaos-synthesized.
///
/// Chaos-synthesized failures MUST use this same shape as real network
/// errors so Hub display remains uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The request exceeded its deadline.
    Timeout,
    /// DNS resolution failed.
    Dns,
    /// TLS handshake or certificate validation failed.
    Tls,
    /// The request was cancelled by the caller (e.g. a breakpoint abort).
    Cancelled,
    /// A generic transport-level failure (connection reset, drop).
    Network,
    /// The upstream responded, but with an HTTP-level error the agent
    /// wants to surface structurally (e.g. a synthesized status code).
    Http,
}

/// Structured network error, shared by real failures and chaos faults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkError {
    /// Error domain, e.g. "NSURLErrorDomain" or "debugprobe.chaos".
    pub domain: String,
    /// Domain-specific error code.
    pub code: i64,
    /// Coarse category used for Hub-side iconography/grouping.
    pub category: ErrorCategory,
    /// Whether this is a network-layer error (vs. an application error).
    pub is_network_error: bool,
    /// Human-readable message.
    pub message: String,
}

impl NetworkError {
    /// Build the error a chaos `Timeout` action produces.
    pub fn chaos_timeout() -> Self {
        Self {
            domain: "debugprobe.chaos".to_string(),
            code: -1001,
            category: ErrorCategory::Timeout,
            is_network_error: true,
            message: "Chaos rule injected a timeout".to_string(),
        }
    }

    /// Build the error a chaos `ConnectionReset` action produces.
    pub fn chaos_connection_reset() -> Self {
        Self {
            domain: "debugprobe.chaos".to_string(),
            code: -1005,
            category: ErrorCategory::Network,
            is_network_error: true,
            message: "Chaos rule reset the connection".to_string(),
        }
    }

    /// Build the error a chaos `Drop` action produces.
    pub fn chaos_dropped() -> Self {
        Self {
            domain: "debugprobe.chaos".to_string(),
            code: -1009,
            category: ErrorCategory::Network,
            is_network_error: true,
            message: "Chaos rule dropped the request".to_string(),
        }
    }

    /// Build the error a breakpoint `Abort` action produces.
    pub fn breakpoint_aborted() -> Self {
        Self {
            domain: "debugprobe.breakpoint".to_string(),
            code: -999,
            category: ErrorCategory::Cancelled,
            is_network_error: true,
            message: "Request aborted at breakpoint".to_string(),
        }
    }
}

/// Captured outbound request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpRequest {
    /// Unique id for this request (and its HTTPEvent).
    pub id: EventId,
    /// HTTP method, e.g. "GET".
    pub method: String,
    /// Absolute request URL.
    pub url: String,
    /// Request headers.
    pub headers: HashMap<String, String>,
    /// Request body, if captured.
    pub body: Option<Vec<u8>>,
    /// Time the request started.
    pub start_time: DateTime<Utc>,
    /// If this request is a redirect hop, the id of the HTTPEvent it was
    /// redirected from.
    pub parent_request_id: Option<EventId>,
}

/// Captured response, possibly mocked or chaos-modified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status_code: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body, if captured.
    pub body: Option<Vec<u8>>,
    /// Wall-clock duration of the request in milliseconds.
    pub duration_ms: u64,
    /// Structured error, present only on failure.
    pub error: Option<NetworkError>,
    /// Whether this response was produced by a mock rule rather than the
    /// real network. True only when a rule *produced* the payload.
    pub is_mocked: bool,
    /// The id of the mock rule that produced this response, if any.
    pub matched_mock_rule_id: Option<String>,
}

/// One captured HTTP request/response pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpEvent {
    /// The request half, always present.
    pub request: HttpRequest,
    /// The response half, present once the exchange completes (or is
    /// short-circuited by a mock/breakpoint/chaos action).
    pub response: Option<HttpResponse>,
}
