//! Capture-and-intervene pipeline stage contracts.
//!
//! These types are the return shapes of the per-stage rule lookups. They
//! live alongside the data model (rather than in the pipeline crate
//! itself) because both the kernel's `EventBus` callback slots and the
//! pipeline crate need to agree on them without creating a dependency
//! cycle between the two.

use crate::http::{HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

/// Result of the mock-request stage.
#[derive(Debug, Clone)]
pub struct MockRequestOutcome {
    /// The request, possibly modified by the matched rule.
    pub request: HttpRequest,
    /// A fabricated response, present only when a rule fully matched and
    /// produced one; its presence short-circuits the network call.
    pub response: Option<HttpResponse>,
    /// The id of the rule that matched, if any.
    pub matched_rule_id: Option<String>,
}

impl MockRequestOutcome {
    /// No rule matched; pass the request through unmodified.
    pub fn passthrough(request: HttpRequest) -> Self {
        Self {
            request,
            response: None,
            matched_rule_id: None,
        }
    }
}

/// Result of the breakpoint-request stage ( "Breakpoint
/// request"). Both variants carry the request they were evaluated
/// against (possibly Hub-modified), so the caller can still emit a
/// faithful `HttpEvent` even when the exchange never reaches the
/// network.
#[derive(Debug, Clone)]
pub enum RequestBreakpointResult {
    /// No matching rule, or the Hub resumed (optionally with a
    /// modification).
    Proceed(HttpRequest),
    /// The Hub (or shutdown) aborted the request.
    Abort(HttpRequest),
}

/// Result of the breakpoint-response stage.
#[derive(Debug, Clone)]
pub enum ResponseBreakpointResult {
    /// No matching rule, or the Hub resumed without modification.
    Proceed(HttpResponse),
    /// The Hub replaced the response.
    Replace(HttpResponse),
}

/// Result of the chaos-request stage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum ChaosRequestOutcome {
    /// No rule matched, or the probability gate missed.
    None,
    /// Sleep for the given number of milliseconds, then proceed.
    Delay(u64),
    /// Fail with a timeout error.
    Timeout,
    /// Fail as if the connection was reset.
    ConnectionReset,
    /// Synthesize an error response with this status code.
    ErrorResponse(u16),
    /// Silently drop the request.
    Drop,
}
