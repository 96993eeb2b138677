//! Mock / chaos / breakpoint rule definitions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What kind of traffic a rule targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetType {
    /// An outbound HTTP request, before it reaches the network.
    HttpRequest,
    /// An inbound HTTP response, before it reaches the host app.
    HttpResponse,
    /// A WebSocket frame the host app is about to send.
    WsOutgoing,
    /// A WebSocket frame the host app is about to receive.
    WsIncoming,
}

/// Shared rule metadata common to mock, chaos, and breakpoint rules.
///
/// `priority` is evaluated highest-first; ties are broken by insertion
/// order.
pub trait Rule {
    /// Stable rule id, referenced by Hub commands and match results.
    fn id(&self) -> &str;
    /// Whether the rule currently participates in matching.
    fn enabled(&self) -> bool;
    /// Evaluation priority; higher values are tried first.
    fn priority(&self) -> i32;
    /// Optional URL pattern (`*` wildcard, or substring match otherwise).
    fn url_pattern(&self) -> Option<&str>;
    /// Optional HTTP method filter, e.g. "POST".
    fn method(&self) -> Option<&str>;
    /// The kind of traffic this rule applies to.
    fn target_type(&self) -> TargetType;
}

/// The body a mock rule returns in place of the real response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockResponseAction {
    /// Status code to return.
    pub status: u16,
    /// Response headers.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Response body, UTF-8 text or base64-decoded by the caller.
    pub body: String,
    /// Artificial delay before responding, in milliseconds.
    #[serde(default)]
    pub delay_ms: u64,
}

/// A mocked WebSocket frame a mock rule injects or replaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockFrameAction {
    /// Opcode of the injected frame.
    pub opcode: crate::ws::WsFrameOpcode,
    /// Payload of the injected frame.
    pub payload: Vec<u8>,
}

/// The action a matched mock rule performs, per `target_type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MockAction {
    /// Fabricate an HTTP response (target type `http-response`, or
    /// `http-request` to short-circuit before the network).
    Response(MockResponseAction),
    /// Fabricate or replace a WebSocket frame.
    Frame(MockFrameAction),
}

/// A mock rule: matched traffic gets `action` instead of going to the
/// real network/peer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockRule {
    /// Stable id.
    pub id: String,
    /// Whether the rule is active.
    pub enabled: bool,
    /// Evaluation priority, higher first.
    pub priority: i32,
    /// Optional URL pattern.
    pub url_pattern: Option<String>,
    /// Optional HTTP method filter.
    pub method: Option<String>,
    /// Traffic this rule applies to.
    pub target_type: TargetType,
    /// What to do when the rule matches.
    pub action: MockAction,
}

impl Rule for MockRule {
    fn id(&self) -> &str {
        &self.id
    }
    fn enabled(&self) -> bool {
        self.enabled
    }
    fn priority(&self) -> i32 {
        self.priority
    }
    fn url_pattern(&self) -> Option<&str> {
        self.url_pattern.as_deref()
    }
    fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }
    fn target_type(&self) -> TargetType {
        self.target_type
    }
}

/// The fault a matched chaos rule injects, evaluated only on the request
/// side.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChaosAction {
    /// Delay the request by the given number of milliseconds, then
    /// proceed normally.
    Delay {
        /// Delay in milliseconds.
        ms: u64,
    },
    /// Fail the request with a timeout error.
    Timeout,
    /// Fail the request as if the connection was reset.
    ConnectionReset,
    /// Synthesize an error response with the given status code.
    ErrorResponse {
        /// Status code to synthesize.
        status: u16,
    },
    /// Silently drop the request (no response ever arrives).
    Drop,
    /// Response-stage fault: overwrite roughly 1% of the response
    /// body's bytes with random garbage.
    CorruptResponse,
}

/// A chaos rule: on request, evaluated against `probability`; on match,
/// its action models a transport fault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChaosRule {
    /// Stable id.
    pub id: String,
    /// Whether the rule is active.
    pub enabled: bool,
    /// Evaluation priority, higher first.
    pub priority: i32,
    /// Optional URL pattern.
    pub url_pattern: Option<String>,
    /// Optional HTTP method filter.
    pub method: Option<String>,
    /// Probability in [0.0, 1.0] that a matching request is affected.
    pub probability: f64,
    /// The fault to apply on a probability hit.
    pub action: ChaosAction,
}

impl Rule for ChaosRule {
    fn id(&self) -> &str {
        &self.id
    }
    fn enabled(&self) -> bool {
        self.enabled
    }
    fn priority(&self) -> i32 {
        self.priority
    }
    fn url_pattern(&self) -> Option<&str> {
        self.url_pattern.as_deref()
    }
    fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }
    fn target_type(&self) -> TargetType {
        match self.action {
            ChaosAction::CorruptResponse => TargetType::HttpResponse,
            _ => TargetType::HttpRequest,
        }
    }
}

/// Which stage a breakpoint rule suspends at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakpointStage {
    /// Suspend before the request reaches the network.
    Request,
    /// Suspend after the response arrives, before it reaches the host.
    Response,
}

/// A breakpoint rule: on match, the pipeline suspends and awaits a Hub
/// `resume_breakpoint` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakpointRule {
    /// Stable id.
    pub id: String,
    /// Whether the rule is active.
    pub enabled: bool,
    /// Evaluation priority, higher first.
    pub priority: i32,
    /// Optional URL pattern.
    pub url_pattern: Option<String>,
    /// Optional HTTP method filter.
    pub method: Option<String>,
    /// Which stage this rule suspends.
    pub stage: BreakpointStage,
}

impl Rule for BreakpointRule {
    fn id(&self) -> &str {
        &self.id
    }
    fn enabled(&self) -> bool {
        self.enabled
    }
    fn priority(&self) -> i32 {
        self.priority
    }
    fn url_pattern(&self) -> Option<&str> {
        self.url_pattern.as_deref()
    }
    fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }
    fn target_type(&self) -> TargetType {
        match self.stage {
            BreakpointStage::Request => TargetType::HttpRequest,
            BreakpointStage::Response => TargetType::HttpResponse,
        }
    }
}

/// The action carried by a Hub `resume_breakpoint` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakpointResumeAction {
    /// Proceed with the (possibly unmodified) request/response.
    Resume,
    /// Abort the request with a cancelled error.
    Abort,
    /// Proceed with a Hub-supplied modification.
    Modify,
}

impl Default for BreakpointResumeAction {
    /// Unknown actions default to `Resume`.
    fn default() -> Self {
        Self::Resume
    }
}
