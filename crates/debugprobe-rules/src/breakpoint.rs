//! The breakpoint rule engine.
//!
//! Unlike mock and chaos rules, a breakpoint match suspends the pipeline
//! until the Hub answers with a `resume_breakpoint` command. Suspension
//! is modeled with a one-shot channel keyed by request id; `resolve`
//! (called when the bridge routes a `ResumeBreakpoint` frame) completes
//! the matching waiter, unblocking the suspended pipeline stage.

use crate::store::RuleStore;
use async_trait::async_trait;
use debugprobe_kernel::BreakpointCallback;
use debugprobe_types::bridge::BreakpointHitPayload;
use debugprobe_types::rules::{BreakpointResumeAction, BreakpointStage};
use debugprobe_types::{
    BreakpointRule, EventId, HttpRequest, HttpResponse, RequestBreakpointResult,
    ResponseBreakpointResult, TargetType,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::{mpsc, oneshot};

/// The Hub's resolution of a suspended breakpoint.
#[derive(Debug, Clone)]
pub struct BreakpointResume {
    /// What to do: proceed, abort, or proceed with a modification.
    pub action: BreakpointResumeAction,
    /// Replacement request body, for `Modify` at the request stage.
    pub modified_request: Option<serde_json::Value>,
    /// Replacement response body, for `Modify` at the response stage.
    pub modified_response: Option<serde_json::Value>,
}

/// Owns the live breakpoint rule set, the table of currently-suspended
/// requests, and the channel that notifies the bridge of new hits.
pub struct BreakpointEngine {
    store: RuleStore<BreakpointRule>,
    waiters: Mutex<HashMap<EventId, oneshot::Sender<BreakpointResume>>>,
    hit_tx: mpsc::UnboundedSender<BreakpointHitPayload>,
    hit_rx: Mutex<Option<mpsc::UnboundedReceiver<BreakpointHitPayload>>>,
}

impl BreakpointEngine {
    /// A fresh engine with no rules installed and no suspended requests.
    pub fn new() -> Self {
        let (hit_tx, hit_rx) = mpsc::unbounded_channel();
        Self {
            store: RuleStore::new(),
            waiters: Mutex::new(HashMap::new()),
            hit_tx,
            hit_rx: Mutex::new(Some(hit_rx)),
        }
    }

    /// Replace the entire breakpoint rule set.
    pub fn replace_rules(&self, rules: Vec<BreakpointRule>) {
        self.store.replace_all(rules);
    }

    /// Number of rules currently installed.
    pub fn rule_count(&self) -> usize {
        self.store.len()
    }

    /// Every rule currently installed, in priority order.
    pub fn rules(&self) -> Vec<BreakpointRule> {
        self.store.snapshot()
    }

    /// Install or replace a single rule by id.
    pub fn add_rule(&self, rule: BreakpointRule) {
        self.store.upsert(rule);
    }

    /// Remove a single rule by id. Returns whether one was removed.
    pub fn remove_rule(&self, id: &str) -> bool {
        self.store.remove(id)
    }

    /// Take ownership of the channel carrying breakpoint-hit
    /// notifications, for the bridge to forward to the Hub. Callable
    /// once.
    pub fn take_hit_receiver(&self) -> Option<mpsc::UnboundedReceiver<BreakpointHitPayload>> {
        self.hit_rx.lock().take()
    }

    /// Resolve a suspended breakpoint by request id. Returns `false` if
    /// no request with that id is currently suspended (e.g. the Hub
    /// resolved an id twice, or resolved after a timeout already
    /// resumed it).
    pub fn resolve(&self, request_id: EventId, resume: BreakpointResume) -> bool {
        let sender = self.waiters.lock().remove(&request_id);
        match sender {
            Some(sender) => sender.send(resume).is_ok(),
            None => false,
        }
    }

    async fn suspend(&self, id: EventId, snapshot: serde_json::Value) -> BreakpointResume {
        let (tx, rx) = oneshot::channel();
        self.waiters.lock().insert(id, tx);

        let _ = self.hit_tx.send(BreakpointHitPayload {
            request_id: id.to_string(),
            snapshot,
        });

        rx.await.unwrap_or(BreakpointResume {
            action: BreakpointResumeAction::Resume,
            modified_request: None,
            modified_response: None,
        })
    }
}

impl Default for BreakpointEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BreakpointCallback for BreakpointEngine {
    async fn match_request(&self, request: HttpRequest) -> RequestBreakpointResult {
        let matched = self.store.find_match(
            TargetType::HttpRequest,
            &request.method,
            &request.url,
        );
        if matched.is_none() {
            return RequestBreakpointResult::Proceed(request);
        }

        let snapshot = serde_json::to_value(&request).unwrap_or(serde_json::Value::Null);
        let resume = self.suspend(request.id, snapshot).await;

        match resume.action {
            BreakpointResumeAction::Abort => RequestBreakpointResult::Abort(request),
            BreakpointResumeAction::Resume => RequestBreakpointResult::Proceed(request),
            BreakpointResumeAction::Modify => match resume
                .modified_request
                .and_then(|v| serde_json::from_value::<HttpRequest>(v).ok())
            {
                Some(modified) => RequestBreakpointResult::Proceed(modified),
                None => RequestBreakpointResult::Proceed(request),
            },
        }
    }

    async fn match_response(&self, request: &HttpRequest, response: HttpResponse) -> ResponseBreakpointResult {
        let snapshot = serde_json::json!({ "request": request, "response": response });
        let resume = self.suspend(request.id, snapshot).await;

        match resume.action {
            BreakpointResumeAction::Abort | BreakpointResumeAction::Resume => {
                ResponseBreakpointResult::Proceed(response)
            }
            BreakpointResumeAction::Modify => match resume
                .modified_response
                .and_then(|v| serde_json::from_value::<HttpResponse>(v).ok())
            {
                Some(modified) => ResponseBreakpointResult::Replace(modified),
                None => ResponseBreakpointResult::Proceed(response),
            },
        }
    }

    async fn has_response_rule(&self, request: &HttpRequest) -> bool {
        self.store.any_match(
            TargetType::HttpResponse,
            &request.method,
            &request.url,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as StdHashMap;

    fn request(url: &str) -> HttpRequest {
        HttpRequest {
            id: EventId::new_v4(),
            method: "GET".to_string(),
            url: url.to_string(),
            headers: StdHashMap::new(),
            body: None,
            start_time: chrono::Utc::now(),
            parent_request_id: None,
        }
    }

    fn breakpoint_rule(id: &str, stage: BreakpointStage) -> BreakpointRule {
        BreakpointRule {
            id: id.to_string(),
            enabled: true,
            priority: 0,
            url_pattern: Some("*".to_string()),
            method: None,
            stage,
        }
    }

    #[tokio::test]
    async fn unmatched_request_proceeds_immediately() {
        let engine = BreakpointEngine::new();
        let req = request("https://x/y");
        let result = engine.match_request(req.clone()).await;
        match result {
            RequestBreakpointResult::Proceed(r) => assert_eq!(r.id, req.id),
            other => panic!("expected Proceed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn matched_request_suspends_until_resolved() {
        let engine = std::sync::Arc::new(BreakpointEngine::new());
        engine.replace_rules(vec![breakpoint_rule("b1", BreakpointStage::Request)]);
        let mut hits = engine.take_hit_receiver().unwrap();

        let req = request("https://x/y");
        let req_id = req.id;
        let engine2 = engine.clone();
        let handle = tokio::spawn(async move { engine2.match_request(req).await });

        let hit = hits.recv().await.expect("hit notification");
        assert_eq!(hit.request_id, req_id.to_string());

        let resolved = engine.resolve(
            req_id,
            BreakpointResume {
                action: BreakpointResumeAction::Resume,
                modified_request: None,
                modified_response: None,
            },
        );
        assert!(resolved);

        let result = handle.await.unwrap();
        assert!(matches!(result, RequestBreakpointResult::Proceed(_)));
    }

    #[tokio::test]
    async fn abort_action_aborts_the_request() {
        let engine = std::sync::Arc::new(BreakpointEngine::new());
        engine.replace_rules(vec![breakpoint_rule("b1", BreakpointStage::Request)]);
        let mut hits = engine.take_hit_receiver().unwrap();

        let req = request("https://x/y");
        let req_id = req.id;
        let engine2 = engine.clone();
        let handle = tokio::spawn(async move { engine2.match_request(req).await });

        hits.recv().await.expect("hit notification");
        engine.resolve(
            req_id,
            BreakpointResume {
                action: BreakpointResumeAction::Abort,
                modified_request: None,
                modified_response: None,
            },
        );

        let result = handle.await.unwrap();
        assert!(matches!(result, RequestBreakpointResult::Abort(_)));
    }

    #[tokio::test]
    async fn has_response_rule_reflects_response_stage_rules() {
        let engine = BreakpointEngine::new();
        let req = request("https://x/y");
        assert!(!engine.has_response_rule(&req).await);

        engine.replace_rules(vec![breakpoint_rule("b1", BreakpointStage::Response)]);
        assert!(engine.has_response_rule(&req).await);
    }

    fn response() -> HttpResponse {
        HttpResponse {
            status_code: 200,
            headers: StdHashMap::new(),
            body: Some(b"{\"v\":1}".to_vec()),
            duration_ms: 12,
            error: None,
            is_mocked: false,
            matched_mock_rule_id: None,
        }
    }

    #[tokio::test]
    async fn response_stage_hit_is_keyed_by_the_originating_request_id() {
        let engine = std::sync::Arc::new(BreakpointEngine::new());
        engine.replace_rules(vec![breakpoint_rule("b1", BreakpointStage::Response)]);
        let mut hits = engine.take_hit_receiver().unwrap();

        let req = request("https://x/y");
        let req_id = req.id;
        let engine2 = engine.clone();
        let handle = tokio::spawn(async move { engine2.match_response(&req, response()).await });

        let hit = hits.recv().await.expect("hit notification");
        assert_eq!(hit.request_id, req_id.to_string());
        assert_eq!(hit.snapshot["request"]["id"], serde_json::json!(req_id));

        engine.resolve(
            req_id,
            BreakpointResume {
                action: BreakpointResumeAction::Modify,
                modified_request: None,
                modified_response: Some(serde_json::json!({
                    "status_code": 418,
                    "headers": {},
                    "body": null,
                    "duration_ms": 0,
                    "error": null,
                    "is_mocked": false,
                    "matched_mock_rule_id": null,
                })),
            },
        );

        let result = handle.await.unwrap();
        match result {
            ResponseBreakpointResult::Replace(r) => assert_eq!(r.status_code, 418),
            other => panic!("expected Replace, got {other:?}"),
        }
    }
}
