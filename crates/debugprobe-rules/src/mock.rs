//! The mock rule engine.

use crate::store::RuleStore;
use async_trait::async_trait;
use debugprobe_kernel::MockCallback;
use debugprobe_types::rules::{MockAction, MockFrameAction, MockResponseAction};
use debugprobe_types::{HttpRequest, HttpResponse, MockRequestOutcome, MockRule, TargetType};

/// Owns the live mock rule set and answers the pipeline's mock-stage
/// lookups.
#[derive(Default)]
pub struct MockEngine {
    store: RuleStore<MockRule>,
}

impl MockEngine {
    /// An empty engine with no rules installed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entire mock rule set, as delivered by a Hub
    /// `update_rules` command.
    pub fn replace_rules(&self, rules: Vec<MockRule>) {
        self.store.replace_all(rules);
    }

    /// Number of rules currently installed.
    pub fn rule_count(&self) -> usize {
        self.store.len()
    }

    /// Every rule currently installed, in priority order.
    pub fn rules(&self) -> Vec<MockRule> {
        self.store.snapshot()
    }

    /// Install or replace a single rule by id.
    pub fn add_rule(&self, rule: MockRule) {
        self.store.upsert(rule);
    }

    /// Remove a single rule by id. Returns whether one was removed.
    pub fn remove_rule(&self, id: &str) -> bool {
        self.store.remove(id)
    }

    fn synthesize_response(action: &MockResponseAction) -> HttpResponse {
        HttpResponse {
            status_code: action.status,
            headers: action.headers.clone(),
            body: Some(action.body.clone().into_bytes()),
            duration_ms: 0,
            error: None,
            is_mocked: true,
            matched_mock_rule_id: None,
        }
    }

    /// Find a matching WebSocket frame-action rule for `target`
    /// (`WsOutgoing`/`WsIncoming`), used by the pipeline crate's
    /// `WsPipeline`. Mock rules are a single ordered set regardless of
    /// target type, so this reuses the same store as the HTTP stages.
    pub fn match_ws_frame(&self, target: TargetType, url: &str) -> Option<(String, MockFrameAction)> {
        let matched = self.store.find_match(target, "", url)?;
        match matched.action {
            MockAction::Frame(action) => Some((matched.id, action)),
            MockAction::Response(_) => None,
        }
    }
}

#[async_trait]
impl MockCallback for MockEngine {
    async fn match_request(&self, request: HttpRequest) -> MockRequestOutcome {
        // Both http-request- and http-response-targeted rules are decided
        // here, before the request ever reaches the network: only this
        // stage can short-circuit without a real round-trip, which a
        // response-targeted mock rule still requires.
        let matched = self.store.find_match_in(
            &[TargetType::HttpRequest, TargetType::HttpResponse],
            &request.method,
            &request.url,
        );
        match matched {
            Some(rule) => match &rule.action {
                MockAction::Response(action) => {
                    if action.delay_ms > 0 {
                        tokio::time::sleep(std::time::Duration::from_millis(action.delay_ms)).await;
                    }
                    let mut response = Self::synthesize_response(action);
                    response.matched_mock_rule_id = Some(rule.id.clone());
                    MockRequestOutcome {
                        request,
                        response: Some(response),
                        matched_rule_id: Some(rule.id),
                    }
                }
                MockAction::Frame(_) => MockRequestOutcome::passthrough(request),
            },
            None => MockRequestOutcome::passthrough(request),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use debugprobe_types::EventId;
    use std::collections::HashMap;

    fn request(url: &str) -> HttpRequest {
        HttpRequest {
            id: EventId::new_v4(),
            method: "GET".to_string(),
            url: url.to_string(),
            headers: HashMap::new(),
            body: None,
            start_time: chrono::Utc::now(),
            parent_request_id: None,
        }
    }

    fn mock_rule(id: &str, pattern: &str) -> MockRule {
        MockRule {
            id: id.to_string(),
            enabled: true,
            priority: 0,
            url_pattern: Some(pattern.to_string()),
            method: None,
            target_type: TargetType::HttpRequest,
            action: MockAction::Response(MockResponseAction {
                status: 201,
                headers: HashMap::new(),
                body: "{\"ok\":true}".to_string(),
                delay_ms: 0,
            }),
        }
    }

    #[tokio::test]
    async fn matching_rule_short_circuits_with_synthesized_response() {
        let engine = MockEngine::new();
        engine.replace_rules(vec![mock_rule("m1", "https://api.example.com/*")]);

        let outcome = engine
            .match_request(request("https://api.example.com/users"))
            .await;
        let response = outcome.response.expect("rule should have matched");
        assert_eq!(response.status_code, 201);
        assert!(response.is_mocked);
        assert_eq!(outcome.matched_rule_id.as_deref(), Some("m1"));
    }

    #[tokio::test]
    async fn non_matching_rule_passes_through() {
        let engine = MockEngine::new();
        engine.replace_rules(vec![mock_rule("m1", "https://api.example.com/*")]);

        let outcome = engine
            .match_request(request("https://other.example.com/users"))
            .await;
        assert!(outcome.response.is_none());
    }

    #[tokio::test]
    async fn http_response_targeted_rule_still_short_circuits_before_any_network_call() {
        let engine = MockEngine::new();
        let mut rule = mock_rule("m1", "https://api.example.com/*");
        rule.target_type = TargetType::HttpResponse;
        rule.action = MockAction::Response(MockResponseAction {
            status: 418,
            headers: HashMap::new(),
            body: "teapot".to_string(),
            delay_ms: 0,
        });
        engine.replace_rules(vec![rule]);

        let outcome = engine
            .match_request(request("https://api.example.com/brew"))
            .await;
        let response = outcome.response.expect("http-response-targeted rule should match in the request stage");
        assert_eq!(response.status_code, 418);
        assert_eq!(response.body.as_deref(), Some("teapot".as_bytes()));
        assert_eq!(response.duration_ms, 0);
    }

    #[tokio::test]
    async fn mock_response_duration_is_always_zero_regardless_of_delay() {
        let engine = MockEngine::new();
        let mut rule = mock_rule("m1", "*");
        rule.action = MockAction::Response(MockResponseAction {
            status: 200,
            headers: HashMap::new(),
            body: String::new(),
            delay_ms: 5,
        });
        engine.replace_rules(vec![rule]);

        let outcome = engine.match_request(request("https://x/y")).await;
        assert_eq!(outcome.response.unwrap().duration_ms, 0);
    }
}
