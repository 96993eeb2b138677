//! The chaos rule engine.

use crate::store::RuleStore;
use async_trait::async_trait;
use debugprobe_kernel::ChaosCallback;
use debugprobe_types::rules::ChaosAction;
use debugprobe_types::{ChaosRequestOutcome, ChaosRule, HttpRequest, HttpResponse, TargetType};
use rand::Rng;

/// Owns the live chaos rule set and answers the pipeline's chaos-stage
/// lookups. Unlike mock rules, a chaos rule only ever fires with
/// probability `rule.probability`, independently re-rolled per request.
#[derive(Default)]
pub struct ChaosEngine {
    store: RuleStore<ChaosRule>,
}

impl ChaosEngine {
    /// An empty engine with no rules installed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entire chaos rule set.
    pub fn replace_rules(&self, rules: Vec<ChaosRule>) {
        self.store.replace_all(rules);
    }

    /// Number of rules currently installed.
    pub fn rule_count(&self) -> usize {
        self.store.len()
    }

    /// Every rule currently installed, in priority order.
    pub fn rules(&self) -> Vec<ChaosRule> {
        self.store.snapshot()
    }

    /// Install or replace a single rule by id.
    pub fn add_rule(&self, rule: ChaosRule) {
        self.store.upsert(rule);
    }

    /// Remove a single rule by id. Returns whether one was removed.
    pub fn remove_rule(&self, id: &str) -> bool {
        self.store.remove(id)
    }
}

#[async_trait]
impl ChaosCallback for ChaosEngine {
    async fn match_request(&self, request: &HttpRequest) -> ChaosRequestOutcome {
        let matched = self.store.find_match(
            TargetType::HttpRequest,
            &request.method,
            &request.url,
        );
        let Some(rule) = matched else {
            return ChaosRequestOutcome::None;
        };

        let roll: f64 = rand::rng().random();
        if roll >= rule.probability {
            return ChaosRequestOutcome::None;
        }

        match rule.action {
            ChaosAction::Delay { ms } => ChaosRequestOutcome::Delay(ms),
            ChaosAction::Timeout => ChaosRequestOutcome::Timeout,
            ChaosAction::ConnectionReset => ChaosRequestOutcome::ConnectionReset,
            ChaosAction::ErrorResponse { status } => ChaosRequestOutcome::ErrorResponse(status),
            ChaosAction::Drop => ChaosRequestOutcome::Drop,
        }
    }

    async fn corrupt_response(&self, request: &HttpRequest, mut response: HttpResponse) -> HttpResponse {
        let matched = self.store.find_match(
            TargetType::HttpResponse,
            &request.method,
            &request.url,
        );
        let Some(rule) = matched else {
            return response;
        };
        if !matches!(rule.action, ChaosAction::CorruptResponse) {
            return response;
        }
        let roll: f64 = rand::rng().random();
        if roll >= rule.probability {
            return response;
        }
        if let Some(body) = response.body.as_mut() {
            corrupt_bytes(body);
        }
        response
    }
}

/// Overwrite roughly 1% of `bytes` with random values, in place.
fn corrupt_bytes(bytes: &mut [u8]) {
    if bytes.is_empty() {
        return;
    }
    let count = (bytes.len() as f64 * 0.01).ceil() as usize;
    let mut rng = rand::rng();
    for _ in 0..count.max(1) {
        let idx = rng.random_range(0..bytes.len());
        bytes[idx] = rng.random();
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

    fn chaos_rule(id: &str, probability: f64, action: ChaosAction) -> ChaosRule {
        ChaosRule {
            id: id.to_string(),
            enabled: true,
            priority: 0,
            url_pattern: Some("*".to_string()),
            method: None,
            probability,
            action,
        }
    }

    #[tokio::test]
    async fn probability_zero_never_fires() {
        let engine = ChaosEngine::new();
        engine.replace_rules(vec![chaos_rule("c1", 0.0, ChaosAction::Timeout)]);
        let outcome = engine.match_request(&request("https://x/y")).await;
        assert!(matches!(outcome, ChaosRequestOutcome::None));
    }

    #[tokio::test]
    async fn probability_one_always_fires() {
        let engine = ChaosEngine::new();
        engine.replace_rules(vec![chaos_rule(
            "c1",
            1.0,
            ChaosAction::ErrorResponse { status: 503 },
        )]);
        let outcome = engine.match_request(&request("https://x/y")).await;
        assert!(matches!(outcome, ChaosRequestOutcome::ErrorResponse(503)));
    }

    #[tokio::test]
    async fn no_matching_rule_yields_none() {
        let engine = ChaosEngine::new();
        let outcome = engine.match_request(&request("https://x/y")).await;
        assert!(matches!(outcome, ChaosRequestOutcome::None));
    }

    #[tokio::test]
    async fn corrupt_response_rewrites_roughly_one_percent_of_bytes() {
        let engine = ChaosEngine::new();
        engine.replace_rules(vec![chaos_rule("c1", 1.0, ChaosAction::CorruptResponse)]);
        let response = HttpResponse {
            status_code: 200,
            headers: HashMap::new(),
            body: Some(vec![0u8; 1000]),
            duration_ms: 5,
            error: None,
            is_mocked: false,
            matched_mock_rule_id: None,
        };
        let corrupted = engine.corrupt_response(&request("https://x/y"), response).await;
        let body = corrupted.body.unwrap();
        let changed = body.iter().filter(|&&b| b != 0).count();
        assert!(changed > 0, "expected at least one byte to be rewritten");
        assert!(changed <= 30, "corruption should touch roughly 1% of bytes, got {changed}");
    }

    #[tokio::test]
    async fn corrupt_response_leaves_body_untouched_without_a_matching_rule() {
        let engine = ChaosEngine::new();
        let response = HttpResponse {
            status_code: 200,
            headers: HashMap::new(),
            body: Some(vec![0u8; 100]),
            duration_ms: 5,
            error: None,
            is_mocked: false,
            matched_mock_rule_id: None,
        };
        let result = engine.corrupt_response(&request("https://x/y"), response).await;
        assert!(result.body.unwrap().iter().all(|&b| b == 0));
    }
}
