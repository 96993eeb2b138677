//! The HTTP capture-and-intervene pipeline.
//!
//! Stage order on the request side: mock → breakpoint → chaos. Stage
//! order on the response side: chaos → breakpoint. A mock-produced or
//! chaos-synthesized response still runs through the response stages,
//! so a breakpoint can inspect or replace it the same as a real one.

use debugprobe_types::{
    ChaosRequestOutcome, HttpEvent, HttpRequest, HttpResponse, NetworkError,
    RequestBreakpointResult, ResponseBreakpointResult,
};
use std::sync::Arc;
use std::time::Duration;

/// What the host network layer should do after `process_request`.
#[derive(Debug, Clone)]
pub enum RequestOutcome {
    /// Send the (possibly modified) request to the real network, then
    /// call `process_response` with whatever comes back.
    Proceed(HttpRequest),
    /// A response was already produced; deliver it to the host app
    /// without touching the network.
    Respond(HttpResponse),
    /// The request was aborted at a breakpoint; surface a cancellation
    /// to the host app.
    Abort,
    /// A chaos rule silently dropped the request; the host app should
    /// behave as though the network call never completes.
    Dropped,
}

/// Drives captured HTTP traffic through the mock/breakpoint/chaos
/// stages and publishes the result via the kernel's `EventBus`.
pub struct HttpPipeline {
    event_bus: Arc<debugprobe_kernel::EventBus>,
}

impl HttpPipeline {
    /// Build a pipeline over the given event bus.
    pub fn new(event_bus: Arc<debugprobe_kernel::EventBus>) -> Self {
        Self { event_bus }
    }

    /// Run the request-side stages. The host network layer must act on
    /// the returned [`RequestOutcome`]; see its variants.
    pub async fn process_request(&self, mut request: HttpRequest) -> RequestOutcome {
        if let Some(mock) = self.event_bus.mock().await {
            let outcome = mock.match_request(request.clone()).await;
            request = outcome.request;
            if let Some(response) = outcome.response {
                let final_response = self.process_response(&request, response).await;
                return RequestOutcome::Respond(final_response);
            }
        }

        if let Some(breakpoint) = self.event_bus.breakpoint().await {
            match breakpoint.match_request(request).await {
                RequestBreakpointResult::Abort(aborted) => {
                    let response = error_response(NetworkError::breakpoint_aborted());
                    self.emit(aborted, Some(response)).await;
                    return RequestOutcome::Abort;
                }
                RequestBreakpointResult::Proceed(r) => request = r,
            }
        }

        if let Some(chaos) = self.event_bus.chaos().await {
            match chaos.match_request(&request).await {
                ChaosRequestOutcome::None => {}
                ChaosRequestOutcome::Delay(ms) => {
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                }
                ChaosRequestOutcome::Timeout => {
                    let response = error_response(NetworkError::chaos_timeout());
                    let final_response = self.process_response(&request, response).await;
                    return RequestOutcome::Respond(final_response);
                }
                ChaosRequestOutcome::ConnectionReset => {
                    let response = error_response(NetworkError::chaos_connection_reset());
                    let final_response = self.process_response(&request, response).await;
                    return RequestOutcome::Respond(final_response);
                }
                ChaosRequestOutcome::ErrorResponse(status) => {
                    let response = HttpResponse {
                        status_code: status,
                        headers: Default::default(),
                        body: None,
                        duration_ms: 0,
                        error: None,
                        is_mocked: false,
                        matched_mock_rule_id: None,
                    };
                    let final_response = self.process_response(&request, response).await;
                    return RequestOutcome::Respond(final_response);
                }
                ChaosRequestOutcome::Drop => {
                    self.emit(request, None).await;
                    return RequestOutcome::Dropped;
                }
            }
        }

        RequestOutcome::Proceed(request)
    }

    /// Run the response-side stages (chaos → breakpoint), then publish
    /// the completed `HttpEvent`. Called by the host network layer with
    /// whatever arrived for a [`RequestOutcome::Proceed`] request.
    pub async fn process_response(
        &self,
        request: &HttpRequest,
        response: HttpResponse,
    ) -> HttpResponse {
        let final_response = self.apply_response_stages(request, response).await;
        self.emit(request.clone(), Some(final_response.clone())).await;
        final_response
    }

    /// Whether a breakpoint rule could match the response stage for
    /// `request`, i.e. whether the host network layer needs to buffer
    /// the full response body rather than streaming it straight through.
    pub async fn should_buffer_response(&self, request: &HttpRequest) -> bool {
        match self.event_bus.breakpoint().await {
            Some(breakpoint) => breakpoint.has_response_rule(request).await,
            None => false,
        }
    }

    async fn apply_response_stages(
        &self,
        request: &HttpRequest,
        mut response: HttpResponse,
    ) -> HttpResponse {
        if let Some(chaos) = self.event_bus.chaos().await {
            response = chaos.corrupt_response(request, response).await;
        }
        if let Some(breakpoint) = self.event_bus.breakpoint().await {
            if breakpoint.has_response_rule(request).await {
                response = match breakpoint.match_response(request, response).await {
                    ResponseBreakpointResult::Proceed(r) => r,
                    ResponseBreakpointResult::Replace(r) => r,
                };
            }
        }
        response
    }

    async fn emit(&self, request: HttpRequest, response: Option<HttpResponse>) {
        if let Some(http) = self.event_bus.http().await {
            http.on_http_event(HttpEvent { request, response }).await;
        }
    }
}

fn error_response(error: NetworkError) -> HttpResponse {
    HttpResponse {
        status_code: 0,
        headers: Default::default(),
        body: None,
        duration_ms: 0,
        error: Some(error),
        is_mocked: false,
        matched_mock_rule_id: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use debugprobe_kernel::EventBus;
    use debugprobe_rules::{ChaosEngine, MockEngine};
    use debugprobe_types::rules::{ChaosAction, MockAction, MockResponseAction};
    use debugprobe_types::{ChaosRule, EventId, MockRule};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct RecordingHttp(Arc<AtomicUsize>);

    #[async_trait]
    impl debugprobe_kernel::HttpCallback for RecordingHttp {
        async fn on_http_event(&self, _event: HttpEvent) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

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

    async fn bus_with_recording_http() -> (Arc<EventBus>, Arc<AtomicUsize>) {
        let bus = Arc::new(EventBus::new());
        let count = Arc::new(AtomicUsize::new(0));
        bus.install_http(Arc::new(RecordingHttp(count.clone()))).await;
        (bus, count)
    }

    #[tokio::test]
    async fn no_rules_installed_proceeds_unchanged() {
        let (bus, _count) = bus_with_recording_http().await;
        let pipeline = HttpPipeline::new(bus);
        let outcome = pipeline.process_request(request("https://x/y")).await;
        assert!(matches!(outcome, RequestOutcome::Proceed(_)));
    }

    #[tokio::test]
    async fn mock_rule_short_circuits_and_emits_one_event() {
        let (bus, count) = bus_with_recording_http().await;
        let mock = Arc::new(MockEngine::new());
        mock.replace_rules(vec![MockRule {
            id: "m1".to_string(),
            enabled: true,
            priority: 0,
            url_pattern: Some("*".to_string()),
            method: None,
            target_type: debugprobe_types::TargetType::HttpRequest,
            action: MockAction::Response(MockResponseAction {
                status: 200,
                headers: HashMap::new(),
                body: "ok".to_string(),
                delay_ms: 0,
            }),
        }]);
        bus.install_mock(mock).await;

        let pipeline = HttpPipeline::new(bus);
        let outcome = pipeline.process_request(request("https://x/y")).await;
        match outcome {
            RequestOutcome::Respond(response) => assert_eq!(response.status_code, 200),
            other => panic!("expected Respond, got {other:?}"),
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn chaos_drop_short_circuits_without_a_response() {
        let (bus, count) = bus_with_recording_http().await;
        let chaos = Arc::new(ChaosEngine::new());
        chaos.replace_rules(vec![ChaosRule {
            id: "c1".to_string(),
            enabled: true,
            priority: 0,
            url_pattern: Some("*".to_string()),
            method: None,
            probability: 1.0,
            action: ChaosAction::Drop,
        }]);
        bus.install_chaos(chaos).await;

        let pipeline = HttpPipeline::new(bus);
        let outcome = pipeline.process_request(request("https://x/y")).await;
        assert!(matches!(outcome, RequestOutcome::Dropped));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn chaos_timeout_produces_a_network_error_response() {
        let (bus, _count) = bus_with_recording_http().await;
        let chaos = Arc::new(ChaosEngine::new());
        chaos.replace_rules(vec![ChaosRule {
            id: "c1".to_string(),
            enabled: true,
            priority: 0,
            url_pattern: Some("*".to_string()),
            method: None,
            probability: 1.0,
            action: ChaosAction::Timeout,
        }]);
        bus.install_chaos(chaos).await;

        let pipeline = HttpPipeline::new(bus);
        let outcome = pipeline.process_request(request("https://x/y")).await;
        match outcome {
            RequestOutcome::Respond(response) => {
                assert!(response.error.is_some());
            }
            other => panic!("expected Respond, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn proceed_path_runs_response_through_process_response() {
        let (bus, count) = bus_with_recording_http().await;
        let pipeline = HttpPipeline::new(bus);
        let req = request("https://x/y");
        let outcome = pipeline.process_request(req.clone()).await;
        let proceeded = match outcome {
            RequestOutcome::Proceed(r) => r,
            other => panic!("expected Proceed, got {other:?}"),
        };

        let real_response = HttpResponse {
            status_code: 200,
            headers: HashMap::new(),
            body: Some(b"hello".to_vec()),
            duration_ms: 12,
            error: None,
            is_mocked: false,
            matched_mock_rule_id: None,
        };
        let final_response = pipeline.process_response(&proceeded, real_response).await;
        assert_eq!(final_response.status_code, 200);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn should_buffer_response_false_without_breakpoint_plugin() {
        let (bus, _count) = bus_with_recording_http().await;
        let pipeline = HttpPipeline::new(bus);
        assert!(!pipeline.should_buffer_response(&request("https://x/y")).await);
    }
}
