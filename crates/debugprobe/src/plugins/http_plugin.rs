//! The HTTP capture-and-intervene plugin.
//!
//! Owns the mock/chaos/breakpoint rule engines and the
//! [`HttpPipeline`]; a capture shim supplied by the host calls
//! [`HttpPlugin::pipeline`] directly to process captured traffic. This
//! plugin is also the `resume_breakpoint` target the bridge dispatches
//! to.

use crate::plugins::forwarding::HttpEventForwarder;
use async_trait::async_trait;
use debugprobe_kernel::{EventBus, EventEmitter, Plugin, PluginContext, Result as KernelResult};
use debugprobe_pipeline::HttpPipeline;
use debugprobe_rules::breakpoint::BreakpointResume;
use debugprobe_rules::{BreakpointEngine, ChaosEngine, MockEngine};
use debugprobe_types::bridge::ResumeBreakpointPayload;
use debugprobe_types::rules::BreakpointResumeAction;
use debugprobe_types::{BreakpointRule, ChaosRule, EventId, MockRule, PluginCommand, PluginCommandResponse};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Which of the three rule sets a rule-management command targets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RuleSet {
    Mock,
    Chaos,
    Breakpoint,
}

#[derive(Debug, Deserialize)]
struct UpdateRulesPayload {
    rule_set: RuleSet,
    #[serde(default)]
    mock: Vec<MockRule>,
    #[serde(default)]
    chaos: Vec<ChaosRule>,
    #[serde(default)]
    breakpoint: Vec<BreakpointRule>,
}

#[derive(Debug, Deserialize)]
struct AddRulePayload {
    rule_set: RuleSet,
    #[serde(default)]
    mock: Option<MockRule>,
    #[serde(default)]
    chaos: Option<ChaosRule>,
    #[serde(default)]
    breakpoint: Option<BreakpointRule>,
}

#[derive(Debug, Deserialize)]
struct RemoveRulePayload {
    rule_set: RuleSet,
    rule_id: String,
}

#[derive(Debug, Deserialize)]
struct GetRulesPayload {
    rule_set: RuleSet,
}

/// The HTTP plugin: rule engines, the capture pipeline, and the
/// breakpoint-hit relay to the bridge.
pub struct HttpPlugin {
    event_bus: Arc<EventBus>,
    mock_engine: Arc<MockEngine>,
    chaos_engine: Arc<ChaosEngine>,
    breakpoint_engine: Arc<BreakpointEngine>,
    pipeline: Arc<HttpPipeline>,
    priority_tx: mpsc::UnboundedSender<debugprobe_types::BridgeEnvelope>,
    event_out: Option<EventEmitter>,
    active: AtomicBool,
    relay_task: Option<JoinHandle<()>>,
}

impl HttpPlugin {
    /// Build the plugin. `priority_tx` is `BridgeClient::priority_sender`
    /// — breakpoint hits bypass the durable outbound queue.
    pub fn new(
        event_bus: Arc<EventBus>,
        mock_engine: Arc<MockEngine>,
        chaos_engine: Arc<ChaosEngine>,
        breakpoint_engine: Arc<BreakpointEngine>,
        priority_tx: mpsc::UnboundedSender<debugprobe_types::BridgeEnvelope>,
    ) -> Self {
        let pipeline = Arc::new(HttpPipeline::new(event_bus.clone()));
        Self {
            event_bus,
            mock_engine,
            chaos_engine,
            breakpoint_engine,
            pipeline,
            priority_tx,
            event_out: None,
            active: AtomicBool::new(true),
            relay_task: None,
        }
    }

    /// The pipeline a host capture shim drives with captured HTTP
    /// traffic.
    pub fn pipeline(&self) -> Arc<HttpPipeline> {
        self.pipeline.clone()
    }

    fn handle_update_rules(&self, payload: UpdateRulesPayload) {
        match payload.rule_set {
            RuleSet::Mock => self.mock_engine.replace_rules(payload.mock),
            RuleSet::Chaos => self.chaos_engine.replace_rules(payload.chaos),
            RuleSet::Breakpoint => self.breakpoint_engine.replace_rules(payload.breakpoint),
        }
    }

    fn handle_add_rule(&self, payload: AddRulePayload) -> std::result::Result<(), &'static str> {
        match (payload.rule_set, payload.mock, payload.chaos, payload.breakpoint) {
            (RuleSet::Mock, Some(rule), _, _) => {
                self.mock_engine.add_rule(rule);
                Ok(())
            }
            (RuleSet::Chaos, _, Some(rule), _) => {
                self.chaos_engine.add_rule(rule);
                Ok(())
            }
            (RuleSet::Breakpoint, _, _, Some(rule)) => {
                self.breakpoint_engine.add_rule(rule);
                Ok(())
            }
            _ => Err("rule payload did not match the declared rule_set"),
        }
    }

    fn handle_remove_rule(&self, payload: RemoveRulePayload) -> bool {
        match payload.rule_set {
            RuleSet::Mock => self.mock_engine.remove_rule(&payload.rule_id),
            RuleSet::Chaos => self.chaos_engine.remove_rule(&payload.rule_id),
            RuleSet::Breakpoint => self.breakpoint_engine.remove_rule(&payload.rule_id),
        }
    }

    fn handle_get_rules(&self, payload: GetRulesPayload) -> serde_json::Value {
        match payload.rule_set {
            RuleSet::Mock => serde_json::json!({ "rules": self.mock_engine.rules() }),
            RuleSet::Chaos => serde_json::json!({ "rules": self.chaos_engine.rules() }),
            RuleSet::Breakpoint => serde_json::json!({ "rules": self.breakpoint_engine.rules() }),
        }
    }

    fn handle_resume_breakpoint(&self, payload: ResumeBreakpointPayload) -> bool {
        let Ok(request_id) = payload.request_id.parse::<EventId>() else {
            return false;
        };
        let action = payload.action;
        self.breakpoint_engine.resolve(
            request_id,
            BreakpointResume {
                action: match action {
                    BreakpointResumeAction::Resume
                    | BreakpointResumeAction::Abort
                    | BreakpointResumeAction::Modify => action,
                },
                modified_request: payload.modified_request,
                modified_response: payload.modified_response,
            },
        )
    }
}

#[async_trait]
impl Plugin for HttpPlugin {
    fn id(&self) -> &str {
        "http"
    }

    fn display_name(&self) -> &str {
        "HTTP Capture"
    }

    async fn initialize(&mut self, ctx: PluginContext) -> KernelResult<()> {
        self.event_out = Some(ctx.event_out);
        Ok(())
    }

    async fn start(&mut self) -> KernelResult<()> {
        if let Some(event_out) = self.event_out.clone() {
            self.event_bus
                .install_http(std::sync::Arc::new(HttpEventForwarder(event_out)))
                .await;
        }
        self.event_bus.install_mock(self.mock_engine.clone()).await;
        self.event_bus.install_chaos(self.chaos_engine.clone()).await;
        self.event_bus
            .install_breakpoint(self.breakpoint_engine.clone())
            .await;

        if let Some(mut hits) = self.breakpoint_engine.take_hit_receiver() {
            let priority_tx = self.priority_tx.clone();
            self.relay_task = Some(tokio::spawn(async move {
                while let Some(hit) = hits.recv().await {
                    let envelope = debugprobe_bridge::breakpoint_hit_frame(hit.request_id, hit.snapshot);
                    if priority_tx.send(envelope).is_err() {
                        break;
                    }
                }
            }));
        }

        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&mut self) -> KernelResult<()> {
        self.event_bus.remove_http().await;
        self.event_bus.remove_mock().await;
        self.event_bus.remove_chaos().await;
        self.event_bus.remove_breakpoint().await;
        if let Some(task) = self.relay_task.take() {
            task.abort();
        }
        self.active.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn pause(&mut self) -> KernelResult<()> {
        self.active.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn resume(&mut self) -> KernelResult<()> {
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn handle_command(&mut self, command: PluginCommand) -> PluginCommandResponse {
        match command.command_type.as_str() {
            "enable" => {
                self.active.store(true, Ordering::SeqCst);
                PluginCommandResponse::success(&command, None)
            }
            "disable" => {
                self.active.store(false, Ordering::SeqCst);
                PluginCommandResponse::success(&command, None)
            }
            "get_status" => PluginCommandResponse::success(
                &command,
                Some(serde_json::json!({
                    "active": self.active.load(Ordering::SeqCst),
                    "mock_rule_count": self.mock_engine.rule_count(),
                    "chaos_rule_count": self.chaos_engine.rule_count(),
                    "breakpoint_rule_count": self.breakpoint_engine.rule_count(),
                })),
            ),
            "update_rules" => match command.payload.clone().map(serde_json::from_value) {
                Some(Ok(payload)) => {
                    self.handle_update_rules(payload);
                    PluginCommandResponse::success(&command, None)
                }
                _ => PluginCommandResponse::failure(&command, "invalid update_rules payload"),
            },
            "add_rule" => match command.payload.clone().map(serde_json::from_value) {
                Some(Ok(payload)) => match self.handle_add_rule(payload) {
                    Ok(()) => PluginCommandResponse::success(&command, None),
                    Err(message) => PluginCommandResponse::failure(&command, message),
                },
                _ => PluginCommandResponse::failure(&command, "invalid add_rule payload"),
            },
            "remove_rule" => match command.payload.clone().map(serde_json::from_value) {
                Some(Ok(payload)) => {
                    let removed = self.handle_remove_rule(payload);
                    PluginCommandResponse::success(&command, Some(serde_json::json!({ "removed": removed })))
                }
                _ => PluginCommandResponse::failure(&command, "invalid remove_rule payload"),
            },
            "get_rules" => match command.payload.clone().map(serde_json::from_value) {
                Some(Ok(payload)) => PluginCommandResponse::success(&command, Some(self.handle_get_rules(payload))),
                _ => PluginCommandResponse::failure(&command, "invalid get_rules payload"),
            },
            "set_config" => PluginCommandResponse::success(&command, None),
            "replay" => PluginCommandResponse::failure(
                &command,
                "replay requires a host network layer to re-issue the request; not implemented in-process",
            ),
            "resume_breakpoint" => match command.payload.clone().map(serde_json::from_value) {
                Some(Ok(payload)) => {
                    let resolved = self.handle_resume_breakpoint(payload);
                    PluginCommandResponse::success(&command, Some(serde_json::json!({ "resolved": resolved })))
                }
                _ => PluginCommandResponse::failure(&command, "invalid resume_breakpoint payload"),
            },
            other => PluginCommandResponse::failure(&command, format!("unknown command_type: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use debugprobe_kernel::EventBus;

    fn plugin() -> HttpPlugin {
        let (tx, _rx) = mpsc::unbounded_channel();
        HttpPlugin::new(
            Arc::new(EventBus::new()),
            Arc::new(MockEngine::new()),
            Arc::new(ChaosEngine::new()),
            Arc::new(BreakpointEngine::new()),
            tx,
        )
    }

    fn command(command_type: &str, payload: Option<serde_json::Value>) -> PluginCommand {
        PluginCommand {
            plugin_id: "http".to_string(),
            command_id: "c1".to_string(),
            command_type: command_type.to_string(),
            payload,
        }
    }

    #[tokio::test]
    async fn add_update_get_remove_rule_round_trip() {
        let mut plugin = plugin();
        let rule = MockRule {
            id: "m1".to_string(),
            enabled: true,
            priority: 0,
            url_pattern: Some("*".to_string()),
            method: None,
            target_type: debugprobe_types::TargetType::HttpRequest,
            action: debugprobe_types::rules::MockAction::Response(debugprobe_types::rules::MockResponseAction {
                status: 200,
                headers: Default::default(),
                body: "ok".to_string(),
                delay_ms: 0,
            }),
        };

        let response = plugin
            .handle_command(command(
                "add_rule",
                Some(serde_json::json!({ "rule_set": "mock", "mock": rule })),
            ))
            .await;
        assert!(response.success);

        let response = plugin.handle_command(command("get_rules", Some(serde_json::json!({ "rule_set": "mock" })))).await;
        let payload = response.payload.unwrap();
        assert_eq!(payload["rules"].as_array().unwrap().len(), 1);

        let response = plugin
            .handle_command(command(
                "remove_rule",
                Some(serde_json::json!({ "rule_set": "mock", "rule_id": "m1" })),
            ))
            .await;
        assert_eq!(response.payload.unwrap()["removed"], serde_json::json!(true));
    }

    #[tokio::test]
    async fn enable_disable_toggles_active_flag_reported_by_get_status() {
        let mut plugin = plugin();
        plugin.handle_command(command("disable", None)).await;
        let response = plugin.handle_command(command("get_status", None)).await;
        assert_eq!(response.payload.unwrap()["active"], serde_json::json!(false));

        plugin.handle_command(command("enable", None)).await;
        let response = plugin.handle_command(command("get_status", None)).await;
        assert_eq!(response.payload.unwrap()["active"], serde_json::json!(true));
    }

    #[tokio::test]
    async fn resume_breakpoint_resolves_a_pending_waiter() {
        let mut plugin = plugin();
        plugin.start().await.unwrap();

        let request_id = EventId::new_v4();
        plugin.breakpoint_engine.replace_rules(vec![BreakpointRule {
            id: "b1".to_string(),
            enabled: true,
            priority: 0,
            url_pattern: Some("*".to_string()),
            method: None,
            stage: debugprobe_types::rules::BreakpointStage::Request,
        }]);

        let engine = plugin.breakpoint_engine.clone();
        let handle = tokio::spawn(async move {
            let req = debugprobe_types::HttpRequest {
                id: request_id,
                method: "GET".to_string(),
                url: "https://x/y".to_string(),
                headers: Default::default(),
                body: None,
                start_time: chrono::Utc::now(),
                parent_request_id: None,
            };
            use debugprobe_kernel::BreakpointCallback;
            engine.match_request(req).await
        });

        // give the suspend() call a chance to register its waiter
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        let response = plugin
            .handle_command(command(
                "resume_breakpoint",
                Some(serde_json::json!({
                    "request_id": request_id.to_string(),
                    "action": "resume",
                    "modified_request": null,
                    "modified_response": null,
                })),
            ))
            .await;
        assert_eq!(response.payload.unwrap()["resolved"], serde_json::json!(true));
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn unknown_command_type_fails() {
        let mut plugin = plugin();
        let response = plugin.handle_command(command("bogus", None)).await;
        assert!(!response.success);
    }
}
