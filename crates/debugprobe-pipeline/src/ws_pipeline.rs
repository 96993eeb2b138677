//! WebSocket frame interception, supplementing the HTTP pipeline.
//!
//! The data model already carries `WsOutgoing`/`WsIncoming` rule
//! targets, but the base spec only wires mock rules
//! through the HTTP stages. This pipeline closes that gap: it lets a
//! mock rule fabricate or replace a frame the host app is about to
//! send or receive, using the same ordered mock rule set as HTTP.

use debugprobe_rules::MockEngine;
use debugprobe_types::{TargetType, WsFrameOpcode};
use std::sync::Arc;

/// What the host WebSocket shim should do with a frame after
/// consulting the mock rule set.
#[derive(Debug, Clone)]
pub enum WsFrameDecision {
    /// No rule matched; send/deliver the frame unchanged.
    Forward(WsFrameOpcode, Vec<u8>),
    /// A mock rule fabricated a replacement frame.
    Replace {
        /// Opcode of the replacement frame.
        opcode: WsFrameOpcode,
        /// Payload of the replacement frame.
        payload: Vec<u8>,
        /// The rule that produced this replacement.
        mock_rule_id: String,
    },
}

/// Evaluates the mock rule set against outgoing/incoming WebSocket
/// frames.
pub struct WsPipeline {
    mock_engine: Arc<MockEngine>,
}

impl WsPipeline {
    /// Build a pipeline over a shared mock rule engine.
    pub fn new(mock_engine: Arc<MockEngine>) -> Self {
        Self { mock_engine }
    }

    /// Consult the mock rule set for a frame the host app is about to
    /// send.
    pub fn intercept_outgoing(
        &self,
        url: &str,
        opcode: WsFrameOpcode,
        payload: Vec<u8>,
    ) -> WsFrameDecision {
        self.intercept(TargetType::WsOutgoing, url, opcode, payload)
    }

    /// Consult the mock rule set for a frame the host app is about to
    /// receive.
    pub fn intercept_incoming(
        &self,
        url: &str,
        opcode: WsFrameOpcode,
        payload: Vec<u8>,
    ) -> WsFrameDecision {
        self.intercept(TargetType::WsIncoming, url, opcode, payload)
    }

    fn intercept(
        &self,
        target: TargetType,
        url: &str,
        opcode: WsFrameOpcode,
        payload: Vec<u8>,
    ) -> WsFrameDecision {
        match self.mock_engine.match_ws_frame(target, url) {
            Some((mock_rule_id, action)) => WsFrameDecision::Replace {
                opcode: action.opcode,
                payload: action.payload,
                mock_rule_id,
            },
            None => WsFrameDecision::Forward(opcode, payload),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use debugprobe_types::rules::{MockAction, MockFrameAction};
    use debugprobe_types::MockRule;

    fn ws_mock_rule(id: &str, target: TargetType, pattern: &str) -> MockRule {
        MockRule {
            id: id.to_string(),
            enabled: true,
            priority: 0,
            url_pattern: Some(pattern.to_string()),
            method: None,
            target_type: target,
            action: MockAction::Frame(MockFrameAction {
                opcode: WsFrameOpcode::Text,
                payload: b"mocked".to_vec(),
            }),
        }
    }

    #[test]
    fn outgoing_rule_replaces_outgoing_frame_only() {
        let engine = Arc::new(MockEngine::new());
        engine.replace_rules(vec![ws_mock_rule("w1", TargetType::WsOutgoing, "wss://x/*")]);
        let pipeline = WsPipeline::new(engine);

        let decision =
            pipeline.intercept_outgoing("wss://x/socket", WsFrameOpcode::Binary, vec![1, 2]);
        assert!(matches!(decision, WsFrameDecision::Replace { .. }));

        let decision =
            pipeline.intercept_incoming("wss://x/socket", WsFrameOpcode::Binary, vec![1, 2]);
        assert!(matches!(decision, WsFrameDecision::Forward(..)));
    }

    #[test]
    fn no_matching_rule_forwards_frame_unchanged() {
        let engine = Arc::new(MockEngine::new());
        let pipeline = WsPipeline::new(engine);
        let decision =
            pipeline.intercept_outgoing("wss://x/socket", WsFrameOpcode::Ping, vec![]);
        match decision {
            WsFrameDecision::Forward(opcode, payload) => {
                assert_eq!(opcode, WsFrameOpcode::Ping);
                assert!(payload.is_empty());
            }
            other => panic!("expected Forward, got {other:?}"),
        }
    }
}
