//! Bridge wire frame envelope

use crate::command::{PluginCommand, PluginCommandResponse};
use crate::device::DeviceInfo;
use crate::event::Event;
use serde::{Deserialize, Serialize};

/// The current schema version of the bridge wire protocol. The Hub may
/// reject a `register_device` frame whose `schema_version` it does not
/// understand.
pub const SCHEMA_VERSION: u32 = 1;

/// A registration request sent immediately after the socket opens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterDevicePayload {
    /// Device identity.
    pub device: DeviceInfo,
    /// Shared secret configured on both device and Hub.
    pub token: String,
    /// Freshly generated per-process-start id, distinguishing a
    /// reconnect from an app restart.
    pub app_session_id: String,
    /// Agent SDK version.
    pub sdk_version: String,
    /// Plugins this agent advertises.
    pub plugins: Vec<AdvertisedPlugin>,
}

/// One plugin advertised during registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvertisedPlugin {
    /// Plugin id.
    pub id: String,
    /// Human-readable display name.
    pub display_name: String,
    /// Plugin version string.
    pub version: String,
}

/// A batch of events flushed to the Hub in one frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsBatchPayload {
    /// Locally assigned batch id, acked by the Hub to release the queue.
    pub batch_id: String,
    /// The events in this batch, in emission order.
    pub events: Vec<Event>,
}

/// A breakpoint suspension notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakpointHitPayload {
    /// The request id the Hub must resolve via `resume_breakpoint`.
    pub request_id: String,
    /// A JSON snapshot of the request (or response) at the breakpoint.
    pub snapshot: serde_json::Value,
}

/// A Hub command resolving a suspended breakpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeBreakpointPayload {
    /// The request id to resolve.
    pub request_id: String,
    /// The action to take.
    pub action: crate::rules::BreakpointResumeAction,
    /// Replacement request, present only for `Modify` at the request
    /// stage.
    pub modified_request: Option<serde_json::Value>,
    /// Replacement response, present only for `Modify` at the response
    /// stage.
    pub modified_response: Option<serde_json::Value>,
}

/// A plugin state transition notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginStateChangedPayload {
    /// The plugin whose state changed.
    pub plugin_id: String,
    /// The new state, as its `Display` string.
    pub state: String,
}

/// Every known bridge frame type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum FrameType {
    /// device → hub: registration request.
    RegisterDevice(RegisterDevicePayload),
    /// hub → device: registration accepted.
    RegisterAck {
        /// Optional human-readable note.
        #[serde(default)]
        reason: Option<String>,
    },
    /// hub → device: registration rejected.
    RegisterReject {
        /// Rejection reason.
        #[serde(default)]
        reason: Option<String>,
    },
    /// device → hub: a batch of events.
    EventsBatch(EventsBatchPayload),
    /// hub → device: acknowledges a batch by id.
    EventsAck {
        /// The acknowledged batch id.
        batch_id: String,
    },
    /// hub → device: a plugin command.
    PluginCommand(PluginCommand),
    /// device → hub: a plugin command response.
    PluginCommandResponse(PluginCommandResponse),
    /// device → hub: a breakpoint was hit and awaits resolution.
    BreakpointHit(BreakpointHitPayload),
    /// hub → device: resolve a suspended breakpoint.
    ResumeBreakpoint(ResumeBreakpointPayload),
    /// device → hub: a plugin's lifecycle state changed.
    PluginStateChanged(PluginStateChangedPayload),
}

/// The outermost frame envelope written to the socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeEnvelope {
    /// Protocol schema version (see [`SCHEMA_VERSION`]).
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// The frame itself.
    #[serde(flatten)]
    pub frame: FrameType,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BridgeEnvelope {
    /// Wrap a frame in the current schema version.
    pub fn new(frame: FrameType) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            frame,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_ack_round_trips() {
        let envelope = BridgeEnvelope::new(FrameType::EventsAck {
            batch_id: "batch-1".to_string(),
        });
        let json = serde_json::to_string(&envelope).expect("serialize");
        let back: BridgeEnvelope = serde_json::from_str(&json).expect("deserialize");
        match back.frame {
            FrameType::EventsAck { batch_id } => assert_eq!(batch_id, "batch-1"),
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}
