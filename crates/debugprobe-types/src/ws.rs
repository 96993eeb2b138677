//! WebSocket capture types

use crate::event::EventId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a captured WebSocket session.
pub type SessionId = Uuid;

/// Direction of a captured WebSocket frame, relative to the host app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WsDirection {
    /// Host app sent the frame.
    Send,
    /// Host app received the frame.
    Receive,
}

/// WebSocket frame opcode, mirroring RFC 6455's frame types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WsFrameOpcode {
    /// UTF-8 text payload.
    Text,
    /// Raw binary payload.
    Binary,
    /// Ping control frame.
    Ping,
    /// Pong control frame.
    Pong,
    /// Close control frame.
    Close,
}

/// A captured WebSocket session descriptor, recorded on connect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsSession {
    /// Event id for the `sessionCreated` record.
    pub id: EventId,
    /// Session identifier, reused on every subsequent frame.
    pub session_id: SessionId,
    /// The URL the session connected to.
    pub url: String,
    /// Time the session was created.
    pub created_at: DateTime<Utc>,
}

/// A captured session close.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsSessionClosed {
    /// Event id.
    pub id: EventId,
    /// Session identifier being closed.
    pub session_id: SessionId,
    /// WebSocket close code.
    pub close_code: u16,
    /// WebSocket close reason, if provided.
    pub close_reason: Option<String>,
    /// Time the session disconnected.
    pub disconnect_time: DateTime<Utc>,
}

/// A single captured frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsFrame {
    /// Event id.
    pub id: EventId,
    /// Session this frame belongs to.
    pub session_id: SessionId,
    /// Send or receive, from the host app's perspective.
    pub direction: WsDirection,
    /// Frame opcode.
    pub opcode: WsFrameOpcode,
    /// Raw payload bytes.
    pub payload: Vec<u8>,
    /// Timestamp the frame was observed.
    pub timestamp: DateTime<Utc>,
    /// Whether a mock rule fabricated this frame, rather than the real
    /// peer producing it.
    pub is_mocked: bool,
    /// The id of the mock rule that produced this frame, if any.
    pub mock_rule_id: Option<String>,
}

/// The WebSocket event sum type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum WsEvent {
    /// A session was created.
    SessionCreated(WsSession),
    /// A session was closed.
    SessionClosed(WsSessionClosed),
    /// A frame was sent or received on an existing session.
    Frame(WsFrame),
}

impl WsEvent {
    /// The event id of the wrapped variant.
    pub fn id(&self) -> EventId {
        match self {
            Self::SessionCreated(s) => s.id,
            Self::SessionClosed(s) => s.id,
            Self::Frame(f) => f.id,
        }
    }

    /// The session id the event pertains to, regardless of variant.
    pub fn session_id(&self) -> SessionId {
        match self {
            Self::SessionCreated(s) => s.session_id,
            Self::SessionClosed(s) => s.session_id,
            Self::Frame(f) => f.session_id,
        }
    }
}
