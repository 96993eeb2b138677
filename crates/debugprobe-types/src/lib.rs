//! Shared data model for the DebugProbe agent.
//!
//! Every other `debugprobe-*` crate depends on this one for the types that
//! cross a seam: plugin events, rule definitions, bridge wire frames, and
//! database descriptors. Nothing in here talks to a socket or a file; it is
//! pure data plus the small amount of logic (URL/ID helpers) that has no
//! sensible owner elsewhere.

pub mod bridge;
pub mod command;
pub mod database;
pub mod device;
pub mod event;
pub mod http;
pub mod log;
pub mod paging;
pub mod pipeline;
pub mod rules;
pub mod ws;

pub use bridge::{BridgeEnvelope, FrameType};
pub use command::{DbCommand, PluginCommand, PluginCommandResponse};
pub use database::{
    ColumnInfo, DatabaseDescriptor, DatabaseInfo, EncryptionStatus, QueryResult, Row, RowPage,
    TableInfo, TableSchema, TableSearchResult,
};
pub use device::DeviceInfo;
pub use event::{Event, EventId};
pub use http::{ErrorCategory, HttpEvent, HttpRequest, HttpResponse, NetworkError};
pub use log::{LogEvent, LogLevel};
pub use paging::{PageMarker, PageTimingEvent, PageVisit, VisitId};
pub use pipeline::{
    ChaosRequestOutcome, MockRequestOutcome, RequestBreakpointResult, ResponseBreakpointResult,
};
pub use rules::{BreakpointRule, ChaosRule, MockRule, Rule, TargetType};
pub use ws::{WsDirection, WsEvent, WsFrameOpcode};
