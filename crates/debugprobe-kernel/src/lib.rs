//! Plugin lifecycle kernel, event bus, and plugin context for the
//! DebugProbe agent.
//!
//! This crate owns nothing specific to HTTP, WebSockets, logs, or
//! databases; it only knows how to register, start, stop, and route
//! commands to whatever implements [`Plugin`], and how plugins publish
//! captured artifacts through [`EventBus`].

pub mod context;
pub mod error;
pub mod event_bus;
pub mod kernel;
pub mod plugin;

pub use context::{CommandResponseEmitter, ConfigStore, ConfigStoreError, EventEmitter, PluginContext};
pub use error::{KernelError, Result};
pub use event_bus::{
    BreakpointCallback, ChaosCallback, EventBus, HttpCallback, LogCallback, MockCallback,
    PageTimingCallback, WsCallback,
};
pub use kernel::Kernel;
pub use plugin::{Plugin, PluginInfo, PluginState};
