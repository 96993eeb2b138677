//! Facade-level error type.
//!
//! Library crates downstream of this one (`debugprobe-kernel`,
//! `debugprobe-bridge`, `debugprobe-inspector`, ...) each define their
//! own `thiserror` enum; this facade is the one place `anyhow` is used,
//! for the top-level wiring in [`crate::Agent::start`].

/// Errors the facade itself can produce, distinct from the typed errors
/// of the crates it wires together.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// [`crate::Agent::start`] was called while the agent was already
    /// running.
    #[error("agent is already running")]
    AlreadyRunning,

    /// The agent is disabled via [`crate::AgentConfig::is_enabled`].
    #[error("agent is disabled by configuration")]
    Disabled,
}
