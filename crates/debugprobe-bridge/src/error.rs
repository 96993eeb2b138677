//! Bridge error taxonomy.

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Errors the bridge transport can produce. None of these are fatal to
/// the host process; they drive the connection state machine rather
/// than propagating up to the host app.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// A socket-level or protocol-level failure. The connection
    /// transitions to `Failed` and backs off.
    #[error("bridge transport error: {0}")]
    Transport(String),

    /// The Hub rejected registration. The connection goes `Failed`
    /// without retry until the bridge is explicitly reconfigured.
    #[error("registration rejected by hub: {0}")]
    RegisterRejected(String),

    /// A frame failed to serialize or deserialize. The event (or
    /// command) is dropped and a metrics counter is incremented.
    #[error("frame serialization failed: {0}")]
    SerializationFailure(#[from] serde_json::Error),

    /// The durable outbound queue's backing store failed.
    #[error("outbound queue error: {0}")]
    Queue(#[from] rusqlite::Error),
}
