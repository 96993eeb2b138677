//! Inspector error taxonomy

/// Result type alias for inspector operations.
pub type Result<T> = std::result::Result<T, InspectorError>;

/// Errors the SQLite inspector can produce. All are returned
/// structurally in the `DBResponse`; the agent never throws up to the
/// host.
#[derive(Debug, thiserror::Error)]
pub enum InspectorError {
    /// No descriptor is registered under the given id.
    #[error("no database registered with id: {0}")]
    DatabaseNotFound(String),

    /// The named table does not exist (or is a `sqlite_%` system table).
    #[error("no table named {0}")]
    TableNotFound(String),

    /// A query failed validation or SQLite rejected it.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The 10s query budget elapsed and the watchdog interrupted it.
    #[error("query timed out")]
    Timeout,

    /// The descriptor is sensitive, or the encryption key was rejected.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// An unexpected SQLite or I/O failure.
    #[error("internal inspector error: {0}")]
    InternalError(String),
}

impl From<rusqlite::Error> for InspectorError {
    fn from(e: rusqlite::Error) -> Self {
        Self::InternalError(e.to_string())
    }
}

/// Errors a [`crate::key_provider::KeyProvider`] can report. Propagated
/// to the inspector as [`InspectorError::AccessDenied`].
#[derive(Debug, thiserror::Error)]
pub enum KeyProviderError {
    /// No key is currently available for this database.
    #[error("no encryption key available: {0}")]
    KeyNotFound(String),
    /// The host denied access to the key (e.g. biometric prompt failed).
    #[error("access denied: {0}")]
    AccessDenied(String),
    /// The key exists but is not a valid passphrase or hex keyspec.
    #[error("invalid key format: {0}")]
    InvalidKeyFormat(String),
    /// Any other provider-specific failure.
    #[error("key provider error: {0}")]
    Other(String),
}
