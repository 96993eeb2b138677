//! Kernel error taxonomy

/// Result type alias for kernel operations.
pub type Result<T> = std::result::Result<T, KernelError>;

/// Errors the plugin kernel can produce. These are surfaced as bridge
/// command responses; they are never fatal to the host process.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    /// `register` was called with an id already present in the registry.
    #[error("plugin id already registered: {0}")]
    DuplicatePluginId(String),

    /// `route_command` targeted an id with no registered plugin.
    #[error("no plugin registered for id: {0}")]
    PluginNotFound(String),

    /// The dependency graph contains a cycle reachable from `plugin`.
    #[error("circular dependency detected at plugin: {0}")]
    CircularDependency(String),

    /// `plugin` declares a dependency on `dependency`, which is not
    /// registered.
    #[error("plugin {plugin} depends on unregistered plugin {dependency}")]
    MissingDependency {
        /// The dependent plugin's id.
        plugin: String,
        /// The missing dependency's id.
        dependency: String,
    },

    /// A plugin's `initialize`/`start` call failed during `start_all`.
    #[error("plugin {id} failed to start: {cause}")]
    StartFailed {
        /// The plugin that failed.
        id: String,
        /// The underlying cause.
        cause: String,
    },

    /// A plugin rejected its configuration.
    #[error("invalid configuration for plugin {id}: {message}")]
    InvalidConfiguration {
        /// The plugin that rejected the configuration.
        id: String,
        /// Why it was rejected.
        message: String,
    },
}
