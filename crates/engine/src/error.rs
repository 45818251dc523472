//! Error types for the execution substrate

/// Error type for execution context operations
#[derive(Debug, thiserror::Error)]
pub enum SubstrateError {
    /// The OS refused to start a worker thread
    #[error("Failed to spawn worker thread for '{label}': {source}")]
    Spawn {
        label: String,
        #[source]
        source: std::io::Error,
    },

    /// The worker pool could not be built
    #[error("Failed to build worker pool for '{label}': {source}")]
    Pool {
        label: String,
        #[source]
        source: rayon::ThreadPoolBuildError,
    },

    /// Another thread already owns the main context
    #[error("Main thread already designated")]
    MainThreadClaimed,

    /// Main context operation attempted off the main thread
    #[error("Not called from the main thread")]
    NotMainThread,
}
