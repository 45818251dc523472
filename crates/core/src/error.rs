//! Error types for queue operations

use dispatchq_engine::SubstrateError;

use crate::config::ConfigError;

/// Error type for queue and runtime operations
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// Synchronous dispatch onto a serial queue from that queue's own thread
    #[error("Synchronous dispatch onto '{label}' from its own thread would deadlock")]
    WouldDeadlock { label: String },

    /// Runtime configuration was already fixed
    #[error("Runtime already initialized")]
    AlreadyInitialized,

    /// The execution substrate failed
    #[error(transparent)]
    Substrate(#[from] SubstrateError),

    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;
