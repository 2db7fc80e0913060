//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while starting or feeding the runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The runtime stopped accepting messages.
    #[error("Inbound queue is closed")]
    InboundClosed,

    /// The inbound queue is full. Only returned by non-blocking delivery.
    #[error("Inbound queue is full")]
    QueueFull,

    /// A global tracing subscriber could not be installed.
    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
