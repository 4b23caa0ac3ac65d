//! Error types for the append-log engine

use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur inside an engine adapter
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage error: {0}")]
    Storage(#[from] fjall::Error),

    #[error("corrupt record for key {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("engine closed")]
    Closed,
}

impl EngineError {
    pub(crate) fn corrupt(key: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::Corrupt {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
