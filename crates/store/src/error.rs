//! Error types for the streaming log store

use streamline_engine::EngineError;
use thiserror::Error;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by the log store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Key absent for an operation that requires an existing stream.
    /// Routine, not fatal.
    #[error("stream not found: {key}")]
    NotFound { key: String },

    /// I/O or protocol failure in the backing engine, wrapped with the
    /// operation and key it happened under.
    #[error("engine {op} failed for key {key}: {source}")]
    Engine {
        op: &'static str,
        key: String,
        #[source]
        source: EngineError,
    },

    /// Malformed entry payload. Absorbed during tail and copy sessions
    /// (the entry is skipped); never escalated to a session-fatal error.
    #[error("could not decode entry {sequence} in stream {key}: {source}")]
    Decode {
        key: String,
        sequence: u64,
        #[source]
        source: serde_json::Error,
    },

    /// Invalid configuration at construction time. Fatal; no
    /// partially-initialized store is returned.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Failure writing to a caller-supplied sink during a copy.
    #[error("could not write to sink: {0}")]
    Sink(#[from] std::io::Error),
}

impl StoreError {
    pub(crate) fn not_found(key: impl Into<String>) -> Self {
        StoreError::NotFound { key: key.into() }
    }

    pub(crate) fn engine(op: &'static str, key: impl Into<String>, source: EngineError) -> Self {
        StoreError::Engine {
            op,
            key: key.into(),
            source,
        }
    }
}
