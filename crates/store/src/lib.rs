//! Streaming log store for CI builds
//!
//! A build process creates a stream under a per-build key and appends log
//! lines to it; any number of consumers tail the stream live while the build
//! runs. Each stream is bounded to an approximate maximum entry count
//! (ring-buffer trimming) and to a maximum lifetime (set-once TTL plus a
//! self-healing background sweep), so abandoned streams are reclaimed
//! without operator intervention.
//!
//! The store owns no state of its own beyond a handle to a [`LogEngine`];
//! consistency relies on the engine's per-key atomicity. Existence checks
//! followed by writes are deliberately not atomic - a concurrent delete in
//! between can surface as a spurious failure, accepted as part of the
//! best-effort contract.

pub mod config;
pub mod error;
pub mod expiry;
pub mod line;
mod scan;
pub mod store;
pub mod tail;

pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use expiry::{SweeperHandle, TtlOutcome};
pub use line::Line;
pub use store::{Info, LogStore, StreamStats};
pub use tail::TailSession;

pub use streamline_engine::{
    EngineEntry, EngineError, FjallEngine, LogEngine, MemoryEngine, ScanPage, TtlState,
};
