//! Keyed append-log engine abstraction
//!
//! This crate defines the capability set the streaming log store is built
//! against: keyed insert-with-auto-id, bounded approximate trim, range reads
//! with a blocking timeout, per-key TTL get/set, and paged key scans.
//!
//! Two adapters are provided:
//! - [`MemoryEngine`]: in-memory, for tests and single-process deployments
//! - [`FjallEngine`]: embedded persistent storage on a fjall keyspace
//!
//! The store layer is generic over [`LogEngine`], so a networked adapter can
//! be plugged in without touching the store.

pub mod disk;
pub mod error;
pub mod memory;
pub mod types;

pub use disk::FjallEngine;
pub use error::{EngineError, Result};
pub use memory::MemoryEngine;
pub use types::{EngineEntry, ScanPage, TtlState};

use async_trait::async_trait;
use std::time::Duration;

/// Capability contract for a keyed append-only log engine.
///
/// Per-key operations are atomic inside the engine; no additional locking is
/// required by callers, and a single engine handle is safe to share across
/// concurrent readers, writers, and background tasks.
#[async_trait]
pub trait LogEngine: Send + Sync + 'static {
    /// Check whether a key exists.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Append a payload to the key, creating the key if it does not exist.
    ///
    /// Returns the assigned sequence number. Sequences are monotonically
    /// increasing per key and never reused. Appending also applies an
    /// approximate trim: the stored entry count may exceed `max_len` by a
    /// bounded slack but never settles below it.
    async fn append(&self, key: &str, payload: Vec<u8>, max_len: u64) -> Result<u64>;

    /// Delete a key and all its entries. Returns false if the key was absent.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Read all entries with sequence greater than `after`.
    ///
    /// Blocks up to `block` waiting for data to arrive. An empty result
    /// means "no data yet" and is not an error; reading a missing key also
    /// yields an empty result, so pollers survive a concurrent delete.
    async fn range_read(&self, key: &str, after: u64, block: Duration) -> Result<Vec<EngineEntry>>;

    /// Get the TTL state of a key.
    async fn ttl(&self, key: &str) -> Result<TtlState>;

    /// Set the TTL of a key. A no-op if the key does not exist; callers that
    /// need set-once semantics must check [`LogEngine::ttl`] first.
    async fn set_ttl(&self, key: &str, ttl: Duration) -> Result<()>;

    /// Scan one page of the key space.
    ///
    /// `cursor` starts at 0; the returned cursor is 0 once the scan has
    /// wrapped. The scan may revisit keys across pages under concurrent
    /// mutation, so callers must deduplicate.
    async fn scan(&self, cursor: u64, prefix: &str, page_size: usize) -> Result<ScanPage>;

    /// Number of stored entries under a key (0 if absent).
    async fn len(&self, key: &str) -> Result<u64>;

    /// All live keys. Full-scan; intended for diagnostics, not hot paths.
    async fn keys(&self) -> Result<Vec<String>>;

    /// Liveness probe.
    async fn ping(&self) -> Result<()>;
}
