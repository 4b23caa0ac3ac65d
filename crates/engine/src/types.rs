//! Wire types shared by engine adapters

use std::time::Duration;

/// One stored entry: an opaque payload plus the engine-assigned sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineEntry {
    /// Monotonically increasing per-key sequence, never reused
    pub sequence: u64,

    /// Opaque payload bytes
    pub payload: Vec<u8>,
}

impl EngineEntry {
    pub fn new(sequence: u64, payload: Vec<u8>) -> Self {
        Self { sequence, payload }
    }
}

/// TTL state of a key.
///
/// Mirrors the -1/-2 sentinel convention of keyed stores as a proper enum:
/// a key can exist without an expiry, exist with a remaining duration, or
/// not exist at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlState {
    /// Key exists but has no expiry attached
    Unset,
    /// Key exists and expires after the given remaining duration
    Set(Duration),
    /// Key does not exist
    Absent,
}

/// One page of a cursor scan over the key space.
#[derive(Debug, Clone, Default)]
pub struct ScanPage {
    /// Keys found in this page (may repeat keys from earlier pages)
    pub keys: Vec<String>,

    /// Cursor for the next page; 0 once the scan has wrapped to the origin
    pub cursor: u64,
}
