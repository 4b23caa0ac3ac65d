//! In-memory engine adapter
//!
//! Keeps every stream in a mutex-guarded map. Blocking range reads park on a
//! shared [`Notify`] that append wakes, so live tails see new entries without
//! busy-spinning inside the poll window. Expired keys are reaped lazily on
//! access, the same passive style networked keyed stores use.

use crate::error::Result;
use crate::types::{EngineEntry, ScanPage, TtlState};
use crate::LogEngine;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Entries a stream may hold above `max_len` before a trim actually runs.
///
/// Trimming on every append would defeat the point of an approximate bound;
/// instead the count is allowed to drift up to this slack, then cut back to
/// exactly `max_len`. The settled size is therefore always in
/// `[max_len, max_len + TRIM_SLACK]`.
const TRIM_SLACK: u64 = 16;

struct MemoryStream {
    entries: VecDeque<EngineEntry>,
    next_sequence: u64,
    expires_at: Option<Instant>,
}

impl MemoryStream {
    fn new() -> Self {
        Self {
            entries: VecDeque::new(),
            next_sequence: 1,
            expires_at: None,
        }
    }
}

/// In-memory [`LogEngine`] adapter
pub struct MemoryEngine {
    streams: Mutex<HashMap<String, MemoryStream>>,

    /// Wakes blocked range readers after any append
    appends: Notify,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self {
            streams: Mutex::new(HashMap::new()),
            appends: Notify::new(),
        }
    }

    /// Drop every key whose deadline has passed. Called under the lock at
    /// the top of each operation.
    fn reap_expired(streams: &mut HashMap<String, MemoryStream>) {
        let now = Instant::now();
        streams.retain(|_, s| s.expires_at.is_none_or(|at| at > now));
    }

    fn read_after(&self, key: &str, after: u64) -> Vec<EngineEntry> {
        let mut streams = self.streams.lock();
        Self::reap_expired(&mut streams);
        match streams.get(key) {
            Some(stream) => stream
                .entries
                .iter()
                .filter(|e| e.sequence > after)
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LogEngine for MemoryEngine {
    async fn exists(&self, key: &str) -> Result<bool> {
        let mut streams = self.streams.lock();
        Self::reap_expired(&mut streams);
        Ok(streams.contains_key(key))
    }

    async fn append(&self, key: &str, payload: Vec<u8>, max_len: u64) -> Result<u64> {
        let sequence = {
            let mut streams = self.streams.lock();
            Self::reap_expired(&mut streams);
            let stream = streams
                .entry(key.to_string())
                .or_insert_with(MemoryStream::new);

            let sequence = stream.next_sequence;
            stream.next_sequence += 1;
            stream.entries.push_back(EngineEntry::new(sequence, payload));

            if stream.entries.len() as u64 > max_len + TRIM_SLACK {
                while stream.entries.len() as u64 > max_len {
                    stream.entries.pop_front();
                }
            }
            sequence
        };

        self.appends.notify_waiters();
        Ok(sequence)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut streams = self.streams.lock();
        Self::reap_expired(&mut streams);
        Ok(streams.remove(key).is_some())
    }

    async fn range_read(&self, key: &str, after: u64, block: Duration) -> Result<Vec<EngineEntry>> {
        let deadline = Instant::now() + block;
        loop {
            // Register for wakeups before reading so an append between the
            // read and the wait is not missed.
            let notified = self.appends.notified();

            let batch = self.read_after(key, after);
            if !batch.is_empty() {
                return Ok(batch);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(Vec::new());
            }
            if tokio::time::timeout(deadline - now, notified).await.is_err() {
                return Ok(Vec::new());
            }
        }
    }

    async fn ttl(&self, key: &str) -> Result<TtlState> {
        let mut streams = self.streams.lock();
        Self::reap_expired(&mut streams);
        match streams.get(key) {
            None => Ok(TtlState::Absent),
            Some(stream) => match stream.expires_at {
                None => Ok(TtlState::Unset),
                Some(at) => Ok(TtlState::Set(at.saturating_duration_since(Instant::now()))),
            },
        }
    }

    async fn set_ttl(&self, key: &str, ttl: Duration) -> Result<()> {
        let mut streams = self.streams.lock();
        Self::reap_expired(&mut streams);
        if let Some(stream) = streams.get_mut(key) {
            stream.expires_at = Some(Instant::now() + ttl);
        }
        Ok(())
    }

    async fn scan(&self, cursor: u64, prefix: &str, page_size: usize) -> Result<ScanPage> {
        let mut streams = self.streams.lock();
        Self::reap_expired(&mut streams);

        let mut all: Vec<&String> = streams.keys().collect();
        all.sort();

        let start = cursor as usize;
        if start >= all.len() {
            return Ok(ScanPage::default());
        }

        let end = (start + page_size.max(1)).min(all.len());
        let keys = all[start..end]
            .iter()
            .filter(|k| k.starts_with(prefix))
            .map(|k| k.to_string())
            .collect();

        let next = if end >= all.len() { 0 } else { end as u64 };
        Ok(ScanPage { keys, cursor: next })
    }

    async fn len(&self, key: &str) -> Result<u64> {
        let mut streams = self.streams.lock();
        Self::reap_expired(&mut streams);
        Ok(streams.get(key).map_or(0, |s| s.entries.len() as u64))
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut streams = self.streams.lock();
        Self::reap_expired(&mut streams);
        Ok(streams.keys().cloned().collect())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
