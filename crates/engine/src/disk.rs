//! Embedded persistent engine adapter on a fjall keyspace
//!
//! Layout: one `entries` partition holding `<key>\0<sequence:be64>` -> payload,
//! and one `meta` partition holding per-key head metadata (next sequence,
//! entry count, expiry deadline) as JSON. The NUL separator means stream keys
//! must not contain NUL bytes.
//!
//! TTLs are enforced lazily: an expired key is purged the first time any
//! operation touches it, and the background sweep's scan contact reaps the
//! rest.

use crate::error::{EngineError, Result};
use crate::types::{EngineEntry, ScanPage, TtlState};
use crate::LogEngine;
use async_trait::async_trait;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Notify;
use tokio::time::Instant;

/// Same slack policy as the in-memory adapter: the stored count may drift
/// this far above `max_len` before a trim cuts it back to exactly `max_len`.
const TRIM_SLACK: u64 = 16;

/// Per-key head metadata stored in the meta partition
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Meta {
    next_sequence: u64,
    len: u64,
    expires_at_ms: Option<u64>,
}

impl Meta {
    fn fresh() -> Self {
        Self {
            next_sequence: 1,
            len: 0,
            expires_at_ms: None,
        }
    }

    fn expired(&self, now_ms: u64) -> bool {
        self.expires_at_ms.is_some_and(|at| at <= now_ms)
    }
}

/// Embedded [`LogEngine`] adapter backed by fjall
pub struct FjallEngine {
    keyspace: Keyspace,
    entries: PartitionHandle,
    meta: PartitionHandle,

    /// Serializes read-modify-write of head metadata
    write_lock: Mutex<()>,

    /// Wakes blocked range readers after any append
    appends: Notify,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn entry_prefix(key: &str) -> Vec<u8> {
    let mut p = Vec::with_capacity(key.len() + 1);
    p.extend_from_slice(key.as_bytes());
    p.push(0);
    p
}

fn entry_key(key: &str, sequence: u64) -> Vec<u8> {
    let mut k = entry_prefix(key);
    k.extend_from_slice(&sequence.to_be_bytes());
    k
}

fn sequence_of(stored_key: &[u8]) -> Option<u64> {
    let tail = stored_key.get(stored_key.len().checked_sub(8)?..)?;
    Some(u64::from_be_bytes(tail.try_into().ok()?))
}

impl FjallEngine {
    /// Open (or create) an engine at the given directory.
    ///
    /// Fails fast on an unusable path or a corrupt keyspace; no
    /// partially-opened engine is returned.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;

        let keyspace = fjall::Config::new(path).open()?;
        let entries = keyspace.open_partition(
            "entries",
            PartitionCreateOptions::default().compression(fjall::CompressionType::Lz4),
        )?;
        let meta = keyspace.open_partition(
            "meta",
            PartitionCreateOptions::default().compression(fjall::CompressionType::None),
        )?;

        Ok(Self {
            keyspace,
            entries,
            meta,
            write_lock: Mutex::new(()),
            appends: Notify::new(),
        })
    }

    /// Load live metadata for a key, purging it first if its TTL has lapsed.
    fn live_meta(&self, key: &str) -> Result<Option<Meta>> {
        let Some(raw) = self.meta.get(key.as_bytes())? else {
            return Ok(None);
        };
        let meta: Meta = serde_json::from_slice(&raw)
            .map_err(|e| EngineError::corrupt(key, e.to_string()))?;

        if meta.expired(now_ms()) {
            tracing::debug!(key = %key, "purging expired stream");
            self.purge(key)?;
            return Ok(None);
        }
        Ok(Some(meta))
    }

    fn save_meta(&self, key: &str, meta: &Meta) -> Result<()> {
        let raw = serde_json::to_vec(meta)
            .map_err(|e| EngineError::corrupt(key, e.to_string()))?;
        self.meta.insert(key.as_bytes(), raw)?;
        Ok(())
    }

    /// Remove a key's entries and metadata.
    fn purge(&self, key: &str) -> Result<()> {
        let stored: Vec<_> = self
            .entries
            .prefix(entry_prefix(key))
            .map(|item| item.map(|(k, _)| k))
            .collect::<std::result::Result<_, _>>()?;
        for stored_key in stored {
            self.entries.remove(stored_key)?;
        }
        self.meta.remove(key.as_bytes())?;
        Ok(())
    }

    fn read_after(&self, key: &str, after: u64) -> Result<Vec<EngineEntry>> {
        if self.live_meta(key)?.is_none() {
            return Ok(Vec::new());
        }

        let lower = entry_key(key, after.saturating_add(1));
        let upper = entry_key(key, u64::MAX);
        let mut batch = Vec::new();
        for item in self.entries.range(lower..=upper) {
            let (stored_key, payload) = item?;
            let sequence = sequence_of(&stored_key)
                .ok_or_else(|| EngineError::corrupt(key, "truncated entry key"))?;
            batch.push(EngineEntry::new(sequence, payload.to_vec()));
        }
        Ok(batch)
    }

    /// Live keys in partition order, purging expired ones along the way.
    fn live_keys(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut expired = Vec::new();
        let now = now_ms();

        for item in self.meta.iter() {
            let (raw_key, raw_meta) = item?;
            let name = String::from_utf8_lossy(&raw_key).into_owned();
            match serde_json::from_slice::<Meta>(&raw_meta) {
                Ok(meta) if meta.expired(now) => expired.push(name),
                Ok(_) => names.push(name),
                Err(e) => return Err(EngineError::corrupt(name, e.to_string())),
            }
        }
        for name in expired {
            self.purge(&name)?;
        }
        Ok(names)
    }
}

#[async_trait]
impl LogEngine for FjallEngine {
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.live_meta(key)?.is_some())
    }

    async fn append(&self, key: &str, payload: Vec<u8>, max_len: u64) -> Result<u64> {
        let sequence = {
            let _guard = self.write_lock.lock();
            let mut meta = self.live_meta(key)?.unwrap_or_else(Meta::fresh);

            let sequence = meta.next_sequence;
            self.entries.insert(entry_key(key, sequence), payload)?;
            meta.next_sequence += 1;
            meta.len += 1;

            if meta.len > max_len + TRIM_SLACK {
                let excess = meta.len - max_len;
                let oldest: Vec<_> = self
                    .entries
                    .prefix(entry_prefix(key))
                    .take(excess as usize)
                    .map(|item| item.map(|(k, _)| k))
                    .collect::<std::result::Result<_, _>>()?;
                for stored_key in oldest {
                    self.entries.remove(stored_key)?;
                }
                meta.len = max_len;
            }

            self.save_meta(key, &meta)?;
            sequence
        };

        self.appends.notify_waiters();
        Ok(sequence)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let _guard = self.write_lock.lock();
        if self.live_meta(key)?.is_none() {
            return Ok(false);
        }
        self.purge(key)?;
        Ok(true)
    }

    async fn range_read(&self, key: &str, after: u64, block: Duration) -> Result<Vec<EngineEntry>> {
        let deadline = Instant::now() + block;
        loop {
            let notified = self.appends.notified();

            let batch = self.read_after(key, after)?;
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
        match self.live_meta(key)? {
            None => Ok(TtlState::Absent),
            Some(Meta {
                expires_at_ms: None,
                ..
            }) => Ok(TtlState::Unset),
            Some(Meta {
                expires_at_ms: Some(at),
                ..
            }) => Ok(TtlState::Set(Duration::from_millis(
                at.saturating_sub(now_ms()),
            ))),
        }
    }

    async fn set_ttl(&self, key: &str, ttl: Duration) -> Result<()> {
        let _guard = self.write_lock.lock();
        if let Some(mut meta) = self.live_meta(key)? {
            meta.expires_at_ms = Some(now_ms() + ttl.as_millis() as u64);
            self.save_meta(key, &meta)?;
        }
        Ok(())
    }

    async fn scan(&self, cursor: u64, prefix: &str, page_size: usize) -> Result<ScanPage> {
        let all = self.live_keys()?;
        let start = cursor as usize;
        if start >= all.len() {
            return Ok(ScanPage::default());
        }

        let end = (start + page_size.max(1)).min(all.len());
        let keys = all[start..end]
            .iter()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();

        let next = if end >= all.len() { 0 } else { end as u64 };
        Ok(ScanPage { keys, cursor: next })
    }

    async fn len(&self, key: &str) -> Result<u64> {
        Ok(self.live_meta(key)?.map_or(0, |m| m.len))
    }

    async fn keys(&self) -> Result<Vec<String>> {
        self.live_keys()
    }

    async fn ping(&self) -> Result<()> {
        self.keyspace.persist(fjall::PersistMode::Buffer)?;
        Ok(())
    }
}
