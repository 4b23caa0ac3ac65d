//! Stream store facade

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::expiry::{self, SweeperHandle};
use crate::line::Line;
use crate::scan;
use crate::tail::{self, SessionParams, TailSession};
use std::collections::HashMap;
use std::sync::Arc;
use streamline_engine::{LogEngine, TtlState};
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Per-stream statistics reported by [`LogStore::info`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamStats {
    /// Approximate stored entry count; -1 when the sub-query failed
    pub size: i64,

    /// Remaining TTL rendered as a duration string; "-1" when unset or the
    /// sub-query failed
    pub ttl: String,
}

/// Global snapshot of every stream
#[derive(Debug, Clone, Default)]
pub struct Info {
    pub streams: HashMap<String, StreamStats>,
}

/// Streaming log store over a backing append-log engine.
///
/// The engine handle is constructor-injected and shared by every operation,
/// tail session, and the expiry sweep; the engine's own concurrency contract
/// makes that safe without additional locking here.
pub struct LogStore<E: LogEngine> {
    engine: Arc<E>,
    config: StoreConfig,
    sweeper: Option<SweeperHandle>,
}

impl<E: LogEngine> LogStore<E> {
    /// Build a store and start its expiry sweep.
    ///
    /// Fails on invalid configuration; no partially-initialized store is
    /// returned. The sweep stops when the store is shut down or dropped.
    pub fn new(engine: Arc<E>, config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let sweeper = expiry::start_sweeper(engine.clone(), &config);
        Ok(Self {
            engine,
            config,
            sweeper: Some(sweeper),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Stop the background expiry sweep. Dropping the store has the same
    /// effect; this just makes the lifecycle explicit.
    pub fn shutdown(&mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.shutdown();
        }
    }

    /// Create the stream under `key`.
    ///
    /// Any pre-existing stream under the same key is deleted first and all
    /// its entries are discarded. This destructive re-create gives
    /// reattempted builds a fresh stream, at the cost of silent data loss if
    /// a key is reused unintentionally.
    pub async fn create(&self, key: &str) -> Result<()> {
        // Best-effort: absence of a predecessor is not an error.
        let _ = self.delete(key).await;

        // A sentinel entry materializes the stream; tails skip it since it
        // does not decode as a line.
        self.engine
            .append(key, Vec::new(), self.config.max_stream_size)
            .await
            .map_err(|e| StoreError::engine("create", key, e))?;

        // TTL assignment is allowed to fail here; the sweep heals it within
        // one TTL cycle.
        if let Err(e) = expiry::set_once(self.engine.as_ref(), key, self.config.default_ttl).await {
            tracing::warn!(error = %e, key, "could not set expiry on stream create");
        }
        Ok(())
    }

    /// Delete the stream under `key` and all its entries.
    pub async fn delete(&self, key: &str) -> Result<()> {
        self.exists(key).await?;
        self.engine
            .delete(key)
            .await
            .map_err(|e| StoreError::engine("delete", key, e))?;
        Ok(())
    }

    /// Append lines to an existing stream.
    ///
    /// Best-effort batch: a failure writing one line is recorded but does
    /// not abort the rest. The call errors if any line failed, but the
    /// caller cannot assume none were written. The existence gate and the
    /// appends are not atomic; a concurrent delete in between surfaces as a
    /// spurious failure, accepted under the best-effort contract.
    pub async fn write(&self, key: &str, lines: &[Line]) -> Result<()> {
        self.exists(key).await?;

        let mut write_err = None;
        for line in lines {
            let payload = match line.encode() {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::warn!(error = %e, key, "could not encode line, skipping");
                    continue;
                }
            };
            if let Err(e) = self
                .engine
                .append(key, payload, self.config.max_stream_size)
                .await
            {
                tracing::warn!(error = %e, key, "could not write line to stream");
                write_err = Some(StoreError::engine("write", key, e));
            }
        }

        // No-op when the TTL is already attached.
        if let Err(e) = expiry::set_once(self.engine.as_ref(), key, self.config.default_ttl).await {
            tracing::debug!(error = %e, key, "could not set expiry on write");
        }

        match write_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Check whether the stream exists. No side effects.
    pub async fn exists(&self, key: &str) -> Result<()> {
        match self.engine.exists(key).await {
            Ok(true) => Ok(()),
            // An engine failure on the existence probe reads as absence,
            // matching the routine NotFound contract.
            Ok(false) | Err(_) => Err(StoreError::not_found(key)),
        }
    }

    /// Start a live tail over the stream.
    ///
    /// Returns `None` when the key does not exist: nothing to tail, not an
    /// error. Every session independently replays from the beginning of the
    /// stream and ends only on cancellation, its hard deadline, or a fatal
    /// engine error.
    pub async fn tail(&self, key: &str) -> Option<TailSession> {
        if self.exists(key).await.is_err() {
            return None;
        }
        Some(tail::spawn(
            self.engine.clone(),
            SessionParams {
                key: key.to_string(),
                poll_interval: self.config.poll_interval,
                max_duration: self.config.tail_max_duration,
                buffer: self.config.tail_buffer,
            },
        ))
    }

    /// List keys under a prefix.
    ///
    /// Capped at `max_prefix_keys`; when more keys exist the result is a
    /// partial set. Ordering is unspecified.
    pub async fn list_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        scan::list_prefix(
            self.engine.as_ref(),
            prefix,
            self.config.scan_page_size,
            self.config.max_prefix_keys,
        )
        .await
    }

    /// Dump the currently available entries into `sink`, decoded and
    /// newline-delimited. One-shot and best-effort: lines written after the
    /// snapshot read are not included. The sink is shut down on every exit
    /// path.
    pub async fn copy_to<W>(&self, key: &str, sink: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let result = self.copy_entries(key, sink).await;
        let _ = sink.shutdown().await;
        result
    }

    async fn copy_entries<W>(&self, key: &str, sink: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        self.exists(key).await?;

        let batch = self
            .engine
            .range_read(key, 0, self.config.poll_interval)
            .await
            .map_err(|e| StoreError::engine("copy", key, e))?;

        for entry in batch {
            let line = match Line::decode(key, &entry) {
                Ok(line) => line,
                // Sentinel and malformed entries are skipped, not copied.
                Err(_) => continue,
            };
            sink.write_all(&line.content).await?;
            sink.write_all(b"\n").await?;
        }
        sink.flush().await?;
        Ok(())
    }

    /// Global snapshot of every stream's approximate size and remaining TTL.
    ///
    /// Full scan with one size and one TTL sub-query per key; expensive, and
    /// unsuitable for frequent polling at scale. Sub-query failures degrade
    /// to `-1` defaults rather than aborting the snapshot.
    pub async fn info(&self) -> Info {
        let keys = self.engine.keys().await.unwrap_or_default();

        let mut streams = HashMap::with_capacity(keys.len());
        for key in keys {
            let size = match self.engine.len(&key).await {
                Ok(n) => n as i64,
                Err(_) => -1,
            };
            let ttl = match self.engine.ttl(&key).await {
                Ok(TtlState::Set(remaining)) => format!("{remaining:?}"),
                Ok(TtlState::Unset) | Ok(TtlState::Absent) | Err(_) => "-1".to_string(),
            };
            streams.insert(key, StreamStats { size, ttl });
        }
        Info { streams }
    }

    /// Engine liveness probe.
    pub async fn ping(&self) -> Result<()> {
        self.engine
            .ping()
            .await
            .map_err(|e| StoreError::engine("ping", "", e))
    }
}

impl<E: LogEngine> Drop for LogStore<E> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
