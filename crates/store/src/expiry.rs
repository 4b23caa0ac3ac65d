//! Stream lifetime management
//!
//! Two cooperating mechanisms bound every stream's lifetime: a set-once TTL
//! assigned when the stream is created (and re-attempted on every write),
//! and a recurring background sweep that assigns the default TTL to any key
//! still missing one. The two share the same set-once semantics, so their
//! race is benign: at most one of them changes state and the loser just
//! observes [`TtlOutcome::AlreadySet`].

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use std::sync::Arc;
use std::time::Duration;
use streamline_engine::{LogEngine, TtlState};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Outcome of a set-once TTL attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlOutcome {
    /// The key had no TTL; the given one was attached
    Assigned,
    /// The key already had a TTL; the countdown was left untouched
    AlreadySet,
}

/// Attach a TTL to a key unless it already has one.
///
/// Never extends or resets an existing countdown. Fails with `NotFound` if
/// the key does not exist (there is nothing to expire).
pub async fn set_once<E: LogEngine>(
    engine: &E,
    key: &str,
    ttl: Duration,
) -> Result<TtlOutcome> {
    let state = engine
        .ttl(key)
        .await
        .map_err(|e| StoreError::engine("ttl", key, e))?;

    match state {
        TtlState::Absent => Err(StoreError::not_found(key)),
        TtlState::Set(_) => Ok(TtlOutcome::AlreadySet),
        TtlState::Unset => {
            engine
                .set_ttl(key, ttl)
                .await
                .map_err(|e| StoreError::engine("set_ttl", key, e))?;
            Ok(TtlOutcome::Assigned)
        }
    }
}

/// Handle to the running expiry sweep task.
///
/// Owned by the store; shut down explicitly via [`SweeperHandle::shutdown`]
/// or aborted when the handle drops, so the sweep never outlives its store.
pub struct SweeperHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal the sweep loop to stop after its current round.
    pub fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        // An explicitly shut-down sweeper finishes its current round; an
        // unceremoniously dropped one is stopped hard.
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            self.task.abort();
        }
    }
}

/// Start the recurring expiry sweep.
///
/// Period equals the default TTL: a key whose create-time TTL assignment
/// failed transiently is healed within at most one full TTL cycle, so no
/// stream is permanently immortal.
pub(crate) fn start_sweeper<E: LogEngine>(engine: Arc<E>, config: &StoreConfig) -> SweeperHandle {
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
    let default_ttl = config.default_ttl;
    let page_size = config.scan_page_size;

    let task = tokio::spawn(async move {
        // First round runs one full period after startup, matching the
        // schedule keys are otherwise expected to be assigned TTLs on.
        let start = tokio::time::Instant::now() + default_ttl;
        let mut interval = tokio::time::interval_at(start, default_ttl);
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => break,
                _ = interval.tick() => {
                    sweep_round(engine.as_ref(), default_ttl, page_size).await;
                }
            }
        }
        tracing::debug!("expiry sweeper stopped");
    });

    SweeperHandle {
        shutdown_tx: Some(shutdown_tx),
        task,
    }
}

/// One full pass over the key space, assigning the default TTL to every key
/// missing one.
async fn sweep_round<E: LogEngine>(engine: &E, ttl: Duration, page_size: usize) {
    let started = Instant::now();
    let mut cursor = 0;
    let mut assigned = 0u64;

    loop {
        let page = match engine.scan(cursor, "", page_size).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(error = %e, "expiry sweep scan failed, abandoning round");
                return;
            }
        };
        cursor = page.cursor;

        for key in page.keys {
            match set_once(engine, &key, ttl).await {
                Ok(TtlOutcome::Assigned) => {
                    tracing::info!(key = %key, ttl = ?ttl, "assigned expiry to non-volatile key");
                    assigned += 1;
                }
                // Already set, or deleted under us; both routine.
                Ok(TtlOutcome::AlreadySet) | Err(StoreError::NotFound { .. }) => {}
                Err(e) => {
                    tracing::warn!(error = %e, key = %key, "could not assign expiry during sweep");
                }
            }
        }

        if cursor == 0 {
            break;
        }
    }

    tracing::info!(
        elapsed = ?started.elapsed(),
        assigned,
        "expiry sweep round complete"
    );
}
