//! Live tail sessions
//!
//! Each call to [`LogStore::tail`](crate::LogStore::tail) spawns one
//! independent polling task. A session always replays from the logical
//! beginning of the stream - cursors are not resumable across sessions, so
//! a late subscriber gets earlier lines redelivered.
//!
//! The session loop blocks only inside the bounded-timeout range read;
//! cancellation and the hard deadline are checked once per iteration, so a
//! session can run up to one poll interval past its cancellation signal.

use crate::error::StoreError;
use crate::line::Line;
use std::sync::Arc;
use std::time::Duration;
use streamline_engine::LogEngine;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

/// One live tail over a stream.
///
/// Lines arrive on a bounded channel with blocking send: a slow consumer
/// throttles delivery, nothing is dropped or buffered without bound. Both
/// channels close when the session terminates; an error is posted only when
/// termination was due to a fatal engine failure. Dropping the session
/// cancels it.
pub struct TailSession {
    lines: mpsc::Receiver<Line>,
    errors: mpsc::Receiver<StoreError>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl TailSession {
    /// Receive the next line; `None` once the session has terminated.
    pub async fn recv(&mut self) -> Option<Line> {
        self.lines.recv().await
    }

    /// The fatal error that ended the session, if any. Resolves to `None`
    /// for sessions that ended by cancellation, deadline, or consumer drop.
    pub async fn error(&mut self) -> Option<StoreError> {
        self.errors.recv().await
    }

    /// Cancel the session. Takes effect within one poll interval.
    pub fn cancel(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

pub(crate) struct SessionParams {
    pub key: String,
    pub poll_interval: Duration,
    pub max_duration: Duration,
    pub buffer: usize,
}

/// Spawn a session task and return its consumer-side handle.
pub(crate) fn spawn<E: LogEngine>(engine: Arc<E>, params: SessionParams) -> TailSession {
    let (line_tx, line_rx) = mpsc::channel(params.buffer);
    let (err_tx, err_rx) = mpsc::channel(1);
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    tokio::spawn(run_session(engine, params, line_tx, err_tx, shutdown_rx));

    TailSession {
        lines: line_rx,
        errors: err_rx,
        shutdown_tx: Some(shutdown_tx),
    }
}

async fn run_session<E: LogEngine>(
    engine: Arc<E>,
    params: SessionParams,
    lines: mpsc::Sender<Line>,
    errors: mpsc::Sender<StoreError>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let key = params.key;
    let deadline = Instant::now() + params.max_duration;
    let mut cursor = 0u64;

    loop {
        // Cooperative cancellation: a sent signal or a dropped session both
        // end the loop.
        match shutdown.try_recv() {
            Ok(()) | Err(oneshot::error::TryRecvError::Closed) => {
                tracing::debug!(key = %key, "tail session cancelled");
                break;
            }
            Err(oneshot::error::TryRecvError::Empty) => {}
        }

        if Instant::now() >= deadline {
            tracing::debug!(key = %key, "tail session reached maximum duration");
            break;
        }

        if lines.is_closed() {
            break;
        }

        let batch = match engine.range_read(&key, cursor, params.poll_interval).await {
            Ok(batch) => batch,
            Err(e) => {
                tracing::error!(error = %e, key = %key, "engine read failed during tail");
                let _ = errors.try_send(StoreError::engine("tail", &*key, e));
                break;
            }
        };

        for entry in batch {
            cursor = entry.sequence;
            let line = match Line::decode(&key, &entry) {
                Ok(line) => line,
                Err(e) => {
                    // One malformed record must not poison the session.
                    tracing::debug!(error = %e, key = %key, "skipping undecodable entry");
                    continue;
                }
            };
            if lines.send(line).await.is_err() {
                // Consumer is gone; closing both channels is the only exit.
                return;
            }
        }
    }
    // Channels close when the senders drop here.
}
