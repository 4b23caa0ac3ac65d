//! Store configuration

use crate::error::{Result, StoreError};
use std::time::Duration;

/// Configuration for a [`LogStore`](crate::LogStore).
///
/// Defaults follow production sizing: streams live five hours, tails poll
/// every 100ms and are force-closed after an hour, and a stream caps out
/// around five thousand entries.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Lifetime assigned to every stream; also the period of the background
    /// expiry sweep
    pub default_ttl: Duration,

    /// How long a tail's range read blocks waiting for data. Bounds
    /// worst-case cancellation latency to roughly one interval.
    pub poll_interval: Duration,

    /// Hard wall-clock ceiling on a tail session, independent of activity
    pub tail_max_duration: Duration,

    /// Capacity of a tail session's line channel; a full channel throttles
    /// delivery (blocking send, no dropping)
    pub tail_buffer: usize,

    /// Approximate maximum entries kept per stream (ring-buffer bound)
    pub max_stream_size: u64,

    /// Maximum keys returned by a prefix listing; results are partial past
    /// this cap
    pub max_prefix_keys: usize,

    /// Page size for cursor scans (prefix listing and the expiry sweep)
    pub scan_page_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(5 * 60 * 60),
            poll_interval: Duration::from_millis(100),
            tail_max_duration: Duration::from_secs(60 * 60),
            tail_buffer: 50,
            max_stream_size: 5000,
            max_prefix_keys: 200,
            scan_page_size: 10,
        }
    }
}

impl StoreConfig {
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_tail_max_duration(mut self, max: Duration) -> Self {
        self.tail_max_duration = max;
        self
    }

    pub fn with_tail_buffer(mut self, buffer: usize) -> Self {
        self.tail_buffer = buffer;
        self
    }

    pub fn with_max_stream_size(mut self, max: u64) -> Self {
        self.max_stream_size = max;
        self
    }

    pub fn with_max_prefix_keys(mut self, max: usize) -> Self {
        self.max_prefix_keys = max;
        self
    }

    pub fn with_scan_page_size(mut self, size: usize) -> Self {
        self.scan_page_size = size;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.default_ttl.is_zero() {
            return Err(StoreError::Config("default_ttl must be non-zero".into()));
        }
        if self.poll_interval.is_zero() {
            return Err(StoreError::Config("poll_interval must be non-zero".into()));
        }
        if self.tail_buffer == 0 {
            return Err(StoreError::Config("tail_buffer must be non-zero".into()));
        }
        if self.scan_page_size == 0 {
            return Err(StoreError::Config("scan_page_size must be non-zero".into()));
        }
        Ok(())
    }
}
