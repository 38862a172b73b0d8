//! Per-queue execution counters.
//!
//! Updated by the worker after every job; readable from any thread without
//! touching the queue's state lock.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub(crate) struct QueueCounters {
    async_jobs: AtomicU64,
    interval_fires: AtomicU64,
    panics_caught: AtomicU64,
    max_job_ticks: AtomicU64,
}

impl QueueCounters {
    pub(crate) fn record_async(&self, elapsed_ticks: u64) {
        self.async_jobs.fetch_add(1, Ordering::Relaxed);
        self.max_job_ticks.fetch_max(elapsed_ticks, Ordering::Relaxed);
    }

    pub(crate) fn record_interval(&self, elapsed_ticks: u64) {
        self.interval_fires.fetch_add(1, Ordering::Relaxed);
        self.max_job_ticks.fetch_max(elapsed_ticks, Ordering::Relaxed);
    }

    pub(crate) fn record_panic(&self) {
        self.panics_caught.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> QueueStats {
        QueueStats {
            async_jobs: self.async_jobs.load(Ordering::Relaxed),
            interval_fires: self.interval_fires.load(Ordering::Relaxed),
            panics_caught: self.panics_caught.load(Ordering::Relaxed),
            max_job_ticks: self.max_job_ticks.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of a queue's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// One-shot jobs executed to completion (including ones that panicked).
    pub async_jobs: u64,
    /// Interval firings executed.
    pub interval_fires: u64,
    /// Job panics absorbed by the log-and-continue policy.
    pub panics_caught: u64,
    /// Longest observed job execution in clock ticks.
    pub max_job_ticks: u64,
}
