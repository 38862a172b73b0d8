//! Interval-job bookkeeping for a dispatch queue.
//!
//! A stable arena of periodic items plus a cached "which deadline is
//! nearest" index. Items are never removed; deadlines only ever move
//! forward. All mutation happens under the owning queue's state lock; the
//! job closures themselves sit behind their own mutex so the worker can run
//! them with the state lock released.

use std::sync::{Arc, Mutex};

/// A periodic job closure, shared between the schedule and the worker while
/// the job runs.
pub(crate) type IntervalFn = Arc<Mutex<dyn FnMut() + Send>>;

struct IntervalItem {
    job: IntervalFn,
    /// Firing period in clock ticks. Never zero.
    period: u64,
    /// Next firing deadline in clock ticks. Strictly increases per firing.
    next_deadline: u64,
}

/// All interval items for one dispatch queue.
pub(crate) struct IntervalSchedule {
    items: Vec<IntervalItem>,
    /// Arena index of the item with the nearest deadline; `None` when empty.
    /// Recomputed on every mutation and every firing.
    next_idx: Option<usize>,
}

impl IntervalSchedule {
    pub(crate) fn new() -> Self {
        Self {
            items: Vec::new(),
            next_idx: None,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    /// Add an item with its first deadline one period from `now`.
    pub(crate) fn add(&mut self, job: IntervalFn, period: u64, now: u64) {
        debug_assert!(period > 0, "interval period must be non-zero");
        self.items.push(IntervalItem {
            job,
            period,
            next_deadline: now + period,
        });
        self.recompute();
    }

    /// Rescan for the nearest deadline. Ties resolve to the earliest-added
    /// item so firing order is reproducible.
    fn recompute(&mut self) {
        let mut best: Option<usize> = None;
        for i in 0..self.items.len() {
            match best {
                Some(b) if self.items[i].next_deadline >= self.items[b].next_deadline => {}
                _ => best = Some(i),
            }
        }
        self.next_idx = best;
    }

    /// Deadline of the nearest item, if any.
    pub(crate) fn next_deadline(&self) -> Option<u64> {
        self.next_idx.map(|i| self.items[i].next_deadline)
    }

    /// If the nearest item is due at `now`, reschedule it one period past
    /// the fire time and hand its job out. At most one item per call, and
    /// an item whose deadline passed several periods ago still fires only
    /// once; a stalled queue never backfills.
    pub(crate) fn take_ready(&mut self, now: u64) -> Option<IntervalFn> {
        let idx = self.next_idx?;
        if self.items[idx].next_deadline > now {
            return None;
        }
        let period = self.items[idx].period;
        self.items[idx].next_deadline = now + period;
        let job = Arc::clone(&self.items[idx].job);
        self.recompute();
        Some(job)
    }
}
