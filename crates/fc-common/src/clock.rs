//! Monotonic flight timebase.
//!
//! Models the hardware timer the rest of the stack schedules against: a
//! small free-running counter that wraps at [`COUNTER_MODULO`], plus a
//! 64-bit base that accumulates the full-scale tick count at every overflow.
//! The combined value is non-decreasing across wraparound and is safe to
//! read from any thread, including the overflow callback's own.
//!
//! # Timebase
//!
//! - 1 tick = 1 microsecond ([`TICKS_PER_MILLI`] ticks per millisecond)
//! - the counter wraps every [`COUNTER_MODULO`] ticks (1 ms), which is when
//!   the registered overflow callback runs
//!
//! # Threading model
//!
//! - **One writer**: whoever calls [`Clock::advance`]. In production the
//!   [`ClockDriver`] thread, in tests the test itself. This stands in for
//!   the hardware counter plus its overflow interrupt.
//! - **Many readers**: [`Clock::now`] uses a seqlock read-compare-retry so
//!   a reader never combines a base and counter that did not occur together.

use crate::error::{FcError, FcResult};
use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Ticks per counter overflow (the counter's modulo value).
pub const COUNTER_MODULO: u32 = 1000;

/// Ticks per millisecond of flight time.
pub const TICKS_PER_MILLI: u64 = 1000;

/// Convert a wall-clock duration into clock ticks.
#[must_use]
pub fn ticks_from_duration(d: Duration) -> u64 {
    d.as_micros() as u64
}

/// Convert clock ticks into a wall-clock duration.
#[must_use]
pub fn duration_from_ticks(ticks: u64) -> Duration {
    Duration::from_micros(ticks)
}

type OverflowCallback = Arc<dyn Fn() + Send + Sync>;

/// Free-running monotonic clock with an overflow-extended 64-bit tick count.
pub struct Clock {
    /// Seqlock word; odd while an overflow is being folded into the base.
    seq: CachePadded<AtomicU64>,
    /// Ticks accumulated at past overflows.
    base: CachePadded<AtomicU64>,
    /// Live counter; wraps at [`COUNTER_MODULO`]. Single writer.
    counter: CachePadded<AtomicU32>,
    /// Optional callback run on every overflow; re-registration replaces.
    overflow_cb: Mutex<Option<OverflowCallback>>,
    /// Total overflows observed since construction.
    overflows: AtomicU64,
}

impl std::fmt::Debug for Clock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clock")
            .field("now", &self.now())
            .field("overflows", &self.overflows.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl Clock {
    /// Create a new clock at tick zero.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            seq: CachePadded::new(AtomicU64::new(0)),
            base: CachePadded::new(AtomicU64::new(0)),
            counter: CachePadded::new(AtomicU32::new(0)),
            overflow_cb: Mutex::new(None),
            overflows: AtomicU64::new(0),
        })
    }

    /// Current tick count.
    ///
    /// Seqlock read: retries while an overflow is mid-flight so the result
    /// is never computed from a counter read that straddled the wrap.
    pub fn now(&self) -> u64 {
        loop {
            let seq1 = self.seq.load(Ordering::Acquire);
            if seq1 & 1 == 0 {
                let base = self.base.load(Ordering::Acquire);
                let live = self.counter.load(Ordering::Acquire);
                let seq2 = self.seq.load(Ordering::Acquire);
                if seq1 == seq2 {
                    return base + u64::from(live);
                }
            }
            std::hint::spin_loop();
        }
    }

    /// Register the overflow callback, replacing any previous registration.
    ///
    /// The callback runs on the writer's thread once per counter wrap and
    /// must stay short; everything downstream of the timer waits on it.
    pub fn set_overflow_callback<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut slot = self
            .overflow_cb
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Arc::new(callback));
    }

    /// Remove the overflow callback.
    pub fn clear_overflow_callback(&self) {
        let mut slot = self
            .overflow_cb
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = None;
    }

    /// Total counter overflows since construction.
    pub fn overflow_count(&self) -> u64 {
        self.overflows.load(Ordering::Relaxed)
    }

    /// Advance the clock by `ticks`, wrapping the counter and firing the
    /// overflow callback as many times as the advance crosses the modulo.
    ///
    /// Single-writer: only one thread may ever call this on a given clock.
    pub fn advance(&self, mut ticks: u64) {
        while ticks > 0 {
            let live = self.counter.load(Ordering::Relaxed);
            let room = u64::from(COUNTER_MODULO - live);
            if ticks < room {
                // Must fit in u32: ticks < room <= COUNTER_MODULO.
                self.counter.store(live + ticks as u32, Ordering::Release);
                return;
            }
            ticks -= room;
            self.overflow();
        }
    }

    /// Fold one full-scale counter period into the base.
    ///
    /// Readers retry while `seq` is odd, so no reader can pair the new base
    /// with the stale counter or vice versa.
    fn overflow(&self) {
        self.seq.fetch_add(1, Ordering::Release);
        self.counter.store(0, Ordering::Relaxed);
        self.base
            .fetch_add(u64::from(COUNTER_MODULO), Ordering::Relaxed);
        self.seq.fetch_add(1, Ordering::Release);
        self.overflows.fetch_add(1, Ordering::Relaxed);

        // Clone the callback out of the slot before invoking it so the slot
        // lock is never held across user code.
        let callback = self
            .overflow_cb
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(callback) = callback {
            callback();
        }
    }
}

/// Thread that feeds a [`Clock`] from wall time, standing in for the
/// hardware timer interrupt. One driver per clock.
#[derive(Debug)]
pub struct ClockDriver {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ClockDriver {
    /// Spawn the driver thread. `period` is the wake cadence; the clock is
    /// advanced by the measured elapsed time on each wake, so a late wake
    /// never loses ticks.
    pub fn start(clock: Arc<Clock>, period: Duration) -> FcResult<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("fc-clock".into())
            .spawn(move || {
                debug!("clock driver started");
                let mut last = Instant::now();
                while !thread_stop.load(Ordering::Acquire) {
                    thread::sleep(period);
                    let elapsed = last.elapsed();
                    last += elapsed;
                    clock.advance(ticks_from_duration(elapsed));
                }
                debug!("clock driver stopped");
            })
            .map_err(|e| FcError::Spawn {
                thread: "fc-clock".into(),
                source: e,
            })?;

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Stop the driver thread and wait for it to exit.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("clock driver thread panicked");
            }
        }
    }
}

impl Drop for ClockDriver {
    fn drop(&mut self) {
        self.stop();
    }
}
