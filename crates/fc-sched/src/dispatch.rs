//! Dispatch queue: one worker thread servicing a FIFO of one-shot jobs and
//! a set of interval jobs.
//!
//! # Ordering policy
//!
//! FIFO jobs execute in submission order relative to each other. When a
//! FIFO job and a ready interval job are both pending at the same wake, the
//! interval job runs first: it carries a real-time deadline, the FIFO job
//! does not.
//!
//! # Failure policy
//!
//! Job panics are caught, counted, and logged; the worker keeps servicing
//! both queues. A silently dead worker would be a total outage for its
//! subsystem's async *and* periodic work, so log-and-continue is enforced
//! here rather than left to each call site.
//!
//! # Shutdown
//!
//! [`DispatchQueue::shutdown`] raises the exit flag and keeps signalling the
//! wake primitive until the worker exits. A worker stuck inside a job makes
//! teardown fail with [`FcError::ShutdownTimeout`] after a bounded number of
//! retries; the thread is leaked rather than joined blindly. Jobs submitted
//! after the exit flag is raised are dropped and never execute.

use crate::interval::{IntervalFn, IntervalSchedule};
use crate::stats::{QueueCounters, QueueStats};
use fc_common::clock::{duration_from_ticks, ticks_from_duration, Clock};
use fc_common::config::QueueConfig;
use fc_common::error::{FcError, FcResult};
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// A one-shot unit of deferred work.
type Job = Box<dyn FnOnce() + Send>;

/// Floor for the worker's bounded idle wait, so a nearly-due deadline on a
/// slow-advancing clock does not degenerate into a spin.
const MIN_IDLE_WAIT: Duration = Duration::from_millis(1);

struct QueueState {
    fifo: VecDeque<Job>,
    intervals: IntervalSchedule,
    should_exit: bool,
}

struct Shared {
    name: String,
    state: Mutex<QueueState>,
    wake: Condvar,
    clock: Arc<Clock>,
    counters: QueueCounters,
}

impl Shared {
    /// Jobs run with this lock released, so poisoning can only come from a
    /// panic inside queue bookkeeping itself; the data is still sound.
    fn lock_state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A serial work queue with exactly one worker thread.
pub struct DispatchQueue {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
    shutdown_retries: u32,
    shutdown_retry_interval: Duration,
}

impl std::fmt::Debug for DispatchQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchQueue")
            .field("name", &self.shared.name)
            .field("stats", &self.shared.counters.snapshot())
            .finish_non_exhaustive()
    }
}

impl DispatchQueue {
    /// Spawn the queue's worker thread.
    ///
    /// `config` supplies the resource hints: stack size, optional
    /// best-effort SCHED_FIFO priority, and the teardown retry budget.
    /// Spawn failure is fatal; a queue without a worker has no degraded
    /// mode.
    pub fn new(name: &str, clock: Arc<Clock>, config: &QueueConfig) -> FcResult<Self> {
        let shared = Arc::new(Shared {
            name: name.to_owned(),
            state: Mutex::new(QueueState {
                fifo: VecDeque::new(),
                intervals: IntervalSchedule::new(),
                should_exit: false,
            }),
            wake: Condvar::new(),
            clock,
            counters: QueueCounters::default(),
        });

        let worker_shared = Arc::clone(&shared);
        let priority = config.realtime_priority;
        let handle = thread::Builder::new()
            .name(name.to_owned())
            .stack_size(config.stack_size)
            .spawn(move || {
                if let Some(priority) = priority {
                    apply_realtime_priority(&worker_shared.name, priority);
                }
                worker_loop(&worker_shared);
            })
            .map_err(|e| FcError::Spawn {
                thread: name.to_owned(),
                source: e,
            })?;

        info!(queue = name, "dispatch queue started");
        Ok(Self {
            shared,
            worker: Mutex::new(Some(handle)),
            shutdown_retries: config.shutdown_retries,
            shutdown_retry_interval: config.shutdown_retry_interval,
        })
    }

    /// Queue name, as carried by the worker thread.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Submit a one-shot job. O(1) append plus a wake signal; never blocks
    /// the caller beyond the short critical section. No handle is returned
    /// and there is no per-job cancellation; the only cancellation is
    /// whole-queue teardown.
    ///
    /// Jobs submitted after shutdown has begun are dropped, never executed.
    pub fn dispatch<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.shared.lock_state();
        if state.should_exit {
            drop(state);
            debug!(queue = %self.shared.name, "job submitted after shutdown; dropped");
            return;
        }
        state.fifo.push_back(Box::new(job));
        drop(state);
        self.shared.wake.notify_one();
    }

    /// Submit a periodic job. The first firing comes one `period` after
    /// registration; each subsequent deadline is one period past the
    /// previous *fire time*, so execution latency never accumulates into
    /// drift and a stalled worker fires once, not once per missed period.
    ///
    /// Interval jobs persist for the queue's lifetime; there is no removal.
    pub fn dispatch_on_interval<F>(&self, job: F, period: Duration)
    where
        F: FnMut() + Send + 'static,
    {
        let period_ticks = ticks_from_duration(period).max(1);
        let job: IntervalFn = Arc::new(Mutex::new(job));

        let mut state = self.shared.lock_state();
        if state.should_exit {
            drop(state);
            debug!(queue = %self.shared.name, "interval job submitted after shutdown; dropped");
            return;
        }
        let now = self.shared.clock.now();
        state.intervals.add(job, period_ticks, now);
        drop(state);
        // Wake the worker so its idle wait re-bounds to the new deadline.
        self.shared.wake.notify_one();
    }

    /// Register an overflow callback on this queue's clock that wakes the
    /// worker whenever the nearest interval deadline has passed.
    ///
    /// The clock carries a single callback slot, so the last queue to
    /// attach wins; a queue without the callback still makes progress
    /// through the worker's bounded idle wait, just with coarser wake
    /// granularity. Readiness is sticky: the deadline comparison stays true
    /// until the worker consumes the firing.
    pub fn attach_timer_wake(&self) {
        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        self.shared.clock.set_overflow_callback(move || {
            let Some(shared) = weak.upgrade() else { return };
            let state = shared.lock_state();
            let due = state
                .intervals
                .next_deadline()
                .is_some_and(|deadline| deadline <= shared.clock.now());
            drop(state);
            if due {
                shared.wake.notify_one();
            }
        });
    }

    /// Snapshot of this queue's execution counters.
    pub fn stats(&self) -> QueueStats {
        self.shared.counters.snapshot()
    }

    /// Raise the exit flag and keep signalling the worker until it exits.
    ///
    /// Idempotent, and callable from any thread holding the queue. Fails
    /// with [`FcError::ShutdownTimeout`] if the worker is stuck inside a
    /// job past the retry budget; the thread is leaked in that case,
    /// because joining would block forever.
    pub fn shutdown(&self) -> FcResult<()> {
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(handle) = handle else {
            return Ok(());
        };

        {
            let mut state = self.shared.lock_state();
            state.should_exit = true;
        }
        self.shared.wake.notify_all();

        for _ in 0..self.shutdown_retries {
            if handle.is_finished() {
                handle.join().map_err(|_| FcError::WorkerLost {
                    queue: self.shared.name.clone(),
                })?;
                info!(
                    queue = %self.shared.name,
                    stats = ?self.stats(),
                    "dispatch queue stopped"
                );
                return Ok(());
            }
            self.shared.wake.notify_all();
            thread::sleep(self.shutdown_retry_interval);
        }

        error!(
            queue = %self.shared.name,
            retries = self.shutdown_retries,
            "worker did not exit; leaking its thread"
        );
        Err(FcError::ShutdownTimeout {
            queue: self.shared.name.clone(),
            waited_ms: (self.shutdown_retry_interval * self.shutdown_retries).as_millis() as u64,
        })
    }
}

impl Drop for DispatchQueue {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            error!(error = %e, "dispatch queue teardown failed");
        }
    }
}

/// The worker: serial, non-preemptive execution of this queue's jobs.
fn worker_loop(shared: &Shared) {
    debug!(queue = %shared.name, "worker started");
    let mut state = shared.lock_state();
    loop {
        if state.should_exit {
            break;
        }
        let now = shared.clock.now();

        // Ready interval work outranks the FIFO: it carries a deadline.
        if let Some(job) = state.intervals.take_ready(now) {
            drop(state);
            run_interval_job(shared, job);
            state = shared.lock_state();
            continue;
        }

        if let Some(job) = state.fifo.pop_front() {
            drop(state);
            run_async_job(shared, job);
            state = shared.lock_state();
            continue;
        }

        // Idle. Sleep until dispatch()/the timer callback signals, bounded
        // by the time left to the nearest interval deadline.
        state = match state.intervals.next_deadline() {
            Some(deadline) => {
                let wait = duration_from_ticks(deadline.saturating_sub(now)).max(MIN_IDLE_WAIT);
                let (guard, _timed_out) = shared
                    .wake
                    .wait_timeout(state, wait)
                    .unwrap_or_else(PoisonError::into_inner);
                guard
            }
            None => shared
                .wake
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner),
        };
    }
    drop(state);
    debug!(queue = %shared.name, "worker exiting");
}

fn run_async_job(shared: &Shared, job: Job) {
    let start = shared.clock.now();
    let result = catch_unwind(AssertUnwindSafe(job));
    shared
        .counters
        .record_async(shared.clock.now().saturating_sub(start));
    if result.is_err() {
        shared.counters.record_panic();
        error!(queue = %shared.name, "dispatched job panicked; worker continues");
    }
}

fn run_interval_job(shared: &Shared, job: IntervalFn) {
    let start = shared.clock.now();
    let result = catch_unwind(AssertUnwindSafe(|| {
        // Uncontended except against a previous panic of the same job;
        // recover the closure either way so the interval keeps firing.
        let mut f = job.lock().unwrap_or_else(PoisonError::into_inner);
        (f)();
    }));
    shared
        .counters
        .record_interval(shared.clock.now().saturating_sub(start));
    if result.is_err() {
        shared.counters.record_panic();
        error!(queue = %shared.name, "interval job panicked; worker continues");
    }
}

#[cfg(target_os = "linux")]
fn apply_realtime_priority(queue: &str, priority: u8) {
    let param = libc::sched_param {
        sched_priority: i32::from(priority.min(99)),
    };
    // Applies to the calling (worker) thread only.
    let rc = unsafe { libc::pthread_setschedparam(libc::pthread_self(), libc::SCHED_FIFO, &param) };
    if rc == 0 {
        info!(queue, priority, "SCHED_FIFO applied to worker");
    } else {
        warn!(
            queue,
            priority, rc, "could not apply SCHED_FIFO (missing CAP_SYS_NICE?); using default scheduling"
        );
    }
}

#[cfg(not(target_os = "linux"))]
fn apply_realtime_priority(queue: &str, _priority: u8) {
    warn!(queue, "realtime priority not supported on this platform");
}
