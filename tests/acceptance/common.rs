//! Common utilities for acceptance tests.

#![allow(dead_code)] // Not every test module uses every helper

use fc_common::clock::Clock;
use fc_common::config::QueueConfig;
use fc_sched::DispatchQueue;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default patience for cross-thread assertions.
pub const WAIT_BUDGET: Duration = Duration::from_secs(5);

/// Spin-wait (with sleeps) until `cond` holds, panicking after
/// [`WAIT_BUDGET`].
pub fn wait_until<F: FnMut() -> bool>(what: &str, mut cond: F) {
    let deadline = Instant::now() + WAIT_BUDGET;
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        std::thread::sleep(Duration::from_millis(2));
    }
}

/// Build a queue with default settings on the given clock.
pub fn spawn_queue(name: &str, clock: &Arc<Clock>) -> DispatchQueue {
    DispatchQueue::new(name, Arc::clone(clock), &QueueConfig::default())
        .expect("queue spawn failed")
}

/// Dispatch a sentinel job and block until the worker has executed it,
/// proving everything dispatched before it has run too.
pub fn drain(queue: &DispatchQueue) {
    let (tx, rx) = mpsc::channel();
    queue.dispatch(move || {
        tx.send(()).unwrap();
    });
    rx.recv_timeout(WAIT_BUDGET).expect("worker did not drain");
}

/// A job that parks the worker until released, for tests that need work
/// to pile up behind a busy worker.
pub struct WorkerBlocker {
    release: mpsc::Sender<()>,
}

impl WorkerBlocker {
    /// Dispatch the blocking job and wait until the worker is inside it.
    pub fn install(queue: &DispatchQueue) -> Self {
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        queue.dispatch(move || {
            started_tx.send(()).unwrap();
            release_rx.recv().unwrap();
        });
        started_rx
            .recv_timeout(WAIT_BUDGET)
            .expect("blocker never started");
        Self {
            release: release_tx,
        }
    }

    /// Let the worker continue.
    pub fn release(self) {
        self.release.send(()).expect("worker already gone");
    }
}
