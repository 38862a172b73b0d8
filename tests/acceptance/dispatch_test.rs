//! Dispatch queue acceptance: ordering, interval cadence, failure policy,
//! and teardown.

use crate::acceptance::common::{drain, spawn_queue, wait_until, WorkerBlocker};
use fc_common::clock::{Clock, COUNTER_MODULO};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const PERIOD_TICKS: u64 = COUNTER_MODULO as u64;

#[test]
fn test_async_jobs_run_in_submission_order() {
    let clock = Clock::new();
    let queue = spawn_queue("acc-fifo", &clock);
    let order = Arc::new(Mutex::new(Vec::new()));

    // Stall the worker so all jobs are queued before any runs.
    let blocker = WorkerBlocker::install(&queue);
    for i in 0..32 {
        let order = Arc::clone(&order);
        queue.dispatch(move || order.lock().unwrap().push(i));
    }
    blocker.release();
    drain(&queue);

    assert_eq!(*order.lock().unwrap(), (0..32).collect::<Vec<_>>());
}

#[test]
fn test_async_jobs_run_at_most_once() {
    let clock = Clock::new();
    let queue = spawn_queue("acc-once", &clock);
    let runs = Arc::new(AtomicUsize::new(0));

    for _ in 0..500 {
        let runs = Arc::clone(&runs);
        queue.dispatch(move || {
            runs.fetch_add(1, Ordering::Relaxed);
        });
    }
    drain(&queue);

    assert_eq!(runs.load(Ordering::Relaxed), 500);
}

#[test]
fn test_interval_fires_once_per_period() {
    let clock = Clock::new();
    let queue = spawn_queue("acc-cadence", &clock);
    queue.attach_timer_wake();

    let fires = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fires);
    queue.dispatch_on_interval(
        move || {
            counter.fetch_add(1, Ordering::Relaxed);
        },
        Duration::from_millis(1),
    );

    // Step the clock one period at a time; each step must produce exactly
    // one firing before the next step.
    for expected in 1..=5 {
        clock.advance(PERIOD_TICKS);
        wait_until("interval firing", || {
            fires.load(Ordering::Relaxed) == expected
        });
        drain(&queue);
        assert_eq!(fires.load(Ordering::Relaxed), expected, "extra firing");
    }
}

#[test]
fn test_missed_periods_are_not_backfilled() {
    let clock = Clock::new();
    let queue = spawn_queue("acc-nobackfill", &clock);
    queue.attach_timer_wake();

    let fires = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fires);
    queue.dispatch_on_interval(
        move || {
            counter.fetch_add(1, Ordering::Relaxed);
        },
        Duration::from_millis(1),
    );

    // Hold the worker busy across five periods, then release: the job
    // must fire once for the whole missed stretch, not five times.
    let blocker = WorkerBlocker::install(&queue);
    clock.advance(5 * PERIOD_TICKS);
    blocker.release();

    drain(&queue);
    std::thread::sleep(Duration::from_millis(20));
    drain(&queue);
    assert_eq!(fires.load(Ordering::Relaxed), 1);
}

#[test]
fn test_panicking_job_does_not_kill_the_worker() {
    let clock = Clock::new();
    let queue = spawn_queue("acc-panic", &clock);

    queue.dispatch(|| panic!("injected failure"));
    let survived = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&survived);
    queue.dispatch(move || {
        counter.fetch_add(1, Ordering::Relaxed);
    });
    drain(&queue);

    assert_eq!(survived.load(Ordering::Relaxed), 1);
    assert_eq!(queue.stats().panics_caught, 1);
}

#[test]
fn test_shutdown_completes_while_producers_are_active() {
    let clock = Clock::new();
    let queue = Arc::new(spawn_queue("acc-shutdown", &clock));

    let stop = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let producers: Vec<_> = (0..4)
        .map(|_| {
            let stop = Arc::clone(&stop);
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || {
                while !stop.load(Ordering::Acquire) {
                    queue.dispatch(|| {});
                    std::thread::sleep(Duration::from_micros(100));
                }
            })
        })
        .collect();

    std::thread::sleep(Duration::from_millis(20));
    queue.shutdown().expect("shutdown failed under load");

    stop.store(true, Ordering::Release);
    for producer in producers {
        producer.join().unwrap();
    }
}

#[test]
fn test_jobs_dispatched_after_shutdown_never_run() {
    let clock = Clock::new();
    let queue = spawn_queue("acc-late", &clock);
    queue.shutdown().expect("clean shutdown failed");

    let ran = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&ran);
    queue.dispatch(move || {
        counter.fetch_add(1, Ordering::Relaxed);
    });

    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(ran.load(Ordering::Relaxed), 0);
    assert_eq!(queue.stats().async_jobs, 0);
}
