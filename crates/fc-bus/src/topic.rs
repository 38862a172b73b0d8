//! Single-value topic slots and their publisher/subscriber handles.

use fc_common::clock::Clock;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A message together with the clock tick at which it was published.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Stamped<T> {
    /// The published value.
    pub value: T,
    /// Publication time in clock ticks.
    pub timestamp: u64,
}

/// Shared storage for one topic: the latest value, nothing older.
#[derive(Debug)]
pub(crate) struct Slot<T> {
    current: Mutex<Stamped<T>>,
}

impl<T: Default> Slot<T> {
    pub(crate) fn new() -> Self {
        Self {
            current: Mutex::new(Stamped::default()),
        }
    }
}

impl<T> Slot<T> {
    /// Critical sections here are a copy in or out, so a poisoned lock
    /// still guards a fully written value.
    fn lock(&self) -> MutexGuard<'_, Stamped<T>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Write handle for one topic. Cheap to clone; concurrent publishers
/// serialize on the slot and last-write-wins.
#[derive(Debug)]
pub struct Publisher<T> {
    clock: Arc<Clock>,
    slot: Arc<Slot<T>>,
}

impl<T> Publisher<T> {
    pub(crate) fn new(clock: Arc<Clock>, slot: Arc<Slot<T>>) -> Self {
        Self { clock, slot }
    }

    /// Overwrite the topic with `value`, stamped with the current tick.
    pub fn publish(&self, value: T) {
        let timestamp = self.clock.now();
        let mut current = self.slot.lock();
        *current = Stamped { value, timestamp };
    }
}

impl<T> Clone for Publisher<T> {
    fn clone(&self) -> Self {
        Self {
            clock: Arc::clone(&self.clock),
            slot: Arc::clone(&self.slot),
        }
    }
}

/// Read handle for one topic, with its own freshness cursor.
///
/// Subscribers are independent: one consuming a value does not mark it seen
/// for any other. Before the first publish, [`Subscriber::get`] yields the
/// message type's default at timestamp zero; a real publish at tick zero is
/// indistinguishable from that default, so drivers start their clocks
/// before their publishers.
#[derive(Debug)]
pub struct Subscriber<T> {
    slot: Arc<Slot<T>>,
    last_seen: u64,
}

impl<T: Clone> Subscriber<T> {
    pub(crate) fn new(slot: Arc<Slot<T>>) -> Self {
        Self { slot, last_seen: 0 }
    }

    /// Whether the topic holds a value newer than this subscriber's last
    /// [`get`](Subscriber::get).
    pub fn updated(&self) -> bool {
        self.slot.lock().timestamp > self.last_seen
    }

    /// Read the latest value and advance the freshness cursor to its
    /// timestamp. Reading never consumes the value for anyone else.
    pub fn get(&mut self) -> Stamped<T> {
        let current = self.slot.lock().clone();
        self.last_seen = current.timestamp;
        current
    }

    /// Timestamp of the last value this subscriber [`get`](Subscriber::get).
    pub fn last_seen(&self) -> u64 {
        self.last_seen
    }
}
