//! Topic registry keyed by message type.

use crate::topic::{Publisher, Slot, Subscriber};
use fc_common::clock::Clock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Marker for types that can travel over the bus.
///
/// Blanket-implemented: any owned, cloneable message with a default works.
/// The default is what subscribers see before the first publish.
pub trait BusMessage: Clone + Default + Send + Sync + 'static {}

impl<T: Clone + Default + Send + Sync + 'static> BusMessage for T {}

/// One topic per message type, created lazily on first use.
///
/// The registry lock covers only handle creation; publishing and polling
/// go straight to the per-topic slot and never contend here.
pub struct TopicBus {
    clock: Arc<Clock>,
    slots: Mutex<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl std::fmt::Debug for TopicBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slots = self.lock_slots();
        f.debug_struct("TopicBus")
            .field("topics", &slots.len())
            .finish_non_exhaustive()
    }
}

impl TopicBus {
    /// Create an empty bus stamping publications from `clock`.
    #[must_use]
    pub fn new(clock: Arc<Clock>) -> Self {
        Self {
            clock,
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn lock_slots(&self) -> MutexGuard<'_, HashMap<TypeId, Arc<dyn Any + Send + Sync>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn slot<T: BusMessage>(&self) -> Arc<Slot<T>> {
        let mut slots = self.lock_slots();
        let entry = slots.entry(TypeId::of::<T>()).or_insert_with(|| {
            debug!(topic = std::any::type_name::<T>(), "topic created");
            Arc::new(Slot::<T>::new()) as Arc<dyn Any + Send + Sync>
        });
        // The map is keyed by TypeId, so the stored slot is always Slot<T>.
        match Arc::clone(entry).downcast::<Slot<T>>() {
            Ok(slot) => slot,
            Err(_) => unreachable!("topic slot type mismatch"),
        }
    }

    /// Write handle for the `T` topic, creating the topic if needed.
    #[must_use]
    pub fn publisher<T: BusMessage>(&self) -> Publisher<T> {
        Publisher::new(Arc::clone(&self.clock), self.slot::<T>())
    }

    /// Read handle for the `T` topic with a fresh cursor, creating the
    /// topic if needed.
    #[must_use]
    pub fn subscriber<T: BusMessage>(&self) -> Subscriber<T> {
        Subscriber::new(self.slot::<T>())
    }
}
