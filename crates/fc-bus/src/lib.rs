//! Typed single-slot publish/subscribe bus.
//!
//! Each message type gets one topic holding only the latest value. Writers
//! overwrite, readers poll; nothing is queued and a slow reader only ever
//! costs itself data, never backpressure on the writer. Freshness is
//! tracked per subscriber through the publication timestamp.

pub mod bus;
pub mod topic;

pub use bus::{BusMessage, TopicBus};
pub use topic::{Publisher, Stamped, Subscriber};
