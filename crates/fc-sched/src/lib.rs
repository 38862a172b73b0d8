//! Dispatch queues: serial deferred and periodic work, one worker thread
//! per subsystem.

pub mod dispatch;
pub mod stats;

mod interval;

pub use dispatch::*;
pub use stats::*;
