//! Common flight-stack types: the monotonic clock, configuration,
//! the error taxonomy, and bus message definitions.

pub mod clock;
pub mod config;
pub mod error;
pub mod messages;

pub use clock::*;
pub use config::*;
pub use error::*;
pub use messages::*;
