//! Bus message definitions.
//!
//! One struct per topic; producers fill these in with calibrated values and
//! publish, consumers poll. Timestamps are clock ticks (microseconds) taken
//! from the shared [`crate::clock::Clock`] at sample time.

use serde::{Deserialize, Serialize};
use static_assertions::assert_impl_all;

/// Number of RC channels carried per frame.
pub const RC_CHANNEL_COUNT: usize = 16;

/// Raw accelerometer sample, body frame, m/s².
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AccelSample {
    /// Sample time in clock ticks.
    pub timestamp: u64,
    /// Die temperature in °C.
    pub temperature: f32,
    /// X axis.
    pub x: f32,
    /// Y axis.
    pub y: f32,
    /// Z axis.
    pub z: f32,
}

/// Raw gyroscope sample, body frame, rad/s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GyroSample {
    /// Sample time in clock ticks.
    pub timestamp: u64,
    /// Die temperature in °C.
    pub temperature: f32,
    /// X axis.
    pub x: f32,
    /// Y axis.
    pub y: f32,
    /// Z axis.
    pub z: f32,
}

/// Raw magnetometer sample, body frame, gauss.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MagSample {
    /// Sample time in clock ticks.
    pub timestamp: u64,
    /// Die temperature in °C.
    pub temperature: f32,
    /// X axis.
    pub x: f32,
    /// Y axis.
    pub y: f32,
    /// Z axis.
    pub z: f32,
}

/// One decoded RC-receiver frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RcInput {
    /// Frame time in clock ticks.
    pub timestamp: u64,
    /// Raw channel values.
    pub channels: [u16; RC_CHANNEL_COUNT],
    /// Frames the receiver reported lost since boot.
    pub lost_frame_count: u16,
    /// Receiver entered failsafe.
    pub failsafe: bool,
    /// Link to the transmitter is lost.
    pub rc_lost: bool,
}

/// Estimated vehicle attitude, Euler angles in radians.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AttitudeEstimate {
    /// Estimate time in clock ticks.
    pub timestamp: u64,
    /// Roll angle.
    pub roll: f32,
    /// Pitch angle.
    pub pitch: f32,
    /// Yaw angle.
    pub yaw: f32,
}

// The topic bus hands these across thread boundaries by value.
assert_impl_all!(AccelSample: Send, Sync, Copy);
assert_impl_all!(GyroSample: Send, Sync, Copy);
assert_impl_all!(MagSample: Send, Sync, Copy);
assert_impl_all!(RcInput: Send, Sync, Copy);
assert_impl_all!(AttitudeEstimate: Send, Sync, Copy);
