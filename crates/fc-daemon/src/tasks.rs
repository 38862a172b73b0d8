//! Periodic flight tasks running on the dispatch queues.
//!
//! Sensors are simulated: the IMU and RC tasks synthesize plausible data so
//! the whole pipeline (publish, poll, estimate) runs on a desktop machine.

use fc_bus::TopicBus;
use fc_common::clock::Clock;
use fc_common::config::TaskConfig;
use fc_common::messages::{AccelSample, AttitudeEstimate, GyroSample, RcInput, RC_CHANNEL_COUNT};
use fc_sched::DispatchQueue;
use std::sync::Arc;
use tracing::{debug, trace};

/// Standard gravity, m/s^2.
const GRAVITY: f32 = 9.806_65;

/// Mid-stick pulse width for the simulated RC receiver.
const RC_MID_PULSE: u16 = 1500;

/// Register the sensor-side interval jobs on the sensor queue.
pub fn register_sensor_tasks(
    queue: &DispatchQueue,
    bus: &TopicBus,
    clock: &Arc<Clock>,
    config: &TaskConfig,
) {
    let accel = bus.publisher::<AccelSample>();
    let gyro = bus.publisher::<GyroSample>();
    let imu_clock = Arc::clone(clock);
    let mut sample_idx = 0u64;
    queue.dispatch_on_interval(
        move || {
            let timestamp = imu_clock.now();
            // Slow oscillation so the estimator has something to track.
            let phase = (sample_idx as f32) * 0.002;
            sample_idx += 1;

            accel.publish(AccelSample {
                timestamp,
                temperature: 35.0,
                x: 0.3 * phase.sin(),
                y: 0.2 * phase.cos(),
                z: -GRAVITY,
            });
            gyro.publish(GyroSample {
                timestamp,
                temperature: 35.0,
                x: 0.01 * phase.cos(),
                y: -0.01 * phase.sin(),
                z: 0.0,
            });
            trace!(timestamp, "imu sample published");
        },
        config.imu_period,
    );

    let rc = bus.publisher::<RcInput>();
    let rc_clock = Arc::clone(clock);
    queue.dispatch_on_interval(
        move || {
            rc.publish(RcInput {
                timestamp: rc_clock.now(),
                channels: [RC_MID_PULSE; RC_CHANNEL_COUNT],
                lost_frame_count: 0,
                failsafe: false,
                rc_lost: false,
            });
        },
        config.rc_period,
    );
}

/// Register the estimator and status jobs on the estimator queue.
pub fn register_estimator_tasks(
    queue: &DispatchQueue,
    bus: &TopicBus,
    clock: &Arc<Clock>,
    config: &TaskConfig,
) {
    let mut accel = bus.subscriber::<AccelSample>();
    let attitude = bus.publisher::<AttitudeEstimate>();
    let est_clock = Arc::clone(clock);
    queue.dispatch_on_interval(
        move || {
            if !accel.updated() {
                return;
            }
            let sample = accel.get().value;
            // Tilt from gravity alone; yaw is unobservable without a mag.
            let roll = sample.y.atan2(-sample.z);
            let pitch = (-sample.x).atan2(sample.y.hypot(sample.z));
            attitude.publish(AttitudeEstimate {
                timestamp: est_clock.now(),
                roll,
                pitch,
                yaw: 0.0,
            });
        },
        config.estimator_period,
    );

    let mut attitude_out = bus.subscriber::<AttitudeEstimate>();
    let mut led_on = false;
    queue.dispatch_on_interval(
        move || {
            led_on = !led_on;
            let latest = attitude_out.get();
            debug!(
                led = led_on,
                roll = latest.value.roll,
                pitch = latest.value.pitch,
                stamped_at = latest.timestamp,
                "status blink"
            );
        },
        config.led_period,
    );
}
