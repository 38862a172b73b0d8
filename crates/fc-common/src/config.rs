//! Configuration structures for the flight stack.
//!
//! Supports TOML deserialization with sensible defaults for bench runs and
//! explicit values for deployment.

use crate::error::{FcError, FcResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level flight-stack configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FcConfig {
    /// Wake cadence of the clock driver thread (the simulated timer
    /// interrupt). Overflow-callback granularity is bounded by this.
    #[serde(with = "humantime_serde")]
    pub timer_period: Duration,

    /// Dispatch queue resource hints.
    pub queue: QueueConfig,

    /// Simulated task periods.
    pub tasks: TaskConfig,
}

impl Default for FcConfig {
    fn default() -> Self {
        Self {
            timer_period: Duration::from_millis(1),
            queue: QueueConfig::default(),
            tasks: TaskConfig::default(),
        }
    }
}

/// Resource hints for a dispatch queue's worker thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Worker stack size in bytes.
    pub stack_size: usize,

    /// Optional SCHED_FIFO priority (1-99) applied best-effort to the
    /// worker; `None` inherits the spawning thread's scheduling.
    pub realtime_priority: Option<u8>,

    /// How many wake retries teardown attempts before declaring the worker
    /// stuck.
    pub shutdown_retries: u32,

    /// Pause between teardown wake retries.
    #[serde(with = "humantime_serde")]
    pub shutdown_retry_interval: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            stack_size: 256 * 1024,
            realtime_priority: None,
            shutdown_retries: 500,
            shutdown_retry_interval: Duration::from_millis(2),
        }
    }
}

/// Periods for the simulated sensor and consumer tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    /// IMU sample/publish period.
    #[serde(with = "humantime_serde")]
    pub imu_period: Duration,

    /// RC-input publish period (one SBUS-style frame).
    #[serde(with = "humantime_serde")]
    pub rc_period: Duration,

    /// Estimator poll period.
    #[serde(with = "humantime_serde")]
    pub estimator_period: Duration,

    /// Status LED blink period.
    #[serde(with = "humantime_serde")]
    pub led_period: Duration,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            imu_period: Duration::from_millis(1),
            rc_period: Duration::from_millis(9),
            estimator_period: Duration::from_millis(2),
            led_period: Duration::from_millis(500),
        }
    }
}

impl FcConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> FcResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| FcError::Io(format!("{}: {e}", path.as_ref().display())))?;
        let config: Self =
            toml::from_str(&raw).map_err(|e| FcError::Config(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate invariants the type system cannot express.
    pub fn validate(&self) -> FcResult<()> {
        if self.timer_period.is_zero() {
            return Err(FcError::Config("timer_period must be non-zero".into()));
        }
        for (name, period) in [
            ("imu_period", self.tasks.imu_period),
            ("rc_period", self.tasks.rc_period),
            ("estimator_period", self.tasks.estimator_period),
            ("led_period", self.tasks.led_period),
        ] {
            if period.is_zero() {
                return Err(FcError::Config(format!("{name} must be non-zero")));
            }
        }
        if let Some(priority) = self.queue.realtime_priority {
            if priority == 0 || priority > 99 {
                return Err(FcError::Config(format!(
                    "realtime_priority must be in 1..=99, got {priority}"
                )));
            }
        }
        if self.queue.shutdown_retries == 0 {
            return Err(FcError::Config("shutdown_retries must be non-zero".into()));
        }
        Ok(())
    }
}
