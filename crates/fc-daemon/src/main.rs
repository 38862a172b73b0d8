//! Flight controller daemon entry point.
//!
//! Wires the monotonic clock, the topic bus, and the dispatch queues into a
//! running pipeline of simulated sensor and estimator tasks, with signal
//! handling for clean teardown.

mod signals;
mod tasks;

use anyhow::{Context, Result};
use clap::Parser;
use fc_bus::TopicBus;
use fc_common::clock::{Clock, ClockDriver};
use fc_common::config::FcConfig;
use fc_sched::DispatchQueue;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::signals::SignalHandler;

/// Flight controller daemon command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "fc-daemon",
    about = "Flight controller runtime - clock, queues, and topic bus",
    version,
    long_about = None
)]
struct Args {
    /// Path to a configuration file (TOML).
    #[arg(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// Run for this many seconds, then shut down (0 = until signalled).
    #[arg(long, short = 'd', default_value = "0")]
    duration: u64,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    info!(version = env!("CARGO_PKG_VERSION"), "starting fc-daemon");

    let config = load_config(&args)?;
    info!(
        timer_period = ?config.timer_period,
        imu_period = ?config.tasks.imu_period,
        "configuration loaded"
    );

    let signal_handler = SignalHandler::new().context("failed to set up signal handlers")?;

    run_daemon(&config, &signal_handler, args.duration)
}

/// Initialize logging with the specified log level.
fn init_logging(level: &str) {
    let filter = format!("fc_daemon={level},fc_sched={level},fc_bus={level},fc_common={level}");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&filter)),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();
}

/// Load configuration from file or use defaults.
///
/// Resolution priority (first existing file wins):
/// 1. Command-line `--config` argument
/// 2. `FC_CONFIG_PATH` environment variable
/// 3. `config/default.toml` (local development)
/// 4. Built-in defaults
fn load_config(args: &Args) -> Result<FcConfig> {
    if let Some(config_path) = &args.config {
        info!(?config_path, "loading config from command-line argument");
        return FcConfig::from_file(config_path)
            .with_context(|| format!("failed to load config from {config_path:?}"));
    }

    if let Ok(env_path) = std::env::var("FC_CONFIG_PATH") {
        let config_path = PathBuf::from(&env_path);
        if config_path.exists() {
            info!(?config_path, "loading config from FC_CONFIG_PATH");
            return FcConfig::from_file(&config_path).with_context(|| {
                format!("failed to load config from FC_CONFIG_PATH={env_path:?}")
            });
        }
        warn!(
            path = %env_path,
            "FC_CONFIG_PATH set but file does not exist, checking other locations"
        );
    }

    let local_path = PathBuf::from("config/default.toml");
    if local_path.exists() {
        info!(?local_path, "loading config from local path");
        return FcConfig::from_file(&local_path)
            .with_context(|| format!("failed to load config from {local_path:?}"));
    }

    info!("no config file found, using built-in defaults");
    Ok(FcConfig::default())
}

/// Bring the pipeline up, run until signalled, tear it down in order.
fn run_daemon(config: &FcConfig, signal_handler: &SignalHandler, max_seconds: u64) -> Result<()> {
    let clock = Clock::new();
    let bus = TopicBus::new(Arc::clone(&clock));

    let sensor_queue = DispatchQueue::new("fc-sensors", Arc::clone(&clock), &config.queue)
        .context("failed to start sensor queue")?;
    let estimator_queue = DispatchQueue::new("fc-estimator", Arc::clone(&clock), &config.queue)
        .context("failed to start estimator queue")?;

    // One callback slot per clock: the estimator queue takes it, the sensor
    // queue rides on its worker's bounded idle wait.
    estimator_queue.attach_timer_wake();

    tasks::register_sensor_tasks(&sensor_queue, &bus, &clock, &config.tasks);
    tasks::register_estimator_tasks(&estimator_queue, &bus, &clock, &config.tasks);

    // One-shot smoke jobs prove both workers are dispatching before the
    // clock starts.
    sensor_queue.dispatch(|| info!("sensor queue online"));
    estimator_queue.dispatch(|| info!("estimator queue online"));

    // The clock starts ticking last, so no task sees time zero as fresh data.
    let mut driver = ClockDriver::start(Arc::clone(&clock), config.timer_period)
        .context("failed to start clock driver")?;

    info!("pipeline running");

    let started = std::time::Instant::now();
    let mut last_status = std::time::Instant::now();
    while !signal_handler.shutdown_requested() {
        if max_seconds > 0 && started.elapsed().as_secs() >= max_seconds {
            info!(seconds = max_seconds, "run duration reached");
            signal_handler.request_shutdown();
            break;
        }
        if last_status.elapsed() >= Duration::from_secs(10) {
            last_status = std::time::Instant::now();
            info!(
                ticks = clock.now(),
                sensors = ?sensor_queue.stats(),
                estimator = ?estimator_queue.stats(),
                "periodic status"
            );
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    // Queues drain before the clock stops, so in-flight jobs still see a
    // live timebase.
    info!("shutting down");
    sensor_queue.shutdown().context("sensor queue teardown")?;
    estimator_queue.shutdown().context("estimator queue teardown")?;
    driver.stop();

    info!(
        ticks = clock.now(),
        overflows = clock.overflow_count(),
        signals = signal_handler.state().signal_count(),
        uptime_secs = started.elapsed().as_secs(),
        "daemon shutdown complete"
    );

    Ok(())
}
