use thiserror::Error;

/// Flight-stack error types covering construction failures, teardown faults,
/// and configuration problems.
///
/// Job execution failures are deliberately absent: a panicking job is handled
/// by the dispatch queue's log-and-continue policy, not surfaced as a value.
#[derive(Debug, Error)]
pub enum FcError {
    /// Configuration or validation error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Thread allocation failed at construction. Fatal; there is no
    /// degraded mode for a queue without a worker.
    #[error("failed to spawn thread {thread:?}: {source}")]
    Spawn {
        /// Name the thread would have carried.
        thread: String,
        /// Underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// The worker did not exit within the bounded wake-retry budget during
    /// teardown. The worker thread is leaked rather than joined blindly.
    #[error("dispatch queue {queue:?} worker did not exit after {waited_ms}ms of wake retries")]
    ShutdownTimeout {
        /// Queue whose worker is stuck.
        queue: String,
        /// Total time spent retrying.
        waited_ms: u64,
    },

    /// The worker thread terminated abnormally instead of observing the
    /// exit flag.
    #[error("dispatch queue {queue:?} worker terminated abnormally")]
    WorkerLost {
        /// Queue whose worker was lost.
        queue: String,
    },

    /// I/O error while loading configuration or similar.
    #[error("I/O error: {0}")]
    Io(String),
}

/// Convenience type alias for flight-stack operations.
pub type FcResult<T> = Result<T, FcError>;
