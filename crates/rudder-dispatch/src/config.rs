//! Configuration surface for the task-dispatch core.

use rudder_core::RetryPolicy;

/// Default number of task IDs granted per lease renewal.
pub const DEFAULT_RANGE_SIZE: i64 = 100_000;

/// Default capacity of the append admission queue.
pub const DEFAULT_OUTSTANDING_APPENDS_THRESHOLD: usize = 250;

/// Default upper bound on tasks committed per batch.
pub const DEFAULT_MAX_TASK_BATCH_SIZE: usize = 100;

/// Tunables for one task list's writer.
///
/// ## Backpressure
///
/// `outstanding_appends_threshold` bounds the admission queue. Appends
/// against a full queue fail immediately with
/// [`Error::Overloaded`](crate::error::Error::Overloaded) rather than
/// blocking; an unbounded queue would collapse latency under overload.
#[derive(Debug, Clone)]
pub struct TaskListConfig {
    /// Number of task IDs granted per lease renewal.
    pub range_size: i64,
    /// Capacity of the append admission queue.
    pub outstanding_appends_threshold: usize,
    /// Upper bound on tasks committed per batch.
    pub max_task_batch_size: usize,
    /// Retry policy for transient persistence faults during lease renewal.
    pub persistence_retry: RetryPolicy,
}

impl Default for TaskListConfig {
    fn default() -> Self {
        Self {
            range_size: DEFAULT_RANGE_SIZE,
            outstanding_appends_threshold: DEFAULT_OUTSTANDING_APPENDS_THRESHOLD,
            max_task_batch_size: DEFAULT_MAX_TASK_BATCH_SIZE,
            persistence_retry: RetryPolicy::default(),
        }
    }
}

impl TaskListConfig {
    /// Creates a config with default tunables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of task IDs granted per lease renewal.
    #[must_use]
    pub const fn with_range_size(mut self, range_size: i64) -> Self {
        self.range_size = range_size;
        self
    }

    /// Sets the admission queue capacity.
    #[must_use]
    pub const fn with_outstanding_appends_threshold(mut self, threshold: usize) -> Self {
        self.outstanding_appends_threshold = threshold;
        self
    }

    /// Sets the upper bound on tasks committed per batch.
    #[must_use]
    pub const fn with_max_task_batch_size(mut self, batch_size: usize) -> Self {
        self.max_task_batch_size = batch_size;
        self
    }

    /// Sets the retry policy for transient persistence faults.
    #[must_use]
    pub fn with_persistence_retry(mut self, policy: RetryPolicy) -> Self {
        self.persistence_retry = policy;
        self
    }
}
