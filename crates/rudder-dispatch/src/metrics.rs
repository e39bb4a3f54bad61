//! Observability metrics for the task-dispatch core.
//!
//! Metrics are exposed via the `metrics` crate facade and are designed to
//! support:
//!
//! - **Alerting**: SLO-based alerts on append failures and lease loss
//! - **Dashboards**: Real-time visibility into writer health and batching
//! - **Debugging**: Correlating watermark movement with commit outcomes
//!
//! ## Metrics Exported
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `rudder_dispatch_appends_total` | Counter | `result` | Append outcomes |
//! | `rudder_dispatch_batch_size` | Histogram | - | Tasks per commit batch |
//! | `rudder_dispatch_commits_total` | Counter | `result` | Batch commit outcomes |
//! | `rudder_dispatch_commit_duration_seconds` | Histogram | - | Commit latency |
//! | `rudder_dispatch_lease_requests_total` | Counter | - | Lease renewal attempts |
//! | `rudder_dispatch_lease_failures_total` | Counter | - | Exhausted renewals |
//! | `rudder_dispatch_max_read_level` | Gauge | `task_list` | Published read watermark |
//! | `rudder_dispatch_drain_reroutes_total` | Counter | `domain` | Tasks steered off a drained zone |
//!
//! ## Integration
//!
//! To export to Prometheus:
//!
//! ```rust,ignore
//! use metrics_exporter_prometheus::PrometheusBuilder;
//!
//! PrometheusBuilder::new()
//!     .with_http_listener(([0, 0, 0, 0], 9090))
//!     .install()
//!     .expect("failed to install Prometheus recorder");
//! ```

use std::time::Duration;

use metrics::{counter, gauge, histogram};

/// Metric names as constants for consistency.
pub mod names {
    /// Counter: Append outcomes by result.
    pub const APPENDS_TOTAL: &str = "rudder_dispatch_appends_total";
    /// Histogram: Tasks per commit batch.
    pub const BATCH_SIZE: &str = "rudder_dispatch_batch_size";
    /// Counter: Batch commit outcomes by result.
    pub const COMMITS_TOTAL: &str = "rudder_dispatch_commits_total";
    /// Histogram: Commit latency in seconds.
    pub const COMMIT_DURATION_SECONDS: &str = "rudder_dispatch_commit_duration_seconds";
    /// Counter: Lease renewal attempts.
    pub const LEASE_REQUESTS_TOTAL: &str = "rudder_dispatch_lease_requests_total";
    /// Counter: Lease renewals that exhausted their retry budget.
    pub const LEASE_FAILURES_TOTAL: &str = "rudder_dispatch_lease_failures_total";
    /// Gauge: Published read watermark per task list.
    pub const MAX_READ_LEVEL: &str = "rudder_dispatch_max_read_level";
    /// Counter: Tasks steered away from a drained zone.
    pub const DRAIN_REROUTES_TOTAL: &str = "rudder_dispatch_drain_reroutes_total";
}

/// Label keys used across metrics.
pub mod labels {
    /// Outcome of an operation (committed, failed, overloaded, shutdown).
    pub const RESULT: &str = "result";
    /// Task-list identity.
    pub const TASK_LIST: &str = "task_list";
    /// Domain identity.
    pub const DOMAIN: &str = "domain";
}

/// High-level interface for recording dispatch metrics.
///
/// Cheap to clone and share across tasks.
#[derive(Debug, Clone, Default)]
pub struct DispatchMetrics {
    _private: (),
}

impl DispatchMetrics {
    /// Creates a new metrics recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an append outcome.
    pub fn record_append(&self, result: &str) {
        counter!(
            names::APPENDS_TOTAL,
            labels::RESULT => result.to_string(),
        )
        .increment(1);
    }

    /// Records the size of a commit batch.
    #[allow(clippy::cast_precision_loss)] // Batch sizes are small
    pub fn observe_batch_size(&self, size: usize) {
        histogram!(names::BATCH_SIZE).record(size as f64);
    }

    /// Records a batch commit outcome.
    pub fn record_commit(&self, result: &str) {
        counter!(
            names::COMMITS_TOTAL,
            labels::RESULT => result.to_string(),
        )
        .increment(1);
    }

    /// Records commit latency.
    pub fn observe_commit_duration(&self, duration: Duration) {
        histogram!(names::COMMIT_DURATION_SECONDS).record(duration.as_secs_f64());
    }

    /// Records a lease renewal attempt.
    pub fn record_lease_request(&self) {
        counter!(names::LEASE_REQUESTS_TOTAL).increment(1);
    }

    /// Records a lease renewal that exhausted its retry budget.
    pub fn record_lease_failure(&self) {
        counter!(names::LEASE_FAILURES_TOTAL).increment(1);
    }

    /// Publishes the read watermark for a task list.
    #[allow(clippy::cast_precision_loss)] // Watermarks fit in f64 mantissa in practice
    pub fn set_max_read_level(&self, task_list: &str, level: i64) {
        gauge!(
            names::MAX_READ_LEVEL,
            labels::TASK_LIST => task_list.to_string(),
        )
        .set(level as f64);
    }

    /// Records a task steered away from a drained zone.
    pub fn record_drain_reroute(&self, domain: &str) {
        counter!(
            names::DRAIN_REROUTES_TOTAL,
            labels::DOMAIN => domain.to_string(),
        )
        .increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_a_recorder_does_not_panic() {
        let metrics = DispatchMetrics::new();

        metrics.record_append("committed");
        metrics.observe_batch_size(3);
        metrics.record_commit("failure");
        metrics.observe_commit_duration(Duration::from_millis(12));
        metrics.record_lease_request();
        metrics.record_lease_failure();
        metrics.set_max_read_level("payments/q/activity", 42);
        metrics.record_drain_reroute("payments");
    }
}
