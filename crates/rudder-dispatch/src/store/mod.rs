//! Pluggable persistence for the task-dispatch core.
//!
//! Two abstract stores back a task list:
//!
//! - [`TaskStore`]: the durable, ordered store task batches are committed to
//! - [`ConfigStore`]: the store that arbitrates the range lease and holds
//!   cluster-wide configuration rows
//!
//! ## Design Principles
//!
//! - **CAS semantics**: Commits and lease renewals are conditional on the
//!   `range_id` the writer last observed; a mismatch means another owner
//!   has taken over
//! - **Separation of concerns**: Task persistence is independent of lease
//!   arbitration
//! - **Testability**: In-memory implementation for testing, a real backend
//!   for production

pub mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rudder_core::WorkflowExecution;

use crate::error::{Error, Result};
use crate::task_list::TaskListId;

/// Caller-supplied task payload and metadata.
///
/// The payload is opaque at this layer; producers and consumers agree on
/// its encoding out of band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInfo {
    /// Opaque task payload.
    pub payload: Bytes,
    /// When the task was created by the caller.
    pub created_at: DateTime<Utc>,
}

impl TaskInfo {
    /// Creates task info stamped with the current time.
    #[must_use]
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            created_at: Utc::now(),
        }
    }
}

/// One task as persisted in the task store.
///
/// Task IDs are unique and strictly increasing within a task list; the
/// store rejects duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    /// Task ID allocated from the writer's leased block.
    pub task_id: i64,
    /// The workflow execution this task belongs to.
    pub execution: WorkflowExecution,
    /// Caller-supplied payload and metadata.
    pub info: TaskInfo,
}

/// Result of a successful batch commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    /// Lowest task ID in the committed batch.
    pub first_task_id: i64,
    /// Highest task ID in the committed batch.
    pub last_task_id: i64,
    /// Number of tasks committed.
    pub committed: usize,
}

/// Lease state as persisted per task list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskListState {
    /// Monotonic lease counter; strictly increases across renewals.
    pub range_id: i64,
    /// Highest task ID known fully processed. Passed through opaquely;
    /// this core does not interpret it.
    pub ack_level: i64,
}

/// Row types in the config store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigRowType {
    /// Cluster-wide zone drain declarations.
    Zonal,
}

/// A versioned config-store row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigEntry {
    /// Which row this entry describes.
    pub row_type: ConfigRowType,
    /// Version for compare-and-swap updates; must be exactly one greater
    /// than the stored version (or 1 for the first write).
    pub version: i64,
    /// When the entry was written.
    pub timestamp: DateTime<Utc>,
    /// Row contents, JSON-encoded.
    pub values: serde_json::Value,
}

/// Durable, ordered task persistence.
///
/// ## CAS Semantics
///
/// `create_tasks` is conditional on the writer still holding the lease:
/// implementations compare the supplied `range_id` against the stored one
/// and fail with [`Error::ConditionFailed`] on mismatch. This is what makes
/// a lost lease observable at commit time rather than silently producing
/// duplicate task IDs.
///
/// ## Thread Safety
///
/// All methods are `Send + Sync` to support concurrent access from multiple
/// task-list writers.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Atomically persists a batch of tasks.
    ///
    /// All-or-nothing: either every record is committed or none is.
    /// Duplicate task IDs are rejected.
    ///
    /// # Errors
    ///
    /// - [`Error::ConditionFailed`] if `range_id` no longer matches the
    ///   stored lease
    /// - [`Error::Persistence`] for backend faults, with the backend's
    ///   transient classification
    async fn create_tasks(
        &self,
        task_list: &TaskListId,
        range_id: i64,
        tasks: Vec<TaskRecord>,
    ) -> Result<CommitRecord>;

    /// Classifies an error as retryable for this backend.
    ///
    /// The default treats transient persistence faults as retryable and
    /// everything else as permanent.
    fn is_transient_error(&self, error: &Error) -> bool {
        error.is_transient()
    }
}

/// Lease arbitration and cluster configuration rows.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Conditionally increments the range lease for a task list.
    ///
    /// Succeeds only if the stored `range_id` equals `observed_range_id`;
    /// on success the stored value becomes `observed_range_id + 1` and the
    /// new state is returned.
    ///
    /// # Errors
    ///
    /// - [`Error::ConditionFailed`] if another writer advanced the lease
    /// - [`Error::Persistence`] for backend faults
    async fn renew_lease(
        &self,
        task_list: &TaskListId,
        observed_range_id: i64,
    ) -> Result<TaskListState>;

    /// Fetches a config row, or `None` if it has never been written.
    ///
    /// # Errors
    ///
    /// Returns an error on backend faults.
    async fn fetch_config(&self, row_type: ConfigRowType) -> Result<Option<ConfigEntry>>;

    /// Writes a config row with a compare-and-swap on its version.
    ///
    /// # Errors
    ///
    /// - [`Error::ConditionFailed`] if the entry's version is not exactly
    ///   one greater than the stored version
    /// - [`Error::Persistence`] for backend faults
    async fn update_config(&self, entry: ConfigEntry) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_info_stamps_creation_time() {
        let before = Utc::now();
        let info = TaskInfo::new(Bytes::from_static(b"payload"));
        assert!(info.created_at >= before);
        assert_eq!(info.payload.as_ref(), b"payload");
    }

    #[test]
    fn commit_record_equality() {
        let a = CommitRecord {
            first_task_id: 1,
            last_task_id: 3,
            committed: 3,
        };
        assert_eq!(a.clone(), a);
    }

    #[test]
    fn config_entry_serializes() {
        let entry = ConfigEntry {
            row_type: ConfigRowType::Zonal,
            version: 1,
            timestamp: Utc::now(),
            values: serde_json::json!({"zone-a": {"name": "zone-a", "status": "drained"}}),
        };
        let json = serde_json::to_string(&entry).unwrap();
        let parsed: ConfigEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, entry);
    }
}
