//! In-memory store implementation for testing and development.
//!
//! [`InMemoryMatchingStore`] implements both [`TaskStore`] and
//! [`ConfigStore`] over one lock, the way a real backend serves both
//! interfaces from one database.
//!
//! ## Limitations
//!
//! - **NOT suitable for production**: No durability, no distribution
//! - **Single-process only**: State is not visible across process boundaries

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use super::{
    CommitRecord, ConfigEntry, ConfigRowType, ConfigStore, TaskListState, TaskRecord, TaskStore,
};
use crate::error::{Error, Result};
use crate::task_list::TaskListId;

/// Per-task-list persisted state.
#[derive(Debug, Default)]
struct ListRow {
    /// Lease counter; 0 means never leased.
    range_id: i64,
    /// Ack level passed through to renewals.
    ack_level: i64,
    /// Committed tasks keyed by task ID.
    tasks: BTreeMap<i64, TaskRecord>,
}

#[derive(Debug, Default)]
struct Inner {
    lists: HashMap<TaskListId, ListRow>,
    config_rows: HashMap<ConfigRowType, ConfigEntry>,
}

/// In-memory matching store for tests.
///
/// ## Example
///
/// ```rust
/// use rudder_dispatch::store::memory::InMemoryMatchingStore;
///
/// let store = InMemoryMatchingStore::new();
/// // Renew leases and commit batches in tests...
/// ```
#[derive(Debug, Default)]
pub struct InMemoryMatchingStore {
    inner: RwLock<Inner>,
}

/// Converts a lock poison error to a persistence error.
fn poison_err<T>(_: PoisonError<T>) -> Error {
    Error::persistence_permanent("matching store lock poisoned")
}

impl InMemoryMatchingStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the committed task IDs for a task list, in commit order.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn task_ids(&self, task_list: &TaskListId) -> Result<Vec<i64>> {
        let inner = self.inner.read().map_err(poison_err)?;
        Ok(inner
            .lists
            .get(task_list)
            .map(|row| row.tasks.keys().copied().collect())
            .unwrap_or_default())
    }

    /// Returns a committed task by ID, if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn task(&self, task_list: &TaskListId, task_id: i64) -> Result<Option<TaskRecord>> {
        let inner = self.inner.read().map_err(poison_err)?;
        Ok(inner
            .lists
            .get(task_list)
            .and_then(|row| row.tasks.get(&task_id).cloned()))
    }

    /// Seeds the ack level a future renewal will report.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn set_ack_level(&self, task_list: &TaskListId, ack_level: i64) -> Result<()> {
        let mut inner = self.inner.write().map_err(poison_err)?;
        inner.lists.entry(task_list.clone()).or_default().ack_level = ack_level;
        Ok(())
    }
}

#[async_trait]
impl TaskStore for InMemoryMatchingStore {
    async fn create_tasks(
        &self,
        task_list: &TaskListId,
        range_id: i64,
        tasks: Vec<TaskRecord>,
    ) -> Result<CommitRecord> {
        if tasks.is_empty() {
            return Err(Error::internal("create_tasks called with an empty batch"));
        }

        let mut inner = self.inner.write().map_err(poison_err)?;
        let row = inner.lists.entry(task_list.clone()).or_default();

        if row.range_id != range_id {
            return Err(Error::ConditionFailed {
                expected: range_id,
                actual: row.range_id,
            });
        }

        // All-or-nothing: validate the whole batch before inserting.
        for task in &tasks {
            if row.tasks.contains_key(&task.task_id) {
                return Err(Error::persistence_permanent(format!(
                    "duplicate task id {} in task list {task_list}",
                    task.task_id
                )));
            }
        }

        let first_task_id = tasks[0].task_id;
        let last_task_id = tasks[tasks.len() - 1].task_id;
        let committed = tasks.len();

        for task in tasks {
            row.tasks.insert(task.task_id, task);
        }

        Ok(CommitRecord {
            first_task_id,
            last_task_id,
            committed,
        })
    }
}

#[async_trait]
impl ConfigStore for InMemoryMatchingStore {
    async fn renew_lease(
        &self,
        task_list: &TaskListId,
        observed_range_id: i64,
    ) -> Result<TaskListState> {
        let mut inner = self.inner.write().map_err(poison_err)?;
        let row = inner.lists.entry(task_list.clone()).or_default();

        if row.range_id != observed_range_id {
            return Err(Error::ConditionFailed {
                expected: observed_range_id,
                actual: row.range_id,
            });
        }

        row.range_id += 1;
        Ok(TaskListState {
            range_id: row.range_id,
            ack_level: row.ack_level,
        })
    }

    async fn fetch_config(&self, row_type: ConfigRowType) -> Result<Option<ConfigEntry>> {
        let inner = self.inner.read().map_err(poison_err)?;
        Ok(inner.config_rows.get(&row_type).cloned())
    }

    async fn update_config(&self, entry: ConfigEntry) -> Result<()> {
        let mut inner = self.inner.write().map_err(poison_err)?;

        let current_version = inner
            .config_rows
            .get(&entry.row_type)
            .map_or(0, |existing| existing.version);
        if entry.version != current_version + 1 {
            return Err(Error::ConditionFailed {
                expected: current_version + 1,
                actual: entry.version,
            });
        }

        inner.config_rows.insert(entry.row_type, entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use chrono::Utc;

    use crate::store::TaskInfo;
    use crate::task_list::TaskListKind;
    use rudder_core::{DomainId, WorkflowExecution};

    fn task_list() -> TaskListId {
        TaskListId::new(
            DomainId::new("payments").unwrap(),
            "transfer-queue",
            TaskListKind::Activity,
        )
        .unwrap()
    }

    fn record(task_id: i64) -> TaskRecord {
        TaskRecord {
            task_id,
            execution: WorkflowExecution::new("wf", "run-1"),
            info: TaskInfo::new(Bytes::from_static(b"payload")),
        }
    }

    #[tokio::test]
    async fn renew_lease_increments_from_zero() {
        let store = InMemoryMatchingStore::new();
        let tl = task_list();

        let state = store.renew_lease(&tl, 0).await.unwrap();
        assert_eq!(state.range_id, 1);

        let state = store.renew_lease(&tl, 1).await.unwrap();
        assert_eq!(state.range_id, 2);
    }

    #[tokio::test]
    async fn renew_lease_rejects_stale_observation() {
        let store = InMemoryMatchingStore::new();
        let tl = task_list();

        store.renew_lease(&tl, 0).await.unwrap();

        let err = store.renew_lease(&tl, 0).await.unwrap_err();
        assert!(matches!(
            err,
            Error::ConditionFailed {
                expected: 0,
                actual: 1
            }
        ));
    }

    #[tokio::test]
    async fn create_tasks_requires_current_range_id() {
        let store = InMemoryMatchingStore::new();
        let tl = task_list();

        store.renew_lease(&tl, 0).await.unwrap();

        let err = store
            .create_tasks(&tl, 0, vec![record(1)])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConditionFailed { .. }));

        let commit = store.create_tasks(&tl, 1, vec![record(1)]).await.unwrap();
        assert_eq!(commit.first_task_id, 1);
        assert_eq!(commit.last_task_id, 1);
    }

    #[tokio::test]
    async fn duplicate_task_ids_rejected_atomically() {
        let store = InMemoryMatchingStore::new();
        let tl = task_list();

        store.renew_lease(&tl, 0).await.unwrap();
        store.create_tasks(&tl, 1, vec![record(1)]).await.unwrap();

        // Batch containing a duplicate is rejected wholesale.
        let err = store
            .create_tasks(&tl, 1, vec![record(2), record(1)])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Persistence { .. }));
        assert_eq!(store.task_ids(&tl).unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn renewal_reports_seeded_ack_level() {
        let store = InMemoryMatchingStore::new();
        let tl = task_list();

        store.set_ack_level(&tl, 17).unwrap();
        let state = store.renew_lease(&tl, 0).await.unwrap();
        assert_eq!(state.ack_level, 17);
    }

    #[tokio::test]
    async fn config_update_is_versioned() {
        let store = InMemoryMatchingStore::new();

        let entry = ConfigEntry {
            row_type: ConfigRowType::Zonal,
            version: 1,
            timestamp: Utc::now(),
            values: serde_json::json!({}),
        };
        store.update_config(entry.clone()).await.unwrap();

        // Re-writing version 1 fails the CAS.
        let err = store.update_config(entry.clone()).await.unwrap_err();
        assert!(matches!(err, Error::ConditionFailed { .. }));

        let next = ConfigEntry {
            version: 2,
            ..entry
        };
        store.update_config(next).await.unwrap();

        let fetched = store.fetch_config(ConfigRowType::Zonal).await.unwrap();
        assert_eq!(fetched.unwrap().version, 2);
    }
}
