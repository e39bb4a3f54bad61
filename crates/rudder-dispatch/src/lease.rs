//! Range lease management and task-ID block allocation.
//!
//! A lease is a monotonically increasing `range_id` persisted in the config
//! store. Holding `range_id = k` grants exclusive authority over the task-ID
//! block `[(k-1)*range_size + 1, k*range_size]`. Blocks are contiguous,
//! non-overlapping, and strictly ordered across renewals; after a renewal
//! the old block is abandoned even if unused, so IDs never repeat.

use std::sync::Arc;

use rudder_core::retry::retry_with_policy;
use rudder_core::RetryPolicy;

use crate::error::{Error, Result};
use crate::metrics::DispatchMetrics;
use crate::store::{ConfigStore, TaskListState};
use crate::task_list::TaskListId;

/// A contiguous interval of task IDs granted by one lease.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskIdBlock {
    /// First ID in the block (inclusive).
    pub start: i64,
    /// Last ID in the block (inclusive).
    pub end: i64,
}

impl TaskIdBlock {
    /// Derives the block granted by `range_id` under a fixed `range_size`.
    ///
    /// Block for `range_id = k` is `[(k-1)*R + 1, k*R]`; the first block
    /// (k = 1) starts at 1.
    #[must_use]
    pub const fn for_range_id(range_id: i64, range_size: i64) -> Self {
        Self {
            start: (range_id - 1) * range_size + 1,
            end: range_id * range_size,
        }
    }

    /// Returns true once every ID in the block has been handed out.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.start > self.end
    }
}

/// Owns the conditional renewal of a task list's range lease.
///
/// The manager caches the last observed `range_id`; renewal is conditional
/// on that observation, so a concurrent owner is detected as
/// [`Error::ConditionFailed`] rather than silently double-allocating IDs.
pub struct LeaseManager {
    task_list: TaskListId,
    config_store: Arc<dyn ConfigStore>,
    retry: RetryPolicy,
    metrics: DispatchMetrics,
    range_id: i64,
    range_size: i64,
}

impl LeaseManager {
    /// Creates a lease manager that has not yet taken a lease.
    #[must_use]
    pub fn new(
        task_list: TaskListId,
        config_store: Arc<dyn ConfigStore>,
        range_size: i64,
        retry: RetryPolicy,
        metrics: DispatchMetrics,
    ) -> Self {
        Self {
            task_list,
            config_store,
            retry,
            metrics,
            range_id: 0,
            range_size,
        }
    }

    /// Returns the last observed `range_id` (0 before the first renewal).
    #[must_use]
    pub const fn range_id(&self) -> i64 {
        self.range_id
    }

    /// Returns the block granted by the current lease.
    #[must_use]
    pub const fn current_block(&self) -> TaskIdBlock {
        TaskIdBlock::for_range_id(self.range_id, self.range_size)
    }

    /// Renews the lease, retrying transient faults under the configured
    /// policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConditionFailed`] if another writer advanced the
    /// lease, or the final persistence error once the retry budget is
    /// exhausted. Either way the caller must treat the task list as lost.
    pub async fn renew(&mut self) -> Result<TaskListState> {
        self.metrics.record_lease_request();

        let task_list = self.task_list.clone();
        let observed = self.range_id;
        let store = Arc::clone(&self.config_store);

        let result = retry_with_policy(
            &self.retry,
            Error::is_transient,
            || {
                let task_list = task_list.clone();
                let store = Arc::clone(&store);
                async move { store.renew_lease(&task_list, observed).await }
            },
        )
        .await;

        match result {
            Ok(state) => {
                self.range_id = state.range_id;
                Ok(state)
            }
            Err(err) => {
                self.metrics.record_lease_failure();
                tracing::error!(
                    task_list = %self.task_list,
                    observed_range_id = observed,
                    error = %err,
                    "lease renewal failed",
                );
                Err(err)
            }
        }
    }
}

/// Allocates strictly increasing task IDs from the leased block, renewing
/// the lease when the block runs out.
///
/// Owned exclusively by the writer loop; single ownership is what makes
/// allocation lock-free.
pub struct IdBlockAllocator {
    lease: LeaseManager,
    block: TaskIdBlock,
}

impl IdBlockAllocator {
    /// Creates an allocator over an initial block.
    #[must_use]
    pub fn new(lease: LeaseManager, block: TaskIdBlock) -> Self {
        Self { lease, block }
    }

    /// Returns the `range_id` backing the current block.
    #[must_use]
    pub const fn range_id(&self) -> i64 {
        self.lease.range_id()
    }

    /// Returns `count` strictly increasing task IDs.
    ///
    /// If the block is exhausted mid-call the lease is renewed and
    /// allocation continues from the new block. Never returns fewer than
    /// `count` IDs.
    ///
    /// # Errors
    ///
    /// Returns the lease error if renewal fails, or
    /// [`Error::InvalidAllocation`] if the locally cached lease no longer
    /// lines up with the exhausted block (concurrent mutation, which must
    /// not occur under single ownership).
    pub async fn alloc_task_ids(&mut self, count: usize) -> Result<Vec<i64>> {
        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            if self.block.is_exhausted() {
                self.block = self.next_block(self.block.end).await?;
            }
            ids.push(self.block.start);
            self.block.start += 1;
        }
        Ok(ids)
    }

    /// Renews the lease and derives the replacement block.
    async fn next_block(&mut self, prev_block_end: i64) -> Result<TaskIdBlock> {
        let current = self.lease.current_block();
        if current.end != prev_block_end {
            return Err(Error::InvalidAllocation {
                prev_block_end,
                current_start: current.start,
                current_end: current.end,
            });
        }
        self.lease.renew().await?;
        Ok(self.lease.current_block())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryMatchingStore;
    use crate::task_list::TaskListKind;
    use rudder_core::DomainId;

    fn task_list() -> TaskListId {
        TaskListId::new(
            DomainId::new("payments").unwrap(),
            "transfer-queue",
            TaskListKind::Activity,
        )
        .unwrap()
    }

    fn manager(store: Arc<InMemoryMatchingStore>, range_size: i64) -> LeaseManager {
        LeaseManager::new(
            task_list(),
            store,
            range_size,
            RetryPolicy::default(),
            DispatchMetrics::new(),
        )
    }

    #[test]
    fn block_arithmetic() {
        assert_eq!(
            TaskIdBlock::for_range_id(1, 100_000),
            TaskIdBlock {
                start: 1,
                end: 100_000
            }
        );
        assert_eq!(
            TaskIdBlock::for_range_id(2, 100_000),
            TaskIdBlock {
                start: 100_001,
                end: 200_000
            }
        );
    }

    #[test]
    fn fresh_block_is_exhausted_at_range_id_zero() {
        // range_id 0 derives the empty block [−R+1, 0].
        let block = TaskIdBlock::for_range_id(0, 10);
        assert!(block.is_exhausted());
    }

    #[tokio::test]
    async fn renew_advances_range_id() {
        let store = Arc::new(InMemoryMatchingStore::new());
        let mut lease = manager(Arc::clone(&store), 10);

        let state = lease.renew().await.unwrap();
        assert_eq!(state.range_id, 1);
        assert_eq!(lease.current_block(), TaskIdBlock { start: 1, end: 10 });

        let state = lease.renew().await.unwrap();
        assert_eq!(state.range_id, 2);
        assert_eq!(lease.current_block(), TaskIdBlock { start: 11, end: 20 });
    }

    #[tokio::test]
    async fn alloc_spans_block_boundary() {
        let store = Arc::new(InMemoryMatchingStore::new());
        let mut lease = manager(Arc::clone(&store), 2);
        lease.renew().await.unwrap();

        let block = lease.current_block();
        let mut allocator = IdBlockAllocator::new(lease, block);

        let ids = allocator.alloc_task_ids(3).await.unwrap();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(allocator.range_id(), 2);
    }

    #[tokio::test]
    async fn alloc_detects_out_of_sync_block() {
        let store = Arc::new(InMemoryMatchingStore::new());
        let mut lease = manager(Arc::clone(&store), 2);
        lease.renew().await.unwrap();

        // Hand the allocator a block that does not match the lease.
        let mut allocator = IdBlockAllocator::new(lease, TaskIdBlock { start: 9, end: 8 });

        let err = allocator.alloc_task_ids(1).await.unwrap_err();
        assert!(matches!(err, Error::InvalidAllocation { .. }));
    }

    #[tokio::test]
    async fn renewal_against_stolen_lease_fails() {
        let store = Arc::new(InMemoryMatchingStore::new());
        let mut lease = manager(Arc::clone(&store), 10);
        lease.renew().await.unwrap();

        // Another writer takes the lease.
        store.renew_lease(&task_list(), 1).await.unwrap();

        let err = lease.renew().await.unwrap_err();
        assert!(matches!(err, Error::ConditionFailed { .. }));
    }
}
