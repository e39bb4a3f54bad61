//! The task writer: serialised, batched appends under the range lease.
//!
//! One dedicated writer loop owns each task list. Callers on arbitrary
//! tasks communicate with the loop exclusively through a bounded admission
//! queue and per-request response channels; the loop is the only allocator
//! of task IDs, which makes allocation lock-free.
//!
//! ## Design Principles
//!
//! - **Single-writer discipline**: exactly one consumer of the admission
//!   queue; no ID allocation outside that consumer
//! - **Bounded admission**: a full queue fails the append immediately
//!   instead of buffering without limit
//! - **Watermark after durability**: `max_read_level` is published with
//!   release semantics only after a successful commit, and only moves
//!   forward
//! - **Shutdown without closing the queue**: the stop signal is a separate
//!   channel; closing the admission queue would race with concurrent
//!   senders

use std::sync::atomic::{AtomicI64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};

use rudder_core::WorkflowExecution;

use crate::config::TaskListConfig;
use crate::error::{Error, Result};
use crate::lease::{IdBlockAllocator, LeaseManager};
use crate::metrics::DispatchMetrics;
use crate::store::{CommitRecord, ConfigStore, TaskInfo, TaskListState, TaskRecord, TaskStore};
use crate::task_list::TaskListId;

/// Lifecycle of a task writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WriterState {
    /// Constructed but not started.
    Fresh = 0,
    /// The writer loop is serving appends.
    Running = 1,
    /// Stop was requested; the loop is draining.
    Stopping = 2,
    /// The loop has exited.
    Stopped = 3,
}

impl WriterState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Running,
            2 => Self::Stopping,
            3 => Self::Stopped,
            _ => Self::Fresh,
        }
    }
}

/// One pending append awaiting commit.
struct AppendRequest {
    execution: WorkflowExecution,
    info: TaskInfo,
    response: oneshot::Sender<Result<CommitRecord>>,
}

/// State shared between the handle and the writer loop.
struct Shared {
    task_list: TaskListId,
    config: TaskListConfig,
    state: AtomicU8,
    max_read_level: AtomicI64,
    stop_tx: watch::Sender<bool>,
    fatal_tx: watch::Sender<bool>,
    metrics: DispatchMetrics,
}

impl Shared {
    fn state(&self) -> WriterState {
        WriterState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Requests a stop. Returns true if this call performed the
    /// `Running -> Stopping` transition; the compare-and-swap makes stop
    /// idempotent and the signal single-shot.
    fn request_stop(&self) -> bool {
        let swapped = self
            .state
            .compare_exchange(
                WriterState::Running as u8,
                WriterState::Stopping as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if swapped {
            // send_replace updates the value even when no receiver is
            // subscribed yet; a plain send would drop the signal.
            self.stop_tx.send_replace(true);
        }
        swapped
    }
}

/// Pieces consumed by `start` and moved into the writer loop.
struct StartupParts {
    append_rx: mpsc::Receiver<AppendRequest>,
    task_store: Arc<dyn TaskStore>,
    lease: LeaseManager,
}

/// Writes tasks sequentially to the task store under the range lease.
///
/// ## Example
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use rudder_core::{DomainId, WorkflowExecution};
/// use rudder_dispatch::config::TaskListConfig;
/// use rudder_dispatch::error::Result;
/// use rudder_dispatch::metrics::DispatchMetrics;
/// use rudder_dispatch::store::memory::InMemoryMatchingStore;
/// use rudder_dispatch::store::TaskInfo;
/// use rudder_dispatch::task_list::{TaskListId, TaskListKind};
/// use rudder_dispatch::writer::TaskWriter;
///
/// # async fn demo() -> Result<()> {
/// let store = Arc::new(InMemoryMatchingStore::new());
/// let task_list = TaskListId::new(
///     DomainId::new("payments").unwrap(),
///     "transfer-queue",
///     TaskListKind::Activity,
/// )?;
///
/// let writer = TaskWriter::new(
///     task_list,
///     TaskListConfig::default(),
///     store.clone(),
///     store,
///     DispatchMetrics::new(),
/// );
/// writer.start().await?;
///
/// let execution = WorkflowExecution::generate("order-workflow");
/// let commit = writer
///     .append(execution, TaskInfo::new(&b"payload"[..]))
///     .await?;
/// assert!(commit.last_task_id >= 1);
///
/// writer.stop();
/// # Ok(())
/// # }
/// ```
pub struct TaskWriter {
    shared: Arc<Shared>,
    append_tx: mpsc::Sender<AppendRequest>,
    startup: Mutex<Option<StartupParts>>,
}

impl TaskWriter {
    /// Creates a writer for one task list. Call [`TaskWriter::start`]
    /// before appending.
    #[must_use]
    pub fn new(
        task_list: TaskListId,
        config: TaskListConfig,
        task_store: Arc<dyn TaskStore>,
        config_store: Arc<dyn ConfigStore>,
        metrics: DispatchMetrics,
    ) -> Self {
        let (append_tx, append_rx) = mpsc::channel(config.outstanding_appends_threshold.max(1));
        let (stop_tx, _) = watch::channel(false);
        let (fatal_tx, _) = watch::channel(false);

        let lease = LeaseManager::new(
            task_list.clone(),
            config_store,
            config.range_size,
            config.persistence_retry.clone(),
            metrics.clone(),
        );

        Self {
            shared: Arc::new(Shared {
                task_list,
                config,
                state: AtomicU8::new(WriterState::Fresh as u8),
                max_read_level: AtomicI64::new(0),
                stop_tx,
                fatal_tx,
                metrics,
            }),
            append_tx,
            startup: Mutex::new(Some(StartupParts {
                append_rx,
                task_store,
                lease,
            })),
        }
    }

    /// Acquires the initial lease, initialises the ID block and watermark,
    /// and launches the writer loop.
    ///
    /// Returns the renewed lease state; the caller seeds its ack tracking
    /// from `ack_level`.
    ///
    /// # Errors
    ///
    /// Returns the lease error if the initial renewal fails; the writer is
    /// left fresh and `start` may be retried.
    pub async fn start(&self) -> Result<TaskListState> {
        let mut parts = self
            .startup
            .lock()
            .map_err(|_| Error::internal("writer startup lock poisoned"))?
            .take()
            .ok_or_else(|| Error::internal("task writer already started"))?;

        // Grab the range before launching the loop; it seeds the watermark.
        let state = match parts.lease.renew().await {
            Ok(state) => state,
            Err(err) => {
                if let Ok(mut slot) = self.startup.lock() {
                    *slot = Some(parts);
                }
                return Err(err);
            }
        };

        let block = parts.lease.current_block();
        self.shared
            .max_read_level
            .store(block.start - 1, Ordering::Release);
        self.shared
            .metrics
            .set_max_read_level(&self.shared.task_list.to_string(), block.start - 1);

        self.shared
            .state
            .compare_exchange(
                WriterState::Fresh as u8,
                WriterState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|_| Error::internal("task writer already started"))?;

        let writer_loop = WriterLoop {
            shared: Arc::clone(&self.shared),
            rx: parts.append_rx,
            task_store: parts.task_store,
            allocator: IdBlockAllocator::new(parts.lease, block),
        };
        tokio::spawn(writer_loop.run());

        Ok(state)
    }

    /// Signals the writer loop to stop. Idempotent.
    ///
    /// Requests already picked up by the loop are served before exit;
    /// requests still in the admission queue are abandoned and their
    /// callers unblock with [`Error::Shutdown`].
    pub fn stop(&self) {
        if self.shared.request_stop() {
            tracing::info!(task_list = %self.shared.task_list, "task writer stopping");
        }
    }

    /// Returns the writer's lifecycle state.
    #[must_use]
    pub fn state(&self) -> WriterState {
        self.shared.state()
    }

    /// Latest published read watermark.
    ///
    /// Every task with `task_id <= max_read_level()` has been durably
    /// committed and is safe for readers to observe.
    #[must_use]
    pub fn max_read_level(&self) -> i64 {
        self.shared.max_read_level.load(Ordering::Acquire)
    }

    /// Returns a receiver that observes `true` when the writer hits a
    /// fatal lease failure. The surrounding task-list manager subscribes
    /// to this and tears the task list down.
    #[must_use]
    pub fn fatal_signal(&self) -> watch::Receiver<bool> {
        self.shared.fatal_tx.subscribe()
    }

    /// Enqueues one task and waits until it is part of a committed batch.
    ///
    /// Cancellation-safe: dropping the returned future abandons the
    /// response channel; a commit already in flight is not rolled back, so
    /// the task may be persisted even though the caller gave up. Wrap in
    /// [`tokio::time::timeout`] to bound the wait.
    ///
    /// # Errors
    ///
    /// - [`Error::Shutdown`] if the writer is stopping or stopped
    /// - [`Error::Overloaded`] if the admission queue is full (no blocking
    ///   beyond admission)
    /// - The commit error shared by the whole batch on persistence failure
    pub async fn append(
        &self,
        execution: WorkflowExecution,
        info: TaskInfo,
    ) -> Result<CommitRecord> {
        if self.shared.state() != WriterState::Running {
            self.shared.metrics.record_append("shutdown");
            return Err(Error::Shutdown);
        }

        let (response_tx, response_rx) = oneshot::channel();
        let request = AppendRequest {
            execution,
            info,
            response: response_tx,
        };

        if let Err(err) = self.append_tx.try_send(request) {
            return match err {
                TrySendError::Full(_) => {
                    self.shared.metrics.record_append("overloaded");
                    Err(Error::Overloaded {
                        capacity: self.shared.config.outstanding_appends_threshold,
                    })
                }
                TrySendError::Closed(_) => {
                    self.shared.metrics.record_append("shutdown");
                    Err(Error::Shutdown)
                }
            };
        }

        let mut stop_rx = self.shared.stop_tx.subscribe();
        let outcome = tokio::select! {
            biased;
            response = response_rx => match response {
                Ok(result) => result,
                // The loop exited without serving this request.
                Err(_) => Err(Error::Shutdown),
            },
            _ = stop_rx.wait_for(|stopped| *stopped) => Err(Error::Shutdown),
        };

        match &outcome {
            Ok(_) => self.shared.metrics.record_append("committed"),
            Err(Error::Shutdown) => self.shared.metrics.record_append("shutdown"),
            Err(_) => self.shared.metrics.record_append("failed"),
        }
        outcome
    }
}

/// The dedicated loop that owns ID allocation and commits for one task
/// list.
struct WriterLoop {
    shared: Arc<Shared>,
    rx: mpsc::Receiver<AppendRequest>,
    task_store: Arc<dyn TaskStore>,
    allocator: IdBlockAllocator,
}

impl WriterLoop {
    async fn run(mut self) {
        let mut stop_rx = self.shared.stop_tx.subscribe();

        loop {
            tokio::select! {
                biased;
                // The admission queue is deliberately left open on stop;
                // closing it would race with concurrent senders.
                _ = async {
                    while !*stop_rx.borrow() {
                        if stop_rx.changed().await.is_err() {
                            break;
                        }
                    }
                } => break,
                maybe_request = self.rx.recv() => {
                    let Some(first) = maybe_request else { break };
                    let batch = self.fill_batch(first);
                    if self.process_batch(batch).await {
                        break;
                    }
                }
            }
        }

        self.shared
            .state
            .store(WriterState::Stopped as u8, Ordering::Release);
        tracing::debug!(task_list = %self.shared.task_list, "task writer loop exited");
    }

    /// Greedily drains further requests without blocking. Batch size is in
    /// `[1, max_task_batch_size]`.
    fn fill_batch(&mut self, first: AppendRequest) -> Vec<AppendRequest> {
        let mut batch = vec![first];
        while batch.len() < self.shared.config.max_task_batch_size {
            match self.rx.try_recv() {
                Ok(request) => batch.push(request),
                Err(_) => break,
            }
        }
        batch
    }

    /// Allocates IDs, commits the batch, publishes the watermark, and fans
    /// the shared outcome to every request. Returns true if the loop must
    /// exit (fatal lease failure).
    async fn process_batch(&mut self, batch: Vec<AppendRequest>) -> bool {
        let size = batch.len();
        self.shared.metrics.observe_batch_size(size);

        let task_ids = match self.allocator.alloc_task_ids(size).await {
            Ok(ids) => ids,
            Err(err) => {
                // The lease could not be renewed; fatal to this task list.
                tracing::error!(
                    task_list = %self.shared.task_list,
                    error = %err,
                    "task id allocation failed",
                );
                Self::fan_out(batch, Err(err));
                self.signal_fatal();
                return true;
            }
        };

        let first_task_id = task_ids[0];
        let last_task_id = task_ids[size - 1];

        let records: Vec<TaskRecord> = batch
            .iter()
            .zip(&task_ids)
            .map(|(request, &task_id)| TaskRecord {
                task_id,
                execution: request.execution.clone(),
                info: request.info.clone(),
            })
            .collect();

        let commit_started = Instant::now();
        let result = self
            .task_store
            .create_tasks(&self.shared.task_list, self.allocator.range_id(), records)
            .await;
        self.shared
            .metrics
            .observe_commit_duration(commit_started.elapsed());

        match result {
            Ok(commit) => {
                // Publish the watermark only after the durable commit; IDs
                // strictly increase, so this only moves forward.
                self.shared
                    .max_read_level
                    .store(last_task_id, Ordering::Release);
                self.shared
                    .metrics
                    .set_max_read_level(&self.shared.task_list.to_string(), last_task_id);
                self.shared.metrics.record_commit("success");

                Self::fan_out(batch, Ok(commit));
                false
            }
            Err(err) => {
                let err = self.handle_commit_error(err, first_task_id, last_task_id);
                let fatal = matches!(err, Error::LeaseLost { .. });
                Self::fan_out(batch, Err(err));
                if fatal {
                    self.signal_fatal();
                }
                fatal
            }
        }
    }

    /// Centralised tagging for commit errors: counts the failure, logs the
    /// burned ID range, and converts a failed lease condition into
    /// [`Error::LeaseLost`].
    ///
    /// IDs consumed by a failed batch are never reused; retrying the same
    /// IDs would risk duplicates once readers have observed the range.
    fn handle_commit_error(&self, err: Error, first_task_id: i64, last_task_id: i64) -> Error {
        self.shared.metrics.record_commit("failure");
        tracing::error!(
            task_list = %self.shared.task_list,
            first_task_id,
            last_task_id,
            error = %err,
            "persistent store operation failure",
        );

        match err {
            Error::ConditionFailed { expected, actual } => Error::LeaseLost {
                message: format!("commit observed range_id {actual}, writer holds {expected}"),
            },
            other => other,
        }
    }

    /// Delivers one shared outcome to every request in the batch.
    fn fan_out(batch: Vec<AppendRequest>, outcome: Result<CommitRecord>) {
        for request in batch {
            // Callers that timed out dropped their receiver; the guarded
            // send discards those results.
            let _ = request.response.send(outcome.clone());
        }
    }

    /// Transitions to stopping and wakes the task-list manager.
    fn signal_fatal(&self) {
        self.shared.request_stop();
        self.shared.fatal_tx.send_replace(true);
    }
}
