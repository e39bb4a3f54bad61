//! # rudder-dispatch
//!
//! The task-dispatch core of the Rudder workflow orchestration service.
//!
//! This crate implements two cooperating subsystems:
//!
//! - **Task Writer**: accepts append requests for a task list, allocates
//!   monotonically increasing task IDs from a leased block, batches
//!   concurrent requests, commits them atomically, and publishes the read
//!   watermark
//! - **Partitioner**: decides which logical zone should own newly arriving
//!   work by consulting per-domain and cluster-wide drain state
//!
//! The subsystems are independent; a deployment may use either or both.
//!
//! ## Guarantees
//!
//! - **Monotonic IDs**: task IDs strictly increase in commit order within a
//!   task list; the lease protocol ensures they never repeat, even across
//!   owner changes
//! - **Safe visibility**: once `max_read_level` is published, every task at
//!   or below it is durably committed
//! - **Bounded admission**: overload fails fast instead of buffering
//! - **Deterministic routing**: zone fallback for drained capacity is a
//!   pure function of the healthy set and the run ID
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use rudder_core::{DomainId, WorkflowExecution};
//! use rudder_dispatch::config::TaskListConfig;
//! use rudder_dispatch::error::Result;
//! use rudder_dispatch::metrics::DispatchMetrics;
//! use rudder_dispatch::store::memory::InMemoryMatchingStore;
//! use rudder_dispatch::store::TaskInfo;
//! use rudder_dispatch::task_list::{TaskListId, TaskListKind};
//! use rudder_dispatch::writer::TaskWriter;
//!
//! # async fn demo() -> Result<()> {
//! let store = Arc::new(InMemoryMatchingStore::new());
//! let task_list = TaskListId::new(
//!     DomainId::new("payments").unwrap(),
//!     "transfer-queue",
//!     TaskListKind::Activity,
//! )?;
//!
//! let writer = TaskWriter::new(
//!     task_list,
//!     TaskListConfig::default(),
//!     store.clone(),
//!     store,
//!     DispatchMetrics::new(),
//! );
//! let state = writer.start().await?;
//! assert_eq!(state.range_id, 1);
//!
//! let commit = writer
//!     .append(
//!         WorkflowExecution::generate("order-workflow"),
//!         TaskInfo::new(&b"payload"[..]),
//!     )
//!     .await?;
//! assert_eq!(commit.first_task_id, 1);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod domain;
pub mod drains;
pub mod error;
pub mod lease;
pub mod metrics;
pub mod partition;
pub mod store;
pub mod task_list;
pub mod writer;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::TaskListConfig;
    pub use crate::domain::{DomainCache, DomainInfo};
    pub use crate::drains::{ConfigStoreZoneDrains, GlobalZoneDrains};
    pub use crate::error::{Error, Result};
    pub use crate::lease::{IdBlockAllocator, LeaseManager, TaskIdBlock};
    pub use crate::metrics::DispatchMetrics;
    pub use crate::partition::{
        DefaultPartitionHint, DefaultPartitioner, DefaultZoneStateResolver, PartitionHint,
        Partitioner, ZonalConfig, ZoneStateResolver,
    };
    pub use crate::store::{
        CommitRecord, ConfigStore, TaskInfo, TaskListState, TaskRecord, TaskStore,
    };
    pub use crate::task_list::{TaskListId, TaskListKind};
    pub use crate::writer::{TaskWriter, WriterState};
}
