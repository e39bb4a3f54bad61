//! # rudder-core
//!
//! Core abstractions for the Rudder workflow dispatch service.
//!
//! This crate provides the foundational types shared across all Rudder
//! components:
//!
//! - **Identifiers**: Strongly-typed IDs for domains and workflow executions
//! - **Zone Types**: Zone names, drain statuses, and zone partitions
//! - **Retry Policy**: Capped exponential backoff for transient faults
//! - **Error Types**: Shared error definitions and result types
//!
//! ## Crate Boundary
//!
//! `rudder-core` is the **only** crate allowed to define shared primitives.
//! Domain logic (task writing, partitioning) lives in `rudder-dispatch` and
//! depends on the contracts defined here.
//!
//! ## Example
//!
//! ```rust
//! use rudder_core::prelude::*;
//!
//! let domain = DomainId::new("payments").unwrap();
//! let execution = WorkflowExecution::generate("order-workflow");
//! assert!(!execution.run_id().is_empty());
//! # let _ = domain;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod id;
pub mod observability;
pub mod retry;
pub mod zone;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use rudder_core::prelude::*;
///
/// let zone = ZoneName::new("zone-a");
/// assert_eq!(zone.as_str(), "zone-a");
/// ```
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::id::{DomainId, WorkflowExecution};
    pub use crate::retry::RetryPolicy;
    pub use crate::zone::{ZoneName, ZonePartition, ZoneStatus};
}

pub use error::{Error, Result};
pub use id::{DomainId, WorkflowExecution};
pub use retry::RetryPolicy;
pub use zone::{ZoneName, ZonePartition, ZoneStatus};
