//! Strongly-typed identifiers for Rudder entities.
//!
//! All identifiers are:
//! - **Strongly typed**: Prevents mixing up different ID kinds at compile time
//! - **Opaque to the dispatch core**: Domains and executions are registered
//!   elsewhere; this layer only carries and compares them
//!
//! # Example
//!
//! ```rust
//! use rudder_core::id::{DomainId, WorkflowExecution};
//!
//! let domain = DomainId::new("payments").unwrap();
//! let execution = WorkflowExecution::generate("order-workflow");
//!
//! assert_eq!(domain.as_str(), "payments");
//! assert_eq!(execution.workflow_id(), "order-workflow");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::{Error, Result};

/// A unique identifier for a registered domain.
///
/// Domains are the unit of tenant isolation: drain overrides, partitioning
/// gates, and task lists are all scoped to a domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainId(String);

impl DomainId {
    /// Creates a domain ID from a raw string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is empty.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(Error::invalid_id("domain id must not be empty"));
        }
        Ok(Self(id))
    }

    /// Returns the raw string form of the ID.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DomainId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// Identity of a single workflow execution.
///
/// The pair `(workflow_id, run_id)` uniquely names one execution of a
/// workflow. The dispatch core treats both components as opaque; it never
/// parses or interprets them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowExecution {
    workflow_id: String,
    run_id: String,
}

impl WorkflowExecution {
    /// Creates an execution identity from existing components.
    #[must_use]
    pub fn new(workflow_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            run_id: run_id.into(),
        }
    }

    /// Creates an execution identity with a freshly generated run ID.
    ///
    /// Run IDs are ULIDs: lexicographically sortable by creation time and
    /// globally unique without coordination.
    #[must_use]
    pub fn generate(workflow_id: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            run_id: Ulid::new().to_string(),
        }
    }

    /// Returns the workflow identifier.
    #[must_use]
    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    /// Returns the run identifier.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }
}

impl fmt::Display for WorkflowExecution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.workflow_id, self.run_id)
    }
}
