//! Task-list identity.
//!
//! A task list is a logical queue of pending work items. Each identity has
//! at most one live owner; ownership is conveyed by the range lease (see
//! [`crate::lease`]).

use std::fmt;

use serde::{Deserialize, Serialize};

use rudder_core::DomainId;

use crate::error::{Error, Result};

/// The kind of work a task list carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskListKind {
    /// Decision tasks drive workflow progress.
    Decision,
    /// Activity tasks execute application code.
    Activity,
}

impl fmt::Display for TaskListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decision => write!(f, "decision"),
            Self::Activity => write!(f, "activity"),
        }
    }
}

/// Unique identity of a task list: `(domain, name, kind)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListId {
    domain_id: DomainId,
    name: String,
    kind: TaskListKind,
}

impl TaskListId {
    /// Creates a task-list identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty.
    pub fn new(domain_id: DomainId, name: impl Into<String>, kind: TaskListKind) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::internal("task list name must not be empty"));
        }
        Ok(Self {
            domain_id,
            name,
            kind,
        })
    }

    /// Returns the owning domain.
    #[must_use]
    pub fn domain_id(&self) -> &DomainId {
        &self.domain_id
    }

    /// Returns the task-list name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the task-list kind.
    #[must_use]
    pub const fn kind(&self) -> TaskListKind {
        self.kind
    }
}

impl fmt::Display for TaskListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.domain_id, self.name, self.kind)
    }
}
