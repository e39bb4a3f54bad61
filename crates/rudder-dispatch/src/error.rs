//! Error types for the task-dispatch domain.
//!
//! Errors are cloneable: a failed commit produces one outcome that is fanned
//! out to every request in the batch, so the same error value must be
//! deliverable to multiple waiting callers. Underlying causes are folded
//! into the message at construction time.

/// The result type used throughout `rudder-dispatch`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in dispatch operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The task list is stopping or stopped; the operation was refused.
    #[error("task list is shutting down")]
    Shutdown,

    /// The admission queue is full; the caller should back off or shed.
    #[error("too many outstanding appends to the task list (capacity {capacity})")]
    Overloaded {
        /// Capacity of the admission queue that was saturated.
        capacity: usize,
    },

    /// The writer no longer holds the range lease. Fatal to the task list.
    #[error("task list lease lost: {message}")]
    LeaseLost {
        /// Description of how the loss was detected.
        message: String,
    },

    /// A conditional store operation observed a different `range_id` than
    /// the one the writer holds.
    #[error("store condition failed: expected range_id {expected}, found {actual}")]
    ConditionFailed {
        /// The range ID the writer believed it held.
        expected: i64,
        /// The range ID the store actually contained.
        actual: i64,
    },

    /// A persistence operation failed.
    #[error("persistence error: {message}")]
    Persistence {
        /// Description of the failure, including any underlying cause.
        message: String,
        /// Whether the backend classifies this fault as retryable.
        transient: bool,
    },

    /// The partition hint could not be decoded or lacked required fields.
    #[error("invalid partition hint: {message}")]
    InvalidHint {
        /// Description of the decode failure.
        message: String,
    },

    /// No healthy zone is available to place work in.
    #[error("no healthy zone available for domain {domain}")]
    NoCapacity {
        /// The domain that could not be placed.
        domain: String,
    },

    /// The ID-block allocator observed state inconsistent with single
    /// ownership. This should never occur under the lease protocol.
    #[error(
        "task id block allocation out of sync: prev block end {prev_block_end}, \
         current block [{current_start}, {current_end}]"
    )]
    InvalidAllocation {
        /// End of the block the allocator just exhausted.
        prev_block_end: i64,
        /// Start of the block derived from the locally cached range ID.
        current_start: i64,
        /// End of the block derived from the locally cached range ID.
        current_end: i64,
    },

    /// A domain lookup failed.
    #[error("domain not found: {key}")]
    DomainNotFound {
        /// The name or ID that was looked up.
        key: String,
    },

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure.
        message: String,
    },

    /// An internal error occurred that should not happen in normal operation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl Error {
    /// Creates a transient persistence error.
    #[must_use]
    pub fn persistence_transient(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
            transient: true,
        }
    }

    /// Creates a permanent persistence error.
    #[must_use]
    pub fn persistence_permanent(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
            transient: false,
        }
    }

    /// Creates an invalid-hint error.
    #[must_use]
    pub fn invalid_hint(message: impl Into<String>) -> Self {
        Self::InvalidHint {
            message: message.into(),
        }
    }

    /// Creates a serialization error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if the backend classifies this error as retryable.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Persistence {
                transient: true,
                ..
            }
        )
    }

    /// Returns true if this error is fatal to the owning task list.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::LeaseLost { .. } | Self::ConditionFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shutdown_display() {
        assert_eq!(Error::Shutdown.to_string(), "task list is shutting down");
    }

    #[test]
    fn overloaded_carries_capacity() {
        let err = Error::Overloaded { capacity: 250 };
        assert!(err.to_string().contains("250"));
    }

    #[test]
    fn transient_predicate() {
        assert!(Error::persistence_transient("timeout").is_transient());
        assert!(!Error::persistence_permanent("corrupt row").is_transient());
        assert!(!Error::Shutdown.is_transient());
    }

    #[test]
    fn fatal_predicate() {
        assert!(Error::LeaseLost {
            message: "range_id advanced".into()
        }
        .is_fatal());
        assert!(Error::ConditionFailed {
            expected: 3,
            actual: 4
        }
        .is_fatal());
        assert!(!Error::persistence_transient("timeout").is_fatal());
    }

    #[test]
    fn errors_are_cloneable_for_batch_fanout() {
        let err = Error::ConditionFailed {
            expected: 1,
            actual: 2,
        };
        let copies = vec![err.clone(), err.clone(), err];
        assert_eq!(copies.len(), 3);
    }
}
