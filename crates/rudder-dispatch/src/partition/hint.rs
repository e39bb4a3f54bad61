//! Partition hint encoding.
//!
//! A partition hint is an opaque byte string supplied by the caller to
//! guide zone selection. It is passed blindly to the partitioner of choice
//! and never persisted by the dispatch core.
//!
//! The default schema is a JSON object with two recognised keys:
//! `wf-start-zone` (required) and `run-id` (optional). Unknown keys are
//! tolerated and ignored; they do not survive a decode/encode round trip.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use rudder_core::ZoneName;

use crate::error::{Error, Result};

/// Opaque partition hint bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionHint(Bytes);

impl PartitionHint {
    /// Wraps raw hint bytes.
    #[must_use]
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Returns the raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// The default partition hint schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultPartitionHint {
    /// Zone the workflow started in. Required.
    #[serde(rename = "wf-start-zone")]
    pub wf_start_zone: ZoneName,

    /// Run identifier used for deterministic fallback selection. Optional;
    /// when absent every run hashes to the same slot.
    #[serde(rename = "run-id", default)]
    pub run_id: String,
}

impl DefaultPartitionHint {
    /// Creates a hint for a start zone and run.
    #[must_use]
    pub fn new(wf_start_zone: ZoneName, run_id: impl Into<String>) -> Self {
        Self {
            wf_start_zone,
            run_id: run_id.into(),
        }
    }

    /// Decodes a hint from its opaque form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHint`] if the bytes are not a JSON object or
    /// `wf-start-zone` is missing.
    pub fn decode(hint: &PartitionHint) -> Result<Self> {
        serde_json::from_slice(hint.as_bytes())
            .map_err(|e| Error::invalid_hint(format!("failed to decode partition hint: {e}")))
    }

    /// Encodes this hint to its opaque form.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode(&self) -> Result<PartitionHint> {
        let bytes = serde_json::to_vec(self)
            .map_err(|e| Error::serialization(format!("failed to encode partition hint: {e}")))?;
        Ok(PartitionHint::new(bytes))
    }
}
