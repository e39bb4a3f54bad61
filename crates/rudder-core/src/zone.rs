//! Zone types for capacity partitioning.
//!
//! A zone is a subdivision of a region: a subset of racks in a datacentre,
//! or a division of traffic that needs logical separation for resilience
//! while still operating within one consistent database.
//!
//! Operators declare drains against zones; the partitioner steers new work
//! away from drained zones until the drain is lifted.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A symbolic zone name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneName(String);

impl ZoneName {
    /// Creates a zone name from a raw string.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the raw string form of the zone name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ZoneName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ZoneName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Drain status of a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneStatus {
    /// Status is unknown or the partition entry is malformed.
    #[default]
    Invalid,
    /// The zone accepts new work.
    Healthy,
    /// An operator has drained the zone; it must not receive new work.
    Drained,
}

impl ZoneStatus {
    /// Returns true if the zone accepts new work.
    #[must_use]
    pub const fn is_healthy(self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// Returns true if the zone is drained.
    #[must_use]
    pub const fn is_drained(self) -> bool {
        matches!(self, Self::Drained)
    }
}

/// A zone together with its drain status.
///
/// Lifecycle: created when an operator declares a drain, mutated only by
/// operator action, destroyed when the drain is lifted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZonePartition {
    /// The zone this entry describes.
    pub name: ZoneName,
    /// Current drain status.
    pub status: ZoneStatus,
}

impl ZonePartition {
    /// Creates a healthy partition entry for a zone.
    #[must_use]
    pub fn healthy(name: ZoneName) -> Self {
        Self {
            name,
            status: ZoneStatus::Healthy,
        }
    }

    /// Creates a drained partition entry for a zone.
    #[must_use]
    pub fn drained(name: ZoneName) -> Self {
        Self {
            name,
            status: ZoneStatus::Drained,
        }
    }

    /// Returns true if this entry reports the zone drained.
    #[must_use]
    pub const fn is_drained(&self) -> bool {
        self.status.is_drained()
    }
}
