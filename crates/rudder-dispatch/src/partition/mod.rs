//! Zone partitioning for newly arriving work.
//!
//! This module provides:
//!
//! - [`Partitioner`]: Trait for deciding which zone should own new work
//! - [`DefaultPartitioner`]: Hint-driven implementation over the
//!   [`ZoneStateResolver`]
//! - [`hint`]: The default partition-hint schema
//!
//! ## Design Principles
//!
//! - **Healthy path is a passthrough**: work stays in its declared start
//!   zone unless that zone is drained
//! - **Deterministic fallback**: for a fixed healthy set and run ID the
//!   alternate pick is stable across processes — `FarmHash-32(run_id)`
//!   modulo the healthy count, bit-exact with existing deployments
//! - **No stickiness**: when the healthy set changes, selection may change

pub mod hint;
pub mod resolver;

use std::sync::Arc;

use async_trait::async_trait;

use rudder_core::{DomainId, ZoneName, ZonePartition};

use crate::error::{Error, Result};
use crate::metrics::DispatchMetrics;

pub use hint::{DefaultPartitionHint, PartitionHint};
pub use resolver::{
    DefaultZoneStateResolver, ZonalConfig, ZonalPartitioningPredicate, ZoneStateResolver,
};

/// Decides the target zone for newly arriving work.
#[async_trait]
pub trait Partitioner: Send + Sync {
    /// Returns the zone that should own work described by `hint`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidHint`] if the hint cannot be decoded
    /// - [`Error::NoCapacity`] if every zone is drained
    /// - Resolution errors from the underlying zone state
    async fn get_task_zone(&self, domain_id: &DomainId, hint: &PartitionHint) -> Result<ZoneName>;

    /// Returns true if `zone` is drained for the domain named `domain`.
    ///
    /// # Errors
    ///
    /// Returns resolution errors from the underlying zone state.
    async fn is_drained(&self, domain: &str, zone: &ZoneName) -> Result<bool>;

    /// Returns true if `zone` is drained for the domain with ID
    /// `domain_id`.
    ///
    /// # Errors
    ///
    /// Returns resolution errors from the underlying zone state.
    async fn is_drained_by_domain_id(&self, domain_id: &DomainId, zone: &ZoneName)
        -> Result<bool>;
}

/// Default hint-driven partitioner.
pub struct DefaultPartitioner {
    drain_state: Arc<dyn ZoneStateResolver>,
    metrics: DispatchMetrics,
}

impl DefaultPartitioner {
    /// Creates a partitioner over a zone-state resolver.
    #[must_use]
    pub fn new(drain_state: Arc<dyn ZoneStateResolver>, metrics: DispatchMetrics) -> Self {
        Self {
            drain_state,
            metrics,
        }
    }
}

#[async_trait]
impl Partitioner for DefaultPartitioner {
    async fn get_task_zone(&self, domain_id: &DomainId, hint: &PartitionHint) -> Result<ZoneName> {
        let decoded = DefaultPartitionHint::decode(hint)?;

        let drained = self
            .is_drained_by_domain_id(domain_id, &decoded.wf_start_zone)
            .await?;
        if !drained {
            return Ok(decoded.wf_start_zone);
        }

        let zones = self.drain_state.list_all(domain_id).await?;
        let picked = pick_zone_after_drain(&zones, &decoded, domain_id)?;
        self.metrics.record_drain_reroute(domain_id.as_str());
        tracing::info!(
            domain_id = %domain_id,
            start_zone = %decoded.wf_start_zone,
            picked_zone = %picked,
            "start zone drained, work rerouted",
        );
        Ok(picked)
    }

    async fn is_drained(&self, domain: &str, zone: &ZoneName) -> Result<bool> {
        let state = self.drain_state.get(domain, zone).await?;
        Ok(state.is_drained())
    }

    async fn is_drained_by_domain_id(
        &self,
        domain_id: &DomainId,
        zone: &ZoneName,
    ) -> Result<bool> {
        let state = self.drain_state.get_by_domain_id(domain_id, zone).await?;
        Ok(state.is_drained())
    }
}

/// Deterministically picks a healthy zone for work whose start zone is
/// drained.
///
/// The healthy list keeps the order of `zones` (the resolver's frozen
/// configuration order); the pick is `FarmHash-32(run_id)` modulo the
/// healthy count, stable across processes for a fixed healthy set.
///
/// # Errors
///
/// Returns [`Error::NoCapacity`] when no zone is healthy.
fn pick_zone_after_drain(
    zones: &[ZonePartition],
    hint: &DefaultPartitionHint,
    domain_id: &DomainId,
) -> Result<ZoneName> {
    let healthy: Vec<&ZoneName> = zones
        .iter()
        .filter(|zone| zone.status.is_healthy())
        .map(|zone| &zone.name)
        .collect();

    if healthy.is_empty() {
        return Err(Error::NoCapacity {
            domain: domain_id.to_string(),
        });
    }

    if hint.run_id.is_empty() {
        // Still deterministic, but every run lands on the same slot.
        tracing::warn!(
            domain_id = %domain_id,
            "partition hint has no run id; fallback selection is degenerate",
        );
    }

    let hash = farmhash::hash32(hint.run_id.as_bytes());
    #[allow(clippy::cast_possible_truncation)] // u32 fits usize on supported targets
    let index = hash as usize % healthy.len();
    Ok(healthy[index].clone())
}
