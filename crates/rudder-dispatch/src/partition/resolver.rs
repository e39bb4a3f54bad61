//! Zone-state resolution.
//!
//! A zone's status for a `(domain, zone)` pair is the merge of three
//! layers, first match wins:
//!
//! 1. **Feature gate** — zonal partitioning disabled for the domain
//!    short-circuits to healthy
//! 2. **Per-domain override** — fires only when the domain's zone config
//!    declares the zone drained; a healthy domain entry does not override
//!    a global drain
//! 3. **Global drain table** — cluster-wide operator declarations
//!
//! Anything else resolves healthy.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use rudder_core::{DomainId, ZoneName, ZonePartition};

use crate::domain::DomainCache;
use crate::drains::GlobalZoneDrains;
use crate::error::Result;

/// Predicate deciding whether zonal partitioning is enabled for a domain.
pub type ZonalPartitioningPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Static configuration for zone resolution.
#[derive(Clone)]
pub struct ZonalConfig {
    /// Every zone the cluster knows about, in frozen configuration order.
    ///
    /// This order determines the order [`ZoneStateResolver::list_all`]
    /// returns, and therefore which alternate zone a given run hashes to
    /// after a drain. Changing it reshuffles fallback placement.
    pub all_zones: Vec<ZoneName>,
    /// Dynamic-config gate, evaluated per domain name.
    pub zonal_partitioning_enabled: ZonalPartitioningPredicate,
}

impl ZonalConfig {
    /// Creates a config with the gate enabled for every domain.
    #[must_use]
    pub fn new(all_zones: Vec<ZoneName>) -> Self {
        Self {
            all_zones,
            zonal_partitioning_enabled: Arc::new(|_| true),
        }
    }

    /// Replaces the partitioning gate.
    #[must_use]
    pub fn with_partitioning_gate(mut self, gate: ZonalPartitioningPredicate) -> Self {
        self.zonal_partitioning_enabled = gate;
        self
    }
}

impl fmt::Debug for ZonalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZonalConfig")
            .field("all_zones", &self.all_zones)
            .finish_non_exhaustive()
    }
}

/// Resolves the drain status of zones with respect to one domain.
#[async_trait]
pub trait ZoneStateResolver: Send + Sync {
    /// Resolves a zone's status for a domain, by domain name.
    ///
    /// # Errors
    ///
    /// Returns an error if the domain lookup or drain fetch fails.
    async fn get(&self, domain: &str, zone: &ZoneName) -> Result<ZonePartition>;

    /// Resolves a zone's status for a domain, by domain ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the domain lookup or drain fetch fails.
    async fn get_by_domain_id(&self, domain_id: &DomainId, zone: &ZoneName)
        -> Result<ZonePartition>;

    /// Resolves every configured zone for a domain, in the frozen
    /// configuration order of [`ZonalConfig::all_zones`].
    ///
    /// # Errors
    ///
    /// Returns an error if any single resolution fails.
    async fn list_all(&self, domain_id: &DomainId) -> Result<Vec<ZonePartition>>;
}

/// Default resolver over the domain cache and the global drain table.
pub struct DefaultZoneStateResolver {
    domain_cache: Arc<dyn DomainCache>,
    global_drains: Arc<dyn GlobalZoneDrains>,
    config: ZonalConfig,
}

impl DefaultZoneStateResolver {
    /// Creates a resolver.
    #[must_use]
    pub fn new(
        domain_cache: Arc<dyn DomainCache>,
        global_drains: Arc<dyn GlobalZoneDrains>,
        config: ZonalConfig,
    ) -> Self {
        Self {
            domain_cache,
            global_drains,
            config,
        }
    }
}

#[async_trait]
impl ZoneStateResolver for DefaultZoneStateResolver {
    async fn get(&self, domain: &str, zone: &ZoneName) -> Result<ZonePartition> {
        if !(self.config.zonal_partitioning_enabled)(domain) {
            return Ok(ZonePartition::healthy(zone.clone()));
        }

        let domain_info = self.domain_cache.get_domain(domain).await?;
        if let Some(entry) = domain_info.zone_config.get(zone) {
            // A domain entry only fires when it declares the zone drained;
            // a healthy entry falls through to the global table.
            if entry.is_drained() {
                return Ok(entry.clone());
            }
        }

        let drains = self.global_drains.get_cluster_drains().await?;
        if let Some(entry) = drains.get(zone) {
            return Ok(entry.clone());
        }

        Ok(ZonePartition::healthy(zone.clone()))
    }

    async fn get_by_domain_id(
        &self,
        domain_id: &DomainId,
        zone: &ZoneName,
    ) -> Result<ZonePartition> {
        let domain_info = self.domain_cache.get_domain_by_id(domain_id).await?;
        self.get(&domain_info.name, zone).await
    }

    async fn list_all(&self, domain_id: &DomainId) -> Result<Vec<ZonePartition>> {
        let mut out = Vec::with_capacity(self.config.all_zones.len());
        for zone in &self.config.all_zones {
            out.push(self.get_by_domain_id(domain_id, zone).await?);
        }
        Ok(out)
    }
}
