//! Read-only domain metadata lookup.
//!
//! Domain registration and caching live outside the dispatch core; this
//! module defines the lookup contract the partitioner consumes, plus an
//! in-memory implementation for testing.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use rudder_core::{DomainId, ZoneName, ZonePartition};

use crate::error::{Error, Result};

/// Domain metadata exposed to the dispatch core.
#[derive(Debug, Clone)]
pub struct DomainInfo {
    /// Domain identifier.
    pub id: DomainId,
    /// Human-readable domain name.
    pub name: String,
    /// Per-domain drain overrides keyed by zone.
    pub zone_config: HashMap<ZoneName, ZonePartition>,
}

/// Read-only lookup of registered domains.
///
/// ## Thread Safety
///
/// All methods are `Send + Sync`; the cache is consulted concurrently from
/// partition decisions.
#[async_trait]
pub trait DomainCache: Send + Sync {
    /// Looks a domain up by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DomainNotFound`] if the domain is not registered.
    async fn get_domain(&self, name: &str) -> Result<DomainInfo>;

    /// Looks a domain up by ID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DomainNotFound`] if the domain is not registered.
    async fn get_domain_by_id(&self, id: &DomainId) -> Result<DomainInfo>;
}

/// In-memory domain cache for testing.
#[derive(Debug, Default)]
pub struct InMemoryDomainCache {
    by_name: RwLock<HashMap<String, DomainInfo>>,
}

/// Converts a lock poison error to an internal error.
fn poison_err<T>(_: PoisonError<T>) -> Error {
    Error::internal("domain cache lock poisoned")
}

impl InMemoryDomainCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a domain.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn insert(&self, info: DomainInfo) -> Result<()> {
        let mut by_name = self.by_name.write().map_err(poison_err)?;
        by_name.insert(info.name.clone(), info);
        Ok(())
    }
}

#[async_trait]
impl DomainCache for InMemoryDomainCache {
    async fn get_domain(&self, name: &str) -> Result<DomainInfo> {
        let by_name = self.by_name.read().map_err(poison_err)?;
        by_name
            .get(name)
            .cloned()
            .ok_or_else(|| Error::DomainNotFound {
                key: name.to_string(),
            })
    }

    async fn get_domain_by_id(&self, id: &DomainId) -> Result<DomainInfo> {
        let by_name = self.by_name.read().map_err(poison_err)?;
        by_name
            .values()
            .find(|info| &info.id == id)
            .cloned()
            .ok_or_else(|| Error::DomainNotFound {
                key: id.to_string(),
            })
    }
}
