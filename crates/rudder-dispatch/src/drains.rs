//! Cluster-wide zone drain declarations.
//!
//! Operators declare drains against zones for the whole cluster; the
//! zone-state resolver consults this table after per-domain overrides.
//! The table is persisted as the `Zonal` row of the config store, a JSON
//! map of zone name to partition entry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use rudder_core::{ZoneName, ZonePartition};

use crate::error::{Error, Result};
use crate::store::{ConfigEntry, ConfigRowType, ConfigStore};

/// Cluster-wide drain table.
#[async_trait]
pub trait GlobalZoneDrains: Send + Sync {
    /// Fetches every declared drain, keyed by zone.
    ///
    /// # Errors
    ///
    /// Returns an error on persistence or decode failure.
    async fn get_cluster_drains(&self) -> Result<HashMap<ZoneName, ZonePartition>>;

    /// Declares or updates one zone's entry.
    ///
    /// Declaring a drained entry creates or replaces it; declaring a
    /// healthy entry lifts the drain and removes the entry.
    ///
    /// # Errors
    ///
    /// Returns an error on persistence failure. Concurrent operator
    /// updates are serialised by the config store's version check; a lost
    /// race surfaces as [`Error::ConditionFailed`] and may be retried.
    async fn set_cluster_drains(&self, partition: ZonePartition) -> Result<()>;
}

/// Drain table persisted in the config store's `Zonal` row.
pub struct ConfigStoreZoneDrains {
    config_store: Arc<dyn ConfigStore>,
}

impl ConfigStoreZoneDrains {
    /// Creates a drain table over a config store.
    #[must_use]
    pub fn new(config_store: Arc<dyn ConfigStore>) -> Self {
        Self { config_store }
    }

    fn decode(entry: &ConfigEntry) -> Result<HashMap<ZoneName, ZonePartition>> {
        serde_json::from_value(entry.values.clone()).map_err(|e| {
            Error::serialization(format!("failed to decode zonal config row: {e}"))
        })
    }
}

#[async_trait]
impl GlobalZoneDrains for ConfigStoreZoneDrains {
    async fn get_cluster_drains(&self) -> Result<HashMap<ZoneName, ZonePartition>> {
        match self.config_store.fetch_config(ConfigRowType::Zonal).await? {
            Some(entry) => Self::decode(&entry),
            None => Ok(HashMap::new()),
        }
    }

    async fn set_cluster_drains(&self, partition: ZonePartition) -> Result<()> {
        let current = self.config_store.fetch_config(ConfigRowType::Zonal).await?;

        let (mut drains, version) = match &current {
            Some(entry) => (Self::decode(entry)?, entry.version),
            None => (HashMap::new(), 0),
        };

        if partition.is_drained() {
            drains.insert(partition.name.clone(), partition);
        } else {
            // Lifting the drain destroys the entry.
            drains.remove(&partition.name);
        }

        let values = serde_json::to_value(&drains)
            .map_err(|e| Error::serialization(format!("failed to encode zonal config row: {e}")))?;

        self.config_store
            .update_config(ConfigEntry {
                row_type: ConfigRowType::Zonal,
                version: version + 1,
                timestamp: Utc::now(),
                values,
            })
            .await
    }
}
