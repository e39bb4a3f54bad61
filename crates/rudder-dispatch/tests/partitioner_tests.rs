//! End-to-end scenarios for zone partitioning.
//!
//! Covers the healthy passthrough, deterministic drain rerouting, the
//! disabled-gate short circuit, and capacity exhaustion.

use std::collections::HashMap;
use std::sync::Arc;

use rudder_core::{DomainId, ZoneName, ZonePartition};
use rudder_dispatch::domain::{DomainInfo, InMemoryDomainCache};
use rudder_dispatch::drains::{ConfigStoreZoneDrains, GlobalZoneDrains};
use rudder_dispatch::error::Error;
use rudder_dispatch::metrics::DispatchMetrics;
use rudder_dispatch::partition::{
    DefaultPartitionHint, DefaultPartitioner, DefaultZoneStateResolver, PartitionHint,
    Partitioner, ZonalConfig,
};
use rudder_dispatch::store::memory::InMemoryMatchingStore;

const ALL_ZONES: [&str; 3] = ["zone-a", "zone-b", "zone-c"];

struct Fixture {
    partitioner: DefaultPartitioner,
    drains: Arc<ConfigStoreZoneDrains>,
    domain_id: DomainId,
}

fn fixture_with(zone_config: HashMap<ZoneName, ZonePartition>, gate_enabled: bool) -> Fixture {
    let domain_id = DomainId::new("d-1").unwrap();

    let cache = Arc::new(InMemoryDomainCache::new());
    cache
        .insert(DomainInfo {
            id: domain_id.clone(),
            name: "payments".to_string(),
            zone_config,
        })
        .unwrap();

    let drains = Arc::new(ConfigStoreZoneDrains::new(Arc::new(
        InMemoryMatchingStore::new(),
    )));

    let config = ZonalConfig::new(ALL_ZONES.iter().map(|z| ZoneName::new(*z)).collect())
        .with_partitioning_gate(Arc::new(move |_| gate_enabled));

    let global_drains: Arc<dyn GlobalZoneDrains> = Arc::clone(&drains) as Arc<dyn GlobalZoneDrains>;
    let resolver = Arc::new(DefaultZoneStateResolver::new(cache, global_drains, config));

    Fixture {
        partitioner: DefaultPartitioner::new(resolver, DispatchMetrics::new()),
        drains,
        domain_id,
    }
}

fn fixture() -> Fixture {
    fixture_with(HashMap::new(), true)
}

fn hint(start_zone: &str, run_id: &str) -> PartitionHint {
    DefaultPartitionHint::new(ZoneName::new(start_zone), run_id)
        .encode()
        .unwrap()
}

#[tokio::test]
async fn healthy_start_zone_is_returned_unchanged() {
    let f = fixture();

    let zone = f
        .partitioner
        .get_task_zone(&f.domain_id, &hint("zone-b", "r1"))
        .await
        .unwrap();
    assert_eq!(zone, ZoneName::new("zone-b"));
}

#[tokio::test]
async fn drained_start_zone_reroutes_by_hash() {
    let f = fixture();
    f.drains
        .set_cluster_drains(ZonePartition::drained(ZoneName::new("zone-b")))
        .await
        .unwrap();

    // Healthy list keeps configuration order: [zone-a, zone-c].
    let healthy = [ZoneName::new("zone-a"), ZoneName::new("zone-c")];
    let expected = &healthy[farmhash::hash32(b"r1") as usize % healthy.len()];

    let zone = f
        .partitioner
        .get_task_zone(&f.domain_id, &hint("zone-b", "r1"))
        .await
        .unwrap();
    assert_eq!(&zone, expected);
    assert_ne!(zone, ZoneName::new("zone-b"));
}

#[tokio::test]
async fn rerouting_is_stable_across_calls() {
    let f = fixture();
    f.drains
        .set_cluster_drains(ZonePartition::drained(ZoneName::new("zone-b")))
        .await
        .unwrap();

    let first = f
        .partitioner
        .get_task_zone(&f.domain_id, &hint("zone-b", "r1"))
        .await
        .unwrap();
    for _ in 0..5 {
        let again = f
            .partitioner
            .get_task_zone(&f.domain_id, &hint("zone-b", "r1"))
            .await
            .unwrap();
        assert_eq!(again, first);
    }
}

#[tokio::test]
async fn domain_override_reroutes_without_global_drain() {
    let zone = ZoneName::new("zone-b");
    let mut zone_config = HashMap::new();
    zone_config.insert(zone.clone(), ZonePartition::drained(zone.clone()));

    let f = fixture_with(zone_config, true);

    let picked = f
        .partitioner
        .get_task_zone(&f.domain_id, &hint("zone-b", "r1"))
        .await
        .unwrap();
    assert_ne!(picked, zone);
}

#[tokio::test]
async fn disabled_gate_keeps_globally_drained_zone() {
    let f = fixture_with(HashMap::new(), false);
    f.drains
        .set_cluster_drains(ZonePartition::drained(ZoneName::new("zone-b")))
        .await
        .unwrap();

    // The gate short-circuits resolution, so the drain is invisible.
    let zone = f
        .partitioner
        .get_task_zone(&f.domain_id, &hint("zone-b", "r1"))
        .await
        .unwrap();
    assert_eq!(zone, ZoneName::new("zone-b"));

    assert!(!f
        .partitioner
        .is_drained("payments", &ZoneName::new("zone-b"))
        .await
        .unwrap());
}

#[tokio::test]
async fn all_zones_drained_is_no_capacity() {
    let f = fixture();
    for zone in ALL_ZONES {
        f.drains
            .set_cluster_drains(ZonePartition::drained(ZoneName::new(zone)))
            .await
            .unwrap();
    }

    let err = f
        .partitioner
        .get_task_zone(&f.domain_id, &hint("zone-b", "r1"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NoCapacity { .. }));
}

#[tokio::test]
async fn undecodable_hint_is_invalid() {
    let f = fixture();

    let err = f
        .partitioner
        .get_task_zone(&f.domain_id, &PartitionHint::new(&b"{\"run-id\": \"r1\"}"[..]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidHint { .. }));
}

#[tokio::test]
async fn missing_run_id_is_tolerated() {
    let f = fixture();
    f.drains
        .set_cluster_drains(ZonePartition::drained(ZoneName::new("zone-b")))
        .await
        .unwrap();

    let raw = PartitionHint::new(&br#"{"wf-start-zone": "zone-b"}"#[..]);
    let zone = f
        .partitioner
        .get_task_zone(&f.domain_id, &raw)
        .await
        .unwrap();
    assert_ne!(zone, ZoneName::new("zone-b"));
}

#[tokio::test]
async fn drain_predicates_agree_by_name_and_id() {
    let f = fixture();
    f.drains
        .set_cluster_drains(ZonePartition::drained(ZoneName::new("zone-c")))
        .await
        .unwrap();

    let zone = ZoneName::new("zone-c");
    assert!(f.partitioner.is_drained("payments", &zone).await.unwrap());
    assert!(f
        .partitioner
        .is_drained_by_domain_id(&f.domain_id, &zone)
        .await
        .unwrap());

    let healthy = ZoneName::new("zone-a");
    assert!(!f.partitioner.is_drained("payments", &healthy).await.unwrap());
}

#[tokio::test]
async fn unknown_domain_is_an_error() {
    let f = fixture();

    let err = f
        .partitioner
        .get_task_zone(&DomainId::new("ghost").unwrap(), &hint("zone-b", "r1"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DomainNotFound { .. }));
}
