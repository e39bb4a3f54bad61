//! Property-based tests for dispatch invariants.
//!
//! These tests use proptest to verify invariants hold across randomly
//! generated inputs: ID-block arithmetic, writer monotonicity, watermark
//! movement, deterministic zone fallback, and drained-wins resolution.

use std::collections::HashMap;
use std::sync::Arc;

use proptest::prelude::*;
use tokio_test::block_on;

use rudder_core::{DomainId, WorkflowExecution, ZoneName, ZonePartition};
use rudder_dispatch::config::TaskListConfig;
use rudder_dispatch::domain::{DomainInfo, InMemoryDomainCache};
use rudder_dispatch::drains::{ConfigStoreZoneDrains, GlobalZoneDrains};
use rudder_dispatch::lease::TaskIdBlock;
use rudder_dispatch::metrics::DispatchMetrics;
use rudder_dispatch::partition::{
    DefaultPartitionHint, DefaultPartitioner, DefaultZoneStateResolver, Partitioner, ZonalConfig,
    ZoneStateResolver,
};
use rudder_dispatch::store::memory::InMemoryMatchingStore;
use rudder_dispatch::store::TaskInfo;
use rudder_dispatch::task_list::{TaskListId, TaskListKind};
use rudder_dispatch::writer::TaskWriter;

fn zone_names(count: usize) -> Vec<ZoneName> {
    (0..count)
        .map(|i| ZoneName::new(format!("zone-{i}")))
        .collect()
}

/// Builds a partitioner fixture over the given zones with the given drains.
fn partition_fixture(
    all_zones: Vec<ZoneName>,
    domain_drained: &[ZoneName],
    globally_drained: &[ZoneName],
    gate_enabled: bool,
) -> (DefaultPartitioner, Arc<DefaultZoneStateResolver>, DomainId) {
    let domain_id = DomainId::new("d-prop").unwrap();

    let mut zone_config = HashMap::new();
    for zone in domain_drained {
        zone_config.insert(zone.clone(), ZonePartition::drained(zone.clone()));
    }

    let cache = Arc::new(InMemoryDomainCache::new());
    cache
        .insert(DomainInfo {
            id: domain_id.clone(),
            name: "prop-domain".to_string(),
            zone_config,
        })
        .unwrap();

    let drains = Arc::new(ConfigStoreZoneDrains::new(Arc::new(
        InMemoryMatchingStore::new(),
    )));
    block_on(async {
        for zone in globally_drained {
            drains
                .set_cluster_drains(ZonePartition::drained(zone.clone()))
                .await
                .unwrap();
        }
    });

    let config = ZonalConfig::new(all_zones)
        .with_partitioning_gate(Arc::new(move |_| gate_enabled));

    let global_drains: Arc<dyn GlobalZoneDrains> = drains;
    let resolver = Arc::new(DefaultZoneStateResolver::new(cache, global_drains, config));
    let drain_state: Arc<dyn ZoneStateResolver> = Arc::clone(&resolver) as Arc<dyn ZoneStateResolver>;
    (
        DefaultPartitioner::new(drain_state, DispatchMetrics::new()),
        resolver,
        domain_id,
    )
}

proptest! {
    /// Blocks derived from successive range IDs are contiguous,
    /// non-overlapping, exactly `range_size` wide, and strictly ordered.
    #[test]
    fn id_blocks_partition_the_id_space(range_size in 1i64..10_000) {
        let mut prev_end = 0i64;
        for range_id in 1..200 {
            let block = TaskIdBlock::for_range_id(range_id, range_size);
            prop_assert_eq!(block.start, prev_end + 1);
            prop_assert_eq!(block.end - block.start + 1, range_size);
            prev_end = block.end;
        }
    }

    /// For a fixed healthy set and run ID, the fallback pick equals
    /// `healthy[farmhash32(run_id) % healthy.len()]`.
    #[test]
    fn fallback_pick_matches_farmhash_formula(
        zone_count in 2usize..6,
        drained_index in 0usize..6,
        run_id in "[a-z0-9]{0,12}",
    ) {
        let drained_index = drained_index % zone_count;
        let all_zones = zone_names(zone_count);
        let drained = all_zones[drained_index].clone();

        let (partitioner, _, domain_id) =
            partition_fixture(all_zones.clone(), &[], &[drained.clone()], true);

        let healthy: Vec<ZoneName> = all_zones
            .iter()
            .filter(|z| **z != drained)
            .cloned()
            .collect();
        let expected =
            healthy[farmhash::hash32(run_id.as_bytes()) as usize % healthy.len()].clone();

        let hint = DefaultPartitionHint::new(drained, run_id.clone())
            .encode()
            .unwrap();
        let picked = block_on(partitioner.get_task_zone(&domain_id, &hint)).unwrap();
        prop_assert_eq!(picked, expected);
    }

    /// A zone drained at any consulted layer resolves drained; with the
    /// gate disabled every zone resolves healthy.
    #[test]
    fn resolver_reports_drained_if_any_layer_drains(
        domain_mask in prop::collection::vec(any::<bool>(), 5),
        global_mask in prop::collection::vec(any::<bool>(), 5),
        gate_enabled in any::<bool>(),
    ) {
        let all_zones = zone_names(5);

        let domain_drained: Vec<ZoneName> = all_zones
            .iter()
            .zip(&domain_mask)
            .filter_map(|(z, &d)| d.then(|| z.clone()))
            .collect();
        let globally_drained: Vec<ZoneName> = all_zones
            .iter()
            .zip(&global_mask)
            .filter_map(|(z, &d)| d.then(|| z.clone()))
            .collect();

        let (_, resolver, domain_id) = partition_fixture(
            all_zones.clone(),
            &domain_drained,
            &globally_drained,
            gate_enabled,
        );

        let resolved = block_on(resolver.list_all(&domain_id)).unwrap();
        prop_assert_eq!(resolved.len(), all_zones.len());

        for (i, partition) in resolved.iter().enumerate() {
            let expected = gate_enabled && (domain_mask[i] || global_mask[i]);
            prop_assert_eq!(
                partition.is_drained(),
                expected,
                "zone {} resolved {:?}",
                i,
                partition.status
            );
        }
    }

    /// Task IDs strictly increase in commit order, the watermark never
    /// regresses, and it never runs ahead of the last committed task.
    #[test]
    fn writer_ids_increase_and_watermark_tracks_commits(
        appends in 1usize..25,
        range_size in 1i64..5,
    ) {
        block_on(async {
            let store = Arc::new(InMemoryMatchingStore::new());
            let task_list = TaskListId::new(
                DomainId::new("prop").unwrap(),
                "prop-queue",
                TaskListKind::Decision,
            )
            .unwrap();

            let writer = TaskWriter::new(
                task_list.clone(),
                TaskListConfig::default().with_range_size(range_size),
                store.clone(),
                store.clone(),
                DispatchMetrics::new(),
            );
            writer.start().await.unwrap();

            let mut committed = Vec::new();
            let mut last_watermark = writer.max_read_level();
            assert_eq!(last_watermark, 0);

            for _ in 0..appends {
                let commit = writer
                    .append(
                        WorkflowExecution::generate("prop-wf"),
                        TaskInfo::new(&b"p"[..]),
                    )
                    .await
                    .unwrap();
                committed.push(commit.last_task_id);

                let watermark = writer.max_read_level();
                assert!(watermark >= last_watermark, "watermark regressed");
                assert!(
                    watermark <= *committed.last().unwrap(),
                    "watermark ran ahead of committed tasks"
                );
                last_watermark = watermark;
            }

            assert!(
                committed.windows(2).all(|w| w[0] < w[1]),
                "task ids not strictly increasing: {committed:?}"
            );
            assert_eq!(store.task_ids(&task_list).unwrap(), committed);

            writer.stop();
        });
    }
}
