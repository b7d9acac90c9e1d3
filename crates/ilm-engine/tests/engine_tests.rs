//! End-to-end flows through the engine facade

use ilm_engine::{EngineConfig, InspectionEngine};
use ilm_model::connection::link_pair;
use ilm_model::{
    Connection, Element, ElementKind, GateKind, GraphStore, ItemId, LotError, LotId, LotStatus,
    MemoryGraphStore, Role,
};
use ilm_partition::PartitionRule;
use ilm_test_utils::{
    caller, fitting, insert_lot, insert_network_lot, pipe, seeded_store, test_item_id,
    CountingStore,
};
use ilm_validation::{GateConfig, GateOutcome};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn engine(store: Arc<dyn GraphStore>) -> InspectionEngine {
    InspectionEngine::new(EngineConfig::default(), store).unwrap()
}

/// Unassigned closed network `a1 - af - a2` on level L1
fn seed_network(store: &MemoryGraphStore) {
    store.insert_element(pipe("a1").with_level("L1"));
    store.insert_element(fitting("af").with_level("L1"));
    store.insert_element(pipe("a2").with_level("L1"));
    store.insert_connections(link_pair("a1", 0, "af", 0));
    store.insert_connections(link_pair("af", 1, "a2", 0));
}

/// Second closed network in its own lot, ids distinct from the fixtures
fn insert_second_network_lot(store: &MemoryGraphStore, status: LotStatus) -> LotId {
    let lot_id = insert_lot(store, status, vec![pipe("b1"), fitting("bf"), pipe("b2")]);
    store.insert_connections(link_pair("b1", 0, "bf", 0));
    store.insert_connections(link_pair("bf", 1, "b2", 0));
    lot_id
}

#[tokio::test]
async fn test_partition_then_full_lifecycle() {
    let store = seeded_store();
    seed_network(&store);
    let engine = engine(store.clone());
    let item = test_item_id();

    let report = engine
        .partition()
        .commit(&item, PartitionRule::ByLevel)
        .await
        .unwrap();
    assert_eq!(report.lots_created.len(), 1);
    assert_eq!(report.elements_assigned, 3);
    let lot_id = report.lots_created[0].lot_id.clone();

    let lifecycle = engine.lifecycle();
    let editor = caller(Role::Editor);
    lifecycle
        .update_status(&lot_id, LotStatus::InProgress, &editor)
        .await
        .unwrap();
    lifecycle
        .update_status(&lot_id, LotStatus::Submitted, &editor)
        .await
        .unwrap();

    assert!(engine.check_lot(&lot_id).await.unwrap().is_passed());

    let approved = lifecycle
        .approve(&lot_id, "network closed", &caller(Role::Approver))
        .await
        .unwrap();
    assert_eq!(approved.status, LotStatus::Approved);

    let published = lifecycle
        .publish(&lot_id, &caller(Role::Admin))
        .await
        .unwrap();
    assert_eq!(published.status, LotStatus::Published);

    let history = lifecycle.history(&lot_id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].user_id, "approver-user");
}

#[tokio::test]
async fn test_hierarchy_lists_lots_and_members() {
    let store = seeded_store();
    let lot_id = insert_network_lot(&store, LotStatus::Submitted);
    let engine = engine(store);

    let tree = engine.item_hierarchy(&test_item_id()).await.unwrap();

    assert_eq!(tree.name, "Block A");
    assert_eq!(tree.lots.len(), 1);
    assert_eq!(tree.lots[0].lot_id, lot_id);
    assert_eq!(tree.element_count(), 3);
    assert_eq!(tree.lots_in(LotStatus::Submitted).count(), 1);
}

#[tokio::test]
async fn test_hierarchy_is_cached_until_status_changes() {
    let inner = seeded_store();
    let lot_id = insert_network_lot(&inner, LotStatus::Submitted);
    let counting = Arc::new(CountingStore::new(inner));
    let engine = engine(counting.clone());
    let item = test_item_id();

    engine.item_hierarchy(&item).await.unwrap();
    let after_first = counting.total();
    engine.item_hierarchy(&item).await.unwrap();
    assert_eq!(counting.total(), after_first);

    engine
        .lifecycle()
        .approve(&lot_id, "ok", &caller(Role::Approver))
        .await
        .unwrap();

    let tree = engine.item_hierarchy(&item).await.unwrap();
    assert_eq!(tree.lots[0].status, LotStatus::Approved);
}

#[tokio::test]
async fn test_hierarchy_refreshes_after_commit() {
    let store = seeded_store();
    seed_network(&store);
    let engine = engine(store);
    let item = test_item_id();

    assert!(engine.item_hierarchy(&item).await.unwrap().lots.is_empty());

    engine
        .partition()
        .commit(&item, PartitionRule::ByLevel)
        .await
        .unwrap();

    let tree = engine.item_hierarchy(&item).await.unwrap();
    assert_eq!(tree.lots.len(), 1);
    assert_eq!(tree.lots[0].group_key.as_deref(), Some("L1"));
}

#[tokio::test]
async fn test_unknown_item_and_lot() {
    let engine = engine(seeded_store());

    let err = engine
        .item_hierarchy(&ItemId::new("ghost"))
        .await
        .unwrap_err();
    assert!(matches!(err, LotError::NotFound { .. }));

    let err = engine.check_lot(&LotId::new("ghost")).await.unwrap_err();
    assert!(matches!(err, LotError::NotFound { .. }));
}

#[tokio::test]
async fn test_check_lot_reports_dangling_pipe() {
    let store = seeded_store();
    let lot_id = insert_lot(&store, LotStatus::InProgress, vec![pipe("d1"), pipe("d2")]);
    store.insert_connections([Connection::open("d1", 0)]);
    let engine = engine(store);

    match engine.check_lot(&lot_id).await.unwrap() {
        GateOutcome::Failed(failure) => assert_eq!(failure.gate, GateKind::Topology),
        GateOutcome::Passed => panic!("dangling pipe passed the gates"),
    }
}

#[tokio::test]
async fn test_batch_approve_isolates_failures() {
    let store = seeded_store();
    let good = insert_network_lot(&store, LotStatus::Submitted);
    let also_good = insert_second_network_lot(&store, LotStatus::Submitted);
    let planning = insert_lot(&store, LotStatus::Planning, vec![]);
    let engine = engine(store);

    let report = engine
        .lifecycle()
        .batch_approve(
            &[good.clone(), planning.clone(), also_good.clone()],
            "batch",
            &caller(Role::Approver),
        )
        .await;

    assert_eq!(report.approved(), 2);
    assert_eq!(report.failed(), 1);
    let order: Vec<&LotId> = report.results.iter().map(|r| &r.lot_id).collect();
    assert_eq!(order, vec![&good, &planning, &also_good]);
    assert!(!report.results[1].success);
    assert_eq!(report.results[1].status, Some(LotStatus::Planning));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_approvals_apply_once() {
    let store = seeded_store();
    let lot_id = insert_network_lot(&store, LotStatus::Submitted);
    let engine = Arc::new(engine(store));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let engine = engine.clone();
            let lot_id = lot_id.clone();
            tokio::spawn(async move {
                engine
                    .lifecycle()
                    .approve(&lot_id, &format!("approval {i}"), &caller(Role::Approver))
                    .await
            })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(err) => assert!(matches!(err, LotError::InvalidTransition { .. })),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(engine.lifecycle().history(&lot_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_disabled_semantic_gate_from_config() {
    let store = seeded_store();
    let duct = Element::new("m2", ElementKind::Duct).with_geometry([[0.0, 0.0], [4.0, 0.0]]);
    let lot_id = insert_lot(&store, LotStatus::Submitted, vec![pipe("m1"), duct]);
    store.insert_connections(link_pair("m1", 0, "m2", 0));

    let strict = engine(store.clone());
    match strict.check_lot(&lot_id).await.unwrap() {
        GateOutcome::Failed(failure) => assert_eq!(failure.gate, GateKind::Semantic),
        GateOutcome::Passed => panic!("pipe to duct passed the semantic gate"),
    }

    let config = EngineConfig::default().with_gates(GateConfig::default().with_semantic(false));
    let lenient = InspectionEngine::new(config, store).unwrap();
    assert!(lenient.check_lot(&lot_id).await.unwrap().is_passed());
}
