//! Rebuild equivalence: a projection rebuilt from genesis must match one
//! maintained incrementally, record for record, because both run the same
//! deterministic fold over the same committed events.

use concord_core::chain_events;
use concord_core::{DraftEvent, HashAlgorithm};
use concord_projection::{
    ActorRegistryProjection, ApplyOutcome, ProjectionApplier, RebuildService, TaskStateProjection,
};
use concord_storage::{InMemoryLedgerStore, InMemoryProjectionStore, LedgerStore, ProjectionStore};
use concord_test_utils::{fixtures, kinds};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// A mixed governance stream: tasks created and advanced, actors
/// registered and suspended, interleaved.
async fn mixed_ledger() -> Arc<InMemoryLedgerStore> {
    let actor = Uuid::now_v7();
    let subject = Uuid::now_v7();
    let drafts = vec![
        fixtures::task_created_draft(actor, "T-1", "Draft bylaw amendment"),
        fixtures::actor_registered_draft(actor, subject, "Registrar"),
        fixtures::task_created_draft(actor, "T-2", "Review petition"),
        fixtures::task_status_draft(actor, "T-1", "in_progress"),
        DraftEvent::new(kinds::ACTOR_SUSPENDED, actor, json!({"subject_id": subject.to_string()})),
        DraftEvent::new(kinds::TASK_COMPLETED, actor, json!({"task_id": "T-1"})),
        fixtures::task_status_draft(actor, "T-2", "in_progress"),
        DraftEvent::new(
            kinds::ACTOR_REINSTATED,
            actor,
            json!({"subject_id": subject.to_string()}),
        ),
        DraftEvent::new(kinds::TASK_CANCELLED, actor, json!({"task_id": "T-2"})),
    ];

    let mut events: Vec<_> = drafts
        .into_iter()
        .enumerate()
        .map(|(i, d)| d.into_envelope(i as u64 + 1))
        .collect();
    chain_events(&mut events, None, HashAlgorithm::Blake3).unwrap();

    let ledger = Arc::new(InMemoryLedgerStore::new());
    for event in events {
        ledger.append(event).await.unwrap();
    }
    ledger
}

#[tokio::test]
async fn test_rebuild_matches_incremental_task_state() {
    let ledger = mixed_ledger().await;

    // Incremental path: apply each event as it lands.
    let incremental = Arc::new(InMemoryProjectionStore::new());
    let applier = ProjectionApplier::new(TaskStateProjection, Arc::clone(&incremental));
    for event in ledger.read_range(1, 9).await.unwrap() {
        applier.apply(&event).await.unwrap();
    }

    // Rebuild path: replay everything into a fresh store.
    let rebuilt = Arc::new(InMemoryProjectionStore::new());
    let rebuild_applier = Arc::new(ProjectionApplier::new(
        TaskStateProjection,
        Arc::clone(&rebuilt),
    ));
    RebuildService::new(rebuild_applier, Arc::clone(&rebuilt), Arc::clone(&ledger), 4)
        .rebuild()
        .await
        .unwrap();

    let a = incremental.records("task_state").await.unwrap();
    let b = rebuilt.records("task_state").await.unwrap();
    assert_eq!(a, b);
    assert_eq!(a.len(), 2);
    assert_eq!(a["T-1"]["status"], "completed");
    assert_eq!(a["T-2"]["status"], "cancelled");

    assert_eq!(
        incremental.checkpoint("task_state").await.unwrap().last_sequence,
        rebuilt.checkpoint("task_state").await.unwrap().last_sequence,
    );
}

#[tokio::test]
async fn test_rebuild_matches_incremental_actor_registry() {
    let ledger = mixed_ledger().await;

    let incremental = Arc::new(InMemoryProjectionStore::new());
    let applier = ProjectionApplier::new(ActorRegistryProjection, Arc::clone(&incremental));
    for event in ledger.read_range(1, 9).await.unwrap() {
        applier.apply(&event).await.unwrap();
    }

    let rebuilt = Arc::new(InMemoryProjectionStore::new());
    let rebuild_applier = Arc::new(ProjectionApplier::new(
        ActorRegistryProjection,
        Arc::clone(&rebuilt),
    ));
    RebuildService::new(rebuild_applier, Arc::clone(&rebuilt), Arc::clone(&ledger), 4)
        .rebuild()
        .await
        .unwrap();

    let a = incremental.records("actor_registry").await.unwrap();
    let b = rebuilt.records("actor_registry").await.unwrap();
    assert_eq!(a, b);
    assert_eq!(a.len(), 1);
    let record = a.values().next().unwrap();
    assert_eq!(record["status"], "active");
}

#[tokio::test]
async fn test_replaying_applied_stream_changes_nothing() {
    let ledger = mixed_ledger().await;
    let store = Arc::new(InMemoryProjectionStore::new());
    let applier = ProjectionApplier::new(TaskStateProjection, Arc::clone(&store));

    let events = ledger.read_range(1, 9).await.unwrap();
    for event in &events {
        applier.apply(event).await.unwrap();
    }
    let snapshot = store.records("task_state").await.unwrap();
    let log_count = store.apply_log_count("task_state").await.unwrap();

    // Replay the whole stream: every apply reports already-applied and the
    // derived state stays put.
    for event in &events {
        assert_eq!(
            applier.apply(event).await.unwrap(),
            ApplyOutcome::AlreadyApplied
        );
    }
    assert_eq!(store.records("task_state").await.unwrap(), snapshot);
    assert_eq!(store.apply_log_count("task_state").await.unwrap(), log_count);
}

#[tokio::test]
async fn test_two_projections_share_one_store() {
    let ledger = mixed_ledger().await;
    let store = Arc::new(InMemoryProjectionStore::new());
    let tasks = ProjectionApplier::new(TaskStateProjection, Arc::clone(&store));
    let actors = ProjectionApplier::new(ActorRegistryProjection, Arc::clone(&store));

    for event in ledger.read_range(1, 9).await.unwrap() {
        tasks.apply(&event).await.unwrap();
        actors.apply(&event).await.unwrap();
    }

    // Cursors advance independently; both reach the head.
    assert_eq!(store.checkpoint("task_state").await.unwrap().last_sequence, 9);
    assert_eq!(
        store.checkpoint("actor_registry").await.unwrap().last_sequence,
        9
    );
    assert_eq!(store.records("task_state").await.unwrap().len(), 2);
    assert_eq!(store.records("actor_registry").await.unwrap().len(), 1);
}
