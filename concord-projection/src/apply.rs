//! Incremental projection application.
//!
//! Each event is applied as one atomic unit: the record upsert, the
//! apply-log entry, and the advanced checkpoint cursor commit together or
//! not at all. The apply log is the sole idempotency mechanism; a losing
//! racer observes `IdempotencyConflict` from the store and treats it as
//! already-applied rather than as a failure.

use chrono::Utc;
use concord_core::{
    ApplyLogEntry, ConcordError, ConcordResult, EventEnvelope, ProjectionCheckpoint,
    ProjectionError, Sequence,
};
use concord_storage::{ApplyUpdate, EventQuery, ProjectionStore, RecordWrite};
use std::sync::Arc;

use crate::handler::ProjectionHandler;

/// Outcome of applying one event to one projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The event was folded in and committed.
    Applied,
    /// The apply log already held the entry; nothing changed.
    AlreadyApplied,
}

/// Applies committed events to a projection through its handler.
pub struct ProjectionApplier<H, P> {
    handler: H,
    store: Arc<P>,
}

impl<H, P> ProjectionApplier<H, P>
where
    H: ProjectionHandler,
    P: ProjectionStore,
{
    pub fn new(handler: H, store: Arc<P>) -> Self {
        Self { handler, store }
    }

    pub fn projection_name(&self) -> &'static str {
        self.handler.name()
    }

    /// Apply one committed event.
    ///
    /// Events the handler does not address still advance the cursor and
    /// apply log; skipping them entirely would make resumption revisit them
    /// forever.
    pub async fn apply(&self, event: &EventEnvelope) -> ConcordResult<ApplyOutcome> {
        let name = self.handler.name();
        if self.store.is_applied(name, event.event_id).await? {
            return Ok(ApplyOutcome::AlreadyApplied);
        }

        let write = match self.handler.entity_key(event)? {
            Some(key) => {
                let prior = self.store.record(name, &key).await?;
                let record = self.handler.apply(prior, event)?;
                Some(RecordWrite { key, record })
            }
            None => None,
        };

        let update = ApplyUpdate {
            projection_name: name.to_string(),
            write,
            log_entry: ApplyLogEntry {
                projection_name: name.to_string(),
                event_id: event.event_id,
                applied_at: Utc::now(),
            },
            checkpoint: ProjectionCheckpoint {
                projection_name: name.to_string(),
                last_event_id: Some(event.event_id),
                last_hash: Some(event.hash.clone()),
                last_sequence: event.sequence,
            },
        };

        match self.store.commit_apply(update).await {
            Ok(()) => {
                tracing::debug!(
                    projection = name,
                    sequence = event.sequence,
                    event_type = %event.event_type,
                    "event applied to projection"
                );
                Ok(ApplyOutcome::Applied)
            }
            // A concurrent applier committed first; the event is in.
            Err(ConcordError::Projection(ProjectionError::IdempotencyConflict { .. })) => {
                Ok(ApplyOutcome::AlreadyApplied)
            }
            Err(other) => Err(other),
        }
    }

    /// Apply all events newer than the projection's cursor, in batches.
    /// Returns the number of events newly applied.
    pub async fn catch_up<Q>(&self, events: &Q, batch_size: usize) -> ConcordResult<u64>
    where
        Q: EventQuery,
    {
        let name = self.handler.name();
        let mut cursor: Sequence = self.store.checkpoint(name).await?.last_sequence;
        let mut applied: u64 = 0;

        loop {
            let batch = events.events_after(cursor, batch_size).await?;
            if batch.is_empty() {
                break;
            }
            for event in &batch {
                if self.apply(event).await? == ApplyOutcome::Applied {
                    applied += 1;
                }
                cursor = event.sequence;
            }
        }
        if applied > 0 {
            tracing::info!(projection = name, applied, cursor, "projection caught up");
        }
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task_state::TaskStateProjection;
    use concord_core::TaskStatus;
    use concord_storage::{InMemoryLedgerStore, InMemoryProjectionStore, LedgerStore};
    use concord_test_utils::fixtures;

    fn applier(
        store: Arc<InMemoryProjectionStore>,
    ) -> ProjectionApplier<TaskStateProjection, InMemoryProjectionStore> {
        ProjectionApplier::new(TaskStateProjection, store)
    }

    #[tokio::test]
    async fn test_apply_writes_record_and_cursor() {
        let store = Arc::new(InMemoryProjectionStore::new());
        let applier = applier(Arc::clone(&store));
        let events = fixtures::genesis_chain(1);

        assert_eq!(applier.apply(&events[0]).await.unwrap(), ApplyOutcome::Applied);

        let record = store.record("task_state", "T-1").await.unwrap().unwrap();
        assert_eq!(record["status"], "open");
        let cp = store.checkpoint("task_state").await.unwrap();
        assert_eq!(cp.last_sequence, 1);
        assert_eq!(cp.last_hash.as_deref(), Some(events[0].hash.as_str()));
    }

    #[tokio::test]
    async fn test_double_apply_is_noop_with_one_log_entry() {
        let store = Arc::new(InMemoryProjectionStore::new());
        let applier = applier(Arc::clone(&store));
        let events = fixtures::genesis_chain(1);

        assert_eq!(applier.apply(&events[0]).await.unwrap(), ApplyOutcome::Applied);
        assert_eq!(
            applier.apply(&events[0]).await.unwrap(),
            ApplyOutcome::AlreadyApplied
        );
        assert_eq!(store.apply_log_count("task_state").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unhandled_event_advances_cursor() {
        let store = Arc::new(InMemoryProjectionStore::new());
        let applier = applier(Arc::clone(&store));

        let actor = uuid::Uuid::now_v7();
        let mut events = vec![fixtures::actor_registered_draft(actor, actor, "clerk")
            .into_envelope(1)];
        concord_core::chain_events(&mut events, None, concord_core::HashAlgorithm::Blake3)
            .unwrap();

        assert_eq!(applier.apply(&events[0]).await.unwrap(), ApplyOutcome::Applied);
        assert!(store.records("task_state").await.unwrap().is_empty());
        assert_eq!(store.checkpoint("task_state").await.unwrap().last_sequence, 1);
    }

    #[tokio::test]
    async fn test_catch_up_from_cursor() {
        let ledger = Arc::new(InMemoryLedgerStore::new());
        for event in fixtures::genesis_chain(5) {
            ledger.append(event).await.unwrap();
        }
        let store = Arc::new(InMemoryProjectionStore::new());
        let applier = applier(Arc::clone(&store));

        let applied = applier.catch_up(ledger.as_ref(), 2).await.unwrap();
        assert_eq!(applied, 5);
        assert_eq!(store.checkpoint("task_state").await.unwrap().last_sequence, 5);

        // Nothing new: a second pass applies nothing.
        assert_eq!(applier.catch_up(ledger.as_ref(), 2).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_catch_up_resumes_mid_stream() {
        let ledger = Arc::new(InMemoryLedgerStore::new());
        let events = fixtures::genesis_chain(4);
        for event in &events {
            ledger.append(event.clone()).await.unwrap();
        }
        let store = Arc::new(InMemoryProjectionStore::new());
        let applier = applier(Arc::clone(&store));

        applier.apply(&events[0]).await.unwrap();
        applier.apply(&events[1]).await.unwrap();

        let applied = applier.catch_up(ledger.as_ref(), 10).await.unwrap();
        assert_eq!(applied, 2);
        assert_eq!(store.apply_log_count("task_state").await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_applied_record_status_decodes() {
        let store = Arc::new(InMemoryProjectionStore::new());
        let applier = applier(Arc::clone(&store));
        for event in fixtures::genesis_chain(1) {
            applier.apply(&event).await.unwrap();
        }
        let record = store.record("task_state", "T-1").await.unwrap().unwrap();
        let decoded: concord_core::TaskStateRecord = serde_json::from_value(record).unwrap();
        assert_eq!(decoded.status, TaskStatus::Open);
    }
}
