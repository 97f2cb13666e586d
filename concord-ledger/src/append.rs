//! The append service: gate check, sequence assignment, chain hashing,
//! persistence.
//!
//! Appends are strictly serialized with respect to sequence assignment: a
//! single writer mutex spans the whole append, so at most one event can
//! ever claim a given sequence number. Sequence collisions are a bug, not a
//! retry condition; the store's contiguity check is the backstop.

use concord_core::{
    chain::compute_hash, genesis_sentinel, ConcordResult, DraftEvent, EventEnvelope,
    HashAlgorithm,
};
use concord_storage::{FreezeChecker, HaltChecker, LedgerStore, TerminalChecker};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::gate::WritePathGate;

/// The ledger write path.
pub struct AppendService<S, T, F, H> {
    store: Arc<S>,
    gate: Arc<WritePathGate<T, F, H>>,
    algorithm: HashAlgorithm,
    writer: Mutex<()>,
}

impl<S, T, F, H> AppendService<S, T, F, H>
where
    S: LedgerStore,
    T: TerminalChecker,
    F: FreezeChecker,
    H: HaltChecker,
{
    pub fn new(store: Arc<S>, gate: Arc<WritePathGate<T, F, H>>, algorithm: HashAlgorithm) -> Self {
        Self {
            store,
            gate,
            algorithm,
            writer: Mutex::new(()),
        }
    }

    /// Append a draft event: consult the gate, assign the next sequence,
    /// link and hash the envelope, persist. Returns the committed envelope.
    pub async fn append(&self, draft: DraftEvent) -> ConcordResult<EventEnvelope> {
        let _writer = self.writer.lock().await;

        let head = self.store.read_latest().await?;
        let head_sequence = head.as_ref().map(|e| e.sequence).unwrap_or(0);

        self.gate.check_append(head_sequence).await?;

        let mut envelope = draft.into_envelope(head_sequence + 1);
        envelope.prev_hash = head
            .map(|e| e.hash)
            .unwrap_or_else(|| genesis_sentinel().to_string());
        envelope.hash = compute_hash(&envelope, self.algorithm);

        let committed = self.store.append(envelope).await?;
        tracing::info!(
            sequence = committed.sequence,
            event_type = %committed.event_type,
            event_id = %committed.event_id,
            hash = %committed.hash,
            "event committed to ledger"
        );
        Ok(committed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_core::{kinds, verify_range, ConcordError, GateError};
    use concord_storage::{InMemoryGateFlags, InMemoryLedgerStore};
    use serde_json::json;
    use std::time::Duration;
    use uuid::Uuid;

    async fn service(
        flags: &InMemoryGateFlags,
    ) -> (
        Arc<InMemoryLedgerStore>,
        AppendService<InMemoryLedgerStore, InMemoryGateFlags, InMemoryGateFlags, InMemoryGateFlags>,
    ) {
        let store = Arc::new(InMemoryLedgerStore::new());
        let gate = Arc::new(
            WritePathGate::new(
                Arc::new(flags.clone()),
                Arc::new(flags.clone()),
                Arc::new(flags.clone()),
                Duration::from_nanos(1),
            )
            .await
            .unwrap(),
        );
        let service = AppendService::new(Arc::clone(&store), gate, HashAlgorithm::Blake3);
        (store, service)
    }

    #[tokio::test]
    async fn test_first_append_is_genesis() {
        let flags = InMemoryGateFlags::new();
        let (_, service) = service(&flags).await;

        let committed = service
            .append(DraftEvent::new(
                kinds::TASK_CREATED,
                Uuid::now_v7(),
                json!({"task_id": "T-1"}),
            ))
            .await
            .unwrap();

        assert_eq!(committed.sequence, 1);
        assert_eq!(committed.prev_hash, genesis_sentinel());
        assert!(committed.hash.starts_with("blake3:"));
    }

    #[tokio::test]
    async fn test_appends_form_verifiable_chain() {
        let flags = InMemoryGateFlags::new();
        let (store, service) = service(&flags).await;

        for i in 0..5 {
            service
                .append(DraftEvent::new(
                    kinds::TASK_CREATED,
                    Uuid::now_v7(),
                    json!({"task_id": format!("T-{i}")}),
                ))
                .await
                .unwrap();
        }

        let events = store.read_range(1, 5).await.unwrap();
        assert_eq!(events.len(), 5);
        assert!(verify_range(&events, None).is_ok());
    }

    #[tokio::test]
    async fn test_gate_rejection_blocks_persistence() {
        let flags = InMemoryGateFlags::new();
        let (store, service) = service(&flags).await;
        flags.set_halt("administrative halt").unwrap();

        let err = service
            .append(DraftEvent::new(kinds::TASK_CREATED, Uuid::now_v7(), json!({})))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ConcordError::Gate(GateError::HaltedWriteRejected { .. })
        ));
        assert!(store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_appends_serialize() {
        let flags = InMemoryGateFlags::new();
        let (store, service) = service(&flags).await;
        let service = Arc::new(service);

        let mut handles = Vec::new();
        for i in 0..16 {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move {
                service
                    .append(DraftEvent::new(
                        kinds::ACTOR_REGISTERED,
                        Uuid::now_v7(),
                        json!({"n": i}),
                    ))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let events = store.read_range(1, 16).await.unwrap();
        assert_eq!(events.len(), 16);
        assert!(verify_range(&events, None).is_ok());
    }
}
