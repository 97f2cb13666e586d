//! CONCORD Test Utilities
//!
//! Centralized test infrastructure for the CONCORD workspace:
//! - Fixture builders for chained events and populated stores
//! - Proptest generators for envelope and payload types
//! - Re-exports of the in-memory port implementations

// Re-export the in-memory stores from their source crate
pub use concord_storage::{
    InMemoryCheckpointStore, InMemoryGateFlags, InMemoryLedgerStore, InMemoryProjectionStore,
};

// Re-export core types for convenience
pub use concord_core::{
    chain_events, genesis_sentinel, kinds, ActorId, ConcordError, ConcordResult, DraftEvent,
    EventEnvelope, EventId, HashAlgorithm, Sequence, Timestamp,
};

use serde_json::{json, Value};
use uuid::Uuid;

// ============================================================================
// FIXTURES
// ============================================================================

/// Fixture builders for common scenarios.
pub mod fixtures {
    use super::*;

    /// A draft task-creation event with a deterministic payload shape.
    pub fn task_created_draft(actor: ActorId, task_id: &str, title: &str) -> DraftEvent {
        DraftEvent::new(
            kinds::TASK_CREATED,
            actor,
            json!({"task_id": task_id, "title": title}),
        )
    }

    /// A draft status-change event.
    pub fn task_status_draft(actor: ActorId, task_id: &str, status: &str) -> DraftEvent {
        DraftEvent::new(
            kinds::TASK_STATUS_CHANGED,
            actor,
            json!({"task_id": task_id, "status": status}),
        )
    }

    /// A draft actor-registration event.
    pub fn actor_registered_draft(actor: ActorId, subject: ActorId, name: &str) -> DraftEvent {
        DraftEvent::new(
            kinds::ACTOR_REGISTERED,
            actor,
            json!({"subject_id": subject.to_string(), "name": name}),
        )
    }

    /// A fully chained run of `n` task-creation envelopes starting at
    /// sequence `start`, linked to `preceding_hash` (sentinel when `None`).
    pub fn chained_events(
        n: u64,
        start: Sequence,
        preceding_hash: Option<&str>,
        algorithm: HashAlgorithm,
    ) -> Vec<EventEnvelope> {
        let actor = Uuid::now_v7();
        let mut events: Vec<EventEnvelope> = (start..start + n)
            .map(|seq| {
                task_created_draft(actor, &format!("T-{seq}"), &format!("Task {seq}"))
                    .into_envelope(seq)
            })
            .collect();
        chain_events(&mut events, preceding_hash, algorithm)
            .expect("chaining registered algorithms is infallible");
        events
    }

    /// A chained run from genesis under the default algorithm.
    pub fn genesis_chain(n: u64) -> Vec<EventEnvelope> {
        chained_events(n, 1, None, HashAlgorithm::default())
    }

    /// An in-memory ledger pre-populated with a clean chain of `n` events.
    pub async fn populated_ledger(n: u64) -> ConcordResult<InMemoryLedgerStore> {
        use concord_storage::LedgerStore;

        let store = InMemoryLedgerStore::new();
        for event in genesis_chain(n) {
            store.append(event).await?;
        }
        Ok(store)
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

/// Proptest strategies for CONCORD types.
pub mod generators {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    /// Generate a random v4 UUID (version and variant bits set).
    pub fn arb_uuid() -> impl Strategy<Value = Uuid> {
        any::<[u8; 16]>().prop_map(|bytes| uuid::Builder::from_random_bytes(bytes).into_uuid())
    }

    /// Generate a timestamp in a sane range (2020-2040), microsecond
    /// precision to match canonical encoding.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (1_577_836_800i64..2_208_988_800i64, 0u32..1_000_000u32).prop_map(|(secs, micros)| {
            Utc.timestamp_opt(secs, micros * 1_000)
                .single()
                .unwrap_or_else(Utc::now)
        })
    }

    pub fn arb_algorithm() -> impl Strategy<Value = HashAlgorithm> {
        prop_oneof![Just(HashAlgorithm::Blake3), Just(HashAlgorithm::Sha256)]
    }

    pub fn arb_event_type() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(kinds::TASK_CREATED.to_string()),
            Just(kinds::TASK_STATUS_CHANGED.to_string()),
            Just(kinds::TASK_COMPLETED.to_string()),
            Just(kinds::ACTOR_REGISTERED.to_string()),
            Just(kinds::ACTOR_SUSPENDED.to_string()),
            Just(kinds::HALT_SET.to_string()),
        ]
    }

    /// Generate an arbitrary JSON payload of bounded depth.
    pub fn arb_payload() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| json!(n)),
            "[a-zA-Z0-9 _.-]{0,24}".prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 24, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
                prop::collection::hash_map("[a-z_]{1,12}", inner, 0..6)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    /// Generate a draft event with arbitrary identity and payload.
    pub fn arb_draft() -> impl Strategy<Value = DraftEvent> {
        (arb_event_type(), arb_uuid(), arb_timestamp(), arb_payload()).prop_map(
            |(event_type, actor_id, timestamp, payload)| {
                let mut draft = DraftEvent::new(event_type, actor_id, payload);
                draft.timestamp = timestamp;
                draft
            },
        )
    }

    /// Generate a fully chained run of 1..=max_len envelopes from genesis.
    pub fn arb_chain(max_len: u64) -> impl Strategy<Value = Vec<EventEnvelope>> {
        (1..=max_len, arb_algorithm()).prop_flat_map(|(len, algorithm)| {
            prop::collection::vec(arb_draft(), len as usize).prop_map(move |drafts| {
                let mut events: Vec<EventEnvelope> = drafts
                    .into_iter()
                    .enumerate()
                    .map(|(i, draft)| draft.into_envelope(i as Sequence + 1))
                    .collect();
                chain_events(&mut events, None, algorithm)
                    .expect("chaining registered algorithms is infallible");
                events
            })
        })
    }
}
