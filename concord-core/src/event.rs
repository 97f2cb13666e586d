//! Event envelope types for the integrity ledger.
//!
//! An [`EventEnvelope`] is one immutable ledger record: metadata (identity,
//! type, actor, timestamps, chain-linkage fields) plus an opaque JSON
//! payload. The stored `hash` is computed over the canonical bytes of the
//! metadata *excluding* the hash field, concatenated with the canonical
//! payload bytes, and is undefined until computed at append time.

use crate::canonical::{canonical_bytes, canonical_id, canonical_timestamp};
use crate::{ActorId, EventId, Sequence, Timestamp, TraceId};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

/// Current envelope schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Well-known event type tags for the governance domain.
///
/// The ledger itself treats `event_type` as an opaque string; these
/// constants exist so producers and projections dispatch on one vocabulary.
pub mod kinds {
    // Task lifecycle
    pub const TASK_CREATED: &str = "task.created";
    pub const TASK_STATUS_CHANGED: &str = "task.status_changed";
    pub const TASK_COMPLETED: &str = "task.completed";
    pub const TASK_CANCELLED: &str = "task.cancelled";

    // Actor registry
    pub const ACTOR_REGISTERED: &str = "actor.registered";
    pub const ACTOR_UPDATED: &str = "actor.updated";
    pub const ACTOR_SUSPENDED: &str = "actor.suspended";
    pub const ACTOR_REINSTATED: &str = "actor.reinstated";

    // Governance lifecycle (write-path gate transitions are themselves events)
    pub const HALT_SET: &str = "governance.halt_set";
    pub const HALT_CLEARED: &str = "governance.halt_cleared";
    pub const FREEZE_SET: &str = "governance.freeze_set";
    pub const CESSATION_INVOKED: &str = "governance.cessation_invoked";
}

/// A draft event: everything a producer supplies before the write path
/// assigns sequence and chain-linkage fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftEvent {
    pub event_id: EventId,
    pub event_type: String,
    pub schema_version: i32,
    pub timestamp: Timestamp,
    pub actor_id: ActorId,
    pub trace_id: TraceId,
    pub payload: Value,
}

impl DraftEvent {
    /// Create a draft with a fresh UUIDv7 id and the current UTC timestamp.
    pub fn new(event_type: impl Into<String>, actor_id: ActorId, payload: Value) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            event_type: event_type.into(),
            schema_version: SCHEMA_VERSION,
            timestamp: Utc::now(),
            actor_id,
            trace_id: Uuid::now_v7(),
            payload,
        }
    }

    /// Set an explicit trace id (for correlating multi-event operations).
    pub fn with_trace(mut self, trace_id: TraceId) -> Self {
        self.trace_id = trace_id;
        self
    }

    /// Promote the draft to an envelope at the given sequence. Chain fields
    /// start empty; the hash-chain builder fills them in.
    pub fn into_envelope(self, sequence: Sequence) -> EventEnvelope {
        EventEnvelope {
            event_id: self.event_id,
            event_type: self.event_type,
            schema_version: self.schema_version,
            timestamp: self.timestamp,
            actor_id: self.actor_id,
            trace_id: self.trace_id,
            sequence,
            prev_hash: String::new(),
            hash: String::new(),
            payload: self.payload,
        }
    }
}

/// One immutable ledger record.
///
/// Created once at append time, never updated or deleted. For any two
/// non-genesis events in sequence order, `event[n].prev_hash ==
/// event[n-1].hash`; the genesis event carries the all-zero sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: EventId,
    pub event_type: String,
    pub schema_version: i32,
    pub timestamp: Timestamp,
    pub actor_id: ActorId,
    pub trace_id: TraceId,
    pub sequence: Sequence,
    pub prev_hash: String,
    pub hash: String,
    pub payload: Value,
}

impl EventEnvelope {
    /// Canonical bytes of the metadata, excluding the `hash` field.
    ///
    /// The hash must never be included in its own input, so it is omitted
    /// here rather than zeroed: omission cannot collide with a legitimate
    /// field value.
    pub fn canonical_metadata_bytes(&self) -> Vec<u8> {
        let metadata = json!({
            "event_id": canonical_id(&self.event_id),
            "event_type": self.event_type,
            "schema_version": self.schema_version,
            "timestamp": canonical_timestamp(&self.timestamp),
            "actor_id": canonical_id(&self.actor_id),
            "trace_id": canonical_id(&self.trace_id),
            "sequence": self.sequence,
            "prev_hash": self.prev_hash,
        });
        canonical_bytes(&metadata)
    }

    /// Canonical bytes of the opaque payload.
    pub fn canonical_payload_bytes(&self) -> Vec<u8> {
        canonical_bytes(&self.payload)
    }

    /// The full hash input: canonical metadata bytes concatenated with
    /// canonical payload bytes.
    pub fn hash_input(&self) -> Vec<u8> {
        let mut input = self.canonical_metadata_bytes();
        input.extend_from_slice(&self.canonical_payload_bytes());
        input
    }

    /// Whether this envelope sits at the head of a chain start.
    pub fn is_genesis(&self) -> bool {
        self.sequence == 1
    }
}
