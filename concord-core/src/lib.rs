//! CONCORD Core - Ledger Data Types and Integrity Primitives
//!
//! Pure data structures and deterministic leaf algorithms. All other crates
//! depend on this. This crate contains no I/O: hashing, canonical encoding,
//! and chain verification are synchronous and reproducible by construction.
//!
//! # Key Types
//!
//! - [`EventEnvelope`]: one immutable ledger record (metadata + payload)
//! - [`HashAlgorithm`]: pluggable digest algorithms behind `"alg:hex"` strings
//! - [`GateState`]: the terminal/freeze/halt write-blocking state model
//! - [`CheckpointAnchor`] / [`MerkleProof`]: sealed range summaries and
//!   inclusion proofs
//! - [`ConcordError`]: the shared error taxonomy

use chrono::{DateTime, Utc};
use uuid::Uuid;

pub mod canonical;
pub mod chain;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod event;
pub mod gate;
pub mod hash;
pub mod projection;

pub use canonical::{canonical_bytes, canonical_id, canonical_timestamp};
pub use chain::{
    chain_events, compute_hash, detect_gaps, verify_chain_link, verify_range, verify_self_hash,
};
pub use checkpoint::{
    AnchorType, ChainLink, ChainProof, CheckpointAnchor, CheckpointId, InclusionProof,
    MerkleProof, ProofStep, SiblingPosition,
};
pub use config::ConcordConfig;
pub use error::{
    ConcordError, ConcordResult, ConfigError, GateError, IntegrityError, ProjectionError,
    ProofError, StorageError,
};
pub use event::{kinds, DraftEvent, EventEnvelope};
pub use gate::{CheckerStatus, FreezeStatus, GateState};
pub use hash::{genesis_sentinel, is_genesis_sentinel, HashAlgorithm, GENESIS_ALGORITHM};
pub use projection::{
    ActorRecord, ActorStatus, ApplyLogEntry, ProjectionCheckpoint, Provenance, TaskStateRecord,
    TaskStatus,
};

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Event identifier using UUIDv7 for timestamp-sortable IDs.
pub type EventId = Uuid;

/// Actor identifier (the principal that authored an event).
pub type ActorId = Uuid;

/// Trace identifier correlating events across a request lifecycle.
pub type TraceId = Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Ledger sequence number. Sequences start at 1; 0 is the "before genesis"
/// cursor value used by checkpoints.
pub type Sequence = u64;

/// Generate a new UUIDv7 event ID (timestamp-sortable).
pub fn new_event_id() -> EventId {
    Uuid::now_v7()
}
