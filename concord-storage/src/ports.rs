//! Storage port traits.
//!
//! The contracts the ledger storage must satisfy; no storage engine is
//! prescribed. The durable implementation maps `commit_apply` to a single
//! transaction and `append` to an atomic sequence-assignment primitive.

use concord_core::{
    AnchorType, ApplyLogEntry, CheckerStatus, CheckpointAnchor, CheckpointId, ConcordResult,
    EventEnvelope, EventId, FreezeStatus, ProjectionCheckpoint, Sequence,
};
use serde_json::Value;
use std::collections::BTreeMap;

/// Append-ordered event storage; the single source of truth.
#[async_trait::async_trait]
pub trait LedgerStore: Send + Sync {
    /// Append a fully chained envelope at the next sequence.
    ///
    /// The store must reject a non-contiguous sequence atomically: at most
    /// one event may ever claim a given sequence number. Returns the
    /// committed envelope.
    async fn append(&self, event: EventEnvelope) -> ConcordResult<EventEnvelope>;

    /// Read one event by sequence number.
    async fn read_by_sequence(&self, sequence: Sequence) -> ConcordResult<Option<EventEnvelope>>;

    /// Read an inclusive sequence range in order.
    async fn read_range(&self, start: Sequence, end: Sequence)
        -> ConcordResult<Vec<EventEnvelope>>;

    /// Read the most recently committed event.
    async fn read_latest(&self) -> ConcordResult<Option<EventEnvelope>>;

    /// The highest committed sequence (0 when the ledger is empty).
    async fn head_sequence(&self) -> ConcordResult<Sequence>;
}

/// Event streaming port used by the projection rebuild service.
#[async_trait::async_trait]
pub trait EventQuery: Send + Sync {
    /// Events with sequence strictly greater than `after`, ascending,
    /// bounded by `limit`.
    async fn events_after(
        &self,
        after: Sequence,
        limit: usize,
    ) -> ConcordResult<Vec<EventEnvelope>>;

    /// Events of one type with sequence strictly greater than `after`.
    async fn events_by_type(
        &self,
        event_type: &str,
        after: Sequence,
        limit: usize,
    ) -> ConcordResult<Vec<EventEnvelope>>;
}

/// Terminal-state checker port: has an irrevocable cessation event been
/// recorded? This check never resets.
#[async_trait::async_trait]
pub trait TerminalChecker: Send + Sync {
    async fn status(&self) -> ConcordResult<CheckerStatus>;
}

/// Freeze checker port: dual-channel operational freeze flag.
#[async_trait::async_trait]
pub trait FreezeChecker: Send + Sync {
    async fn status(&self) -> ConcordResult<FreezeStatus>;
}

/// Halt checker port: temporary administrative halt; reversible.
#[async_trait::async_trait]
pub trait HaltChecker: Send + Sync {
    async fn status(&self) -> ConcordResult<CheckerStatus>;
}

/// Checkpoint anchor persistence.
#[async_trait::async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Persist a newly sealed anchor.
    async fn insert(&self, anchor: CheckpointAnchor) -> ConcordResult<()>;

    /// The anchor with the highest `sequence_end`, if any.
    async fn latest(&self) -> ConcordResult<Option<CheckpointAnchor>>;

    /// The sealed anchor whose range covers the given sequence, if any.
    async fn find_covering(&self, sequence: Sequence) -> ConcordResult<Option<CheckpointAnchor>>;

    /// Attach an external reference to a sealed anchor. The merkle root and
    /// sequence range are never touched.
    async fn attach_reference(
        &self,
        checkpoint_id: CheckpointId,
        anchor_type: AnchorType,
        reference: String,
    ) -> ConcordResult<CheckpointAnchor>;
}

/// A projection record write within an apply unit.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordWrite {
    pub key: String,
    pub record: Value,
}

/// The atomic unit committed per applied event: optional record write,
/// apply-log entry, and advanced checkpoint cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyUpdate {
    pub projection_name: String,
    pub write: Option<RecordWrite>,
    pub log_entry: ApplyLogEntry,
    pub checkpoint: ProjectionCheckpoint,
}

/// Projection-side storage: derived records, apply log, and checkpoints.
/// Never written back into the ledger.
#[async_trait::async_trait]
pub trait ProjectionStore: Send + Sync {
    /// Current derived record for a key, if any.
    async fn record(&self, projection: &str, key: &str) -> ConcordResult<Option<Value>>;

    /// All records of a projection, keyed. Used by audits and equivalence
    /// checks; large projections page through `record` instead.
    async fn records(&self, projection: &str) -> ConcordResult<BTreeMap<String, Value>>;

    /// Whether `(projection, event_id)` is already in the apply log.
    async fn is_applied(&self, projection: &str, event_id: EventId) -> ConcordResult<bool>;

    /// Commit one apply unit atomically. Fails with `IdempotencyConflict`
    /// when the apply-log entry already exists (a concurrent applier won).
    async fn commit_apply(&self, update: ApplyUpdate) -> ConcordResult<()>;

    /// The projection's resumption cursor (initial cursor when absent).
    async fn checkpoint(&self, projection: &str) -> ConcordResult<ProjectionCheckpoint>;

    /// Number of apply-log entries for a projection.
    async fn apply_log_count(&self, projection: &str) -> ConcordResult<usize>;

    /// Drop all records, apply-log entries, and the checkpoint for a
    /// projection. Used by rebuild.
    async fn clear_projection(&self, projection: &str) -> ConcordResult<()>;

    /// Claim the rebuild-in-progress marker. Fails with
    /// `RebuildInProgress` when another rebuild holds it.
    async fn try_begin_rebuild(&self, projection: &str) -> ConcordResult<()>;

    /// Release the rebuild-in-progress marker.
    async fn end_rebuild(&self, projection: &str) -> ConcordResult<()>;
}
