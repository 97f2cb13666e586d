//! In-memory port implementations for tests and development.
//!
//! Tables live behind `RwLock`s; the projection store keeps its three
//! tables under one lock so `commit_apply` is a single atomic unit, the
//! same guarantee a durable implementation gets from one transaction.

use crate::ports::{
    ApplyUpdate, CheckpointStore, EventQuery, FreezeChecker, HaltChecker, LedgerStore,
    ProjectionStore, TerminalChecker,
};
use chrono::Utc;
use concord_core::{
    AnchorType, CheckerStatus, CheckpointAnchor, CheckpointId, ConcordResult, EventEnvelope,
    EventId, FreezeStatus, ProjectionCheckpoint, ProjectionError, Sequence, StorageError,
};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, RwLock};

// ============================================================================
// LEDGER STORE
// ============================================================================

/// In-memory ledger store.
///
/// Events live in a `BTreeMap` keyed by sequence, so range scans observe a
/// consistent, monotonically increasing view. The append path checks
/// contiguity under the write lock, which is the atomic
/// sequence-assignment primitive for this implementation.
pub struct InMemoryLedgerStore {
    events: Arc<RwLock<BTreeMap<Sequence, EventEnvelope>>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self {
            events: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Number of committed events.
    pub fn len(&self) -> ConcordResult<usize> {
        let events = self.events.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(events.len())
    }

    pub fn is_empty(&self) -> ConcordResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Overwrite a stored event in place. Test-only corruption hook; the
    /// ledger contract forbids updates.
    pub fn corrupt_for_test(&self, event: EventEnvelope) -> ConcordResult<()> {
        let mut events = self
            .events
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        events.insert(event.sequence, event);
        Ok(())
    }
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for InMemoryLedgerStore {
    fn clone(&self) -> Self {
        Self {
            events: Arc::clone(&self.events),
        }
    }
}

#[async_trait::async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn append(&self, event: EventEnvelope) -> ConcordResult<EventEnvelope> {
        let mut events = self
            .events
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;

        let expected = events.keys().next_back().copied().unwrap_or(0) + 1;
        if event.sequence != expected {
            return Err(StorageError::NonContiguousAppend {
                expected,
                got: event.sequence,
            }
            .into());
        }

        events.insert(event.sequence, event.clone());
        Ok(event)
    }

    async fn read_by_sequence(&self, sequence: Sequence) -> ConcordResult<Option<EventEnvelope>> {
        let events = self.events.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(events.get(&sequence).cloned())
    }

    async fn read_range(
        &self,
        start: Sequence,
        end: Sequence,
    ) -> ConcordResult<Vec<EventEnvelope>> {
        let events = self.events.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(events.range(start..=end).map(|(_, e)| e.clone()).collect())
    }

    async fn read_latest(&self) -> ConcordResult<Option<EventEnvelope>> {
        let events = self.events.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(events.values().next_back().cloned())
    }

    async fn head_sequence(&self) -> ConcordResult<Sequence> {
        let events = self.events.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(events.keys().next_back().copied().unwrap_or(0))
    }
}

#[async_trait::async_trait]
impl EventQuery for InMemoryLedgerStore {
    async fn events_after(
        &self,
        after: Sequence,
        limit: usize,
    ) -> ConcordResult<Vec<EventEnvelope>> {
        let events = self.events.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(events
            .range(after + 1..)
            .take(limit)
            .map(|(_, e)| e.clone())
            .collect())
    }

    async fn events_by_type(
        &self,
        event_type: &str,
        after: Sequence,
        limit: usize,
    ) -> ConcordResult<Vec<EventEnvelope>> {
        let events = self.events.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(events
            .range(after + 1..)
            .filter(|(_, e)| e.event_type == event_type)
            .take(limit)
            .map(|(_, e)| e.clone())
            .collect())
    }
}

// ============================================================================
// CHECKPOINT STORE
// ============================================================================

/// In-memory checkpoint anchor store.
pub struct InMemoryCheckpointStore {
    anchors: Arc<RwLock<Vec<CheckpointAnchor>>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self {
            anchors: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn count(&self) -> ConcordResult<usize> {
        let anchors = self
            .anchors
            .read()
            .map_err(|_| StorageError::LockPoisoned)?;
        Ok(anchors.len())
    }
}

impl Default for InMemoryCheckpointStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for InMemoryCheckpointStore {
    fn clone(&self) -> Self {
        Self {
            anchors: Arc::clone(&self.anchors),
        }
    }
}

#[async_trait::async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn insert(&self, anchor: CheckpointAnchor) -> ConcordResult<()> {
        let mut anchors = self
            .anchors
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        anchors.push(anchor);
        Ok(())
    }

    async fn latest(&self) -> ConcordResult<Option<CheckpointAnchor>> {
        let anchors = self
            .anchors
            .read()
            .map_err(|_| StorageError::LockPoisoned)?;
        Ok(anchors.iter().max_by_key(|a| a.sequence_end).cloned())
    }

    async fn find_covering(&self, sequence: Sequence) -> ConcordResult<Option<CheckpointAnchor>> {
        let anchors = self
            .anchors
            .read()
            .map_err(|_| StorageError::LockPoisoned)?;
        Ok(anchors.iter().find(|a| a.covers(sequence)).cloned())
    }

    async fn attach_reference(
        &self,
        checkpoint_id: CheckpointId,
        anchor_type: AnchorType,
        reference: String,
    ) -> ConcordResult<CheckpointAnchor> {
        let mut anchors = self
            .anchors
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        let anchor = anchors
            .iter_mut()
            .find(|a| a.checkpoint_id == checkpoint_id)
            .ok_or(StorageError::CheckpointNotFound { checkpoint_id })?;
        anchor.anchor_type = anchor_type;
        anchor.anchor_reference = Some(reference);
        Ok(anchor.clone())
    }
}

// ============================================================================
// GATE FLAGS
// ============================================================================

/// In-memory terminal/freeze/halt flags implementing all three checker
/// ports. The freeze flag is held as two independent channels; setting the
/// terminal flag also sets both freeze channels (cessation triggers freeze).
pub struct InMemoryGateFlags {
    terminal: Arc<RwLock<CheckerStatus>>,
    freeze: Arc<RwLock<FreezeStatus>>,
    halt: Arc<RwLock<CheckerStatus>>,
}

impl InMemoryGateFlags {
    pub fn new() -> Self {
        Self {
            terminal: Arc::new(RwLock::new(CheckerStatus::clear())),
            freeze: Arc::new(RwLock::new(FreezeStatus::default())),
            halt: Arc::new(RwLock::new(CheckerStatus::clear())),
        }
    }

    /// Record an irrevocable cessation. Sets both freeze channels as well.
    pub fn set_terminal(&self, reason: impl Into<String>) -> ConcordResult<()> {
        let reason = reason.into();
        let now = Utc::now();
        {
            let mut terminal = self
                .terminal
                .write()
                .map_err(|_| StorageError::LockPoisoned)?;
            *terminal = CheckerStatus::engaged(now, reason.clone());
        }
        let mut freeze = self
            .freeze
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        freeze.primary = true;
        freeze.mirror = true;
        freeze.since.get_or_insert(now);
        freeze.reason.get_or_insert(reason);
        Ok(())
    }

    /// Set one freeze channel ("primary" mirrored storage path or "mirror").
    pub fn set_freeze_channel(
        &self,
        primary: bool,
        mirror: bool,
        reason: impl Into<String>,
    ) -> ConcordResult<()> {
        let mut freeze = self
            .freeze
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        freeze.primary = freeze.primary || primary;
        freeze.mirror = freeze.mirror || mirror;
        freeze.since.get_or_insert(Utc::now());
        freeze.reason = Some(reason.into());
        Ok(())
    }

    /// Engage the reversible administrative halt.
    pub fn set_halt(&self, reason: impl Into<String>) -> ConcordResult<()> {
        let mut halt = self.halt.write().map_err(|_| StorageError::LockPoisoned)?;
        *halt = CheckerStatus::engaged(Utc::now(), reason);
        Ok(())
    }

    /// Clear the administrative halt.
    pub fn clear_halt(&self) -> ConcordResult<()> {
        let mut halt = self.halt.write().map_err(|_| StorageError::LockPoisoned)?;
        *halt = CheckerStatus::clear();
        Ok(())
    }
}

impl Default for InMemoryGateFlags {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for InMemoryGateFlags {
    fn clone(&self) -> Self {
        Self {
            terminal: Arc::clone(&self.terminal),
            freeze: Arc::clone(&self.freeze),
            halt: Arc::clone(&self.halt),
        }
    }
}

#[async_trait::async_trait]
impl TerminalChecker for InMemoryGateFlags {
    async fn status(&self) -> ConcordResult<CheckerStatus> {
        let terminal = self
            .terminal
            .read()
            .map_err(|_| StorageError::LockPoisoned)?;
        Ok(terminal.clone())
    }
}

#[async_trait::async_trait]
impl FreezeChecker for InMemoryGateFlags {
    async fn status(&self) -> ConcordResult<FreezeStatus> {
        let freeze = self.freeze.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(freeze.clone())
    }
}

#[async_trait::async_trait]
impl HaltChecker for InMemoryGateFlags {
    async fn status(&self) -> ConcordResult<CheckerStatus> {
        let halt = self.halt.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(halt.clone())
    }
}

// ============================================================================
// PROJECTION STORE
// ============================================================================

#[derive(Default)]
struct ProjectionTables {
    records: HashMap<(String, String), Value>,
    apply_log: HashSet<(String, EventId)>,
    checkpoints: HashMap<String, ProjectionCheckpoint>,
    rebuilding: HashSet<String>,
}

/// In-memory projection store. All tables sit under one lock so each
/// `commit_apply` is atomic with respect to concurrent appliers.
pub struct InMemoryProjectionStore {
    tables: Arc<RwLock<ProjectionTables>>,
}

impl InMemoryProjectionStore {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(ProjectionTables::default())),
        }
    }
}

impl Default for InMemoryProjectionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for InMemoryProjectionStore {
    fn clone(&self) -> Self {
        Self {
            tables: Arc::clone(&self.tables),
        }
    }
}

#[async_trait::async_trait]
impl ProjectionStore for InMemoryProjectionStore {
    async fn record(&self, projection: &str, key: &str) -> ConcordResult<Option<Value>> {
        let tables = self.tables.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(tables
            .records
            .get(&(projection.to_string(), key.to_string()))
            .cloned())
    }

    async fn records(&self, projection: &str) -> ConcordResult<BTreeMap<String, Value>> {
        let tables = self.tables.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(tables
            .records
            .iter()
            .filter(|((p, _), _)| p == projection)
            .map(|((_, k), v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn is_applied(&self, projection: &str, event_id: EventId) -> ConcordResult<bool> {
        let tables = self.tables.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(tables
            .apply_log
            .contains(&(projection.to_string(), event_id)))
    }

    async fn commit_apply(&self, update: ApplyUpdate) -> ConcordResult<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;

        let log_key = (update.projection_name.clone(), update.log_entry.event_id);
        if tables.apply_log.contains(&log_key) {
            return Err(ProjectionError::IdempotencyConflict {
                projection: update.projection_name,
                event_id: update.log_entry.event_id,
            }
            .into());
        }

        if let Some(write) = update.write {
            tables
                .records
                .insert((update.projection_name.clone(), write.key), write.record);
        }
        tables.apply_log.insert(log_key);
        tables
            .checkpoints
            .insert(update.projection_name, update.checkpoint);
        Ok(())
    }

    async fn checkpoint(&self, projection: &str) -> ConcordResult<ProjectionCheckpoint> {
        let tables = self.tables.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(tables
            .checkpoints
            .get(projection)
            .cloned()
            .unwrap_or_else(|| ProjectionCheckpoint::initial(projection)))
    }

    async fn apply_log_count(&self, projection: &str) -> ConcordResult<usize> {
        let tables = self.tables.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(tables
            .apply_log
            .iter()
            .filter(|(p, _)| p == projection)
            .count())
    }

    async fn clear_projection(&self, projection: &str) -> ConcordResult<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        tables.records.retain(|(p, _), _| p != projection);
        tables.apply_log.retain(|(p, _)| p != projection);
        tables.checkpoints.remove(projection);
        Ok(())
    }

    async fn try_begin_rebuild(&self, projection: &str) -> ConcordResult<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        if !tables.rebuilding.insert(projection.to_string()) {
            return Err(ProjectionError::RebuildInProgress {
                projection: projection.to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn end_rebuild(&self, projection: &str) -> ConcordResult<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        tables.rebuilding.remove(projection);
        Ok(())
    }
}
