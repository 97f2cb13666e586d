//! Projection record types.
//!
//! Projections are derived, queryable views reconstructed deterministically
//! from the ledger; they are never authoritative and may be dropped and
//! rebuilt at any time. Every record carries provenance (the sequence and
//! hash of the last event that shaped it).

use crate::{EventId, Sequence, Timestamp};
use serde::{Deserialize, Serialize};

/// Provenance carried by every projection record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub last_event_sequence: Sequence,
    pub last_event_hash: String,
}

/// Recorded proof that an event has been applied to a projection.
///
/// The composite key `(projection_name, event_id)` is the sole idempotency
/// mechanism: existence is checked before applying, and a present entry
/// makes re-application a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyLogEntry {
    pub projection_name: String,
    pub event_id: EventId,
    pub applied_at: Timestamp,
}

/// Per-projection resumption cursor for incremental application and crash
/// recovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionCheckpoint {
    pub projection_name: String,
    pub last_event_id: Option<EventId>,
    pub last_hash: Option<String>,
    pub last_sequence: Sequence,
}

impl ProjectionCheckpoint {
    /// The initial cursor: before genesis.
    pub fn initial(projection_name: impl Into<String>) -> Self {
        Self {
            projection_name: projection_name.into(),
            last_event_id: None,
            last_hash: None,
            last_sequence: 0,
        }
    }
}

// ============================================================================
// TASK STATE PROJECTION
// ============================================================================

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Open,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    /// Parse a status tag carried in event payloads.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "open" => Some(TaskStatus::Open),
            "in_progress" => Some(TaskStatus::InProgress),
            "completed" => Some(TaskStatus::Completed),
            "cancelled" => Some(TaskStatus::Cancelled),
            _ => None,
        }
    }
}

/// Derived task state, keyed by task identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStateRecord {
    pub task_id: String,
    pub title: String,
    pub status: TaskStatus,
    pub assignee: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(flatten)]
    pub provenance: Provenance,
}

// ============================================================================
// ACTOR REGISTRY PROJECTION
// ============================================================================

/// Actor registration status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorStatus {
    Active,
    Suspended,
}

/// Derived actor registry entry, keyed by actor identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorRecord {
    pub actor_id: String,
    pub display_name: String,
    pub status: ActorStatus,
    pub registered_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(flatten)]
    pub provenance: Provenance,
}
