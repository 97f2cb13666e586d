//! Error types for CONCORD operations.
//!
//! Integrity violations and gate rejections are fatal for the operation and
//! non-retryable; they carry enough context (sequence, hashes, timestamps,
//! offending field) to reconstruct the failure externally. Checkpoint and
//! projection-apply failures are retryable: the un-sealed range or
//! unadvanced cursor is picked up on the next pass.

use crate::{EventId, Sequence, Timestamp};
use thiserror::Error;

/// Integrity errors: hash and chain violations. Non-retryable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IntegrityError {
    #[error("Unsupported hash algorithm: {algorithm}")]
    UnsupportedAlgorithm { algorithm: String },

    #[error("Self-hash mismatch for event {event_id} at sequence {sequence}: stored {stored}, computed {computed}")]
    HashMismatch {
        event_id: EventId,
        sequence: Sequence,
        stored: String,
        computed: String,
    },

    #[error("Chain break at sequence {sequence}: prev_hash {found_prev} does not match predecessor hash {expected_prev}")]
    ChainBreak {
        sequence: Sequence,
        expected_prev: String,
        found_prev: String,
    },

    #[error("Sequence gap: missing range [{missing_start}, {missing_end}]")]
    SequenceGap {
        missing_start: Sequence,
        missing_end: Sequence,
    },
}

/// Write-path gate rejections. Each stage raises a distinct error carrying
/// the relevant timestamp/sequence context; never a generic failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GateError {
    #[error("Write rejected: ledger terminated at {since:?} ({reason}), head sequence {head_sequence}")]
    TerminalWriteRejected {
        since: Option<Timestamp>,
        reason: String,
        head_sequence: Sequence,
    },

    #[error("Write rejected: ledger frozen at {since:?} ({reason}), head sequence {head_sequence}")]
    FrozenWriteRejected {
        since: Option<Timestamp>,
        reason: String,
        head_sequence: Sequence,
    },

    #[error("Write rejected: ledger halted at {since:?} ({reason}), head sequence {head_sequence}")]
    HaltedWriteRejected {
        since: Option<Timestamp>,
        reason: String,
        head_sequence: Sequence,
    },
}

/// Inclusion-proof errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProofError {
    #[error("Merkle proof invalid: recombined root {computed} does not match expected root {expected}")]
    MerkleProofInvalid { computed: String, expected: String },

    #[error("Chain proof broken at sequence {sequence}")]
    ChainProofBroken { sequence: Sequence },

    #[error("No event at sequence {sequence} (head is {head_sequence})")]
    UnknownSequence {
        sequence: Sequence,
        head_sequence: Sequence,
    },

    #[error("Leaf index {index} out of range for tree of {leaf_count} leaves")]
    LeafOutOfRange { index: usize, leaf_count: usize },

    #[error("Cannot build a merkle tree over zero leaves")]
    EmptyTree,
}

/// Projection engine errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProjectionError {
    #[error("Apply-log conflict: event {event_id} already applied to projection {projection}")]
    IdempotencyConflict {
        projection: String,
        event_id: EventId,
    },

    #[error("Rebuild already in progress for projection {projection}")]
    RebuildInProgress { projection: String },

    #[error("No handler registered for projection {projection}")]
    UnknownProjection { projection: String },

    #[error("Handler for projection {projection} failed on event type {event_type}: {reason}")]
    HandlerFailed {
        projection: String,
        event_type: String,
        reason: String,
    },
}

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Event not found at sequence {sequence}")]
    NotFound { sequence: Sequence },

    #[error("Append failed: {reason}")]
    AppendFailed { reason: String },

    #[error("Non-contiguous append: expected sequence {expected}, got {got}")]
    NonContiguousAppend { expected: Sequence, got: Sequence },

    #[error("Checkpoint not found: {checkpoint_id}")]
    CheckpointNotFound { checkpoint_id: uuid::Uuid },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all CONCORD errors.
#[derive(Debug, Clone, Error)]
pub enum ConcordError {
    #[error("Integrity error: {0}")]
    Integrity(#[from] IntegrityError),

    #[error("Gate rejection: {0}")]
    Gate(#[from] GateError),

    #[error("Proof error: {0}")]
    Proof(#[from] ProofError),

    #[error("Projection error: {0}")]
    Projection(#[from] ProjectionError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl ConcordError {
    /// Whether the failed operation may be retried.
    ///
    /// Integrity violations and gate rejections are permanent for the
    /// attempted write; storage and projection failures leave durable state
    /// unadvanced and are safe to retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            ConcordError::Integrity(_) | ConcordError::Gate(_) | ConcordError::Config(_) => false,
            ConcordError::Proof(_) => false,
            ConcordError::Projection(e) => !matches!(
                e,
                ProjectionError::UnknownProjection { .. } | ProjectionError::HandlerFailed { .. }
            ),
            ConcordError::Storage(_) => true,
        }
    }
}

/// Result type alias for CONCORD operations.
pub type ConcordResult<T> = Result<T, ConcordError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_integrity_error_display_hash_mismatch() {
        let err = IntegrityError::HashMismatch {
            event_id: Uuid::nil(),
            sequence: 7,
            stored: "blake3:aa".to_string(),
            computed: "blake3:bb".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("sequence 7"));
        assert!(msg.contains("blake3:aa"));
        assert!(msg.contains("blake3:bb"));
    }

    #[test]
    fn test_gate_error_display_terminal() {
        let err = GateError::TerminalWriteRejected {
            since: None,
            reason: "cessation recorded".to_string(),
            head_sequence: 42,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("terminated"));
        assert!(msg.contains("cessation recorded"));
        assert!(msg.contains("42"));
    }

    #[test]
    fn test_projection_error_display_rebuild_in_progress() {
        let err = ProjectionError::RebuildInProgress {
            projection: "task_state".to_string(),
        };
        assert!(format!("{}", err).contains("task_state"));
    }

    #[test]
    fn test_concord_error_from_variants() {
        let integrity = ConcordError::from(IntegrityError::SequenceGap {
            missing_start: 3,
            missing_end: 3,
        });
        assert!(matches!(integrity, ConcordError::Integrity(_)));

        let storage = ConcordError::from(StorageError::LockPoisoned);
        assert!(matches!(storage, ConcordError::Storage(_)));

        let gate = ConcordError::from(GateError::HaltedWriteRejected {
            since: None,
            reason: "maintenance".to_string(),
            head_sequence: 0,
        });
        assert!(matches!(gate, ConcordError::Gate(_)));
    }

    #[test]
    fn test_retryability_classification() {
        assert!(!ConcordError::from(IntegrityError::UnsupportedAlgorithm {
            algorithm: "md5".to_string(),
        })
        .is_retryable());
        assert!(ConcordError::from(StorageError::AppendFailed {
            reason: "io".to_string(),
        })
        .is_retryable());
        assert!(ConcordError::from(ProjectionError::IdempotencyConflict {
            projection: "task_state".to_string(),
            event_id: Uuid::nil(),
        })
        .is_retryable());
    }
}
