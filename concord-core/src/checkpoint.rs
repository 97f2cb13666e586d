//! Checkpoint anchors and inclusion proofs.
//!
//! A checkpoint anchor seals a contiguous sequence range under a Merkle
//! root. Proofs are ephemeral: computed on demand from a sealed checkpoint's
//! tree, never persisted (the anchor is the durable artifact).

use crate::{Sequence, Timestamp};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Checkpoint identifier.
pub type CheckpointId = Uuid;

/// External anchoring status of a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnchorType {
    /// Sealed locally, no external reference yet.
    #[default]
    Pending,
    /// Externally timestamped (e.g. RFC 3161).
    Timestamped,
    /// Externally anchored (e.g. a public chain transaction).
    Anchored,
}

/// A sealed summary over a contiguous sequence range.
///
/// Immutable once sealed: `merkle_root` and the sequence range never change.
/// The anchor may later gain an `anchor_reference` when an external
/// timestamp or anchor is obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointAnchor {
    pub checkpoint_id: CheckpointId,
    pub sequence_start: Sequence,
    pub sequence_end: Sequence,
    pub merkle_root: String,
    pub created_at: Timestamp,
    pub anchor_type: AnchorType,
    pub anchor_reference: Option<String>,
    pub event_count: u64,
}

impl CheckpointAnchor {
    /// Whether the given sequence falls inside this anchor's range.
    pub fn covers(&self, sequence: Sequence) -> bool {
        sequence >= self.sequence_start && sequence <= self.sequence_end
    }
}

/// Position of a sibling hash relative to the path node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiblingPosition {
    Left,
    Right,
}

/// One step of a Merkle inclusion path, leaf to root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    pub level: u32,
    pub position: SiblingPosition,
    pub sibling_hash: String,
}

/// A logarithmic-size proof of an event's membership under a checkpoint
/// root. Combination is strictly positional: verification recombines
/// left/right exactly as recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub event_sequence: Sequence,
    pub event_hash: String,
    pub checkpoint_sequence: Sequence,
    pub checkpoint_root: String,
    pub path: Vec<ProofStep>,
    pub tree_size: u64,
}

/// One link of a linear chain proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainLink {
    pub sequence: Sequence,
    pub hash: String,
    pub prev_hash: String,
}

/// A linear hash-chain proof for events newer than the latest sealed
/// checkpoint: the ordered links from the queried event up to the head.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainProof {
    pub event_sequence: Sequence,
    pub event_hash: String,
    pub head_sequence: Sequence,
    pub head_hash: String,
    pub links: Vec<ChainLink>,
}

/// A proof of inclusion, distinguishing how it was produced.
///
/// Events inside a sealed checkpoint get a Merkle proof; events in the
/// pending interval fall back to a chain proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InclusionProof {
    Merkle(MerkleProof),
    Chain(ChainProof),
}

impl InclusionProof {
    /// The sequence of the event this proof covers.
    pub fn event_sequence(&self) -> Sequence {
        match self {
            InclusionProof::Merkle(p) => p.event_sequence,
            InclusionProof::Chain(p) => p.event_sequence,
        }
    }
}
