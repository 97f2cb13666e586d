//! Checkpoint sealing.
//!
//! A checkpoint seals the contiguous range from the end of the previous
//! checkpoint to the current head under a Merkle root. Sealing never blocks
//! appends: it reads a committed range and writes one anchor row. A failed
//! seal leaves no partial state; the un-sealed range is picked up by the
//! next pass.

use chrono::Utc;
use concord_core::{
    AnchorType, CheckpointAnchor, CheckpointId, ConcordResult, HashAlgorithm, Sequence,
};
use concord_storage::{CheckpointStore, LedgerStore};
use std::sync::Arc;
use uuid::Uuid;

use crate::merkle::MerkleTree;

/// Seals contiguous event ranges into checkpoint anchors.
pub struct CheckpointService<S, C> {
    ledger: Arc<S>,
    checkpoints: Arc<C>,
    algorithm: HashAlgorithm,
    interval_events: u64,
}

impl<S, C> CheckpointService<S, C>
where
    S: LedgerStore,
    C: CheckpointStore,
{
    pub fn new(
        ledger: Arc<S>,
        checkpoints: Arc<C>,
        algorithm: HashAlgorithm,
        interval_events: u64,
    ) -> Self {
        Self {
            ledger,
            checkpoints,
            algorithm,
            interval_events,
        }
    }

    /// The first sequence the next checkpoint would cover.
    async fn next_start(&self) -> ConcordResult<Sequence> {
        let latest = self.checkpoints.latest().await?;
        Ok(latest.map(|a| a.sequence_end).unwrap_or(0) + 1)
    }

    /// Seal everything from the end of the latest checkpoint through the
    /// current head. Returns `None` when no new events have arrived.
    pub async fn seal(&self) -> ConcordResult<Option<CheckpointAnchor>> {
        let start = self.next_start().await?;
        let head = self.ledger.head_sequence().await?;
        if head < start {
            return Ok(None);
        }

        let events = self.ledger.read_range(start, head).await?;
        let leaves: Vec<String> = events.iter().map(|e| e.hash.clone()).collect();
        let tree = MerkleTree::build(&leaves, self.algorithm)?;

        let anchor = CheckpointAnchor {
            checkpoint_id: Uuid::now_v7(),
            sequence_start: start,
            sequence_end: head,
            merkle_root: tree.root().to_string(),
            created_at: Utc::now(),
            anchor_type: AnchorType::Pending,
            anchor_reference: None,
            event_count: leaves.len() as u64,
        };
        self.checkpoints.insert(anchor.clone()).await?;

        tracing::info!(
            checkpoint_id = %anchor.checkpoint_id,
            sequence_start = anchor.sequence_start,
            sequence_end = anchor.sequence_end,
            merkle_root = %anchor.merkle_root,
            event_count = anchor.event_count,
            "checkpoint sealed"
        );
        Ok(Some(anchor))
    }

    /// Seal only when the pending interval has reached the configured event
    /// count. The periodic driver calls this; `seal` is for explicit
    /// administrative sealing.
    pub async fn seal_if_due(&self) -> ConcordResult<Option<CheckpointAnchor>> {
        let start = self.next_start().await?;
        let head = self.ledger.head_sequence().await?;
        let pending = head.saturating_sub(start.saturating_sub(1));
        if pending < self.interval_events {
            return Ok(None);
        }
        self.seal().await
    }

    /// Record an external timestamp or anchor reference against a sealed
    /// checkpoint. The root and range are immutable; only the anchoring
    /// status changes.
    pub async fn attach_reference(
        &self,
        checkpoint_id: CheckpointId,
        anchor_type: AnchorType,
        reference: impl Into<String>,
    ) -> ConcordResult<CheckpointAnchor> {
        let anchor = self
            .checkpoints
            .attach_reference(checkpoint_id, anchor_type, reference.into())
            .await?;
        tracing::info!(
            checkpoint_id = %anchor.checkpoint_id,
            anchor_type = ?anchor.anchor_type,
            "external reference attached to checkpoint"
        );
        Ok(anchor)
    }
}
