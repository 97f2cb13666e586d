//! Inclusion proof generation and verification.
//!
//! Events covered by a sealed checkpoint get a logarithmic Merkle proof
//! against the checkpoint root. Events in the pending interval (newer than
//! the latest sealed checkpoint) fall back to a linear chain proof: the
//! ordered hash-chain links from the queried event up to the head. Proofs
//! are computed on demand and never persisted.

use concord_core::{
    hash::algorithm_of, ChainLink, ChainProof, ConcordResult, InclusionProof, MerkleProof,
    ProofError, Sequence,
};
use concord_storage::{CheckpointStore, LedgerStore};
use std::sync::Arc;

use crate::merkle::{verify_proof_path, MerkleTree};

/// Produces inclusion proofs for committed events.
pub struct ProofService<S, C> {
    ledger: Arc<S>,
    checkpoints: Arc<C>,
}

impl<S, C> ProofService<S, C>
where
    S: LedgerStore,
    C: CheckpointStore,
{
    pub fn new(ledger: Arc<S>, checkpoints: Arc<C>) -> Self {
        Self {
            ledger,
            checkpoints,
        }
    }

    /// Prove inclusion of the event at `sequence`: a Merkle proof when a
    /// sealed checkpoint covers it, otherwise a chain proof to the head.
    pub async fn prove(&self, sequence: Sequence) -> ConcordResult<InclusionProof> {
        let head_sequence = self.ledger.head_sequence().await?;
        if sequence == 0 || sequence > head_sequence {
            return Err(ProofError::UnknownSequence {
                sequence,
                head_sequence,
            }
            .into());
        }

        match self.checkpoints.find_covering(sequence).await? {
            Some(anchor) => self.merkle_proof(sequence, &anchor).await,
            None => self.chain_proof(sequence, head_sequence).await,
        }
    }

    async fn merkle_proof(
        &self,
        sequence: Sequence,
        anchor: &concord_core::CheckpointAnchor,
    ) -> ConcordResult<InclusionProof> {
        let events = self
            .ledger
            .read_range(anchor.sequence_start, anchor.sequence_end)
            .await?;
        let leaves: Vec<String> = events.iter().map(|e| e.hash.clone()).collect();

        let algorithm = algorithm_of(&anchor.merkle_root)?;
        let tree = MerkleTree::build(&leaves, algorithm)?;
        let leaf_index = (sequence - anchor.sequence_start) as usize;
        let path = tree.proof(leaf_index)?;

        Ok(InclusionProof::Merkle(MerkleProof {
            event_sequence: sequence,
            event_hash: leaves[leaf_index].clone(),
            checkpoint_sequence: anchor.sequence_end,
            checkpoint_root: anchor.merkle_root.clone(),
            path,
            tree_size: tree.padded_size() as u64,
        }))
    }

    async fn chain_proof(
        &self,
        sequence: Sequence,
        head_sequence: Sequence,
    ) -> ConcordResult<InclusionProof> {
        let events = self.ledger.read_range(sequence, head_sequence).await?;
        let links: Vec<ChainLink> = events
            .iter()
            .map(|e| ChainLink {
                sequence: e.sequence,
                hash: e.hash.clone(),
                prev_hash: e.prev_hash.clone(),
            })
            .collect();

        let first = links.first().ok_or(ProofError::UnknownSequence {
            sequence,
            head_sequence,
        })?;
        let last = links
            .last()
            .cloned()
            .unwrap_or_else(|| first.clone());

        Ok(InclusionProof::Chain(ChainProof {
            event_sequence: sequence,
            event_hash: first.hash.clone(),
            head_sequence: last.sequence,
            head_hash: last.hash,
            links,
        }))
    }
}

/// Verify an inclusion proof against its embedded commitment.
///
/// Merkle proofs recombine the leaf up the recorded path and compare to the
/// checkpoint root. Chain proofs walk the links from the queried event to
/// the head, requiring contiguous sequences and matching prev-hash linkage
/// at every step.
pub fn verify_proof(proof: &InclusionProof) -> ConcordResult<()> {
    match proof {
        InclusionProof::Merkle(p) => verify_proof_path(&p.event_hash, &p.path, &p.checkpoint_root),
        InclusionProof::Chain(p) => verify_chain_proof(p),
    }
}

fn verify_chain_proof(proof: &ChainProof) -> ConcordResult<()> {
    let first = proof
        .links
        .first()
        .ok_or(ProofError::ChainProofBroken {
            sequence: proof.event_sequence,
        })?;
    if first.sequence != proof.event_sequence || first.hash != proof.event_hash {
        return Err(ProofError::ChainProofBroken {
            sequence: proof.event_sequence,
        }
        .into());
    }

    for pair in proof.links.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        if next.sequence != prev.sequence + 1 || next.prev_hash != prev.hash {
            return Err(ProofError::ChainProofBroken {
                sequence: next.sequence,
            }
            .into());
        }
    }

    let last = proof.links.last().ok_or(ProofError::ChainProofBroken {
        sequence: proof.event_sequence,
    })?;
    if last.sequence != proof.head_sequence || last.hash != proof.head_hash {
        return Err(ProofError::ChainProofBroken {
            sequence: last.sequence,
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_core::{
        chain_events, kinds, ConcordError, DraftEvent, EventEnvelope, HashAlgorithm,
    };
    use concord_storage::{InMemoryCheckpointStore, InMemoryLedgerStore};
    use serde_json::json;
    use uuid::Uuid;

    use crate::checkpoint::CheckpointService;

    fn chained(n: u64, start: u64, preceding: Option<&str>) -> Vec<EventEnvelope> {
        let actor = Uuid::now_v7();
        let mut events: Vec<EventEnvelope> = (start..start + n)
            .map(|seq| {
                DraftEvent::new(kinds::TASK_CREATED, actor, json!({"seq": seq})).into_envelope(seq)
            })
            .collect();
        chain_events(&mut events, preceding, HashAlgorithm::Blake3).unwrap();
        events
    }

    async fn fixture(
        sealed: u64,
        pending: u64,
    ) -> (
        Arc<InMemoryLedgerStore>,
        Arc<InMemoryCheckpointStore>,
        ProofService<InMemoryLedgerStore, InMemoryCheckpointStore>,
    ) {
        let ledger = Arc::new(InMemoryLedgerStore::new());
        for event in chained(sealed, 1, None) {
            ledger.append(event).await.unwrap();
        }
        let checkpoints = Arc::new(InMemoryCheckpointStore::new());
        if sealed > 0 {
            CheckpointService::new(
                Arc::clone(&ledger),
                Arc::clone(&checkpoints),
                HashAlgorithm::Blake3,
                256,
            )
            .seal()
            .await
            .unwrap();
        }
        if pending > 0 {
            let preceding = ledger.read_latest().await.unwrap().map(|e| e.hash);
            for event in chained(pending, sealed + 1, preceding.as_deref()) {
                ledger.append(event).await.unwrap();
            }
        }
        let service = ProofService::new(Arc::clone(&ledger), Arc::clone(&checkpoints));
        (ledger, checkpoints, service)
    }

    #[tokio::test]
    async fn test_sealed_event_gets_merkle_proof() {
        let (_, _, service) = fixture(6, 2).await;
        let proof = service.prove(4).await.unwrap();
        match &proof {
            InclusionProof::Merkle(p) => {
                assert_eq!(p.event_sequence, 4);
                assert_eq!(p.checkpoint_sequence, 6);
                assert!(!p.path.is_empty());
            }
            InclusionProof::Chain(_) => panic!("expected merkle proof for sealed event"),
        }
        verify_proof(&proof).unwrap();
    }

    #[tokio::test]
    async fn test_pending_event_gets_chain_proof() {
        let (_, _, service) = fixture(4, 3).await;
        let proof = service.prove(6).await.unwrap();
        match &proof {
            InclusionProof::Chain(p) => {
                assert_eq!(p.event_sequence, 6);
                assert_eq!(p.head_sequence, 7);
                assert_eq!(p.links.len(), 2);
            }
            InclusionProof::Merkle(_) => panic!("expected chain proof for pending event"),
        }
        verify_proof(&proof).unwrap();
    }

    #[tokio::test]
    async fn test_head_event_chain_proof_is_single_link() {
        let (_, _, service) = fixture(0, 3).await;
        let proof = service.prove(3).await.unwrap();
        match &proof {
            InclusionProof::Chain(p) => {
                assert_eq!(p.links.len(), 1);
                assert_eq!(p.event_hash, p.head_hash);
            }
            InclusionProof::Merkle(_) => panic!("expected chain proof"),
        }
        verify_proof(&proof).unwrap();
    }

    #[tokio::test]
    async fn test_unknown_sequence_rejected() {
        let (_, _, service) = fixture(3, 0).await;
        for bad in [0u64, 9] {
            let err = service.prove(bad).await.unwrap_err();
            assert!(matches!(
                err,
                ConcordError::Proof(ProofError::UnknownSequence { .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_merkle_proof_detects_forged_leaf() {
        let (_, _, service) = fixture(5, 0).await;
        let proof = service.prove(2).await.unwrap();
        let forged = match proof {
            InclusionProof::Merkle(mut p) => {
                p.event_hash = HashAlgorithm::Blake3.compute(b"forged event");
                InclusionProof::Merkle(p)
            }
            other => other,
        };
        assert!(matches!(
            verify_proof(&forged).unwrap_err(),
            ConcordError::Proof(ProofError::MerkleProofInvalid { .. })
        ));
    }

    #[tokio::test]
    async fn test_chain_proof_detects_severed_link() {
        let (_, _, service) = fixture(0, 4).await;
        let proof = service.prove(2).await.unwrap();
        let severed = match proof {
            InclusionProof::Chain(mut p) => {
                p.links[1].prev_hash = HashAlgorithm::Blake3.compute(b"severed");
                InclusionProof::Chain(p)
            }
            other => other,
        };
        assert!(matches!(
            verify_proof(&severed).unwrap_err(),
            ConcordError::Proof(ProofError::ChainProofBroken { sequence: 3 })
        ));
    }

    #[tokio::test]
    async fn test_chain_proof_detects_truncated_head() {
        let (_, _, service) = fixture(0, 4).await;
        let proof = service.prove(2).await.unwrap();
        let truncated = match proof {
            InclusionProof::Chain(mut p) => {
                p.links.pop();
                InclusionProof::Chain(p)
            }
            other => other,
        };
        assert!(verify_proof(&truncated).is_err());
    }

    #[tokio::test]
    async fn test_second_checkpoint_covers_its_own_range() {
        let (ledger, checkpoints, service) = fixture(4, 3).await;
        CheckpointService::new(ledger, Arc::clone(&checkpoints), HashAlgorithm::Blake3, 256)
            .seal()
            .await
            .unwrap();

        // Sequence 6 was pending; after the second seal it gets a merkle
        // proof against the new root.
        let proof = service.prove(6).await.unwrap();
        match &proof {
            InclusionProof::Merkle(p) => assert_eq!(p.checkpoint_sequence, 7),
            InclusionProof::Chain(_) => panic!("expected merkle proof after sealing"),
        }
        verify_proof(&proof).unwrap();
    }
}
