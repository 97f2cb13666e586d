//! Chain audit over stored events.
//!
//! Re-verifies the hash chain as persisted: self-hashes, prev-hash linkage,
//! and sequence contiguity. The auditor reads in bounded batches so a long
//! ledger never has to fit in memory, carrying the last verified envelope
//! across batch boundaries.

use concord_core::{
    chain::{verify_chain_link, verify_self_hash},
    ConcordResult, EventEnvelope, IntegrityError, Sequence,
};
use concord_storage::LedgerStore;
use std::sync::Arc;

/// A clean audit result: the verified range and its boundary hashes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditReport {
    pub first_sequence: Sequence,
    pub last_sequence: Sequence,
    pub events_verified: u64,
    pub head_hash: String,
}

/// Verifies stored chain integrity in batches.
pub struct ChainAuditor<S> {
    ledger: Arc<S>,
    batch_size: usize,
}

impl<S> ChainAuditor<S>
where
    S: LedgerStore,
{
    pub fn new(ledger: Arc<S>, batch_size: usize) -> Self {
        Self { ledger, batch_size }
    }

    /// Audit the full ledger from genesis to head.
    pub async fn verify_all(&self) -> ConcordResult<Option<AuditReport>> {
        let head = self.ledger.head_sequence().await?;
        if head == 0 {
            return Ok(None);
        }
        self.verify_range(1, head).await.map(Some)
    }

    /// Audit an inclusive sequence range.
    ///
    /// When the range does not start at genesis, the predecessor event is
    /// loaded so the first link is checked against real chain state rather
    /// than trusted blindly.
    pub async fn verify_range(
        &self,
        start: Sequence,
        end: Sequence,
    ) -> ConcordResult<AuditReport> {
        let mut previous: Option<EventEnvelope> = if start > 1 {
            let predecessor = self.ledger.read_by_sequence(start - 1).await?.ok_or(
                IntegrityError::SequenceGap {
                    missing_start: start - 1,
                    missing_end: start - 1,
                },
            )?;
            Some(predecessor)
        } else {
            None
        };

        let step = (self.batch_size as u64).max(1);
        let mut cursor = start;
        let mut verified: u64 = 0;
        while cursor <= end {
            let batch_end = cursor.saturating_add(step - 1).min(end);
            let batch = self.ledger.read_range(cursor, batch_end).await?;

            let mut expected = cursor;
            for event in &batch {
                if event.sequence != expected {
                    return Err(IntegrityError::SequenceGap {
                        missing_start: expected,
                        missing_end: event.sequence - 1,
                    }
                    .into());
                }
                verify_self_hash(event)?;
                verify_chain_link(event, previous.as_ref())?;
                previous = Some(event.clone());
                expected += 1;
                verified += 1;
            }
            if expected <= batch_end {
                return Err(IntegrityError::SequenceGap {
                    missing_start: expected,
                    missing_end: batch_end,
                }
                .into());
            }
            cursor = batch_end + 1;
        }

        let head = previous.ok_or(IntegrityError::SequenceGap {
            missing_start: start,
            missing_end: end,
        })?;
        tracing::debug!(
            first_sequence = start,
            last_sequence = end,
            events_verified = verified,
            "chain audit clean"
        );
        Ok(AuditReport {
            first_sequence: start,
            last_sequence: end,
            events_verified: verified,
            head_hash: head.hash,
        })
    }
}
