//! Hash-chain construction and verification.
//!
//! Each event's hash is computed from its envelope (excluding the hash
//! field) and each event references its predecessor's hash. A self-hash
//! mismatch or broken link is a non-retryable integrity violation: callers
//! must halt further writes rather than skip past it.

use crate::error::{ConcordResult, IntegrityError};
use crate::event::EventEnvelope;
use crate::hash::{self, genesis_sentinel, HashAlgorithm};
use crate::Sequence;

/// Compute the prefixed hash for an envelope under the given algorithm.
///
/// The input is the canonical metadata bytes (hash field excluded)
/// concatenated with the canonical payload bytes.
pub fn compute_hash(envelope: &EventEnvelope, algorithm: HashAlgorithm) -> String {
    algorithm.compute(&envelope.hash_input())
}

/// Verify the stored self-hash of an envelope, selecting the algorithm from
/// the stored prefix.
pub fn verify_self_hash(envelope: &EventEnvelope) -> ConcordResult<()> {
    let algorithm = hash::algorithm_of(&envelope.hash)?;
    let computed = compute_hash(envelope, algorithm);
    if computed != envelope.hash {
        return Err(IntegrityError::HashMismatch {
            event_id: envelope.event_id,
            sequence: envelope.sequence,
            stored: envelope.hash.clone(),
            computed,
        }
        .into());
    }
    Ok(())
}

/// Verify the linkage between an event and its predecessor.
///
/// When `previous` is absent the event must be the first in sequence and
/// carry the genesis sentinel as `prev_hash`.
pub fn verify_chain_link(
    event: &EventEnvelope,
    previous: Option<&EventEnvelope>,
) -> ConcordResult<()> {
    let expected_prev = match previous {
        Some(prev) => {
            if prev.sequence + 1 != event.sequence {
                return Err(IntegrityError::SequenceGap {
                    missing_start: prev.sequence + 1,
                    missing_end: event.sequence - 1,
                }
                .into());
            }
            prev.hash.as_str()
        }
        None => genesis_sentinel(),
    };

    if event.prev_hash != expected_prev {
        return Err(IntegrityError::ChainBreak {
            sequence: event.sequence,
            expected_prev: expected_prev.to_string(),
            found_prev: event.prev_hash.clone(),
        }
        .into());
    }
    Ok(())
}

/// Walk an ordered slice of envelopes, computing and assigning
/// `prev_hash`/`hash` for each in turn.
///
/// The first envelope links to `preceding_hash` when given, otherwise to the
/// genesis sentinel. Used both for live append and for deterministic replay
/// validation.
pub fn chain_events(
    events: &mut [EventEnvelope],
    preceding_hash: Option<&str>,
    algorithm: HashAlgorithm,
) -> ConcordResult<()> {
    let mut prev = preceding_hash.unwrap_or_else(|| genesis_sentinel()).to_string();
    for event in events.iter_mut() {
        event.prev_hash = prev;
        event.hash = compute_hash(event, algorithm);
        prev = event.hash.clone();
    }
    Ok(())
}

/// Verify self-hash, linkage, and sequence contiguity over a stored range.
///
/// `preceding` is the event immediately before the range, if any. The first
/// failure is reported with full context; nothing is skipped.
pub fn verify_range(
    events: &[EventEnvelope],
    preceding: Option<&EventEnvelope>,
) -> ConcordResult<()> {
    let mut previous = preceding;
    for event in events {
        verify_self_hash(event)?;
        // A range scan starting mid-chain cannot check the first link
        // against the sentinel; require a predecessor or genesis position.
        if previous.is_some() || event.is_genesis() {
            verify_chain_link(event, previous)?;
        }
        previous = Some(event);
    }
    Ok(())
}

/// Detect missing sequence ranges in a sorted list of sequence numbers.
///
/// `[1, 2, 4, 5]` reports `[(3, 3)]`. The input is assumed ascending;
/// duplicates are ignored.
pub fn detect_gaps(sequences: &[Sequence]) -> Vec<(Sequence, Sequence)> {
    let mut gaps = Vec::new();
    for window in sequences.windows(2) {
        let (prev, next) = (window[0], window[1]);
        if next > prev + 1 {
            gaps.push((prev + 1, next - 1));
        }
    }
    gaps
}
