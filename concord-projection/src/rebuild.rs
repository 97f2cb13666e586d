//! Projection rebuild: drop and replay from genesis.
//!
//! A rebuild claims the projection's in-progress marker, clears derived
//! state, and replays every event in sequence order through the same
//! applier the incremental path uses, so the rebuilt projection is
//! byte-identical to one maintained incrementally. The marker is released
//! on every exit path; a failed rebuild leaves the projection cleared but
//! unlocked, and the next attempt starts clean.

use concord_core::{ConcordResult, Sequence};
use concord_storage::{EventQuery, ProjectionStore};
use std::sync::Arc;

use crate::apply::ProjectionApplier;
use crate::handler::ProjectionHandler;

/// Summary of one completed rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuildReport {
    pub projection: String,
    pub events_replayed: u64,
    pub final_sequence: Sequence,
}

/// Drives full rebuilds of a projection.
pub struct RebuildService<H, P, Q> {
    applier: Arc<ProjectionApplier<H, P>>,
    store: Arc<P>,
    events: Arc<Q>,
    batch_size: usize,
}

impl<H, P, Q> RebuildService<H, P, Q>
where
    H: ProjectionHandler,
    P: ProjectionStore,
    Q: EventQuery,
{
    pub fn new(
        applier: Arc<ProjectionApplier<H, P>>,
        store: Arc<P>,
        events: Arc<Q>,
        batch_size: usize,
    ) -> Self {
        Self {
            applier,
            store,
            events,
            batch_size,
        }
    }

    /// Rebuild the projection from genesis.
    pub async fn rebuild(&self) -> ConcordResult<RebuildReport> {
        let name = self.applier.projection_name();
        self.store.try_begin_rebuild(name).await?;

        let result = self.run(name).await;
        // The marker must come off even when the replay fails.
        let release = self.store.end_rebuild(name).await;
        let report = result?;
        release?;

        tracing::info!(
            projection = name,
            events_replayed = report.events_replayed,
            final_sequence = report.final_sequence,
            "projection rebuilt"
        );
        Ok(report)
    }

    async fn run(&self, name: &str) -> ConcordResult<RebuildReport> {
        self.store.clear_projection(name).await?;
        let replayed = self.applier.catch_up(self.events.as_ref(), self.batch_size).await?;
        let final_sequence = self.store.checkpoint(name).await?.last_sequence;
        Ok(RebuildReport {
            projection: name.to_string(),
            events_replayed: replayed,
            final_sequence,
        })
    }
}
