//! CONCORD Projection - Derived Read Models
//!
//! The query side of the ledger: deterministic handlers fold committed
//! events into per-entity records, the applier commits each application as
//! one atomic unit guarded by the apply log, and the rebuild service drops
//! and replays a projection from genesis. Projections are never
//! authoritative; the ledger is, and any projection can be discarded and
//! reconstructed at any time.

pub mod actor_registry;
pub mod apply;
pub mod handler;
pub mod rebuild;
pub mod task_state;

pub use actor_registry::ActorRegistryProjection;
pub use apply::{ApplyOutcome, ProjectionApplier};
pub use handler::ProjectionHandler;
pub use rebuild::RebuildService;
pub use task_state::TaskStateProjection;
