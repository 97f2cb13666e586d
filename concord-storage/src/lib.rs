//! CONCORD Storage - Ports and In-Memory Implementations
//!
//! Defines the storage abstraction layer consumed by the ledger core: the
//! ledger store, checkpoint store, terminal/freeze/halt checker ports, the
//! event query port used by projection rebuild, and the projection store.
//! Implementations are selected by dependency injection at startup; the
//! in-memory implementations here serve tests and development, a durable
//! implementation lives behind the same traits.
//!
//! # Async Design
//!
//! All port methods are async: storage I/O (append, checkpoint persistence,
//! projection writes) is the only suspension point in the system. Hashing
//! and merkle computation stay synchronous in `concord-core` and
//! `concord-ledger`.

pub mod memory;
pub mod ports;

pub use memory::{
    InMemoryCheckpointStore, InMemoryGateFlags, InMemoryLedgerStore, InMemoryProjectionStore,
};
pub use ports::{
    ApplyUpdate, CheckpointStore, EventQuery, FreezeChecker, HaltChecker, LedgerStore,
    ProjectionStore, RecordWrite, TerminalChecker,
};
