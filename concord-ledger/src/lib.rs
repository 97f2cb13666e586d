//! CONCORD Ledger - Write Path, Checkpoints, and Proofs
//!
//! The services around "append an event and derive consistent downstream
//! state": the ordered write-path gate, the single-writer append service,
//! the merkle tree builder, the checkpoint service that seals contiguous
//! sequence ranges, and inclusion-proof generation/verification with the
//! chain-proof fallback for the pending interval.
//!
//! Hashing and merkle computation are CPU-bound and synchronous; the only
//! suspension points are storage I/O behind the `concord-storage` ports.

pub mod append;
pub mod audit;
pub mod checkpoint;
pub mod gate;
pub mod merkle;
pub mod proof;

pub use append::AppendService;
pub use audit::{AuditReport, ChainAuditor};
pub use checkpoint::CheckpointService;
pub use gate::{GateSnapshot, WritePathGate};
pub use merkle::{verify_proof_path, MerkleTree};
pub use proof::{verify_proof, ProofService};
