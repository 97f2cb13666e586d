//! The ordered write-path gate.
//!
//! Consulted immediately before every append attempt. Order matters:
//! terminal is evaluated before freeze, and freeze before halt, so a
//! reversible halt can never mask a permanent cessation. Each rejection is
//! a distinct typed error carrying timestamp/sequence context and is logged
//! in full before being returned.

use chrono::Utc;
use concord_core::{ConcordResult, GateError, GateState, Sequence, Timestamp};
use concord_storage::{FreezeChecker, HaltChecker, TerminalChecker};
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// A point-in-time evaluation of the three checker ports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateSnapshot {
    pub state: GateState,
    pub since: Option<Timestamp>,
    pub reason: String,
    pub refreshed_at: Timestamp,
}

impl GateSnapshot {
    fn active() -> Self {
        Self {
            state: GateState::Active,
            since: None,
            reason: String::new(),
            refreshed_at: Utc::now(),
        }
    }
}

/// Write-path gate with cached checker state.
///
/// Gate checks must not add I/O latency to every append, so evaluations are
/// served from a cached snapshot initialized at startup and refreshed on a
/// bounded interval or on explicit invalidation. The cache is never mutated
/// from arbitrary call sites; only `refresh` writes it.
pub struct WritePathGate<T, F, H> {
    terminal: Arc<T>,
    freeze: Arc<F>,
    halt: Arc<H>,
    refresh_interval: Duration,
    snapshot: RwLock<Option<GateSnapshot>>,
}

impl<T, F, H> WritePathGate<T, F, H>
where
    T: TerminalChecker,
    F: FreezeChecker,
    H: HaltChecker,
{
    /// Create the gate and perform the initial refresh from the checkers.
    pub async fn new(
        terminal: Arc<T>,
        freeze: Arc<F>,
        halt: Arc<H>,
        refresh_interval: Duration,
    ) -> ConcordResult<Self> {
        let gate = Self {
            terminal,
            freeze,
            halt,
            refresh_interval,
            snapshot: RwLock::new(None),
        };
        gate.refresh().await?;
        Ok(gate)
    }

    /// Re-query the checker ports and replace the cached snapshot.
    ///
    /// Evaluation is terminal-first: once a more severe stage is engaged
    /// the later stages are not consulted.
    pub async fn refresh(&self) -> ConcordResult<GateSnapshot> {
        let terminal = self.terminal.status().await?;
        let snapshot = if terminal.engaged {
            GateSnapshot {
                state: GateState::Terminated,
                since: terminal.since,
                reason: terminal.reason.unwrap_or_default(),
                refreshed_at: Utc::now(),
            }
        } else {
            let freeze = self.freeze.status().await?;
            if freeze.engaged() {
                GateSnapshot {
                    state: GateState::Frozen,
                    since: freeze.since,
                    reason: format!(
                        "{} (channel: {})",
                        freeze.reason.clone().unwrap_or_default(),
                        freeze.channel()
                    ),
                    refreshed_at: Utc::now(),
                }
            } else {
                let halt = self.halt.status().await?;
                if halt.engaged {
                    GateSnapshot {
                        state: GateState::Halted,
                        since: halt.since,
                        reason: halt.reason.unwrap_or_default(),
                        refreshed_at: Utc::now(),
                    }
                } else {
                    GateSnapshot::active()
                }
            }
        };

        let mut cached = self
            .snapshot
            .write()
            .map_err(|_| concord_core::StorageError::LockPoisoned)?;
        *cached = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// Drop the cached snapshot so the next check re-queries the ports.
    pub fn invalidate(&self) {
        if let Ok(mut cached) = self.snapshot.write() {
            *cached = None;
        }
    }

    /// The current snapshot, refreshing if absent or older than the bounded
    /// interval.
    pub async fn snapshot(&self) -> ConcordResult<GateSnapshot> {
        let cached = {
            let guard = self
                .snapshot
                .read()
                .map_err(|_| concord_core::StorageError::LockPoisoned)?;
            guard.clone()
        };
        match cached {
            Some(snapshot)
                if Utc::now()
                    .signed_duration_since(snapshot.refreshed_at)
                    .to_std()
                    .map(|age| age < self.refresh_interval)
                    .unwrap_or(false) =>
            {
                Ok(snapshot)
            }
            _ => self.refresh().await,
        }
    }

    /// Evaluate the gate for an append at the given head sequence.
    ///
    /// Rejections are logged with full context before being returned; they
    /// are never silently dropped.
    pub async fn check_append(&self, head_sequence: Sequence) -> ConcordResult<()> {
        let snapshot = self.snapshot().await?;
        let rejection = match snapshot.state {
            GateState::Active => return Ok(()),
            GateState::Terminated => GateError::TerminalWriteRejected {
                since: snapshot.since,
                reason: snapshot.reason.clone(),
                head_sequence,
            },
            GateState::Frozen => GateError::FrozenWriteRejected {
                since: snapshot.since,
                reason: snapshot.reason.clone(),
                head_sequence,
            },
            GateState::Halted => GateError::HaltedWriteRejected {
                since: snapshot.since,
                reason: snapshot.reason.clone(),
                head_sequence,
            },
        };
        tracing::warn!(
            state = %snapshot.state,
            since = ?snapshot.since,
            reason = %snapshot.reason,
            head_sequence,
            "append rejected by write-path gate"
        );
        Err(rejection.into())
    }
}
