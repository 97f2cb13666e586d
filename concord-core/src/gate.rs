//! Write-path gate state model.
//!
//! The three write-blocking conditions form a single closed sum type with an
//! explicit precedence order, not independent flags: terminal is checked
//! before freeze, and freeze before halt, so a reversible halt can never
//! mask a permanent cessation.

use crate::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The ordered write-path gate state.
///
/// Variants are declared in increasing severity; `severity()` makes the
/// precedence explicit for fold-style evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum GateState {
    /// Appends proceed normally.
    #[default]
    Active,
    /// Temporary administrative halt; reversible.
    Halted,
    /// Operational freeze (dual-channel flag); irrevocable once set by
    /// design, but logically distinct from terminal.
    Frozen,
    /// Irrevocable cessation recorded; never resets.
    Terminated,
}

impl GateState {
    /// Precedence for gate evaluation. Higher wins.
    pub const fn severity(&self) -> u8 {
        match self {
            GateState::Active => 0,
            GateState::Halted => 1,
            GateState::Frozen => 2,
            GateState::Terminated => 3,
        }
    }

    /// Whether appends are blocked in this state.
    pub const fn blocks_writes(&self) -> bool {
        !matches!(self, GateState::Active)
    }

    /// The more severe of two states.
    pub fn max(self, other: GateState) -> GateState {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for GateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GateState::Active => "active",
            GateState::Halted => "halted",
            GateState::Frozen => "frozen",
            GateState::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

/// Status reported by a terminal or halt checker port: a boolean-style
/// answer plus the context a rejection must carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CheckerStatus {
    pub engaged: bool,
    pub since: Option<Timestamp>,
    pub reason: Option<String>,
}

impl CheckerStatus {
    /// A disengaged status with no context.
    pub fn clear() -> Self {
        Self::default()
    }

    /// An engaged status with context.
    pub fn engaged(since: Timestamp, reason: impl Into<String>) -> Self {
        Self {
            engaged: true,
            since: Some(since),
            reason: Some(reason.into()),
        }
    }
}

/// Status reported by the freeze checker port.
///
/// The freeze flag is mirrored across two independent storage paths for
/// partition tolerance; the gate treats it as set when either channel is
/// set, so a partitioned channel can never un-freeze the system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FreezeStatus {
    pub primary: bool,
    pub mirror: bool,
    pub since: Option<Timestamp>,
    pub reason: Option<String>,
}

impl FreezeStatus {
    pub fn engaged(&self) -> bool {
        self.primary || self.mirror
    }

    /// Which channel reported the freeze, for rejection context.
    pub fn channel(&self) -> &'static str {
        match (self.primary, self.mirror) {
            (true, true) => "primary+mirror",
            (true, false) => "primary",
            (false, true) => "mirror",
            (false, false) => "none",
        }
    }
}
