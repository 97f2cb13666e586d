//! Configuration types.

use crate::error::{ConcordResult, ConfigError};
use crate::hash::HashAlgorithm;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Master configuration for the ledger core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcordConfig {
    /// Algorithm used for newly appended events and merkle trees.
    pub default_algorithm: HashAlgorithm,

    /// Seal a checkpoint once this many events have accumulated past the
    /// last anchor (on-demand sealing is always available).
    pub checkpoint_interval_events: u64,

    /// How long cached gate state stays fresh before the next append
    /// re-queries the checker ports.
    /// Stored in nanoseconds when serialized.
    pub gate_cache_refresh: Duration,

    /// Batch size for projection rebuild/resume range pulls.
    pub projection_batch_size: usize,
}

impl Default for ConcordConfig {
    fn default() -> Self {
        Self {
            default_algorithm: HashAlgorithm::Blake3,
            checkpoint_interval_events: 256,
            gate_cache_refresh: Duration::from_secs(5),
            projection_batch_size: 512,
        }
    }
}

impl ConcordConfig {
    /// Create from environment variables with fallback to defaults.
    ///
    /// Environment variables:
    /// - `CONCORD_CHECKPOINT_INTERVAL`: events per checkpoint (default: 256)
    /// - `CONCORD_GATE_REFRESH_MS`: gate cache freshness in ms (default: 5000)
    /// - `CONCORD_PROJECTION_BATCH`: rebuild batch size (default: 512)
    /// - `CONCORD_HASH_ALGORITHM`: `blake3` or `sha256` (default: blake3)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            default_algorithm: std::env::var("CONCORD_HASH_ALGORITHM")
                .ok()
                .and_then(|s| HashAlgorithm::from_tag(&s))
                .unwrap_or(defaults.default_algorithm),
            checkpoint_interval_events: std::env::var("CONCORD_CHECKPOINT_INTERVAL")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.checkpoint_interval_events),
            gate_cache_refresh: std::env::var("CONCORD_GATE_REFRESH_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.gate_cache_refresh),
            projection_batch_size: std::env::var("CONCORD_PROJECTION_BATCH")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.projection_batch_size),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ConcordResult<()> {
        if self.checkpoint_interval_events == 0 {
            return Err(ConfigError::InvalidValue {
                field: "checkpoint_interval_events".to_string(),
                value: self.checkpoint_interval_events.to_string(),
                reason: "checkpoint_interval_events must be greater than 0".to_string(),
            }
            .into());
        }

        if self.projection_batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "projection_batch_size".to_string(),
                value: self.projection_batch_size.to_string(),
                reason: "projection_batch_size must be greater than 0".to_string(),
            }
            .into());
        }

        if self.gate_cache_refresh.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "gate_cache_refresh".to_string(),
                value: format!("{:?}", self.gate_cache_refresh),
                reason: "gate_cache_refresh must be positive".to_string(),
            }
            .into());
        }

        Ok(())
    }
}
