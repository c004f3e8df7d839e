use crate::{IndexerError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for the consolidation pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsolidationConfig {
    /// Maximum members per prefix key in the ranked store.
    pub capacity: usize,

    /// Reseeding takes at most `capacity / retain_ratio` suggestions per
    /// prefix, leaving room for organic growth.
    pub retain_ratio: usize,

    /// Minimum distinct pending words before a tick consolidates.
    pub trigger_threshold: usize,

    /// Period of the consolidation timer, in milliseconds.
    pub tick_interval_ms: u64,

    /// Words taken from the starter list when the store is empty at startup.
    pub starter_load_size: usize,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            retain_ratio: 2,
            trigger_threshold: 100,
            tick_interval_ms: 30_000,
            starter_load_size: 0,
        }
    }
}

impl ConsolidationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(IndexerError::InvalidConfig(
                "capacity must be at least 1".to_string(),
            ));
        }
        if self.retain_ratio == 0 {
            return Err(IndexerError::InvalidConfig(
                "retain_ratio must be at least 1".to_string(),
            ));
        }
        if self.tick_interval_ms == 0 {
            return Err(IndexerError::InvalidConfig(
                "tick_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Suggestions pushed per prefix on a regular reseed. Never zero.
    #[must_use]
    pub fn seed_budget(&self) -> usize {
        (self.capacity / self.retain_ratio.max(1)).max(1)
    }
}
