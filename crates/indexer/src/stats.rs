use serde::{Deserialize, Serialize};

/// Statistics about one consolidation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidationStats {
    /// Distinct words taken from the query counter
    pub words_drained: usize,

    /// Words already ranked whose prefix scores were increased
    pub words_promoted: usize,

    /// Words unknown to the ranked store, indexed for reseeding
    pub words_discovered: usize,

    /// Individual (prefix, word) score increments
    pub score_increments: usize,

    /// Members evicted to respect capacity
    pub evictions: usize,

    /// Prefix keys rewritten by the reseed step
    pub prefixes_refreshed: usize,

    /// Members written by the reseed step
    pub members_seeded: usize,

    /// Time taken in milliseconds
    pub time_ms: u64,
}

impl ConsolidationStats {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Point-in-time view of the in-process index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub nodes: usize,
    pub words: usize,
    pub pending_queries: usize,
}
