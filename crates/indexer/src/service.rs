use crate::config::ConsolidationConfig;
use crate::consolidator::{Consolidator, PassOutcome};
use crate::gate::{IngestionGate, QueryOutcome};
use crate::ranked_cache::RankedCache;
use crate::stats::{ConsolidationStats, IndexSnapshot};
use crate::worker::ConsolidationWorker;
use crate::Result;
use std::sync::Arc;
use typeahead_ranked_store::{RankedStore, ScoredMember};

/// The two operations the request layer needs, plus the wiring behind them.
///
/// One instance owns the prefix index and query counter; clones share them.
#[derive(Clone)]
pub struct TypeaheadService {
    gate: IngestionGate,
    consolidator: Arc<Consolidator>,
}

impl TypeaheadService {
    pub fn new(store: Arc<dyn RankedStore>, config: ConsolidationConfig) -> Result<Self> {
        config.validate()?;
        let gate = IngestionGate::new(RankedCache::new(store, config.capacity));
        let consolidator = Arc::new(Consolidator::new(gate.clone(), config));
        Ok(Self { gate, consolidator })
    }

    pub fn config(&self) -> &ConsolidationConfig {
        self.consolidator.config()
    }

    /// Records an observed query. Fails with `Unavailable` during a pass.
    pub async fn report_query(&self, word: &str) -> Result<QueryOutcome> {
        self.gate.record_query(word).await
    }

    /// Ranked completions for `prefix`, best first.
    pub async fn lookup(&self, prefix: &str) -> Result<Vec<String>> {
        self.gate.lookup(prefix).await
    }

    pub async fn lookup_scored(&self, prefix: &str) -> Result<Vec<ScoredMember>> {
        self.gate.lookup_scored(prefix).await
    }

    /// Completions known only to the current window's prefix index.
    pub async fn index_suggestions(&self, prefix: &str) -> Result<Vec<String>> {
        self.gate.index_suggestions(prefix).await
    }

    #[must_use]
    pub fn index_snapshot(&self) -> IndexSnapshot {
        self.gate.index_snapshot()
    }

    #[must_use]
    pub fn is_consolidating(&self) -> bool {
        self.gate.is_busy()
    }

    pub async fn consolidate(&self, force: bool) -> Result<PassOutcome> {
        if force {
            self.consolidator.run_pass().await
        } else {
            self.consolidator.tick().await
        }
    }

    pub async fn load_starter_words<S: AsRef<str>>(
        &self,
        words: &[S],
    ) -> Result<Option<ConsolidationStats>> {
        let limit = self.config().starter_load_size.min(words.len());
        self.consolidator.load_starter_words(&words[..limit]).await
    }

    /// Starts the periodic consolidation task.
    pub fn start_worker(&self) -> ConsolidationWorker {
        ConsolidationWorker::start(self.consolidator.clone(), self.config().tick_interval())
    }
}
