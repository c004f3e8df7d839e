use crate::config::ConsolidationConfig;
use crate::gate::IngestionGate;
use crate::prefix_index::PrefixIndex;
use crate::stats::ConsolidationStats;
use crate::Result;
use log::{debug, info};
use std::collections::HashMap;
use std::time::Instant;

/// Result of one consolidation attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum PassOutcome {
    /// Not enough distinct pending words to bother.
    Idle { pending: usize },
    /// Another pass holds the gate.
    Skipped,
    Completed(ConsolidationStats),
}

/// How reseeded members are scored.
#[derive(Clone, Copy)]
enum Seeding<'a> {
    /// Very first load of an empty store: full capacity, score 0.
    Initial,
    /// Regular pass: seed budget, score = count from this window.
    Window(&'a HashMap<String, u64>),
}

#[derive(Debug, Default)]
struct RefreshOutcome {
    prefixes: usize,
    members: usize,
    evictions: usize,
}

/// Folds the pending window into the ranked store.
///
/// One pass: drain the counter, promote words the store already ranks, index
/// the rest, reseed every prefix of the indexed words, reset the index. The
/// pass owns the ingestion state for its whole duration.
pub struct Consolidator {
    gate: IngestionGate,
    config: ConsolidationConfig,
}

impl Consolidator {
    pub fn new(gate: IngestionGate, config: ConsolidationConfig) -> Self {
        Self { gate, config }
    }

    pub fn config(&self) -> &ConsolidationConfig {
        &self.config
    }

    pub fn gate(&self) -> &IngestionGate {
        &self.gate
    }

    /// Timer entry point: consolidates only once the threshold is reached.
    pub async fn tick(&self) -> Result<PassOutcome> {
        let pending = self.gate.pending();
        if pending == 0 || pending < self.config.trigger_threshold {
            debug!(
                "Consolidation idle: {pending} pending (threshold {})",
                self.config.trigger_threshold
            );
            return Ok(PassOutcome::Idle { pending });
        }
        self.run_pass().await
    }

    /// Runs a pass regardless of the threshold.
    pub async fn run_pass(&self) -> Result<PassOutcome> {
        let Some(_busy) = self.gate.try_close() else {
            debug!("Consolidation already running; skipping");
            return Ok(PassOutcome::Skipped);
        };
        let started = Instant::now();
        let mut state = self.gate.lock_state().await;
        let cache = self.gate.cache();

        let counts = state.counter.drain_all();
        self.gate.publish(&state);
        let mut stats = ConsolidationStats::new();
        stats.words_drained = counts.len();

        for (word, count) in &counts {
            if cache.knows_word(word).await? {
                #[allow(clippy::cast_precision_loss)]
                let outcome = cache.promote_word(word, *count as f64).await?;
                stats.words_promoted += 1;
                stats.score_increments += outcome.increments;
                stats.evictions += outcome.evicted.len();
            } else {
                state.index.insert(word);
                stats.words_discovered += 1;
            }
        }

        self.gate.publish(&state);

        let refresh = self
            .refresh_ranked_cache(&state.index, Seeding::Window(&counts))
            .await?;
        stats.prefixes_refreshed = refresh.prefixes;
        stats.members_seeded = refresh.members;
        stats.evictions += refresh.evictions;

        state.index.reset();
        self.gate.publish(&state);

        #[allow(clippy::cast_possible_truncation)]
        let elapsed_ms = started.elapsed().as_millis() as u64;
        stats.time_ms = elapsed_ms;
        info!(
            "Consolidated {} words ({} promoted, {} discovered, {} prefixes refreshed, {} evictions) in {}ms",
            stats.words_drained,
            stats.words_promoted,
            stats.words_discovered,
            stats.prefixes_refreshed,
            stats.evictions,
            stats.time_ms
        );
        Ok(PassOutcome::Completed(stats))
    }

    /// Seeds an empty store from a starter vocabulary. Does nothing once the
    /// store holds any key.
    pub async fn load_starter_words<S: AsRef<str>>(
        &self,
        words: &[S],
    ) -> Result<Option<ConsolidationStats>> {
        let cache = self.gate.cache();
        if cache.store().key_count().await? > 0 {
            debug!("Ranked store already populated; skipping starter load");
            return Ok(None);
        }
        let Some(_busy) = self.gate.try_close() else {
            return Ok(None);
        };
        let started = Instant::now();

        // Built aside so words already ingested stay pending for the next pass.
        let mut starter = PrefixIndex::new();
        starter.load(words.iter().map(AsRef::as_ref));
        let refresh = self.refresh_ranked_cache(&starter, Seeding::Initial).await?;

        let mut stats = ConsolidationStats::new();
        stats.words_discovered = starter.word_count();
        stats.prefixes_refreshed = refresh.prefixes;
        stats.members_seeded = refresh.members;
        stats.evictions = refresh.evictions;
        #[allow(clippy::cast_possible_truncation)]
        let elapsed_ms = started.elapsed().as_millis() as u64;
        stats.time_ms = elapsed_ms;
        info!(
            "Starter load seeded {} words across {} prefixes in {}ms",
            stats.words_discovered, stats.prefixes_refreshed, stats.time_ms
        );
        Ok(Some(stats))
    }

    async fn refresh_ranked_cache(
        &self,
        index: &PrefixIndex,
        seeding: Seeding<'_>,
    ) -> Result<RefreshOutcome> {
        let cache = self.gate.cache();
        let budget = match seeding {
            Seeding::Initial => self.config.capacity,
            Seeding::Window(_) => self.config.seed_budget(),
        };

        let mut prefixes: Vec<String> = index.all_prefixes().into_iter().collect();
        prefixes.sort();

        let mut outcome = RefreshOutcome::default();
        for prefix in prefixes {
            let mut scored: Vec<(String, f64)> = index
                .suggest(&prefix)
                .into_iter()
                .map(|word| {
                    let score = match seeding {
                        Seeding::Initial => 0.0,
                        #[allow(clippy::cast_precision_loss)]
                        Seeding::Window(counts) => counts.get(&word).copied().unwrap_or(0) as f64,
                    };
                    (word, score)
                })
                .collect();
            scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            scored.truncate(budget);

            let seeded = cache.seed(&prefix, scored.into_iter().collect()).await?;
            outcome.prefixes += 1;
            outcome.members += seeded.seeded;
            outcome.evictions += seeded.evicted.len();
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranked_cache::RankedCache;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use typeahead_ranked_store::{MemoryRankedStore, RankedStore, ScoredMember};

    fn consolidator(capacity: usize, threshold: usize) -> Consolidator {
        let store: Arc<dyn RankedStore> = Arc::new(MemoryRankedStore::new());
        let config = ConsolidationConfig {
            capacity,
            retain_ratio: 1,
            trigger_threshold: threshold,
            ..ConsolidationConfig::default()
        };
        Consolidator::new(IngestionGate::new(RankedCache::new(store, capacity)), config)
    }

    async fn report(consolidator: &Consolidator, word: &str, times: usize) {
        for _ in 0..times {
            consolidator.gate().record_query(word).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_tick_below_threshold_stays_idle() {
        let consolidator = consolidator(3, 5);
        report(&consolidator, "cat", 1).await;
        assert_eq!(
            consolidator.tick().await.unwrap(),
            PassOutcome::Idle { pending: 1 }
        );
        assert_eq!(consolidator.gate().pending(), 1);
    }

    #[tokio::test]
    async fn test_new_words_reach_the_store_with_window_counts() {
        let consolidator = consolidator(3, 1);
        report(&consolidator, "cat", 5).await;
        report(&consolidator, "car", 3).await;
        report(&consolidator, "can", 1).await;

        let PassOutcome::Completed(stats) = consolidator.tick().await.unwrap() else {
            panic!("expected a completed pass");
        };
        assert_eq!(stats.words_drained, 3);
        assert_eq!(stats.words_discovered, 3);

        let gate = consolidator.gate();
        assert_eq!(gate.lookup("ca").await.unwrap(), vec!["cat", "car", "can"]);
        assert!(gate.index_suggestions("c").await.unwrap().is_empty());
        assert_eq!(gate.pending(), 0);
    }

    #[tokio::test]
    async fn test_known_word_evicts_weakest_at_capacity() {
        let consolidator = consolidator(3, 1);
        report(&consolidator, "cat", 5).await;
        report(&consolidator, "car", 3).await;
        report(&consolidator, "can", 1).await;
        consolidator.run_pass().await.unwrap();

        // Make `cab` a ranked word without touching "ca".
        let gate = consolidator.gate();
        gate.cache()
            .store()
            .increment_score("cab", "cab", 0.0)
            .await
            .unwrap();
        report(&consolidator, "cab", 4).await;
        consolidator.run_pass().await.unwrap();

        assert_eq!(
            gate.lookup_scored("ca").await.unwrap(),
            vec![
                ScoredMember::new("cat", 5.0),
                ScoredMember::new("cab", 4.0),
                ScoredMember::new("car", 3.0),
            ]
        );
    }

    #[tokio::test]
    async fn test_starter_load_uses_full_capacity_and_zero_scores() {
        let consolidator = consolidator(2, 1);
        let words = ["apple", "apply", "ape"];
        let stats = consolidator
            .load_starter_words(&words)
            .await
            .unwrap()
            .expect("empty store is seeded");
        assert_eq!(stats.words_discovered, 3);

        let gate = consolidator.gate();
        let ranked = gate.lookup_scored("ap").await.unwrap();
        assert_eq!(ranked.len(), 2);
        assert!(ranked.iter().all(|entry| entry.score == 0.0));
        assert!(gate.cache().knows_word("apple").await.unwrap());

        assert!(consolidator.load_starter_words(&words).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_starter_load_keeps_pending_counts() {
        let consolidator = consolidator(3, 1);
        report(&consolidator, "zebra", 2).await;
        consolidator.load_starter_words(&["apple"]).await.unwrap();
        assert_eq!(consolidator.gate().pending(), 1);
    }

    #[tokio::test]
    async fn test_pass_while_gate_closed_is_skipped() {
        let consolidator = consolidator(3, 1);
        report(&consolidator, "cat", 1).await;
        let _guard = consolidator.gate().try_close().expect("open");
        assert_eq!(consolidator.run_pass().await.unwrap(), PassOutcome::Skipped);
    }
}
