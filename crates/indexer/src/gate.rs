use crate::prefix_index::PrefixIndex;
use crate::query_counter::QueryCounter;
use crate::ranked_cache::RankedCache;
use crate::stats::IndexSnapshot;
use crate::{IndexerError, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use typeahead_ranked_store::ScoredMember;

/// State written by ingestion and consumed by consolidation.
#[derive(Debug, Default)]
pub struct IngestState {
    pub index: PrefixIndex,
    pub counter: QueryCounter,
}

/// What happened to a reported query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOutcome {
    /// Counted; `newly_indexed` when the word went into the prefix index
    /// because the ranked store does not offer it yet.
    Recorded { newly_indexed: bool },
    /// Empty input.
    Ignored,
}

/// Coordinates query ingestion with consolidation passes.
///
/// While `busy` is set a pass owns [`IngestState`]; ingestion is refused with
/// [`IndexerError::Unavailable`]. Lookups only read the ranked store and are
/// never refused.
#[derive(Clone)]
pub struct IngestionGate {
    inner: Arc<GateInner>,
}

struct GateInner {
    busy: AtomicBool,
    state: Mutex<IngestState>,
    cache: RankedCache,
    counts: PublishedCounts,
}

/// Last sizes written under the state lock, readable while a pass holds it.
#[derive(Default)]
struct PublishedCounts {
    nodes: AtomicUsize,
    words: AtomicUsize,
    pending: AtomicUsize,
}

/// Holds the gate closed; reopens it on drop, including on error paths.
pub(crate) struct BusyGuard<'a> {
    busy: &'a AtomicBool,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

impl IngestionGate {
    pub fn new(cache: RankedCache) -> Self {
        Self {
            inner: Arc::new(GateInner {
                busy: AtomicBool::new(false),
                state: Mutex::new(IngestState::default()),
                cache,
                counts: PublishedCounts::default(),
            }),
        }
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.inner.busy.load(Ordering::Acquire)
    }

    pub fn cache(&self) -> &RankedCache {
        &self.inner.cache
    }

    /// Counts `word` and, when the ranked store does not know it yet, adds it
    /// to the prefix index right away.
    pub async fn record_query(&self, word: &str) -> Result<QueryOutcome> {
        if word.is_empty() {
            return Ok(QueryOutcome::Ignored);
        }
        if self.is_busy() {
            return Err(IndexerError::Unavailable);
        }

        let known = self.inner.cache.knows_word(word).await?;

        let mut state = self.inner.state.lock().await;
        // A pass may have closed the gate while we were talking to the store.
        if self.is_busy() {
            return Err(IndexerError::Unavailable);
        }
        state.counter.record(word);
        if !known {
            state.index.insert(word);
        }
        self.publish(&state);
        Ok(QueryOutcome::Recorded {
            newly_indexed: !known,
        })
    }

    /// Ranked completions for `prefix`. Never blocked by consolidation.
    pub async fn lookup(&self, prefix: &str) -> Result<Vec<String>> {
        self.inner.cache.lookup(prefix).await
    }

    pub async fn lookup_scored(&self, prefix: &str) -> Result<Vec<ScoredMember>> {
        self.inner.cache.lookup_scored(prefix).await
    }

    /// Completions held in the prefix index for the current window.
    ///
    /// The index belongs to the pass while one runs, so this fails with
    /// `Unavailable` instead of waiting for it.
    pub async fn index_suggestions(&self, prefix: &str) -> Result<Vec<String>> {
        if self.is_busy() {
            return Err(IndexerError::Unavailable);
        }
        Ok(self.inner.state.lock().await.index.suggest(prefix))
    }

    /// Index and counter sizes as of the last change. Never waits for a pass.
    #[must_use]
    pub fn index_snapshot(&self) -> IndexSnapshot {
        let counts = &self.inner.counts;
        IndexSnapshot {
            nodes: counts.nodes.load(Ordering::Acquire),
            words: counts.words.load(Ordering::Acquire),
            pending_queries: counts.pending.load(Ordering::Acquire),
        }
    }

    /// Distinct words waiting for the next pass.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.counts.pending.load(Ordering::Acquire)
    }

    /// Republishes the sizes of `state`; callers hold the state lock.
    pub(crate) fn publish(&self, state: &IngestState) {
        let counts = &self.inner.counts;
        counts.nodes.store(state.index.node_count(), Ordering::Release);
        counts.words.store(state.index.word_count(), Ordering::Release);
        counts.pending.store(state.counter.size(), Ordering::Release);
    }

    /// Closes the gate unless a pass already holds it.
    pub(crate) fn try_close(&self) -> Option<BusyGuard<'_>> {
        self.inner
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard {
                busy: &self.inner.busy,
            })
    }

    pub(crate) async fn lock_state(&self) -> MutexGuard<'_, IngestState> {
        self.inner.state.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use typeahead_ranked_store::MemoryRankedStore;

    fn gate() -> IngestionGate {
        IngestionGate::new(RankedCache::new(Arc::new(MemoryRankedStore::new()), 3))
    }

    #[tokio::test]
    async fn unknown_word_is_indexed_immediately() {
        let gate = gate();
        let outcome = gate.record_query("dog").await.unwrap();
        assert_eq!(outcome, QueryOutcome::Recorded { newly_indexed: true });

        assert!(gate.lookup("do").await.unwrap().is_empty());
        assert_eq!(gate.index_suggestions("do").await.unwrap(), vec!["dog"]);
        assert_eq!(gate.pending(), 1);
    }

    #[tokio::test]
    async fn known_word_is_only_counted() {
        let gate = gate();
        let seeded: HashMap<String, f64> = [("cat".to_string(), 0.0)].into_iter().collect();
        gate.cache().seed("cat", seeded).await.unwrap();

        let outcome = gate.record_query("cat").await.unwrap();
        assert_eq!(outcome, QueryOutcome::Recorded { newly_indexed: false });
        assert!(gate.index_suggestions("c").await.unwrap().is_empty());
        assert_eq!(gate.pending(), 1);
    }

    #[tokio::test]
    async fn closed_gate_rejects_ingestion_but_serves_lookups() {
        let gate = gate();
        gate.cache().promote_word("cat", 2.0).await.unwrap();

        let guard = gate.try_close().expect("gate open");
        assert!(gate.is_busy());
        assert!(gate.try_close().is_none(), "second pass must not start");

        let err = gate.record_query("cat").await.unwrap_err();
        assert!(err.is_transient());
        assert!(gate.index_suggestions("c").await.unwrap_err().is_transient());
        assert_eq!(gate.lookup("ca").await.unwrap(), vec!["cat"]);

        drop(guard);
        assert!(!gate.is_busy());
        assert!(gate.record_query("cat").await.is_ok());
    }

    #[tokio::test]
    async fn empty_word_is_ignored() {
        let gate = gate();
        assert_eq!(gate.record_query("").await.unwrap(), QueryOutcome::Ignored);
        assert_eq!(gate.pending(), 0);
    }
}
