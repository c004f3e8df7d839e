#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use typeahead_indexer::{ConsolidationConfig, TypeaheadService};
use typeahead_ranked_store::{
    MemoryRankedStore, RankedStore, RankedStoreError, Result, ScoredMember,
};

/// Memory store whose writes can be switched to fail like a lost connection.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryRankedStore,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    pub fn set_failing(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RankedStoreError::Unreachable("connection reset".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RankedStore for FlakyStore {
    async fn exists(&self, key: &str) -> Result<bool> {
        self.inner.exists(key).await
    }

    async fn member_count(&self, key: &str) -> Result<usize> {
        self.inner.member_count(key).await
    }

    async fn score(&self, key: &str, member: &str) -> Result<Option<f64>> {
        self.inner.score(key, member).await
    }

    async fn increment_score(&self, key: &str, member: &str, delta: f64) -> Result<f64> {
        self.check()?;
        self.inner.increment_score(key, member, delta).await
    }

    async fn evict_lowest_scoring(&self, key: &str) -> Result<Option<ScoredMember>> {
        self.check()?;
        self.inner.evict_lowest_scoring(key).await
    }

    async fn set_members(&self, key: &str, members: &HashMap<String, f64>) -> Result<()> {
        self.check()?;
        self.inner.set_members(key, members).await
    }

    async fn range_by_score_descending(&self, key: &str) -> Result<Vec<ScoredMember>> {
        self.inner.range_by_score_descending(key).await
    }

    async fn key_count(&self) -> Result<usize> {
        self.inner.key_count().await
    }

    async fn flush(&self) -> Result<()> {
        self.inner.flush().await
    }
}

/// Memory store whose bulk writes take `delay`, so a pass stays open long
/// enough to observe from the outside.
pub struct SlowStore {
    inner: MemoryRankedStore,
    delay: Duration,
}

impl SlowStore {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MemoryRankedStore::new(),
            delay,
        }
    }
}

#[async_trait]
impl RankedStore for SlowStore {
    async fn exists(&self, key: &str) -> Result<bool> {
        self.inner.exists(key).await
    }

    async fn member_count(&self, key: &str) -> Result<usize> {
        self.inner.member_count(key).await
    }

    async fn score(&self, key: &str, member: &str) -> Result<Option<f64>> {
        self.inner.score(key, member).await
    }

    async fn increment_score(&self, key: &str, member: &str, delta: f64) -> Result<f64> {
        self.inner.increment_score(key, member, delta).await
    }

    async fn evict_lowest_scoring(&self, key: &str) -> Result<Option<ScoredMember>> {
        self.inner.evict_lowest_scoring(key).await
    }

    async fn set_members(&self, key: &str, members: &HashMap<String, f64>) -> Result<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.set_members(key, members).await
    }

    async fn range_by_score_descending(&self, key: &str) -> Result<Vec<ScoredMember>> {
        self.inner.range_by_score_descending(key).await
    }

    async fn key_count(&self) -> Result<usize> {
        self.inner.key_count().await
    }

    async fn flush(&self) -> Result<()> {
        self.inner.flush().await
    }
}

pub fn config(capacity: usize, retain_ratio: usize, threshold: usize) -> ConsolidationConfig {
    ConsolidationConfig {
        capacity,
        retain_ratio,
        trigger_threshold: threshold,
        tick_interval_ms: 1_000,
        starter_load_size: 0,
    }
}

pub fn memory_service(config: ConsolidationConfig) -> (Arc<MemoryRankedStore>, TypeaheadService) {
    let store = Arc::new(MemoryRankedStore::new());
    let service = TypeaheadService::new(store.clone(), config).expect("valid config");
    (store, service)
}

pub async fn report_times(service: &TypeaheadService, word: &str, times: usize) {
    for _ in 0..times {
        service.report_query(word).await.expect("gate open");
    }
}
