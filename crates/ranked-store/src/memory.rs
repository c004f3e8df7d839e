use crate::error::Result;
use crate::snapshot::StoreSnapshot;
use crate::store::RankedStore;
use crate::types::{validate_score, ScoredMember};
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::RwLock;

/// Total order over scores so they can key a `BTreeSet`.
#[derive(Debug, Clone, Copy)]
struct Score(f64);

impl PartialEq for Score {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// One prefix key: score lookup by member plus ascending (score, member) order.
#[derive(Debug, Default, Clone)]
struct SortedSet {
    scores: HashMap<String, f64>,
    order: BTreeSet<(Score, String)>,
}

impl SortedSet {
    fn len(&self) -> usize {
        self.scores.len()
    }

    fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    fn score(&self, member: &str) -> Option<f64> {
        self.scores.get(member).copied()
    }

    fn set(&mut self, member: &str, score: f64) {
        if let Some(previous) = self.scores.insert(member.to_string(), score) {
            self.order.remove(&(Score(previous), member.to_string()));
        }
        self.order.insert((Score(score), member.to_string()));
    }

    fn increment(&mut self, member: &str, delta: f64) -> f64 {
        let next = self.score(member).unwrap_or(0.0) + delta;
        self.set(member, next);
        next
    }

    fn pop_min(&mut self) -> Option<ScoredMember> {
        let (score, member) = self.order.pop_first()?;
        self.scores.remove(&member);
        Some(ScoredMember {
            member,
            score: score.0,
        })
    }

    fn descending(&self) -> Vec<ScoredMember> {
        self.order
            .iter()
            .rev()
            .map(|(score, member)| ScoredMember {
                member: member.clone(),
                score: score.0,
            })
            .collect()
    }
}

/// Process-local ranked store with sorted-set semantics.
#[derive(Debug, Default)]
pub struct MemoryRankedStore {
    sets: RwLock<HashMap<String, SortedSet>>,
}

impl MemoryRankedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from a previously captured snapshot.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self> {
        let mut sets = HashMap::with_capacity(snapshot.keys.len());
        for (key, members) in snapshot.keys {
            let mut set = SortedSet::default();
            for entry in members {
                validate_score(&key, &entry.member, entry.score)?;
                set.set(&entry.member, entry.score);
            }
            if !set.is_empty() {
                sets.insert(key, set);
            }
        }
        Ok(Self {
            sets: RwLock::new(sets),
        })
    }

    /// Captures every key, members ordered highest score first.
    pub async fn snapshot(&self) -> StoreSnapshot {
        let guard = self.sets.read().await;
        let keys = guard
            .iter()
            .map(|(key, set)| (key.clone(), set.descending()))
            .collect();
        StoreSnapshot::new(keys)
    }
}

#[async_trait]
impl RankedStore for MemoryRankedStore {
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.sets.read().await.contains_key(key))
    }

    async fn member_count(&self, key: &str) -> Result<usize> {
        Ok(self.sets.read().await.get(key).map_or(0, SortedSet::len))
    }

    async fn score(&self, key: &str, member: &str) -> Result<Option<f64>> {
        Ok(self
            .sets
            .read()
            .await
            .get(key)
            .and_then(|set| set.score(member)))
    }

    async fn increment_score(&self, key: &str, member: &str, delta: f64) -> Result<f64> {
        validate_score(key, member, delta)?;
        let mut guard = self.sets.write().await;
        let set = guard.entry(key.to_string()).or_default();
        Ok(set.increment(member, delta))
    }

    async fn evict_lowest_scoring(&self, key: &str) -> Result<Option<ScoredMember>> {
        let mut guard = self.sets.write().await;
        let Some(set) = guard.get_mut(key) else {
            return Ok(None);
        };
        let evicted = set.pop_min();
        if set.is_empty() {
            guard.remove(key);
        }
        Ok(evicted)
    }

    async fn set_members(&self, key: &str, members: &HashMap<String, f64>) -> Result<()> {
        if members.is_empty() {
            return Ok(());
        }
        for (member, score) in members {
            validate_score(key, member, *score)?;
        }
        let mut guard = self.sets.write().await;
        let set = guard.entry(key.to_string()).or_default();
        for (member, score) in members {
            set.set(member, *score);
        }
        Ok(())
    }

    async fn range_by_score_descending(&self, key: &str) -> Result<Vec<ScoredMember>> {
        Ok(self
            .sets
            .read()
            .await
            .get(key)
            .map(SortedSet::descending)
            .unwrap_or_default())
    }

    async fn key_count(&self) -> Result<usize> {
        Ok(self.sets.read().await.len())
    }

    async fn flush(&self) -> Result<()> {
        self.sets.write().await.clear();
        Ok(())
    }
}
