use crate::prefix_index::prefixes_of;
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;
use typeahead_ranked_store::{RankedStore, ScoredMember};

/// Capacity-bounded view over a [`RankedStore`].
///
/// No key ever grows past `capacity` through this type: an insertion that
/// would overflow evicts the lowest-scoring member(s) first.
#[derive(Clone)]
pub struct RankedCache {
    store: Arc<dyn RankedStore>,
    capacity: usize,
}

/// Result of bumping one word under every one of its prefixes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromoteOutcome {
    pub increments: usize,
    pub evicted: Vec<(String, ScoredMember)>,
}

/// Result of writing one prefix key during a reseed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeedOutcome {
    pub seeded: usize,
    pub evicted: Vec<ScoredMember>,
}

impl RankedCache {
    pub fn new(store: Arc<dyn RankedStore>, capacity: usize) -> Self {
        Self { store, capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn store(&self) -> &Arc<dyn RankedStore> {
        &self.store
    }

    /// Whether `word` is ranked under its own full-word key, i.e. the store
    /// already offers it as a completion.
    ///
    /// Checking key existence alone is not enough: `her` exists as a key as
    /// soon as `herself` is ranked.
    pub async fn knows_word(&self, word: &str) -> Result<bool> {
        Ok(self.store.score(word, word).await?.is_some())
    }

    /// Adds `delta` to `member` under `key`, evicting the minimum first when
    /// `member` is new and the key is full. Returns the evicted members.
    pub async fn increment_bounded(
        &self,
        key: &str,
        member: &str,
        delta: f64,
    ) -> Result<Vec<ScoredMember>> {
        let mut evicted = Vec::new();
        if self.store.score(key, member).await?.is_none() {
            while self.store.member_count(key).await? >= self.capacity {
                match self.store.evict_lowest_scoring(key).await? {
                    Some(entry) => evicted.push(entry),
                    None => break,
                }
            }
        }
        self.store.increment_score(key, member, delta).await?;
        Ok(evicted)
    }

    /// Increments `word` by `delta` under each of its prefixes.
    pub async fn promote_word(&self, word: &str, delta: f64) -> Result<PromoteOutcome> {
        let mut outcome = PromoteOutcome::default();
        for prefix in prefixes_of(word) {
            let evicted = self.increment_bounded(prefix, word, delta).await?;
            outcome.increments += 1;
            outcome
                .evicted
                .extend(evicted.into_iter().map(|entry| (prefix.to_string(), entry)));
        }
        Ok(outcome)
    }

    /// Writes `members` into `key`, trimming the lowest-scoring existing
    /// members so the key ends at no more than `capacity`.
    ///
    /// Scores of members already present are overwritten. A batch larger than
    /// the capacity keeps its highest-scored members.
    pub async fn seed(&self, key: &str, mut members: HashMap<String, f64>) -> Result<SeedOutcome> {
        let mut outcome = SeedOutcome::default();
        if members.is_empty() {
            return Ok(outcome);
        }
        if members.len() > self.capacity {
            members = keep_highest(members, self.capacity);
        }

        let mut current = self.store.member_count(key).await?;
        let mut absent = 0usize;
        if current > 0 {
            for member in members.keys() {
                if self.store.score(key, member).await?.is_none() {
                    absent += 1;
                }
            }
        } else {
            absent = members.len();
        }

        while current + absent > self.capacity {
            let Some(entry) = self.store.evict_lowest_scoring(key).await? else {
                break;
            };
            current -= 1;
            if members.contains_key(&entry.member) {
                absent += 1;
            }
            outcome.evicted.push(entry);
        }

        self.store.set_members(key, &members).await?;
        outcome.seeded = members.len();
        Ok(outcome)
    }

    /// Ranked completions for `prefix`, best first.
    pub async fn lookup(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .lookup_scored(prefix)
            .await?
            .into_iter()
            .map(|entry| entry.member)
            .collect())
    }

    pub async fn lookup_scored(&self, prefix: &str) -> Result<Vec<ScoredMember>> {
        let mut ranked = self.store.range_by_score_descending(prefix).await?;
        ranked.truncate(self.capacity);
        Ok(ranked)
    }
}

fn keep_highest(members: HashMap<String, f64>, limit: usize) -> HashMap<String, f64> {
    let mut ordered: Vec<(String, f64)> = members.into_iter().collect();
    ordered.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ordered.truncate(limit);
    ordered.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use typeahead_ranked_store::MemoryRankedStore;

    fn cache(capacity: usize) -> RankedCache {
        RankedCache::new(Arc::new(MemoryRankedStore::new()), capacity)
    }

    fn members(entries: &[(&str, f64)]) -> HashMap<String, f64> {
        entries
            .iter()
            .map(|(member, score)| ((*member).to_string(), *score))
            .collect()
    }

    #[tokio::test]
    async fn test_full_key_evicts_minimum_before_new_member() {
        let cache = cache(3);
        cache
            .seed("ca", members(&[("cat", 5.0), ("car", 3.0), ("can", 1.0)]))
            .await
            .unwrap();

        let evicted = cache.increment_bounded("ca", "cab", 4.0).await.unwrap();
        assert_eq!(evicted, vec![ScoredMember::new("can", 1.0)]);
        assert_eq!(cache.lookup("ca").await.unwrap(), vec!["cat", "cab", "car"]);
    }

    #[tokio::test]
    async fn test_existing_member_increment_never_evicts() {
        let cache = cache(2);
        cache
            .seed("do", members(&[("dog", 1.0), ("dot", 2.0)]))
            .await
            .unwrap();

        let evicted = cache.increment_bounded("do", "dog", 5.0).await.unwrap();
        assert!(evicted.is_empty());
        assert_eq!(cache.lookup("do").await.unwrap(), vec!["dog", "dot"]);
    }

    #[tokio::test]
    async fn test_seed_trims_lowest_to_make_room() {
        let cache = cache(3);
        cache
            .seed("ca", members(&[("cat", 5.0), ("car", 3.0), ("can", 1.0)]))
            .await
            .unwrap();

        let outcome = cache
            .seed("ca", members(&[("cab", 0.0), ("cap", 0.0)]))
            .await
            .unwrap();
        assert_eq!(outcome.seeded, 2);
        assert_eq!(outcome.evicted.len(), 2);
        assert_eq!(cache.store().member_count("ca").await.unwrap(), 3);
        assert_eq!(
            cache.store().score("ca", "cat").await.unwrap(),
            Some(5.0),
            "highest member survives the trim"
        );
    }

    #[tokio::test]
    async fn test_seed_overlapping_members_respects_capacity() {
        let cache = cache(3);
        cache
            .seed("ca", members(&[("can", 0.0), ("car", 5.0), ("cat", 6.0)]))
            .await
            .unwrap();

        // `can` is both the minimum and part of the batch.
        cache
            .seed("ca", members(&[("can", 1.0), ("cab", 1.0)]))
            .await
            .unwrap();
        assert!(cache.store().member_count("ca").await.unwrap() <= 3);
        assert_eq!(cache.store().score("ca", "can").await.unwrap(), Some(1.0));
    }

    #[tokio::test]
    async fn test_oversized_batch_keeps_highest() {
        let cache = cache(2);
        cache
            .seed("b", members(&[("be", 1.0), ("bee", 3.0), ("bed", 2.0)]))
            .await
            .unwrap();
        assert_eq!(cache.lookup("b").await.unwrap(), vec!["bee", "bed"]);
    }

    #[tokio::test]
    async fn test_knows_word_requires_own_key_membership() {
        let cache = cache(5);
        cache
            .seed("her", members(&[("herself", 0.0)]))
            .await
            .unwrap();
        assert!(cache.store().exists("her").await.unwrap());
        assert!(!cache.knows_word("her").await.unwrap());

        cache
            .seed("herself", members(&[("herself", 0.0)]))
            .await
            .unwrap();
        assert!(cache.knows_word("herself").await.unwrap());
    }

    #[tokio::test]
    async fn test_promote_word_touches_every_prefix() {
        let cache = cache(5);
        let outcome = cache.promote_word("cab", 4.0).await.unwrap();
        assert_eq!(outcome.increments, 3);
        for prefix in ["c", "ca", "cab"] {
            assert_eq!(cache.store().score(prefix, "cab").await.unwrap(), Some(4.0));
        }
    }
}
