use crate::error::Result;
use crate::types::ScoredMember;
use async_trait::async_trait;
use std::collections::HashMap;

/// Ordered, score-bounded set operations keyed by prefix.
///
/// A key with no members does not exist. Implementations may block on
/// network I/O; callers await each operation in turn.
#[async_trait]
pub trait RankedStore: Send + Sync {
    /// Whether `key` currently holds at least one member.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Number of members stored under `key` (0 when absent).
    async fn member_count(&self, key: &str) -> Result<usize>;

    /// Score of `member` under `key`, if present.
    async fn score(&self, key: &str, member: &str) -> Result<Option<f64>>;

    /// Creates `member` with `delta` when absent, otherwise adds `delta`.
    /// Returns the resulting score.
    async fn increment_score(&self, key: &str, member: &str, delta: f64) -> Result<f64>;

    /// Removes and returns the member with the smallest score. Ties go to the
    /// lexicographically smallest member.
    async fn evict_lowest_scoring(&self, key: &str) -> Result<Option<ScoredMember>>;

    /// Adds the given members, overwriting the score of any already present.
    async fn set_members(&self, key: &str, members: &HashMap<String, f64>) -> Result<()>;

    /// All members of `key`, highest score first.
    async fn range_by_score_descending(&self, key: &str) -> Result<Vec<ScoredMember>>;

    /// Number of keys in the store.
    async fn key_count(&self) -> Result<usize>;

    /// Drops every key.
    async fn flush(&self) -> Result<()>;
}
