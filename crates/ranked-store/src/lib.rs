//! # Typeahead Ranked Store
//!
//! Per-prefix ranked sets backing type-ahead lookups.
//!
//! Every key is a prefix; every key holds a set of `(member, score)` pairs
//! ordered by score. The contract mirrors sorted-set stores:
//!
//! ```text
//! prefix "ca"
//!     │
//!     ├──> cat  5.0
//!     ├──> cab  4.0
//!     └──> car  3.0
//! ```
//!
//! Capacity is not enforced here; the consolidation pipeline applies its own
//! bound on top of these primitives.
//!
//! ## Example
//!
//! ```no_run
//! use typeahead_ranked_store::{MemoryRankedStore, RankedStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = MemoryRankedStore::new();
//!     store.increment_score("ca", "cat", 5.0).await?;
//!     store.increment_score("ca", "car", 3.0).await?;
//!
//!     for entry in store.range_by_score_descending("ca").await? {
//!         println!("{}: {}", entry.member, entry.score);
//!     }
//!     Ok(())
//! }
//! ```

mod error;
mod memory;
mod snapshot;
mod store;
mod types;

pub use error::{RankedStoreError, Result};
pub use memory::MemoryRankedStore;
pub use snapshot::{StoreSnapshot, SNAPSHOT_SCHEMA_VERSION};
pub use store::RankedStore;
pub use types::{validate_score, ScoredMember};
