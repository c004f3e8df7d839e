//! # Typeahead Indexer
//!
//! Learns completions from observed queries and consolidates them into a
//! capacity-bounded ranked store.
//!
//! ## Pipeline
//!
//! ```text
//! report_query(word)
//!     │
//!     ├──> Query Counter (word → count)
//!     │
//!     ├──> Prefix Index (words the store does not rank yet)
//!     │
//!     └──> on tick: Consolidator (exclusive)
//!            ├─> promote ranked words under every prefix
//!            ├─> reseed prefixes of newly indexed words
//!            └─> reset the prefix index
//!
//! lookup(prefix) ──> Ranked Store (never blocked)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use typeahead_indexer::{ConsolidationConfig, TypeaheadService};
//! use typeahead_ranked_store::MemoryRankedStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(MemoryRankedStore::new());
//!     let service = TypeaheadService::new(store, ConsolidationConfig::default())?;
//!     let _worker = service.start_worker();
//!
//!     service.report_query("dog").await?;
//!     println!("{:?}", service.lookup("do").await?);
//!     Ok(())
//! }
//! ```

mod config;
mod consolidator;
mod error;
mod gate;
mod prefix_index;
mod query_counter;
mod ranked_cache;
mod service;
mod stats;
mod worker;

pub use config::ConsolidationConfig;
pub use consolidator::{Consolidator, PassOutcome};
pub use error::{IndexerError, Result};
pub use gate::{IngestState, IngestionGate, QueryOutcome};
pub use prefix_index::{prefixes_of, PrefixIndex};
pub use query_counter::QueryCounter;
pub use ranked_cache::{PromoteOutcome, RankedCache, SeedOutcome};
pub use service::TypeaheadService;
pub use stats::{ConsolidationStats, IndexSnapshot};
pub use worker::{ConsolidationUpdate, ConsolidationWorker, ConsolidatorHealth};
