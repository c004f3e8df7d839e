use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexerError>;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("Ranked store error: {0}")]
    RankedStoreError(#[from] typeahead_ranked_store::RankedStoreError),

    #[error("Consolidation in progress; retry after the next tick")]
    Unavailable,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{0}")]
    Other(String),
}

impl IndexerError {
    /// Transient conditions the caller may retry without losing data.
    pub fn is_transient(&self) -> bool {
        matches!(self, IndexerError::Unavailable)
    }
}
