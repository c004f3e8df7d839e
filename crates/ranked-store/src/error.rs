use thiserror::Error;

pub type Result<T> = std::result::Result<T, RankedStoreError>;

#[derive(Error, Debug)]
pub enum RankedStoreError {
    #[error("Store unreachable: {0}")]
    Unreachable(String),

    #[error("Invalid score {score} for member '{member}' under key '{key}'")]
    InvalidScore {
        key: String,
        member: String,
        score: f64,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("{0}")]
    Other(String),
}
