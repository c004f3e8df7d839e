use crate::error::{RankedStoreError, Result};
use crate::memory::MemoryRankedStore;
use crate::types::ScoredMember;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// JSON image of a [`MemoryRankedStore`], persisted between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub schema_version: u32,
    pub keys: BTreeMap<String, Vec<ScoredMember>>,
}

impl StoreSnapshot {
    pub fn new(keys: BTreeMap<String, Vec<ScoredMember>>) -> Self {
        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            keys,
        }
    }

    /// Reads a snapshot; a missing file is not an error.
    pub async fn read(path: &Path) -> Result<Option<Self>> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let snapshot: StoreSnapshot = serde_json::from_slice(&bytes)?;
        if snapshot.schema_version != SNAPSHOT_SCHEMA_VERSION {
            return Err(RankedStoreError::Snapshot(format!(
                "unsupported schema version {} in {}",
                snapshot.schema_version,
                path.display()
            )));
        }
        Ok(Some(snapshot))
    }

    pub async fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let bytes = serde_json::to_vec_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        if let Err(err) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(err.into());
        }
        Ok(())
    }
}

impl MemoryRankedStore {
    /// Loads the snapshot at `path`, or starts empty when there is none.
    pub async fn open_snapshot(path: &Path) -> Result<Self> {
        match StoreSnapshot::read(path).await? {
            Some(snapshot) => {
                log::info!(
                    "Loaded ranked store snapshot with {} keys from {}",
                    snapshot.keys.len(),
                    path.display()
                );
                Self::from_snapshot(snapshot)
            }
            None => Ok(Self::new()),
        }
    }

    pub async fn save_snapshot(&self, path: &Path) -> Result<()> {
        let snapshot = self.snapshot().await;
        snapshot.write(path).await?;
        log::debug!(
            "Saved ranked store snapshot with {} keys to {}",
            snapshot.keys.len(),
            path.display()
        );
        Ok(())
    }
}
