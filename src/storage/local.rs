//! Local filesystem storage implementation.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── vacancies.json        # Snapshot of the vacancies target
//! └── tasks.json            # Snapshot of the tasks target
//! ```
//!
//! Writes go to `{file}.tmp` first and are renamed into place, so an
//! interrupted write leaves the previous snapshot readable.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{Record, Snapshot};
use crate::storage::{SnapshotStore, WriteMetadata};

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Get the full path for a relative key.
    pub fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes through a temporary sibling file.
    ///
    /// The temporary file is removed if any step fails.
    async fn write_bytes(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        Self::ensure_dir(path).await?;

        let tmp = path.with_extension("tmp");
        let result = Self::write_then_rename(&tmp, path, bytes).await;
        if result.is_err() {
            if let Err(e) = tokio::fs::remove_file(&tmp).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("Cannot remove {}: {}", tmp.display(), e);
                }
            }
        }
        result
    }

    async fn write_then_rename(tmp: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let mut file = tokio::fs::File::create(tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(tmp, path).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(path: &Path) -> std::io::Result<Option<Vec<u8>>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl SnapshotStore for LocalStorage {
    async fn load(&self, key: &str) -> Snapshot {
        let path = self.path(key);
        let bytes = match Self::read_bytes(&path).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                log::debug!("No snapshot at {}", path.display());
                return Snapshot::new();
            }
            Err(e) => {
                log::warn!("Cannot read snapshot {}: {}", path.display(), e);
                return Snapshot::new();
            }
        };

        match serde_json::from_slice::<Vec<Record>>(&bytes) {
            Ok(records) => records.into_iter().filter(|r| !r.key.is_empty()).collect(),
            Err(e) => {
                log::warn!(
                    "Malformed snapshot {}: {}. Starting from empty history",
                    path.display(),
                    e
                );
                Snapshot::new()
            }
        }
    }

    async fn save(&self, key: &str, records: &[Record]) -> Result<WriteMetadata> {
        let path = self.path(key);
        let bytes = serde_json::to_vec_pretty(records)?;
        Self::write_bytes(&path, &bytes)
            .await
            .map_err(|e| AppError::storage(&path, e))?;

        Ok(WriteMetadata {
            count: records.len(),
            location: path.display().to_string(),
            timestamp: Utc::now(),
        })
    }
}
