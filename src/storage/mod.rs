//! Storage abstractions for snapshot persistence.
//!
//! Each target owns one JSON array file under the data directory:
//!
//! ```text
//! data/
//! ├── vacancies.json
//! └── tasks.json
//! ```

pub mod local;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{Record, Snapshot};

// Re-export for convenience
pub use local::LocalStorage;

/// Metadata about a snapshot write.
#[derive(Debug, Clone)]
pub struct WriteMetadata {
    /// Number of records written
    pub count: usize,
    /// Where the snapshot was written
    pub location: String,
    /// Timestamp of the write
    pub timestamp: DateTime<Utc>,
}

/// Trait for snapshot storage backends.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Load the snapshot stored under `key`.
    ///
    /// Never fails: a missing, unreadable or malformed snapshot is empty.
    async fn load(&self, key: &str) -> Snapshot;

    /// Replace the snapshot stored under `key`.
    async fn save(&self, key: &str, records: &[Record]) -> Result<WriteMetadata>;
}
