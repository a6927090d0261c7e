mod kapacitor_record;
mod kapacitor_store;
mod source_store;

pub use kapacitor_record::KapacitorRecord;
pub use kapacitor_store::KapacitorStore;
pub use source_store::{SourceRecord, SourceStore};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("store: {0}")]
pub struct StoreError(pub String);

/// Lookup side of the data-source registry.
#[async_trait]
pub trait SourceRegistry: Send + Sync {
    async fn exists(&self, id: i64) -> Result<bool, StoreError>;
}

/// Keyed storage for kapacitor instances.
///
/// There is no unscoped `get`: every single-record lookup names
/// both the instance and its owning source.
#[async_trait]
pub trait InstanceStore: Send + Sync {
    async fn all(&self) -> Result<Vec<KapacitorRecord>, StoreError>;
    /// Assigns a fresh id and returns the stored record.
    async fn add(&self, record: KapacitorRecord) -> Result<KapacitorRecord, StoreError>;
    async fn get_scoped(&self, id: i64, src_id: i64)
        -> Result<Option<KapacitorRecord>, StoreError>;
    /// Returns false when the record no longer exists.
    async fn update(&self, record: &KapacitorRecord) -> Result<bool, StoreError>;
    async fn delete(&self, id: i64) -> Result<bool, StoreError>;
}
