use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use super::{SourceRegistry, StoreError};

#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    pub id: i64,
    pub name: String,
    pub url: String,
}

#[derive(Clone)]
pub struct SourceStore {
    sources: Arc<DashMap<i64, SourceRecord>>,
}

impl Default for SourceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceStore {
    pub fn new() -> Self {
        Self {
            sources: Arc::new(DashMap::new()),
        }
    }

    pub fn insert(&self, record: SourceRecord) {
        self.sources.insert(record.id, record);
    }

    pub fn count(&self) -> usize {
        self.sources.len()
    }
}

#[async_trait]
impl SourceRegistry for SourceStore {
    async fn exists(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.sources.contains_key(&id))
    }
}
