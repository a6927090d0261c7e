use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use super::kapacitor_record::KapacitorRecord;
use super::{InstanceStore, StoreError};

#[derive(Clone)]
pub struct KapacitorStore {
    servers: Arc<DashMap<i64, KapacitorRecord>>,
    next_id: Arc<AtomicI64>,
}

impl Default for KapacitorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KapacitorStore {
    pub fn new() -> Self {
        Self {
            servers: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }

    pub fn count(&self) -> usize {
        self.servers.len()
    }
}

#[async_trait]
impl InstanceStore for KapacitorStore {
    async fn all(&self) -> Result<Vec<KapacitorRecord>, StoreError> {
        let mut all: Vec<KapacitorRecord> =
            self.servers.iter().map(|r| r.value().clone()).collect();
        all.sort_by_key(|r| r.id);
        Ok(all)
    }

    async fn add(&self, mut record: KapacitorRecord) -> Result<KapacitorRecord, StoreError> {
        record.id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.servers.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_scoped(
        &self,
        id: i64,
        src_id: i64,
    ) -> Result<Option<KapacitorRecord>, StoreError> {
        Ok(self
            .servers
            .get(&id)
            .filter(|r| r.src_id == src_id)
            .map(|r| r.clone()))
    }

    async fn update(&self, record: &KapacitorRecord) -> Result<bool, StoreError> {
        match self.servers.get_mut(&record.id) {
            Some(mut entry) => {
                *entry = record.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.servers.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_server(src_id: i64) -> KapacitorRecord {
        KapacitorRecord {
            id: 0,
            src_id,
            name: "kapa1".into(),
            url: "http://localhost:9092".into(),
            username: String::new(),
            password: String::new(),
            active: false,
        }
    }

    #[tokio::test]
    async fn add_assigns_increasing_ids() {
        let store = KapacitorStore::new();
        let a = store.add(sample_server(1)).await.unwrap();
        let b = store.add(sample_server(1)).await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(store.count(), 2);
    }

    #[tokio::test]
    async fn get_scoped_requires_matching_source() {
        let store = KapacitorStore::new();
        let srv = store.add(sample_server(1)).await.unwrap();
        assert!(store.get_scoped(srv.id, 1).await.unwrap().is_some());
        assert!(store.get_scoped(srv.id, 2).await.unwrap().is_none());
        assert!(store.get_scoped(99, 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn all_is_ordered_by_id() {
        let store = KapacitorStore::new();
        for src in [2, 1, 2] {
            store.add(sample_server(src)).await.unwrap();
        }
        let ids: Vec<i64> = store.all().await.unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn update_existing() {
        let store = KapacitorStore::new();
        let mut srv = store.add(sample_server(1)).await.unwrap();
        srv.name = "renamed".into();
        assert!(store.update(&srv).await.unwrap());
        let got = store.get_scoped(srv.id, 1).await.unwrap().unwrap();
        assert_eq!(got.name, "renamed");
    }

    #[tokio::test]
    async fn update_missing_returns_false() {
        let store = KapacitorStore::new();
        let mut srv = sample_server(1);
        srv.id = 42;
        assert!(!store.update(&srv).await.unwrap());
    }

    #[tokio::test]
    async fn delete_existing_then_missing() {
        let store = KapacitorStore::new();
        let srv = store.add(sample_server(1)).await.unwrap();
        assert!(store.delete(srv.id).await.unwrap());
        assert!(!store.delete(srv.id).await.unwrap());
        assert!(store.get_scoped(srv.id, 1).await.unwrap().is_none());
    }
}
