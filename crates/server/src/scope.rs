use crate::error::ApiError;
use crate::store::{InstanceStore, KapacitorRecord};

/// Resolves kapacitor `kapa_id` within source `src_id`.
///
/// Existence and ownership are one lookup: an instance owned by another
/// source is reported exactly like one that does not exist.
pub async fn resolve(
    store: &dyn InstanceStore,
    src_id: i64,
    kapa_id: i64,
) -> Result<KapacitorRecord, ApiError> {
    store
        .get_scoped(kapa_id, src_id)
        .await?
        .ok_or(ApiError::InstanceNotFound(kapa_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::KapacitorStore;

    fn record(src_id: i64) -> KapacitorRecord {
        KapacitorRecord {
            id: 0,
            src_id,
            name: "kapa".into(),
            url: "http://localhost:9092".into(),
            username: String::new(),
            password: String::new(),
            active: true,
        }
    }

    #[tokio::test]
    async fn resolves_within_owning_source() {
        let store = KapacitorStore::new();
        let srv = store.add(record(1)).await.unwrap();
        let got = resolve(&store, 1, srv.id).await.unwrap();
        assert_eq!(got, srv);
    }

    #[tokio::test]
    async fn foreign_source_looks_like_missing_id() {
        let store = KapacitorStore::new();
        let srv = store.add(record(1)).await.unwrap();
        let store_ref: &dyn InstanceStore = &store;

        let foreign = resolve(store_ref, 2, srv.id).await.unwrap_err();
        store.delete(srv.id).await.unwrap();
        let missing = resolve(store_ref, 1, srv.id).await.unwrap_err();

        assert_eq!(foreign.to_string(), missing.to_string());
        assert_eq!(foreign.status(), missing.status());
    }
}
