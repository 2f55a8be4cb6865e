// ABOUTME: In-memory AppStore for tests and embedding.
// ABOUTME: Records live behind a parking_lot RwLock for the life of the process.

use super::collection::Collection;
use super::{AppFilter, AppStore, StoreError};
use crate::app::{AppRecord, AppUpdate};
use async_trait::async_trait;
use parking_lot::RwLock;

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Collection>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AppStore for MemoryStore {
    async fn find_one(&self, filter: &AppFilter) -> Result<Option<AppRecord>, StoreError> {
        Ok(self.inner.read().find_one(filter))
    }

    async fn insert_one(&self, record: AppRecord) -> Result<(), StoreError> {
        self.inner.write().insert(record)
    }

    async fn update_one(
        &self,
        filter: &AppFilter,
        update: &AppUpdate,
    ) -> Result<AppRecord, StoreError> {
        self.inner.write().update(filter, update)
    }

    async fn delete_one(&self, filter: &AppFilter) -> Result<bool, StoreError> {
        Ok(self.inner.write().delete(filter))
    }

    async fn find(&self, filter: &AppFilter) -> Result<Vec<AppRecord>, StoreError> {
        Ok(self.inner.read().find(filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{AppSpec, AppStatus};
    use crate::types::{AppName, OwnerId};

    fn record(owner: &str, name: &str) -> AppRecord {
        let spec = AppSpec::new(AppName::parse(name).unwrap(), "https://example.com/x.git");
        AppRecord::new(OwnerId::new(owner), spec).unwrap()
    }

    #[tokio::test]
    async fn name_unique_per_owner() {
        let store = MemoryStore::new();
        store.insert_one(record("alice", "web")).await.unwrap();

        let err = store.insert_one(record("alice", "web")).await.unwrap_err();
        assert!(matches!(err, StoreError::NameTaken { .. }));

        store.insert_one(record("bob", "web")).await.unwrap();
    }

    #[tokio::test]
    async fn owner_scoped_lookup() {
        let store = MemoryStore::new();
        let rec = record("alice", "web");
        let id = rec.id.clone();
        store.insert_one(rec).await.unwrap();

        let alice = OwnerId::new("alice");
        let bob = OwnerId::new("bob");
        assert!(store.find_one(&AppFilter::app(&alice, &id)).await.unwrap().is_some());
        assert!(store.find_one(&AppFilter::app(&bob, &id)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_missing_record_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update_one(
                &AppFilter::by_id(&crate::types::AppId::new("nope")),
                &AppUpdate::transition(AppStatus::Building),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn rejected_update_leaves_record_unchanged() {
        let store = MemoryStore::new();
        let rec = record("alice", "web");
        let id = rec.id.clone();
        store.insert_one(rec).await.unwrap();

        let err = store
            .update_one(&AppFilter::by_id(&id), &AppUpdate::transition(AppStatus::Running))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Record(_)));

        let stored = store.find_one(&AppFilter::by_id(&id)).await.unwrap().unwrap();
        assert_eq!(stored.status, AppStatus::Pending);
    }
}
