// ABOUTME: Persistence of app records behind the AppStore trait.
// ABOUTME: Ships an in-memory store and a JSON file store sharing one collection model.

mod collection;
mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use crate::app::{AppRecord, AppUpdate, RecordError};
use crate::types::{AppId, AppName, OwnerId};
use async_trait::async_trait;
use std::path::PathBuf;

/// Record storage. Every lookup goes through an [`AppFilter`].
#[async_trait]
pub trait AppStore: Send + Sync {
    async fn find_one(&self, filter: &AppFilter) -> Result<Option<AppRecord>, StoreError>;

    /// Insert a new record. Names are unique per owner.
    async fn insert_one(&self, record: AppRecord) -> Result<(), StoreError>;

    /// Apply `update` to the single matching record and return the result.
    async fn update_one(
        &self,
        filter: &AppFilter,
        update: &AppUpdate,
    ) -> Result<AppRecord, StoreError>;

    /// Remove the matching record. Returns whether one existed.
    async fn delete_one(&self, filter: &AppFilter) -> Result<bool, StoreError>;

    /// All matching records, oldest first.
    async fn find(&self, filter: &AppFilter) -> Result<Vec<AppRecord>, StoreError>;
}

/// Record selector. Always scoped by app id, owner, or both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppFilter {
    id: Option<AppId>,
    owner: Option<OwnerId>,
    name: Option<AppName>,
}

impl AppFilter {
    /// Match a record by id regardless of owner.
    pub fn by_id(id: &AppId) -> Self {
        Self {
            id: Some(id.clone()),
            owner: None,
            name: None,
        }
    }

    /// Match every record of an owner.
    pub fn owned_by(owner: &OwnerId) -> Self {
        Self {
            id: None,
            owner: Some(owner.clone()),
            name: None,
        }
    }

    /// Match one app, only if `owner` owns it.
    pub fn app(owner: &OwnerId, id: &AppId) -> Self {
        Self {
            id: Some(id.clone()),
            owner: Some(owner.clone()),
            name: None,
        }
    }

    /// Match an owner's app by name.
    pub fn named(owner: &OwnerId, name: &AppName) -> Self {
        Self {
            id: None,
            owner: Some(owner.clone()),
            name: Some(name.clone()),
        }
    }

    pub fn matches(&self, record: &AppRecord) -> bool {
        self.id.as_ref().is_none_or(|id| &record.id == id)
            && self.owner.as_ref().is_none_or(|o| &record.owner == o)
            && self.name.as_ref().is_none_or(|n| record.name() == n)
    }
}

/// Errors from record storage.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("app not found")]
    NotFound,

    #[error("owner {owner} already has an app named {name}")]
    NameTaken { owner: OwnerId, name: AppName },

    #[error("duplicate app id: {0}")]
    DuplicateId(AppId),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error("state file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("state file {path} is not valid: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
