// ABOUTME: Record collection shared by the store implementations.
// ABOUTME: Holds the uniqueness and update rules independent of where records live.

use super::{AppFilter, StoreError};
use crate::app::{AppRecord, AppUpdate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub(crate) struct Collection {
    records: Vec<AppRecord>,
}

impl Collection {
    pub(crate) fn find_one(&self, filter: &AppFilter) -> Option<AppRecord> {
        self.records.iter().find(|r| filter.matches(r)).cloned()
    }

    pub(crate) fn find(&self, filter: &AppFilter) -> Vec<AppRecord> {
        let mut found: Vec<AppRecord> = self
            .records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        found.sort_by_key(|r| r.created_at);
        found
    }

    pub(crate) fn insert(&mut self, record: AppRecord) -> Result<(), StoreError> {
        record.check()?;
        if self.records.iter().any(|r| r.id == record.id) {
            return Err(StoreError::DuplicateId(record.id));
        }
        if self
            .records
            .iter()
            .any(|r| r.owner == record.owner && r.name() == record.name())
        {
            return Err(StoreError::NameTaken {
                owner: record.owner,
                name: record.spec.name,
            });
        }
        self.records.push(record);
        Ok(())
    }

    pub(crate) fn update(
        &mut self,
        filter: &AppFilter,
        update: &AppUpdate,
    ) -> Result<AppRecord, StoreError> {
        let record = self
            .records
            .iter_mut()
            .find(|r| filter.matches(r))
            .ok_or(StoreError::NotFound)?;
        record.apply(update)?;
        Ok(record.clone())
    }

    pub(crate) fn delete(&mut self, filter: &AppFilter) -> bool {
        match self.records.iter().position(|r| filter.matches(r)) {
            Some(idx) => {
                self.records.remove(idx);
                true
            }
            None => false,
        }
    }
}
