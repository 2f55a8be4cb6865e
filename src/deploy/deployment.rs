// ABOUTME: Generic deployment struct parameterized by state.
// ABOUTME: Holds the record snapshot taken when the deploy entered building.

use std::path::{Path, PathBuf};

use crate::app::AppRecord;
use crate::types::AppId;

use super::state::{Detected, Fetched, Pending};

/// One deploy in progress. `S` carries what the stages so far produced.
#[derive(Debug)]
pub struct Deployment<S> {
    pub(crate) record: AppRecord,
    pub(crate) dest: PathBuf,
    pub(crate) state: S,
}

impl Deployment<Pending> {
    /// Start a deploy of `record` into the workspace at `dest`.
    pub fn new(record: AppRecord, dest: impl Into<PathBuf>) -> Self {
        Deployment {
            record,
            dest: dest.into(),
            state: Pending,
        }
    }
}

impl<S> Deployment<S> {
    pub fn record(&self) -> &AppRecord {
        &self.record
    }

    pub fn app_id(&self) -> &AppId {
        &self.record.id
    }

    pub fn dest(&self) -> &Path {
        &self.dest
    }

    pub fn state(&self) -> &S {
        &self.state
    }
}

impl Deployment<Fetched> {
    pub fn revision(&self) -> Option<&str> {
        self.state.workspace.revision.as_deref()
    }
}

impl Deployment<Detected> {
    pub fn kind(&self) -> crate::app::RuntimeKind {
        self.state.kind
    }
}
