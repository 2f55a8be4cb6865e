// ABOUTME: Error types for orchestrator operations.
// ABOUTME: DeployErrorKind gives callers a stable value to match on.

use super::lock::LockInfo;
use crate::app::{AppStatus, RecordError};
use crate::build::BuildError;
use crate::runtime::SupervisorError;
use crate::source::FetchError;
use crate::store::StoreError;
use crate::types::{AppId, AppName, OwnerId};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("app not found: {0}")]
    NotFound(AppId),

    #[error("owner {owner} already has an app named {name}")]
    NameTaken { owner: OwnerId, name: AppName },

    #[error("invalid app: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("build failed: {0}")]
    Build(#[from] BuildError),

    #[error("container runtime error: {0}")]
    Runtime(String),

    #[error("no container runtime available")]
    RuntimeUnavailable,

    #[error(
        "{} already in progress since {} (pid {} on {})",
        .0.operation, .0.started_at, .0.pid, .0.holder
    )]
    Conflict(LockInfo),

    #[error("lock error: {0}")]
    Lock(String),

    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition { from: AppStatus, to: AppStatus },

    #[error("{stage} timed out after {after:?}")]
    Timeout { stage: &'static str, after: Duration },

    #[error("deploy cancelled")]
    Cancelled,

    #[error("failed to remove workspace {path}: {source}")]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store error: {0}")]
    Store(StoreError),
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    NotFound,
    NameTaken,
    InvalidInput,
    Fetch,
    Build,
    Runtime,
    RuntimeUnavailable,
    /// Another operation holds the app's deploy lock.
    Conflict,
    /// The lock itself could not be taken or inspected.
    Lock,
    InvalidTransition,
    Timeout,
    Cancelled,
    Workspace,
    Store,
}

impl DeployError {
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::NotFound(_) => DeployErrorKind::NotFound,
            DeployError::NameTaken { .. } => DeployErrorKind::NameTaken,
            DeployError::InvalidInput(_) => DeployErrorKind::InvalidInput,
            DeployError::Fetch(_) => DeployErrorKind::Fetch,
            DeployError::Build(BuildError::RuntimeUnavailable) => {
                DeployErrorKind::RuntimeUnavailable
            }
            DeployError::Build(_) => DeployErrorKind::Build,
            DeployError::Runtime(_) => DeployErrorKind::Runtime,
            DeployError::RuntimeUnavailable => DeployErrorKind::RuntimeUnavailable,
            DeployError::Conflict(_) => DeployErrorKind::Conflict,
            DeployError::Lock(_) => DeployErrorKind::Lock,
            DeployError::InvalidTransition { .. } => DeployErrorKind::InvalidTransition,
            DeployError::Timeout { .. } => DeployErrorKind::Timeout,
            DeployError::Cancelled => DeployErrorKind::Cancelled,
            DeployError::Workspace { .. } => DeployErrorKind::Workspace,
            DeployError::Store(_) => DeployErrorKind::Store,
        }
    }

    /// Holder of the lock, for conflict errors.
    pub fn lock_holder(&self) -> Option<&LockInfo> {
        match self {
            DeployError::Conflict(info) => Some(info),
            _ => None,
        }
    }
}

impl From<StoreError> for DeployError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NameTaken { owner, name } => DeployError::NameTaken { owner, name },
            StoreError::Record(record) => record.into(),
            other => DeployError::Store(other),
        }
    }
}

impl From<RecordError> for DeployError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::InvalidTransition { from, to } => {
                DeployError::InvalidTransition { from, to }
            }
            other => DeployError::InvalidInput(other.to_string()),
        }
    }
}

impl From<SupervisorError> for DeployError {
    fn from(err: SupervisorError) -> Self {
        match err {
            SupervisorError::RuntimeUnavailable => DeployError::RuntimeUnavailable,
            SupervisorError::Runtime(message) => DeployError::Runtime(message),
        }
    }
}
