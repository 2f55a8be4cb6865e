// ABOUTME: AppRecord, its user-supplied spec, and the update type that mutates it.
// ABOUTME: Applying an update validates the transition and the container invariant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{AppStatus, RuntimeKind};
use crate::types::{AppId, AppName, ContainerId, OwnerId};

fn default_branch() -> String {
    "main".to_string()
}

/// What the user asked to deploy. Fixed for the duration of one deploy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSpec {
    pub name: AppName,
    pub git_url: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl AppSpec {
    /// Spec tracking the `main` branch with no environment.
    pub fn new(name: AppName, git_url: impl Into<String>) -> Self {
        Self {
            name,
            git_url: git_url.into(),
            branch: default_branch(),
            env: BTreeMap::new(),
        }
    }

    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    fn validate(&self) -> Result<(), RecordError> {
        if self.git_url.trim().is_empty() {
            return Err(RecordError::InvalidSpec("git url cannot be empty".into()));
        }
        if self.branch.trim().is_empty() {
            return Err(RecordError::InvalidSpec("branch cannot be empty".into()));
        }
        if let Some(key) = self
            .env
            .keys()
            .find(|k| k.is_empty() || k.contains('='))
        {
            return Err(RecordError::InvalidSpec(format!(
                "invalid environment variable name: {key:?}"
            )));
        }
        Ok(())
    }
}

/// Persisted reference to the container backing an app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDescriptor {
    pub id: ContainerId,
    pub name: String,
    pub image: String,
}

/// The unit the orchestrator operates on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppRecord {
    pub id: AppId,
    pub owner: OwnerId,
    #[serde(flatten)]
    pub spec: AppSpec,
    pub runtime_kind: Option<RuntimeKind>,
    pub status: AppStatus,
    pub container: Option<ContainerDescriptor>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deployed_at: Option<DateTime<Utc>>,
}

/// Why a record could not be built or updated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("invalid app spec: {0}")]
    InvalidSpec(String),

    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition { from: AppStatus, to: AppStatus },

    #[error("status {status} {}", if *has_container { "cannot carry a container" } else { "requires a container" })]
    ContainerInvariant { status: AppStatus, has_container: bool },
}

impl AppRecord {
    /// A fresh `pending` record.
    pub fn new(owner: OwnerId, spec: AppSpec) -> Result<Self, RecordError> {
        spec.validate()?;
        let now = Utc::now();
        Ok(Self {
            id: AppId::generate(),
            owner,
            spec,
            runtime_kind: None,
            status: AppStatus::Pending,
            container: None,
            error: None,
            created_at: now,
            updated_at: now,
            deployed_at: None,
        })
    }

    pub fn name(&self) -> &AppName {
        &self.spec.name
    }

    /// Check the invariants a stored record must hold.
    pub fn check(&self) -> Result<(), RecordError> {
        self.spec.validate()?;
        if self.status.holds_container() != self.container.is_some() {
            return Err(RecordError::ContainerInvariant {
                status: self.status,
                has_container: self.container.is_some(),
            });
        }
        Ok(())
    }

    /// Apply an update atomically: either every field changes or none does.
    pub fn apply(&mut self, update: &AppUpdate) -> Result<(), RecordError> {
        let mut next = self.clone();

        if let Some(status) = update.status {
            if !self.status.can_transition_to(status) {
                return Err(RecordError::InvalidTransition {
                    from: self.status,
                    to: status,
                });
            }
            next.status = status;
            if status != AppStatus::Failed {
                next.error = None;
            }
        }
        if let Some(kind) = update.runtime_kind {
            next.runtime_kind = Some(kind);
        }
        if let Some(container) = &update.container {
            next.container = container.clone();
        }
        if let Some(error) = &update.error {
            next.error = Some(error.clone());
        }

        let now = Utc::now();
        if update.deployed {
            next.deployed_at = Some(now);
        }
        next.updated_at = now;

        next.check()?;
        *self = next;
        Ok(())
    }
}

/// A set of field changes for one record. Built by the orchestrator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppUpdate {
    status: Option<AppStatus>,
    runtime_kind: Option<RuntimeKind>,
    container: Option<Option<ContainerDescriptor>>,
    error: Option<String>,
    deployed: bool,
}

impl AppUpdate {
    /// Move to `status`.
    pub fn transition(status: AppStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Move to `failed`, recording the message and dropping any container.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Some(AppStatus::Failed),
            container: Some(None),
            error: Some(message.into()),
            ..Default::default()
        }
    }

    /// Record the detected runtime type without touching status.
    pub fn runtime_kind(kind: RuntimeKind) -> Self {
        Self {
            runtime_kind: Some(kind),
            ..Default::default()
        }
    }

    pub fn with_container(mut self, container: ContainerDescriptor) -> Self {
        self.container = Some(Some(container));
        self
    }

    pub fn without_container(mut self) -> Self {
        self.container = Some(None);
        self
    }

    /// Stamp `deployed_at`.
    pub fn deployed(mut self) -> Self {
        self.deployed = true;
        self
    }

    pub fn status(&self) -> Option<AppStatus> {
        self.status
    }
}
