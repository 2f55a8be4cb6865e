// ABOUTME: Deployment state types for the type state pattern.
// ABOUTME: Each state carries the data the next stage needs.

use crate::app::RuntimeKind;
use crate::source::Workspace;

/// Nothing fetched yet.
/// Available actions: `fetch()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Pending;

/// Sources checked out.
/// Available actions: `detect()`
#[derive(Debug, Clone)]
pub struct Fetched {
    pub(crate) workspace: Workspace,
}

impl Fetched {
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }
}

/// Runtime type known.
/// Available actions: `build()`
#[derive(Debug, Clone)]
pub struct Detected {
    pub(crate) workspace: Workspace,
    pub(crate) kind: RuntimeKind,
}

impl Detected {
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn kind(&self) -> RuntimeKind {
        self.kind
    }
}
