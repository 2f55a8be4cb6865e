// ABOUTME: Diagnostics accumulator for non-fatal warnings during app operations.
// ABOUTME: Collects cleanup problems that should be shown to users without failing the call.

use serde::Serialize;

/// Collects non-fatal warnings during an operation.
#[derive(Debug, Default, Serialize)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!(kind = ?warning.kind, "{}", warning.message);
        self.warnings.push(warning);
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// A non-fatal warning.
#[derive(Debug, Clone, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// Stopping a container failed; removal is still attempted.
    pub fn container_stop(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::ContainerStop,
            message: message.into(),
        }
    }

    /// Removing a container failed (it may remain on the host).
    pub fn container_remove(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::ContainerRemove,
            message: message.into(),
        }
    }

    /// A container is recorded but no runtime is reachable to clean it up.
    pub fn runtime_unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::RuntimeUnavailable,
            message: message.into(),
        }
    }
}

/// Categories of warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningKind {
    ContainerStop,
    ContainerRemove,
    RuntimeUnavailable,
}
