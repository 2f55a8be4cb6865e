// ABOUTME: Lifecycle status of an app and its allowed transitions.
// ABOUTME: Tags are a stable string vocabulary read by external callers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Persisted lifecycle stage of an app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppStatus {
    Pending,
    Building,
    Running,
    Deployed,
    UnknownType,
    Stopped,
    Failed,
}

impl AppStatus {
    pub const ALL: [AppStatus; 7] = [
        AppStatus::Pending,
        AppStatus::Building,
        AppStatus::Running,
        AppStatus::Deployed,
        AppStatus::UnknownType,
        AppStatus::Stopped,
        AppStatus::Failed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AppStatus::Pending => "pending",
            AppStatus::Building => "building",
            AppStatus::Running => "running",
            AppStatus::Deployed => "deployed",
            AppStatus::UnknownType => "unknown-type",
            AppStatus::Stopped => "stopped",
            AppStatus::Failed => "failed",
        }
    }

    /// States a deploy has settled in. Failure from these only comes via a new deploy.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AppStatus::Deployed | AppStatus::UnknownType | AppStatus::Failed
        )
    }

    /// Whether a container descriptor must be present in this state.
    pub fn holds_container(self) -> bool {
        matches!(self, AppStatus::Running | AppStatus::Stopped)
    }

    /// Check a transition against the lifecycle table.
    ///
    /// - any state may start a (re)deploy by moving to `building`
    /// - `building` settles in `running`, `deployed`, `unknown-type` or `failed`
    /// - `running` and `stopped` toggle
    /// - non-terminal states may fail
    pub fn can_transition_to(self, next: AppStatus) -> bool {
        use AppStatus::*;

        match (self, next) {
            (_, Building) => true,
            (Building, Running | Deployed | UnknownType) => true,
            (Running, Stopped) | (Stopped, Running) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for AppStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_tags_match_vocabulary() {
        for status in AppStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn deploy_path_is_allowed() {
        assert!(AppStatus::Pending.can_transition_to(AppStatus::Building));
        assert!(AppStatus::Building.can_transition_to(AppStatus::Running));
        assert!(AppStatus::Building.can_transition_to(AppStatus::Deployed));
        assert!(AppStatus::Building.can_transition_to(AppStatus::UnknownType));
        assert!(AppStatus::Building.can_transition_to(AppStatus::Failed));
    }

    #[test]
    fn redeploy_allowed_from_everywhere() {
        for status in AppStatus::ALL {
            assert!(status.can_transition_to(AppStatus::Building), "{status}");
        }
    }

    #[test]
    fn stop_start_only_between_running_and_stopped() {
        assert!(AppStatus::Running.can_transition_to(AppStatus::Stopped));
        assert!(AppStatus::Stopped.can_transition_to(AppStatus::Running));
        assert!(!AppStatus::Deployed.can_transition_to(AppStatus::Stopped));
        assert!(!AppStatus::Pending.can_transition_to(AppStatus::Running));
        assert!(!AppStatus::Failed.can_transition_to(AppStatus::Running));
    }

    #[test]
    fn failure_only_from_non_terminal() {
        assert!(AppStatus::Pending.can_transition_to(AppStatus::Failed));
        assert!(AppStatus::Running.can_transition_to(AppStatus::Failed));
        assert!(AppStatus::Stopped.can_transition_to(AppStatus::Failed));
        assert!(!AppStatus::Deployed.can_transition_to(AppStatus::Failed));
        assert!(!AppStatus::Failed.can_transition_to(AppStatus::Failed));
    }
}
