// ABOUTME: Tunables for the deploy pipeline.
// ABOUTME: Built from configuration; defaults match a fresh installation.

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploySettings {
    /// Workspaces live at `{deploy_root}/{owner}/{name}`.
    pub deploy_root: PathBuf,
    pub fetch_timeout: Duration,
    pub build_timeout: Duration,
    /// Log lines returned when the caller does not ask for a count.
    pub log_tail: u64,
}

impl DeploySettings {
    /// Per-app lock files shared by every process using this deploy root.
    pub fn lock_dir(&self) -> PathBuf {
        self.deploy_root.join(".locks")
    }
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self {
            deploy_root: PathBuf::from("/var/cloudnest/apps"),
            fetch_timeout: Duration::from_secs(5 * 60),
            build_timeout: Duration::from_secs(30 * 60),
            log_tail: 100,
        }
    }
}
