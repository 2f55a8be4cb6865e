// ABOUTME: Fetching app sources into per-app workspaces.
// ABOUTME: Defines the SourceFetcher seam and workspace path helpers.

mod git;

pub use git::GitFetcher;

use crate::types::{AppName, OwnerId};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Materializes a branch of a repository into a directory.
///
/// Fetching is a destructive refresh: whatever was at `dest` is replaced. Once `cancel`
/// fires the fetch should stop early, but it must not return while anything is still
/// writing under `dest`.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        branch: &str,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> Result<Workspace, FetchError>;
}

/// A fetched checkout on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub path: PathBuf,
    /// Commit the checkout points at, when known.
    pub revision: Option<String>,
}

impl Workspace {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            revision: None,
        }
    }
}

/// Any failure to produce a workspace. Carries the underlying cause as text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to fetch {url} ({branch}): {message}")]
pub struct FetchError {
    pub url: String,
    pub branch: String,
    pub message: String,
}

impl FetchError {
    pub fn new(url: &str, branch: &str, message: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            branch: branch.to_string(),
            message: message.into(),
        }
    }
}

/// Deterministic workspace location: `{root}/{owner}/{name}`.
pub fn workspace_path(root: &Path, owner: &OwnerId, name: &AppName) -> PathBuf {
    root.join(path_component(owner.as_str())).join(name.as_str())
}

// Owner ids come from outside; keep them a single, non-hidden path segment. Dot entries
// under the root are reserved for lock files.
fn path_component(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() || cleaned.starts_with('.') {
        format!("_{cleaned}")
    } else {
        cleaned
    }
}

/// Remove a workspace recursively. A missing directory counts as removed.
pub async fn remove_workspace(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
