// ABOUTME: SourceFetcher backed by libgit2.
// ABOUTME: Clones a single branch on a blocking thread and aborts it on cancellation.

use super::{FetchError, SourceFetcher, Workspace};
use async_trait::async_trait;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Clones repositories with `git2`. Works for remote URLs and local paths.
#[derive(Debug, Clone, Default)]
pub struct GitFetcher;

impl GitFetcher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SourceFetcher for GitFetcher {
    async fn fetch(
        &self,
        url: &str,
        branch: &str,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> Result<Workspace, FetchError> {
        let (url, branch, dest) = (url.to_string(), branch.to_string(), dest.to_path_buf());
        let err = {
            let (url, branch) = (url.clone(), branch.clone());
            move |message: String| FetchError::new(&url, &branch, message)
        };

        // The clone thread cannot be dropped, only told to stop, so the task is always
        // awaited to completion before `dest` is handed back to the caller.
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || clone_branch(&url, &branch, &dest, &cancel))
            .await
            .map_err(|e| err(format!("clone task failed: {e}")))?
    }
}

fn clone_branch(
    url: &str,
    branch: &str,
    dest: &Path,
    cancel: &CancellationToken,
) -> Result<Workspace, FetchError> {
    let fail = |message: String| FetchError::new(url, branch, message);

    if cancel.is_cancelled() {
        return Err(fail("cancelled before clone".to_string()));
    }
    match std::fs::remove_dir_all(dest) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(fail(format!("cannot clear {}: {e}", dest.display()))),
    }
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| fail(format!("cannot create {}: {e}", parent.display())))?;
    }

    // Returning false from either callback makes libgit2 abort the clone.
    let mut callbacks = git2::RemoteCallbacks::new();
    let transfer = cancel.clone();
    callbacks.transfer_progress(move |_| !transfer.is_cancelled());
    let mut fetch = git2::FetchOptions::new();
    fetch.remote_callbacks(callbacks);

    let mut checkout = git2::build::CheckoutBuilder::new();
    let planning = cancel.clone();
    checkout
        .notify_on(git2::CheckoutNotificationType::UPDATED)
        .notify(move |_, _, _, _, _| !planning.is_cancelled());

    tracing::debug!(url, branch, dest = %dest.display(), "cloning");
    let cloned = git2::build::RepoBuilder::new()
        .branch(branch)
        .fetch_options(fetch)
        .with_checkout(checkout)
        .clone(url, dest);

    let repo = match cloned {
        Ok(repo) if !cancel.is_cancelled() => repo,
        Ok(_) => {
            discard_partial(dest);
            return Err(fail("clone cancelled".to_string()));
        }
        Err(e) => {
            if cancel.is_cancelled() {
                discard_partial(dest);
                return Err(fail(format!("clone cancelled: {}", e.message())));
            }
            return Err(fail(e.message().to_string()));
        }
    };

    let revision = repo
        .head()
        .ok()
        .and_then(|head| head.peel_to_commit().ok())
        .map(|commit| commit.id().to_string());

    Ok(Workspace {
        path: dest.to_path_buf(),
        revision,
    })
}

fn discard_partial(dest: &Path) {
    if let Err(e) = std::fs::remove_dir_all(dest)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!(dest = %dest.display(), error = %e, "could not remove cancelled checkout");
    }
}
