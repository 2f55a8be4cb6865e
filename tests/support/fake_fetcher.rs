// ABOUTME: SourceFetcher that writes a fixed file set instead of cloning.
// ABOUTME: Can be made slow or failing to exercise timeouts and error paths.

use async_trait::async_trait;
use cloudnest::source::{FetchError, SourceFetcher, Workspace};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
pub struct FakeFetcher {
    files: Mutex<Vec<(String, String)>>,
    delay: Mutex<Option<Duration>>,
    error: Mutex<Option<String>>,
    fetches: AtomicUsize,
}

impl FakeFetcher {
    pub fn with_files(files: &[(&str, &str)]) -> Self {
        let fetcher = Self::default();
        fetcher.set_files(files);
        fetcher
    }

    /// Files written into every workspace from now on.
    pub fn set_files(&self, files: &[(&str, &str)]) {
        *self.files.lock() = files
            .iter()
            .map(|(p, c)| (p.to_string(), c.to_string()))
            .collect();
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn fail_with(&self, message: &str) {
        *self.error.lock() = Some(message.to_string());
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceFetcher for FakeFetcher {
    async fn fetch(
        &self,
        url: &str,
        branch: &str,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> Result<Workspace, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::select! {
                _ = cancel.cancelled() => return Err(FetchError::new(url, branch, "cancelled")),
                _ = tokio::time::sleep(delay) => {}
            }
        }
        if let Some(message) = self.error.lock().clone() {
            return Err(FetchError::new(url, branch, message));
        }

        let _ = std::fs::remove_dir_all(dest);
        std::fs::create_dir_all(dest).map_err(|e| FetchError::new(url, branch, e.to_string()))?;
        for (path, content) in self.files.lock().iter() {
            let file = dest.join(path);
            if let Some(parent) = file.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(file, content).unwrap();
        }

        Ok(Workspace {
            path: dest.to_path_buf(),
            revision: Some("0000000".to_string()),
        })
    }
}
