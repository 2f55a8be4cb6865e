// ABOUTME: Per-app lock that serializes deploys and guards control actions.
// ABOUTME: An in-process mutex queues local callers; a lock file excludes other processes.

use chrono::{DateTime, Utc};
use fs2::FileExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;

use crate::types::AppId;

use super::error::DeployError;

/// How often a queued deploy retries a lock file held by another process.
const LOCK_POLL: Duration = Duration::from_millis(100);

/// Operation holding an app's lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Deploy,
    Stop,
    Start,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Deploy => "deploy",
            Operation::Stop => "stop",
            Operation::Start => "start",
            Operation::Delete => "delete",
        })
    }
}

/// Information about who holds a deploy lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    /// Hostname of the machine that holds the lock.
    pub holder: String,
    /// Process ID of the lock holder.
    pub pid: u32,
    /// When the lock was acquired.
    pub started_at: DateTime<Utc>,
    pub operation: Operation,
    pub app: AppId,
}

impl LockInfo {
    /// Create new lock info for the current process.
    pub fn new(app: &AppId, operation: Operation) -> Self {
        Self {
            holder: gethostname::gethostname().to_string_lossy().into_owned(),
            pid: std::process::id(),
            started_at: Utc::now(),
            operation,
            app: app.clone(),
        }
    }
}

#[derive(Clone, Default)]
struct Slot {
    mutex: Arc<tokio::sync::Mutex<()>>,
    holder: Arc<Mutex<Option<LockInfo>>>,
}

/// Lock table keyed by app id.
///
/// Built with [`DeployLocks::in_dir`], every lock is also an exclusive `flock` on
/// `{dir}/{app_id}.lock`, so processes sharing the directory exclude each other. The
/// file holds the current holder's [`LockInfo`] as JSON for conflict reports. The OS
/// drops the `flock` when its process dies, so a crash never leaves a lock behind.
#[derive(Clone, Default)]
pub struct DeployLocks {
    slots: Arc<Mutex<HashMap<AppId, Slot>>>,
    dir: Option<Arc<PathBuf>>,
}

impl fmt::Debug for DeployLocks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeployLocks")
            .field("apps", &self.slots.lock().len())
            .field("dir", &self.dir)
            .finish()
    }
}

/// A held app lock that releases on drop.
pub struct DeployGuard {
    holder: Arc<Mutex<Option<LockInfo>>>,
    file: Option<File>,
    _guard: OwnedMutexGuard<()>,
}

impl fmt::Debug for DeployGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeployGuard")
            .field("holder", &*self.holder.lock())
            .finish()
    }
}

impl Drop for DeployGuard {
    fn drop(&mut self) {
        self.holder.lock().take();
        if let Some(file) = self.file.take() {
            // Clear the holder info while still locked; closing the file unlocks it.
            let _ = file.set_len(0);
            let _ = FileExt::unlock(&file);
        }
    }
}

impl DeployLocks {
    /// Locks that only exclude callers sharing this value.
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks that also exclude other processes using the same directory.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            slots: Arc::default(),
            dir: Some(Arc::new(dir.into())),
        }
    }

    /// Lock file for `app`, when locks are shared through a directory.
    pub fn lock_path(&self, app: &AppId) -> Option<PathBuf> {
        let stem: String = app
            .as_str()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.dir.as_ref().map(|dir| dir.join(format!("{stem}.lock")))
    }

    fn slot(&self, app: &AppId) -> Slot {
        self.slots.lock().entry(app.clone()).or_default().clone()
    }

    /// Wait for the app's lock. Deploys queue here behind each other.
    pub async fn acquire(&self, app: &AppId, operation: Operation) -> Result<DeployGuard, DeployError> {
        let slot = self.slot(app);
        let guard = slot.mutex.lock_owned().await;
        let info = LockInfo::new(app, operation);

        let file = match self.lock_path(app) {
            None => None,
            Some(path) => loop {
                match claim_file(path.clone(), info.clone()).await? {
                    Ok(file) => break Some(file),
                    Err(held) => {
                        tracing::debug!(
                            app_id = %app,
                            holder = %held.holder,
                            pid = held.pid,
                            "waiting for lock held by another process"
                        );
                        tokio::time::sleep(LOCK_POLL).await;
                    }
                }
            },
        };

        *slot.holder.lock() = Some(info);
        Ok(DeployGuard {
            holder: slot.holder,
            file,
            _guard: guard,
        })
    }

    /// Take the lock only if it is free; otherwise report the current holder as
    /// [`DeployError::Conflict`].
    pub async fn try_acquire(&self, app: &AppId, operation: Operation) -> Result<DeployGuard, DeployError> {
        let slot = self.slot(app);
        let guard = match slot.mutex.clone().try_lock_owned() {
            Ok(guard) => guard,
            Err(_) => {
                let held = slot
                    .holder
                    .lock()
                    .clone()
                    .unwrap_or_else(|| LockInfo::new(app, Operation::Deploy));
                return Err(DeployError::Conflict(held));
            }
        };
        let info = LockInfo::new(app, operation);

        let file = match self.lock_path(app) {
            None => None,
            Some(path) => Some(claim_file(path, info.clone()).await?.map_err(DeployError::Conflict)?),
        };

        *slot.holder.lock() = Some(info);
        Ok(DeployGuard {
            holder: slot.holder,
            file,
            _guard: guard,
        })
    }

    /// Current holder of the app's lock in this process, if any.
    pub fn holder(&self, app: &AppId) -> Option<LockInfo> {
        self.slots
            .lock()
            .get(app)
            .and_then(|slot| slot.holder.lock().clone())
    }

    /// Drop the table entry for a deleted app. Outstanding guards stay valid.
    pub fn forget(&self, app: &AppId) {
        self.slots.lock().remove(app);
    }
}

// Outer error: the lock file could not be used at all. Inner error: someone else holds it.
async fn claim_file(path: PathBuf, info: LockInfo) -> Result<Result<File, LockInfo>, DeployError> {
    tokio::task::spawn_blocking(move || try_lock_file(&path, &info))
        .await
        .map_err(|e| DeployError::Lock(format!("lock task failed: {e}")))?
}

fn try_lock_file(path: &Path, info: &LockInfo) -> Result<Result<File, LockInfo>, DeployError> {
    let lock_err = |action: &str, e: std::io::Error| {
        DeployError::Lock(format!("failed to {action} {}: {e}", path.display()))
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| lock_err("create", e))?;
    }
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|e| lock_err("open", e))?;

    if file.try_lock_exclusive().is_err() {
        return Ok(Err(read_holder(&mut file, info)));
    }

    let body = serde_json::to_vec(info)
        .map_err(|e| DeployError::Lock(format!("failed to serialize lock: {e}")))?;
    file.set_len(0).map_err(|e| lock_err("truncate", e))?;
    file.seek(SeekFrom::Start(0))
        .and_then(|_| file.write_all(&body))
        .map_err(|e| lock_err("write", e))?;
    Ok(Ok(file))
}

// The holder may still be writing its info; fall back to a placeholder naming the app.
fn read_holder(file: &mut File, wanted: &LockInfo) -> LockInfo {
    let mut body = String::new();
    if file.read_to_string(&mut body).is_ok()
        && let Ok(info) = serde_json::from_str(&body)
    {
        return info;
    }
    tracing::warn!(app_id = %wanted.app, "lock info unreadable");
    LockInfo {
        holder: "unknown".to_string(),
        pid: 0,
        ..wanted.clone()
    }
}
