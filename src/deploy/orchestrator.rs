// ABOUTME: Orchestrator driving app lifecycles: create, deploy, control, delete.
// ABOUTME: Deploys run as background tasks, serialized per app and cancellable.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::app::{AppRecord, AppSpec, AppStatus, AppUpdate, ContainerDescriptor};
use crate::build::{BuildOutcome, BuildRegistry};
use crate::diagnostics::{Diagnostics, Warning};
use crate::runtime::ContainerSupervisor;
use crate::source::{SourceFetcher, remove_workspace, workspace_path};
use crate::store::{AppFilter, AppStore};
use crate::types::{AppId, OwnerId};

use super::lock::{DeployGuard, DeployLocks, Operation};
use super::state::Pending;
use super::{DeployError, DeploySettings, Deployment};

/// Result of a stop or start request.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlOutcome {
    /// The container changed state; carries the updated record.
    Done(AppRecord),
    /// Nothing to act on: no container recorded, or no runtime reachable.
    NoContainer,
}

/// A deploy running in the background.
#[derive(Debug)]
pub struct DeployHandle {
    app_id: AppId,
    cancel: CancellationToken,
    join: JoinHandle<Result<AppRecord, DeployError>>,
}

impl DeployHandle {
    pub fn app_id(&self) -> &AppId {
        &self.app_id
    }

    /// Cancel this deploy only.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the deploy to settle.
    pub async fn wait(self) -> Result<AppRecord, DeployError> {
        match self.join.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(DeployError::Cancelled),
            Err(e) => Err(DeployError::Runtime(format!("deploy task panicked: {e}"))),
        }
    }
}

// Cancellation tokens of queued and running deploys, per app. Each trigger gets a child
// of the app's token; a generation number keeps late finishers from touching a newer entry.
#[derive(Clone, Default)]
struct Inflight {
    apps: Arc<Mutex<HashMap<AppId, InflightEntry>>>,
    next_generation: Arc<Mutex<u64>>,
}

struct InflightEntry {
    token: CancellationToken,
    generation: u64,
    count: usize,
}

struct InflightTicket {
    inflight: Inflight,
    app_id: AppId,
    generation: u64,
}

impl Inflight {
    fn register(&self, app_id: &AppId) -> (CancellationToken, InflightTicket) {
        let mut apps = self.apps.lock();
        let entry = apps.entry(app_id.clone()).or_insert_with(|| {
            let mut next = self.next_generation.lock();
            *next += 1;
            InflightEntry {
                token: CancellationToken::new(),
                generation: *next,
                count: 0,
            }
        });
        entry.count += 1;

        let ticket = InflightTicket {
            inflight: self.clone(),
            app_id: app_id.clone(),
            generation: entry.generation,
        };
        (entry.token.child_token(), ticket)
    }

    fn cancel(&self, app_id: &AppId) -> bool {
        match self.apps.lock().remove(app_id) {
            Some(entry) => {
                entry.token.cancel();
                true
            }
            None => false,
        }
    }
}

impl Drop for InflightTicket {
    fn drop(&mut self) {
        let mut apps = self.inflight.apps.lock();
        if let Some(entry) = apps.get_mut(&self.app_id)
            && entry.generation == self.generation
        {
            entry.count -= 1;
            if entry.count == 0 {
                apps.remove(&self.app_id);
            }
        }
    }
}

/// Drives app records through fetch, detect, build and the control actions.
#[derive(Clone)]
pub struct Orchestrator {
    store: Arc<dyn AppStore>,
    fetcher: Arc<dyn SourceFetcher>,
    supervisor: ContainerSupervisor,
    builds: Arc<BuildRegistry>,
    settings: Arc<DeploySettings>,
    locks: DeployLocks,
    inflight: Inflight,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("supervisor", &self.supervisor)
            .field("settings", &self.settings)
            .field("locks", &self.locks)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn AppStore>,
        fetcher: Arc<dyn SourceFetcher>,
        supervisor: ContainerSupervisor,
        builds: BuildRegistry,
        settings: DeploySettings,
    ) -> Self {
        Self {
            store,
            fetcher,
            supervisor,
            builds: Arc::new(builds),
            locks: DeployLocks::in_dir(settings.lock_dir()),
            settings: Arc::new(settings),
            inflight: Inflight::default(),
        }
    }

    pub fn settings(&self) -> &DeploySettings {
        &self.settings
    }

    pub fn supervisor(&self) -> &ContainerSupervisor {
        &self.supervisor
    }

    /// Register a new app in `pending`.
    pub async fn create_app(&self, owner: &OwnerId, spec: AppSpec) -> Result<AppRecord, DeployError> {
        let record = AppRecord::new(owner.clone(), spec)?;
        self.store.insert_one(record.clone()).await?;
        info!(app_id = %record.id, owner = %owner, name = %record.name(), "app created");
        Ok(record)
    }

    /// Start a deploy in the background. Only existence and ownership are checked here;
    /// everything after that is reported through the record and the handle.
    pub async fn trigger_deploy(
        &self,
        owner: &OwnerId,
        app_id: &AppId,
    ) -> Result<DeployHandle, DeployError> {
        let record = self.load(owner, app_id).await?;
        let (cancel, ticket) = self.inflight.register(&record.id);

        let this = self.clone();
        let token = cancel.clone();
        let id = record.id.clone();
        let join = tokio::spawn(async move {
            let _ticket = ticket;
            this.deploy(&id, token).await
        });

        debug!(app_id = %record.id, "deploy triggered");
        Ok(DeployHandle {
            app_id: record.id,
            cancel,
            join,
        })
    }

    /// Run the deploy pipeline for one app to completion.
    ///
    /// Waits behind any deploy of the same app. Every failure after the record enters
    /// `building` is persisted as `failed` before being returned.
    pub async fn deploy(
        &self,
        app_id: &AppId,
        cancel: CancellationToken,
    ) -> Result<AppRecord, DeployError> {
        let _guard = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(app_id = %app_id, "deploy cancelled while queued");
                return Err(DeployError::Cancelled);
            }
            guard = self.locks.acquire(app_id, Operation::Deploy) => guard?,
        };

        let filter = AppFilter::by_id(app_id);
        let Some(record) = self.store.find_one(&filter).await? else {
            warn!(app_id = %app_id, "deploy requested for missing app");
            return Err(DeployError::NotFound(app_id.clone()));
        };

        let record = self.enter_building(record).await?;
        let dest = workspace_path(&self.settings.deploy_root, &record.owner, record.name());
        info!(app_id = %app_id, workspace = %dest.display(), "deploy started");

        match self.run_stages(Deployment::new(record, dest), &cancel).await {
            Ok(outcome) => {
                let status = outcome.status();
                let record = self.store.update_one(&filter, &outcome.into_update()).await?;
                info!(app_id = %app_id, status = %status, "deploy finished");
                Ok(record)
            }
            Err(err) => {
                error!(app_id = %app_id, error = %err, "deploy failed");
                if let Err(store_err) = self
                    .store
                    .update_one(&filter, &AppUpdate::failed(err.to_string()))
                    .await
                {
                    error!(app_id = %app_id, error = %store_err, "could not record deploy failure");
                }
                Err(err)
            }
        }
    }

    /// Fire the cancellation token of every queued or running deploy of this app.
    /// Returns whether there was one.
    pub async fn cancel_deploy(&self, owner: &OwnerId, app_id: &AppId) -> Result<bool, DeployError> {
        self.load(owner, app_id).await?;
        let cancelled = self.inflight.cancel(app_id);
        if cancelled {
            info!(app_id = %app_id, "deploy cancellation requested");
        }
        Ok(cancelled)
    }

    pub async fn status(&self, owner: &OwnerId, app_id: &AppId) -> Result<AppRecord, DeployError> {
        self.load(owner, app_id).await
    }

    /// The owner's apps, oldest first.
    pub async fn list(&self, owner: &OwnerId) -> Result<Vec<AppRecord>, DeployError> {
        Ok(self.store.find(&AppFilter::owned_by(owner)).await?)
    }

    pub async fn stop(&self, owner: &OwnerId, app_id: &AppId) -> Result<ControlOutcome, DeployError> {
        self.control(owner, app_id, Operation::Stop, AppStatus::Stopped)
            .await
    }

    pub async fn start(&self, owner: &OwnerId, app_id: &AppId) -> Result<ControlOutcome, DeployError> {
        self.control(owner, app_id, Operation::Start, AppStatus::Running)
            .await
    }

    /// Last `tail` lines of the app's container output. Defaults to the configured tail.
    pub async fn logs(
        &self,
        owner: &OwnerId,
        app_id: &AppId,
        tail: Option<u64>,
    ) -> Result<Vec<String>, DeployError> {
        let record = self.load(owner, app_id).await?;
        let Some(container) = record.container else {
            return Ok(Vec::new());
        };
        if !self.supervisor.is_available() {
            return Ok(Vec::new());
        }

        let tail = tail.unwrap_or(self.settings.log_tail);
        Ok(self.supervisor.logs(&container.id, tail).await?)
    }

    /// Remove the app's container, workspace and record, in that order.
    ///
    /// Container cleanup problems are returned as warnings. A workspace that cannot be
    /// removed aborts the delete and leaves the record in place.
    pub async fn delete(&self, owner: &OwnerId, app_id: &AppId) -> Result<Diagnostics, DeployError> {
        let (_guard, record) = self.lock_app(owner, app_id, Operation::Delete).await?;
        let mut diagnostics = Diagnostics::default();

        if let Some(container) = &record.container {
            self.discard_container(container, &mut diagnostics).await;
        }

        let workspace = workspace_path(&self.settings.deploy_root, &record.owner, record.name());
        remove_workspace(&workspace)
            .await
            .map_err(|source| DeployError::Workspace {
                path: workspace.clone(),
                source,
            })?;

        self.store.delete_one(&AppFilter::app(owner, app_id)).await?;
        self.locks.forget(app_id);
        info!(app_id = %app_id, owner = %owner, "app deleted");
        Ok(diagnostics)
    }

    async fn load(&self, owner: &OwnerId, app_id: &AppId) -> Result<AppRecord, DeployError> {
        self.store
            .find_one(&AppFilter::app(owner, app_id))
            .await?
            .ok_or_else(|| DeployError::NotFound(app_id.clone()))
    }

    // Checks ownership before touching the lock table, then re-reads under the lock.
    async fn lock_app(
        &self,
        owner: &OwnerId,
        app_id: &AppId,
        operation: Operation,
    ) -> Result<(DeployGuard, AppRecord), DeployError> {
        self.load(owner, app_id).await?;
        let guard = self.locks.try_acquire(app_id, operation).await?;
        let record = self.load(owner, app_id).await?;
        Ok((guard, record))
    }

    async fn control(
        &self,
        owner: &OwnerId,
        app_id: &AppId,
        operation: Operation,
        target: AppStatus,
    ) -> Result<ControlOutcome, DeployError> {
        let (_guard, record) = self.lock_app(owner, app_id, operation).await?;

        let Some(container) = &record.container else {
            debug!(app_id = %app_id, %operation, "no container recorded");
            return Ok(ControlOutcome::NoContainer);
        };
        if !self.supervisor.is_available() {
            debug!(app_id = %app_id, %operation, "no container runtime available");
            return Ok(ControlOutcome::NoContainer);
        }
        if !record.status.can_transition_to(target) {
            return Err(DeployError::InvalidTransition {
                from: record.status,
                to: target,
            });
        }

        match operation {
            Operation::Stop => self.supervisor.stop(&container.id).await?,
            _ => self.supervisor.start(&container.id).await?,
        }

        let record = self
            .store
            .update_one(&AppFilter::by_id(app_id), &AppUpdate::transition(target))
            .await?;
        info!(app_id = %app_id, status = %record.status, "container {operation} done");
        Ok(ControlOutcome::Done(record))
    }

    // Moves the record to `building`, retiring whatever container the last deploy left.
    async fn enter_building(&self, record: AppRecord) -> Result<AppRecord, DeployError> {
        if let Some(container) = &record.container {
            // Warnings are logged by Diagnostics; a redeploy carries on regardless.
            self.discard_container(container, &mut Diagnostics::default())
                .await;
        }

        let update = AppUpdate::transition(AppStatus::Building).without_container();
        Ok(self
            .store
            .update_one(&AppFilter::by_id(&record.id), &update)
            .await?)
    }

    async fn run_stages(
        &self,
        deployment: Deployment<Pending>,
        cancel: &CancellationToken,
    ) -> Result<BuildOutcome, DeployError> {
        let fetcher = self.fetcher.as_ref();
        let fetched = interruptible(cancel, "fetch", self.settings.fetch_timeout, |stop| async move {
            deployment.fetch(fetcher, &stop).await
        })
        .await?;

        let detected = fetched.detect();
        self.store
            .update_one(
                &AppFilter::by_id(detected.app_id()),
                &AppUpdate::runtime_kind(detected.kind()),
            )
            .await?;

        bounded(
            cancel,
            "build",
            self.settings.build_timeout,
            detected.build(&self.builds),
        )
        .await
    }

    async fn discard_container(&self, container: &ContainerDescriptor, diagnostics: &mut Diagnostics) {
        if !self.supervisor.is_available() {
            diagnostics.warn(Warning::runtime_unavailable(format!(
                "container {} left in place: no container runtime available",
                container.name
            )));
            return;
        }
        if let Err(e) = self.supervisor.stop(&container.id).await {
            diagnostics.warn(Warning::container_stop(format!(
                "failed to stop container {}: {e}",
                container.name
            )));
        }
        if let Err(e) = self.supervisor.remove(&container.id).await {
            diagnostics.warn(Warning::container_remove(format!(
                "failed to remove container {}: {e}",
                container.name
            )));
        }
    }
}

// Runs one stage under the cancellation token and a time limit.
async fn bounded<T>(
    cancel: &CancellationToken,
    stage: &'static str,
    limit: Duration,
    work: impl Future<Output = Result<T, DeployError>>,
) -> Result<T, DeployError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DeployError::Cancelled),
        result = tokio::time::timeout(limit, work) => match result {
            Ok(result) => result,
            Err(_) => Err(DeployError::Timeout { stage, after: limit }),
        },
    }
}

// Like `bounded`, but the stage is told to stop instead of being dropped, and is awaited
// until it returns. Nothing it started may outlive the deploy lock.
async fn interruptible<T, F, Fut>(
    cancel: &CancellationToken,
    stage: &'static str,
    limit: Duration,
    start: F,
) -> Result<T, DeployError>
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = Result<T, DeployError>>,
{
    let stop = cancel.child_token();
    let work = start(stop.clone());
    tokio::pin!(work);

    let interrupted = tokio::select! {
        biased;
        _ = cancel.cancelled() => DeployError::Cancelled,
        result = &mut work => return result,
        _ = tokio::time::sleep(limit) => DeployError::Timeout { stage, after: limit },
    };

    stop.cancel();
    if let Err(e) = work.await {
        debug!(stage, error = %e, "stage stopped");
    }
    Err(interrupted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn bounded_reports_timeout_with_stage() {
        let err = bounded(
            &CancellationToken::new(),
            "build",
            Duration::from_millis(10),
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DeployError::Timeout { stage: "build", .. }));
    }

    #[tokio::test]
    async fn bounded_prefers_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = bounded(&cancel, "fetch", Duration::from_secs(1), async { Ok(()) })
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::Cancelled));
    }

    #[tokio::test]
    async fn interrupted_stage_runs_to_its_end_before_returning() {
        let finished = Arc::new(AtomicBool::new(false));
        let seen = finished.clone();

        let err = interruptible(
            &CancellationToken::new(),
            "fetch",
            Duration::from_millis(10),
            |stop| async move {
                stop.cancelled().await;
                // Winding down still takes a while after the stop signal.
                tokio::time::sleep(Duration::from_millis(50)).await;
                seen.store(true, Ordering::SeqCst);
                Err::<(), _>(DeployError::Cancelled)
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DeployError::Timeout { stage: "fetch", .. }));
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn interruptible_passes_through_a_finished_stage() {
        let value = interruptible(
            &CancellationToken::new(),
            "fetch",
            Duration::from_secs(5),
            |_| async { Ok(7) },
        )
        .await
        .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn cancelled_deploy_stops_the_stage() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let stopped = Arc::new(AtomicBool::new(false));
        let seen = stopped.clone();

        let err = interruptible(&cancel, "fetch", Duration::from_secs(5), |stop| async move {
            stop.cancelled().await;
            seen.store(true, Ordering::SeqCst);
            Ok(())
        })
        .await
        .unwrap_err();

        assert!(matches!(err, DeployError::Cancelled));
        assert!(stopped.load(Ordering::SeqCst));
    }

    #[test]
    fn inflight_cancel_reaches_every_child() {
        let inflight = Inflight::default();
        let app = AppId::new("app");
        let (first, _t1) = inflight.register(&app);
        let (second, _t2) = inflight.register(&app);

        assert!(inflight.cancel(&app));
        assert!(first.is_cancelled());
        assert!(second.is_cancelled());
        assert!(!inflight.cancel(&app));
    }

    #[test]
    fn finished_tickets_clear_the_entry() {
        let inflight = Inflight::default();
        let app = AppId::new("app");
        let (_token, ticket) = inflight.register(&app);
        drop(ticket);
        assert!(!inflight.cancel(&app));
    }

    #[test]
    fn stale_ticket_leaves_newer_entry_alone() {
        let inflight = Inflight::default();
        let app = AppId::new("app");
        let (_old, old_ticket) = inflight.register(&app);
        inflight.cancel(&app);

        let (fresh, _fresh_ticket) = inflight.register(&app);
        drop(old_ticket);
        assert!(inflight.cancel(&app));
        assert!(fresh.is_cancelled());
    }
}
