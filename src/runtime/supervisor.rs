// ABOUTME: ContainerSupervisor: the deploy core's view of the container runtime.
// ABOUTME: Works with or without a runtime and folds runtime errors into two cases.

use super::build_context::build_context;
use super::detection::detect_runtime;
use super::error::RuntimeError;
use super::traits::{
    ContainerConfig, ContainerError, ContainerFilters, ContainerInfo, ContainerRuntime, ImageError,
    LogError, LogOptions, RestartPolicyConfig, RuntimeInfo, RuntimeInfoError, RuntimeMetadata,
};
use super::types::RuntimeConfig;
use super::BollardRuntime;
use crate::app::ContainerDescriptor;
use crate::types::{ContainerId, ImageRef};
use futures::StreamExt;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors surfaced by the supervisor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SupervisorError {
    #[error("no container runtime available")]
    RuntimeUnavailable,

    #[error("{0}")]
    Runtime(String),
}

impl From<ContainerError> for SupervisorError {
    fn from(e: ContainerError) -> Self {
        SupervisorError::Runtime(e.to_string())
    }
}

impl From<ImageError> for SupervisorError {
    fn from(e: ImageError) -> Self {
        SupervisorError::Runtime(e.to_string())
    }
}

impl From<LogError> for SupervisorError {
    fn from(e: LogError) -> Self {
        SupervisorError::Runtime(e.to_string())
    }
}

impl From<RuntimeInfoError> for SupervisorError {
    fn from(e: RuntimeInfoError) -> Self {
        SupervisorError::Runtime(e.to_string())
    }
}

/// What to launch for an app.
#[derive(Debug, Clone)]
pub struct RunSpec {
    pub name: String,
    pub image: ImageRef,
    pub env: HashMap<String, String>,
    pub labels: HashMap<String, String>,
    pub restart: RestartPolicyConfig,
}

/// Handle on an optional container runtime. Cheap to clone.
#[derive(Clone)]
pub struct ContainerSupervisor {
    runtime: Option<Arc<dyn ContainerRuntime>>,
    stop_timeout: Duration,
}

impl std::fmt::Debug for ContainerSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerSupervisor")
            .field("available", &self.is_available())
            .field("stop_timeout", &self.stop_timeout)
            .finish()
    }
}

impl ContainerSupervisor {
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self {
            runtime: Some(runtime),
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        }
    }

    /// A supervisor with no runtime behind it.
    pub fn unavailable() -> Self {
        Self {
            runtime: None,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        }
    }

    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// Detect, connect and ping a runtime.
    pub async fn connect(config: &RuntimeConfig) -> Result<Self, RuntimeError> {
        let endpoint = detect_runtime(config)?;
        tracing::debug!(
            runtime = %endpoint.runtime_type,
            socket = %endpoint.socket_path,
            "connecting to container runtime"
        );
        let runtime = BollardRuntime::connect(&endpoint)?;
        runtime.ping().await?;
        Ok(Self::new(Arc::new(runtime)))
    }

    /// Like [`connect`](Self::connect), degrading to no runtime on failure.
    pub async fn connect_or_unavailable(config: &RuntimeConfig) -> Self {
        match Self::connect(config).await {
            Ok(supervisor) => supervisor,
            Err(e) => {
                tracing::warn!(kind = ?e.kind(), "container runtime unavailable: {}", e);
                Self::unavailable()
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.runtime.is_some()
    }

    fn runtime(&self) -> Result<&Arc<dyn ContainerRuntime>, SupervisorError> {
        self.runtime
            .as_ref()
            .ok_or(SupervisorError::RuntimeUnavailable)
    }

    /// Version and platform of the connected runtime.
    pub async fn describe(&self) -> Result<RuntimeMetadata, SupervisorError> {
        Ok(self.runtime()?.info().await?)
    }

    /// Build `tag` from the `Dockerfile` at the root of `workspace`.
    pub async fn build_image(&self, workspace: &Path, tag: &ImageRef) -> Result<(), SupervisorError> {
        let runtime = self.runtime()?;
        let root = workspace.to_path_buf();
        let context = tokio::task::spawn_blocking(move || build_context(&root))
            .await
            .map_err(|e| SupervisorError::Runtime(format!("build context task failed: {e}")))?
            .map_err(|e| SupervisorError::Runtime(format!("cannot pack build context: {e}")))?;

        tracing::debug!(image = %tag, bytes = context.len(), "building image");
        runtime.build_image(context, tag).await?;
        Ok(())
    }

    /// Create and start a container. A container that fails to start is removed.
    pub async fn run(&self, spec: &RunSpec) -> Result<ContainerDescriptor, SupervisorError> {
        let runtime = self.runtime()?;
        let config = ContainerConfig {
            name: spec.name.clone(),
            image: spec.image.clone(),
            env: spec.env.clone(),
            labels: spec.labels.clone(),
            restart_policy: spec.restart.clone(),
            stop_timeout: Some(self.stop_timeout),
        };

        let id = runtime.create_container(&config).await?;
        if let Err(e) = runtime.start_container(&id).await {
            if let Err(cleanup) = runtime.remove_container(&id, true).await {
                tracing::warn!(container = %id, "failed to remove unstarted container: {}", cleanup);
            }
            return Err(e.into());
        }

        Ok(ContainerDescriptor {
            id,
            name: spec.name.clone(),
            image: spec.image.to_string(),
        })
    }

    /// Inspect a container. `None` if the runtime no longer knows it.
    pub async fn get(&self, id: &ContainerId) -> Result<Option<ContainerInfo>, SupervisorError> {
        match self.runtime()?.inspect_container(id).await {
            Ok(info) => Ok(Some(info)),
            Err(ContainerError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Stop a container. Stopping a stopped container succeeds.
    pub async fn stop(&self, id: &ContainerId) -> Result<(), SupervisorError> {
        match self.runtime()?.stop_container(id, self.stop_timeout).await {
            Ok(()) | Err(ContainerError::NotRunning(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Start a container. Starting a running container succeeds.
    pub async fn start(&self, id: &ContainerId) -> Result<(), SupervisorError> {
        match self.runtime()?.start_container(id).await {
            Ok(()) | Err(ContainerError::AlreadyRunning(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Force-remove a container. Removing a missing container succeeds.
    pub async fn remove(&self, id: &ContainerId) -> Result<(), SupervisorError> {
        match self.runtime()?.remove_container(id, true).await {
            Ok(()) | Err(ContainerError::NotFound(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Force-remove any container with exactly this name. Returns whether one existed.
    pub async fn remove_named(&self, name: &str) -> Result<bool, SupervisorError> {
        let runtime = self.runtime()?;
        let filters = ContainerFilters {
            name: Some(name.to_string()),
            all: true,
            ..Default::default()
        };

        let mut removed = false;
        // The name filter matches substrings, so compare exactly.
        for summary in runtime.list_containers(&filters).await? {
            if summary.name == name {
                self.remove(&summary.id).await?;
                removed = true;
            }
        }
        Ok(removed)
    }

    /// Last `tail` lines of a container's combined output.
    pub async fn logs(&self, id: &ContainerId, tail: u64) -> Result<Vec<String>, SupervisorError> {
        let mut stream = self
            .runtime()?
            .container_logs(id, &LogOptions::tail(tail))
            .await?;

        let mut lines = Vec::new();
        while let Some(chunk) = stream.next().await {
            lines.extend(chunk?.content.lines().map(str::to_string));
        }

        // Chunks may split differently than lines; enforce the bound here.
        let excess = lines.len().saturating_sub(tail as usize);
        lines.drain(..excess);
        Ok(lines)
    }
}
