// ABOUTME: In-memory container runtime implementing every capability trait.
// ABOUTME: Failure and delay knobs let tests drive the error paths.

use async_trait::async_trait;
use cloudnest::runtime::{
    ContainerConfig, ContainerError, ContainerFilters, ContainerInfo, ContainerOps,
    ContainerRuntime, ContainerState, ContainerSummary, ContainerSupervisor, ImageError, ImageOps,
    LogError, LogLine, LogLineStream, LogOps, LogOptions, LogStream, RuntimeInfo,
    RuntimeInfoError, RuntimeMetadata,
};
use cloudnest::types::{ContainerId, ImageRef};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct FakeContainer {
    pub id: ContainerId,
    pub name: String,
    pub image: String,
    pub running: bool,
    pub env: HashMap<String, String>,
    pub labels: HashMap<String, String>,
}

#[derive(Default)]
struct State {
    next_id: u64,
    images: HashSet<String>,
    containers: HashMap<ContainerId, FakeContainer>,
    logs: HashMap<ContainerId, Vec<String>>,
    build_error: Option<String>,
    build_delay: Option<Duration>,
    stop_error: Option<String>,
    builds: usize,
}

#[derive(Default)]
pub struct FakeRuntime {
    state: Mutex<State>,
}

impl FakeRuntime {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn supervisor(self: &Arc<Self>) -> ContainerSupervisor {
        let runtime: Arc<dyn ContainerRuntime> = self.clone();
        ContainerSupervisor::new(runtime)
    }

    pub fn fail_builds(&self, message: &str) {
        self.state.lock().build_error = Some(message.to_string());
    }

    pub fn succeed_builds(&self) {
        self.state.lock().build_error = None;
    }

    pub fn slow_builds(&self, delay: Duration) {
        self.state.lock().build_delay = Some(delay);
    }

    pub fn fail_stops(&self, message: &str) {
        self.state.lock().stop_error = Some(message.to_string());
    }

    pub fn set_logs(&self, id: &ContainerId, lines: &[&str]) {
        self.state
            .lock()
            .logs
            .insert(id.clone(), lines.iter().map(|l| l.to_string()).collect());
    }

    pub fn containers(&self) -> Vec<FakeContainer> {
        self.state.lock().containers.values().cloned().collect()
    }

    pub fn container(&self, id: &ContainerId) -> Option<FakeContainer> {
        self.state.lock().containers.get(id).cloned()
    }

    pub fn builds(&self) -> usize {
        self.state.lock().builds
    }

    pub fn has_image(&self, reference: &str) -> bool {
        self.state.lock().images.contains(reference)
    }
}

#[async_trait]
impl ImageOps for FakeRuntime {
    async fn build_image(&self, context: Vec<u8>, tag: &ImageRef) -> Result<(), ImageError> {
        let delay = self.state.lock().build_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        state.builds += 1;
        if let Some(message) = &state.build_error {
            return Err(ImageError::BuildFailed(message.clone()));
        }
        if context.is_empty() {
            return Err(ImageError::BuildFailed("empty build context".into()));
        }
        state.images.insert(tag.to_string());
        Ok(())
    }
}

#[async_trait]
impl ContainerOps for FakeRuntime {
    async fn create_container(&self, config: &ContainerConfig) -> Result<ContainerId, ContainerError> {
        let mut state = self.state.lock();
        if state.containers.values().any(|c| c.name == config.name) {
            return Err(ContainerError::AlreadyExists(config.name.clone()));
        }
        if !state.images.contains(&config.image.to_string()) {
            return Err(ContainerError::ImageNotFound(config.image.to_string()));
        }

        state.next_id += 1;
        let id = ContainerId::new(format!("{:016x}", state.next_id));
        state.containers.insert(
            id.clone(),
            FakeContainer {
                id: id.clone(),
                name: config.name.clone(),
                image: config.image.to_string(),
                running: false,
                env: config.env.clone(),
                labels: config.labels.clone(),
            },
        );
        Ok(id)
    }

    async fn start_container(&self, id: &ContainerId) -> Result<(), ContainerError> {
        let mut state = self.state.lock();
        let container = state
            .containers
            .get_mut(id)
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))?;
        if container.running {
            return Err(ContainerError::AlreadyRunning(id.to_string()));
        }
        container.running = true;
        Ok(())
    }

    async fn stop_container(&self, id: &ContainerId, _timeout: Duration) -> Result<(), ContainerError> {
        let mut state = self.state.lock();
        if let Some(message) = &state.stop_error {
            return Err(ContainerError::Runtime(message.clone()));
        }
        let container = state
            .containers
            .get_mut(id)
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))?;
        if !container.running {
            return Err(ContainerError::NotRunning(id.to_string()));
        }
        container.running = false;
        Ok(())
    }

    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<(), ContainerError> {
        let mut state = self.state.lock();
        match state.containers.get(id) {
            None => Err(ContainerError::NotFound(id.to_string())),
            Some(c) if c.running && !force => {
                Err(ContainerError::Runtime(format!("{} is running", id)))
            }
            Some(_) => {
                state.containers.remove(id);
                Ok(())
            }
        }
    }

    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerInfo, ContainerError> {
        let state = self.state.lock();
        let c = state
            .containers
            .get(id)
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))?;
        Ok(ContainerInfo {
            id: c.id.clone(),
            name: c.name.clone(),
            image: c.image.clone(),
            state: if c.running {
                ContainerState::Running
            } else {
                ContainerState::Stopped
            },
            labels: c.labels.clone(),
        })
    }

    async fn list_containers(
        &self,
        filters: &ContainerFilters,
    ) -> Result<Vec<ContainerSummary>, ContainerError> {
        let state = self.state.lock();
        Ok(state
            .containers
            .values()
            .filter(|c| filters.all || c.running)
            .filter(|c| filters.name.as_ref().is_none_or(|n| c.name.contains(n.as_str())))
            .filter(|c| {
                filters
                    .labels
                    .iter()
                    .all(|(k, v)| c.labels.get(k) == Some(v))
            })
            .map(|c| ContainerSummary {
                id: c.id.clone(),
                name: c.name.clone(),
                image: c.image.clone(),
                state: if c.running { "running" } else { "exited" }.to_string(),
                labels: c.labels.clone(),
            })
            .collect())
    }
}

#[async_trait]
impl LogOps for FakeRuntime {
    async fn container_logs(
        &self,
        id: &ContainerId,
        opts: &LogOptions,
    ) -> Result<LogLineStream, LogError> {
        let state = self.state.lock();
        if !state.containers.contains_key(id) {
            return Err(LogError::ContainerNotFound(id.to_string()));
        }
        let mut lines = state.logs.get(id).cloned().unwrap_or_default();
        if let Some(tail) = opts.tail {
            let excess = lines.len().saturating_sub(tail as usize);
            lines.drain(..excess);
        }

        let items: Vec<Result<LogLine, LogError>> = lines
            .into_iter()
            .map(|line| {
                Ok(LogLine {
                    content: format!("{line}\n"),
                    stream: LogStream::Stdout,
                })
            })
            .collect();
        Ok(Box::pin(futures::stream::iter(items)))
    }
}

#[async_trait]
impl RuntimeInfo for FakeRuntime {
    async fn info(&self) -> Result<RuntimeMetadata, RuntimeInfoError> {
        Ok(RuntimeMetadata {
            name: "fake".to_string(),
            version: "1.0".to_string(),
            api_version: "1.0".to_string(),
            os: "linux".to_string(),
            arch: "amd64".to_string(),
        })
    }

    async fn ping(&self) -> Result<(), RuntimeInfoError> {
        Ok(())
    }
}
