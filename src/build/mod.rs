// ABOUTME: Build strategies keyed by detected runtime type.
// ABOUTME: The registry dispatches a fetched workspace to its executor.

mod command;
mod container;
mod node;
mod python;
mod static_site;

pub use command::run_tool;
pub use container::{ContainerBuild, container_name};
pub use node::NodeBuild;
pub use python::PythonBuild;
pub use static_site::StaticBuild;

use crate::app::{AppRecord, AppStatus, AppUpdate, ContainerDescriptor, RuntimeKind};
use crate::runtime::{ContainerSupervisor, RestartPolicyConfig, SupervisorError};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

/// Everything an executor gets to work with.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub record: AppRecord,
    pub workspace: PathBuf,
    pub kind: RuntimeKind,
}

/// How a successful build leaves the app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// A supervised container is up.
    Running(ContainerDescriptor),
    /// Built, nothing supervised.
    Deployed,
    /// No strategy for this workspace. Not an error.
    UnknownType,
}

impl BuildOutcome {
    pub fn status(&self) -> AppStatus {
        match self {
            BuildOutcome::Running(_) => AppStatus::Running,
            BuildOutcome::Deployed => AppStatus::Deployed,
            BuildOutcome::UnknownType => AppStatus::UnknownType,
        }
    }

    /// The record update that settles a deploy with this outcome.
    pub fn into_update(self) -> AppUpdate {
        match self {
            BuildOutcome::Running(container) => AppUpdate::transition(AppStatus::Running)
                .with_container(container)
                .deployed(),
            BuildOutcome::Deployed => AppUpdate::transition(AppStatus::Deployed).deployed(),
            BuildOutcome::UnknownType => AppUpdate::transition(AppStatus::UnknownType),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no container runtime available")]
    RuntimeUnavailable,

    #[error("container runtime: {0}")]
    Runtime(String),

    #[error("{program} failed: {message}")]
    Command { program: String, message: String },

    #[error("{0} not found in workspace")]
    MissingFile(String),
}

impl From<SupervisorError> for BuildError {
    fn from(e: SupervisorError) -> Self {
        match e {
            SupervisorError::RuntimeUnavailable => BuildError::RuntimeUnavailable,
            SupervisorError::Runtime(message) => BuildError::Runtime(message),
        }
    }
}

/// One build strategy.
#[async_trait]
pub trait BuildExecutor: Send + Sync {
    async fn build(&self, ctx: &BuildContext) -> Result<BuildOutcome, BuildError>;
}

/// Strategy for workspaces nobody knows how to build.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnknownBuild;

#[async_trait]
impl BuildExecutor for UnknownBuild {
    async fn build(&self, _ctx: &BuildContext) -> Result<BuildOutcome, BuildError> {
        Ok(BuildOutcome::UnknownType)
    }
}

/// Knobs shared by the standard executors.
#[derive(Debug, Clone)]
pub struct BuildSettings {
    pub image_namespace: String,
    /// Container env applied before the app's own env.
    pub default_env: BTreeMap<String, String>,
    pub restart: RestartPolicyConfig,
    pub pip: String,
    pub npm: String,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            image_namespace: "cloudnest".to_string(),
            default_env: BTreeMap::new(),
            restart: RestartPolicyConfig::UnlessStopped,
            pip: "pip".to_string(),
            npm: "npm".to_string(),
        }
    }
}

/// Maps runtime types to executors. Kinds without an entry build as unknown.
#[derive(Clone, Default)]
pub struct BuildRegistry {
    executors: HashMap<RuntimeKind, Arc<dyn BuildExecutor>>,
}

impl BuildRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The executors for every runtime type this crate supports.
    pub fn standard(settings: &BuildSettings, supervisor: ContainerSupervisor) -> Self {
        let python = Arc::new(PythonBuild::new(&settings.pip));
        Self::new()
            .register(
                RuntimeKind::ContainerImage,
                Arc::new(ContainerBuild::new(supervisor, settings)),
            )
            .register(RuntimeKind::NodeRuntime, Arc::new(NodeBuild::new(&settings.npm)))
            .register(RuntimeKind::PythonRuntime, python.clone())
            .register(RuntimeKind::PythonBot, python)
            .register(RuntimeKind::StaticSite, Arc::new(StaticBuild))
            .register(RuntimeKind::Unknown, Arc::new(UnknownBuild))
    }

    pub fn register(mut self, kind: RuntimeKind, executor: Arc<dyn BuildExecutor>) -> Self {
        self.executors.insert(kind, executor);
        self
    }

    pub fn get(&self, kind: RuntimeKind) -> Option<Arc<dyn BuildExecutor>> {
        self.executors.get(&kind).cloned()
    }

    /// Run the executor for `ctx.kind`.
    pub async fn build(&self, ctx: &BuildContext) -> Result<BuildOutcome, BuildError> {
        match self.get(ctx.kind) {
            Some(executor) => executor.build(ctx).await,
            None => {
                tracing::debug!(kind = %ctx.kind, "no executor registered");
                Ok(BuildOutcome::UnknownType)
            }
        }
    }
}
