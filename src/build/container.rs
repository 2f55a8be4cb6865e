// ABOUTME: Build strategy for workspaces with a Dockerfile.
// ABOUTME: Builds the app image and runs it as a supervised container.

use super::{BuildContext, BuildError, BuildExecutor, BuildOutcome, BuildSettings};
use crate::app::AppRecord;
use crate::runtime::{ContainerSupervisor, RestartPolicyConfig, RunSpec};
use crate::types::ImageRef;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};

pub const LABEL_APP: &str = "cloudnest.app";
pub const LABEL_OWNER: &str = "cloudnest.owner";
pub const LABEL_MANAGED: &str = "cloudnest.managed";

/// Container name for an app: `{namespace}-{name}-{id[..8]}`.
pub fn container_name(namespace: &str, record: &AppRecord) -> String {
    format!("{}-{}-{}", namespace, record.name(), record.id.short())
}

pub struct ContainerBuild {
    supervisor: ContainerSupervisor,
    namespace: String,
    default_env: BTreeMap<String, String>,
    restart: RestartPolicyConfig,
}

impl ContainerBuild {
    pub fn new(supervisor: ContainerSupervisor, settings: &BuildSettings) -> Self {
        Self {
            supervisor,
            namespace: settings.image_namespace.clone(),
            default_env: settings.default_env.clone(),
            restart: settings.restart.clone(),
        }
    }

    fn run_spec(&self, record: &AppRecord, image: ImageRef) -> RunSpec {
        let env: HashMap<String, String> = self
            .default_env
            .iter()
            .chain(record.spec.env.iter())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let labels = HashMap::from([
            (LABEL_APP.to_string(), record.id.to_string()),
            (LABEL_OWNER.to_string(), record.owner.to_string()),
            (LABEL_MANAGED.to_string(), "true".to_string()),
        ]);

        RunSpec {
            name: container_name(&self.namespace, record),
            image,
            env,
            labels,
            restart: self.restart.clone(),
        }
    }
}

#[async_trait]
impl BuildExecutor for ContainerBuild {
    async fn build(&self, ctx: &BuildContext) -> Result<BuildOutcome, BuildError> {
        if !self.supervisor.is_available() {
            return Err(BuildError::RuntimeUnavailable);
        }

        let image = ImageRef::for_app(&self.namespace, ctx.record.name());
        tracing::info!(app_id = %ctx.record.id, image = %image, "building image");
        self.supervisor.build_image(&ctx.workspace, &image).await?;

        let spec = self.run_spec(&ctx.record, image);
        if self.supervisor.remove_named(&spec.name).await? {
            tracing::info!(container = %spec.name, "removed stale container");
        }

        let container = self.supervisor.run(&spec).await?;
        tracing::info!(app_id = %ctx.record.id, container = %container.id, "container started");
        Ok(BuildOutcome::Running(container))
    }
}
