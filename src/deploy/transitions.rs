// ABOUTME: Stage methods for the deploy pipeline.
// ABOUTME: Each method consumes self and returns the next state on success.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::build::{BuildContext, BuildOutcome, BuildRegistry};
use crate::detect::detect_app_type;
use crate::source::SourceFetcher;

use super::Deployment;
use super::error::DeployError;
use super::state::{Detected, Fetched, Pending};

impl Deployment<Pending> {
    /// Replace the workspace with a fresh checkout of the app's branch.
    pub async fn fetch(
        self,
        fetcher: &dyn SourceFetcher,
        cancel: &CancellationToken,
    ) -> Result<Deployment<Fetched>, DeployError> {
        let spec = &self.record.spec;
        debug!(app_id = %self.record.id, url = %spec.git_url, branch = %spec.branch, "fetching");

        let workspace = fetcher
            .fetch(&spec.git_url, &spec.branch, &self.dest, cancel)
            .await?;
        info!(
            app_id = %self.record.id,
            revision = workspace.revision.as_deref().unwrap_or("unknown"),
            "fetched"
        );

        Ok(Deployment {
            record: self.record,
            dest: self.dest,
            state: Fetched { workspace },
        })
    }
}

impl Deployment<Fetched> {
    /// Classify the checkout.
    pub fn detect(self) -> Deployment<Detected> {
        let kind = detect_app_type(&self.state.workspace.path);
        info!(app_id = %self.record.id, kind = %kind, "detected runtime type");

        Deployment {
            record: self.record,
            dest: self.dest,
            state: Detected {
                workspace: self.state.workspace,
                kind,
            },
        }
    }
}

impl Deployment<Detected> {
    /// Hand the workspace to the executor for its runtime type.
    pub async fn build(self, registry: &BuildRegistry) -> Result<BuildOutcome, DeployError> {
        let ctx = BuildContext {
            record: self.record,
            workspace: self.state.workspace.path,
            kind: self.state.kind,
        };
        Ok(registry.build(&ctx).await?)
    }
}
