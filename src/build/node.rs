// ABOUTME: Build strategy for Node.js apps.
// ABOUTME: Installs package dependencies with npm.

use super::{BuildContext, BuildError, BuildExecutor, BuildOutcome, run_tool};
use async_trait::async_trait;

pub struct NodeBuild {
    npm: String,
}

impl NodeBuild {
    pub fn new(npm: impl Into<String>) -> Self {
        Self { npm: npm.into() }
    }
}

#[async_trait]
impl BuildExecutor for NodeBuild {
    async fn build(&self, ctx: &BuildContext) -> Result<BuildOutcome, BuildError> {
        if ctx.workspace.join("package.json").is_file() {
            tracing::info!(app_id = %ctx.record.id, "installing node dependencies");
            run_tool(&self.npm, &["install"], &ctx.workspace).await?;
        }
        Ok(BuildOutcome::Deployed)
    }
}
