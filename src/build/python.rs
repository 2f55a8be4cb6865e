// ABOUTME: Build strategy for Python apps and bots.
// ABOUTME: Installs requirements; no process is supervised afterwards.

use super::{BuildContext, BuildError, BuildExecutor, BuildOutcome, run_tool};
use async_trait::async_trait;

pub struct PythonBuild {
    pip: String,
}

impl PythonBuild {
    pub fn new(pip: impl Into<String>) -> Self {
        Self { pip: pip.into() }
    }
}

#[async_trait]
impl BuildExecutor for PythonBuild {
    async fn build(&self, ctx: &BuildContext) -> Result<BuildOutcome, BuildError> {
        if ctx.workspace.join("requirements.txt").is_file() {
            tracing::info!(app_id = %ctx.record.id, "installing python requirements");
            run_tool(&self.pip, &["install", "-r", "requirements.txt"], &ctx.workspace).await?;
        }
        Ok(BuildOutcome::Deployed)
    }
}
