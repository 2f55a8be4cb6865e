// ABOUTME: Build strategy for static sites.
// ABOUTME: Nothing to compile; the workspace is served as fetched.

use super::{BuildContext, BuildError, BuildExecutor, BuildOutcome};
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, Default)]
pub struct StaticBuild;

#[async_trait]
impl BuildExecutor for StaticBuild {
    async fn build(&self, ctx: &BuildContext) -> Result<BuildOutcome, BuildError> {
        if !ctx.workspace.join("index.html").is_file() {
            return Err(BuildError::MissingFile("index.html".to_string()));
        }
        Ok(BuildOutcome::Deployed)
    }
}
