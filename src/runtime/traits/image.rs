// ABOUTME: Image build trait for container runtimes.
// ABOUTME: Images are built from a tar context with a Dockerfile at its root.

use crate::types::ImageRef;
use async_trait::async_trait;

#[async_trait]
pub trait ImageOps: Send + Sync {
    /// Build and tag an image. Build output is streamed to the debug log.
    async fn build_image(&self, context: Vec<u8>, tag: &ImageRef) -> Result<(), ImageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("build failed: {0}")]
    BuildFailed(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
