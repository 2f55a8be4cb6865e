// ABOUTME: Log retrieval trait for container runtimes.
// ABOUTME: Returns a stream of output chunks from stdout and stderr.

use crate::types::ContainerId;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

pub type LogLineStream = Pin<Box<dyn Stream<Item = Result<LogLine, LogError>> + Send>>;

#[async_trait]
pub trait LogOps: Send + Sync {
    /// Past output of a container. The stream ends at the current end of the log.
    async fn container_logs(
        &self,
        id: &ContainerId,
        opts: &LogOptions,
    ) -> Result<LogLineStream, LogError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogOptions {
    /// Lines from the end of the log; `None` for everything.
    pub tail: Option<u64>,
    pub timestamps: bool,
}

impl LogOptions {
    pub fn tail(n: u64) -> Self {
        Self {
            tail: Some(n),
            timestamps: false,
        }
    }
}

/// A chunk of output. May hold several lines or part of one.
#[derive(Debug, Clone)]
pub struct LogLine {
    pub content: String,
    pub stream: LogStream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStream {
    Stdout,
    Stderr,
}

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("container not found: {0}")]
    ContainerNotFound(String),

    #[error("log stream failed: {0}")]
    Stream(String),
}
