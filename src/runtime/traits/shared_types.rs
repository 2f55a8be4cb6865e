// ABOUTME: Types shared by the runtime traits.
// ABOUTME: Container launch config, inspection results, restart policy and runtime metadata.

use crate::types::{ContainerId, ImageRef};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

/// Everything needed to create one app container.
#[derive(Debug, Clone)]
pub struct ContainerConfig {
    pub name: String,
    pub image: ImageRef,
    pub env: HashMap<String, String>,
    pub labels: HashMap<String, String>,
    pub restart_policy: RestartPolicyConfig,
    /// Grace period the runtime gives the container on stop.
    pub stop_timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RestartPolicyConfig {
    No,
    Always,
    #[default]
    UnlessStopped,
    OnFailure { max_retries: Option<u32> },
}

#[derive(Debug, Clone)]
pub struct ContainerInfo {
    pub id: ContainerId,
    pub name: String,
    pub image: String,
    pub state: ContainerState,
    pub labels: HashMap<String, String>,
}

/// Coarse container state. Transitional runtime states fold into the nearest one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    Created,
    Running,
    Restarting,
    Stopped,
}

#[derive(Debug, Clone, Serialize)]
pub struct RuntimeMetadata {
    /// "docker" or "podman".
    pub name: String,
    pub version: String,
    pub api_version: String,
    pub os: String,
    pub arch: String,
}
