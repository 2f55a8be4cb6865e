// ABOUTME: Container runtime backed by bollard over a local unix socket.
// ABOUTME: Docker and Podman both answer the Docker-compatible API used here.

use crate::runtime::traits::{
    ContainerConfig, ContainerError, ContainerFilters, ContainerInfo, ContainerOps, ContainerState,
    ContainerSummary, ImageError, ImageOps, LogError, LogLine, LogLineStream, LogOps, LogOptions,
    LogStream, RestartPolicyConfig, RuntimeInfo, RuntimeInfoError, RuntimeMetadata,
};
use crate::runtime::types::{RuntimeEndpoint, RuntimeType};
use crate::types::{ContainerId, ImageRef};
use async_trait::async_trait;
use bollard::Docker;
use bollard::container::LogOutput;
use bollard::errors::Error as BollardError;
use bollard::models::{
    ContainerCreateBody, ContainerStateStatusEnum, HostConfig, RestartPolicy,
    RestartPolicyNameEnum,
};
use bollard::query_parameters::{
    BuildImageOptions, CreateContainerOptions, InspectContainerOptions, ListContainersOptions,
    LogsOptions, RemoveContainerOptions, StartContainerOptions, StopContainerOptions,
};
use bytes::Bytes;
use futures::StreamExt;
use http_body_util::{Either, Full};
use std::collections::HashMap;
use std::time::Duration;

const CLIENT_TIMEOUT_SECS: u64 = 120;
const LIST_ATTEMPTS: usize = 3;

pub struct BollardRuntime {
    client: Docker,
    runtime_type: RuntimeType,
}

impl BollardRuntime {
    /// Open a client on the endpoint's socket. Nothing is sent until the first call.
    pub fn connect(endpoint: &RuntimeEndpoint) -> Result<Self, RuntimeInfoError> {
        let client = Docker::connect_with_unix(
            &endpoint.socket_path,
            CLIENT_TIMEOUT_SECS,
            bollard::API_DEFAULT_VERSION,
        )
        .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            runtime_type: endpoint.runtime_type,
        })
    }
}

// Status code and message of an error response from the daemon.
fn daemon_error(e: &BollardError) -> Option<(u16, &str)> {
    match e {
        BollardError::DockerResponseServerError {
            status_code,
            message,
        } => Some((*status_code, message.as_str())),
        _ => None,
    }
}

#[derive(Clone, Copy)]
enum ContainerCall {
    Create,
    Start,
    Stop,
    Other,
}

fn container_error(call: ContainerCall, e: BollardError) -> ContainerError {
    let Some((status, message)) = daemon_error(&e) else {
        return ContainerError::Runtime(e.to_string());
    };
    let message = message.to_string();

    match (call, status) {
        (ContainerCall::Create, 404) => ContainerError::ImageNotFound(message),
        (ContainerCall::Create, 409) => ContainerError::AlreadyExists(message),
        (_, 404) => ContainerError::NotFound(message),
        (ContainerCall::Start, 304) => ContainerError::AlreadyRunning(message),
        (ContainerCall::Stop, 304) => ContainerError::NotRunning(message),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn restart_policy(policy: &RestartPolicyConfig) -> RestartPolicy {
    let (name, retries) = match policy {
        RestartPolicyConfig::No => (RestartPolicyNameEnum::NO, None),
        RestartPolicyConfig::Always => (RestartPolicyNameEnum::ALWAYS, None),
        RestartPolicyConfig::UnlessStopped => (RestartPolicyNameEnum::UNLESS_STOPPED, None),
        RestartPolicyConfig::OnFailure { max_retries } => (
            RestartPolicyNameEnum::ON_FAILURE,
            max_retries.map(i64::from),
        ),
    };
    RestartPolicy {
        name: Some(name),
        maximum_retry_count: retries,
    }
}

fn container_state(status: ContainerStateStatusEnum) -> ContainerState {
    match status {
        ContainerStateStatusEnum::CREATED => ContainerState::Created,
        ContainerStateStatusEnum::RUNNING | ContainerStateStatusEnum::PAUSED => {
            ContainerState::Running
        }
        ContainerStateStatusEnum::RESTARTING => ContainerState::Restarting,
        _ => ContainerState::Stopped,
    }
}

// Names come back with a leading slash.
fn bare_name(name: &str) -> String {
    name.trim_start_matches('/').to_string()
}

#[async_trait]
impl RuntimeInfo for BollardRuntime {
    async fn info(&self) -> Result<RuntimeMetadata, RuntimeInfoError> {
        let info = self
            .client
            .info()
            .await
            .map_err(|e| RuntimeInfoError::Runtime(e.to_string()))?;

        Ok(RuntimeMetadata {
            name: self.runtime_type.to_string(),
            version: info.server_version.unwrap_or_default(),
            api_version: bollard::API_DEFAULT_VERSION.to_string(),
            os: info.operating_system.unwrap_or_default(),
            arch: info.architecture.unwrap_or_default(),
        })
    }

    async fn ping(&self) -> Result<(), RuntimeInfoError> {
        self.client
            .ping()
            .await
            .map(drop)
            .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))
    }
}

#[async_trait]
impl ImageOps for BollardRuntime {
    async fn build_image(&self, context: Vec<u8>, tag: &ImageRef) -> Result<(), ImageError> {
        let image = tag.to_string();
        let options = BuildImageOptions {
            dockerfile: "Dockerfile".to_string(),
            t: Some(image.clone()),
            ..Default::default()
        };
        let body = Either::Left(Full::new(Bytes::from(context)));
        let mut progress = self.client.build_image(options, None, Some(body));

        // Build failures arrive in-band as an error detail, not as a stream error.
        while let Some(item) = progress.next().await {
            let info = item.map_err(|e| ImageError::Runtime(format!("{image}: {e}")))?;
            if let Some(detail) = info.error_detail {
                let message = detail.message.unwrap_or_else(|| "unknown error".into());
                return Err(ImageError::BuildFailed(format!("{image}: {message}")));
            }
            if let Some(line) = info.stream.as_deref().map(str::trim_end)
                && !line.is_empty()
            {
                tracing::debug!(image = %image, "{}", line);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ContainerOps for BollardRuntime {
    async fn create_container(
        &self,
        config: &ContainerConfig,
    ) -> Result<ContainerId, ContainerError> {
        let env: Vec<String> = config
            .env
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();

        let body = ContainerCreateBody {
            image: Some(config.image.to_string()),
            env: (!env.is_empty()).then_some(env),
            labels: (!config.labels.is_empty()).then(|| config.labels.clone()),
            stop_timeout: config.stop_timeout.map(|d| d.as_secs() as i64),
            host_config: Some(HostConfig {
                restart_policy: Some(restart_policy(&config.restart_policy)),
                ..Default::default()
            }),
            ..Default::default()
        };
        let options = CreateContainerOptions {
            name: Some(config.name.clone()),
            ..Default::default()
        };

        let created = self
            .client
            .create_container(Some(options), body)
            .await
            .map_err(|e| container_error(ContainerCall::Create, e))?;
        Ok(ContainerId::new(created.id))
    }

    async fn start_container(&self, id: &ContainerId) -> Result<(), ContainerError> {
        self.client
            .start_container(id.as_str(), None::<StartContainerOptions>)
            .await
            .map_err(|e| container_error(ContainerCall::Start, e))
    }

    async fn stop_container(
        &self,
        id: &ContainerId,
        timeout: Duration,
    ) -> Result<(), ContainerError> {
        let options = StopContainerOptions {
            t: Some(timeout.as_secs() as i32),
            signal: None,
        };
        self.client
            .stop_container(id.as_str(), Some(options))
            .await
            .map_err(|e| container_error(ContainerCall::Stop, e))
    }

    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<(), ContainerError> {
        let options = RemoveContainerOptions {
            force,
            ..Default::default()
        };
        self.client
            .remove_container(id.as_str(), Some(options))
            .await
            .map_err(|e| container_error(ContainerCall::Other, e))
    }

    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerInfo, ContainerError> {
        let details = self
            .client
            .inspect_container(id.as_str(), None::<InspectContainerOptions>)
            .await
            .map_err(|e| container_error(ContainerCall::Other, e))?;

        let state = details
            .state
            .and_then(|s| s.status)
            .map(container_state)
            .unwrap_or(ContainerState::Stopped);
        let (image, labels) = details
            .config
            .map(|c| (c.image.unwrap_or_default(), c.labels.unwrap_or_default()))
            .unwrap_or_default();

        Ok(ContainerInfo {
            id: details.id.map(ContainerId::new).unwrap_or_else(|| id.clone()),
            name: bare_name(details.name.as_deref().unwrap_or_default()),
            image,
            state,
            labels,
        })
    }

    async fn list_containers(
        &self,
        filters: &ContainerFilters,
    ) -> Result<Vec<ContainerSummary>, ContainerError> {
        let mut query: HashMap<String, Vec<String>> = HashMap::new();
        if let Some(name) = &filters.name {
            query.insert("name".into(), vec![name.clone()]);
        }
        if !filters.labels.is_empty() {
            let labels = filters.labels.iter().map(|(k, v)| format!("{k}={v}"));
            query.insert("label".into(), labels.collect());
        }
        let options = ListContainersOptions {
            all: filters.all,
            filters: Some(query),
            ..Default::default()
        };

        // Podman can report a transient "stopping" state that bollard fails to decode.
        let mut attempt = 1;
        let containers = loop {
            match self.client.list_containers(Some(options.clone())).await {
                Ok(containers) => break containers,
                Err(e) if attempt < LIST_ATTEMPTS && e.to_string().contains("unknown variant") => {
                    tracing::debug!(attempt, "retrying container list: {}", e);
                    attempt += 1;
                    tokio::time::sleep(Duration::from_millis(500)).await;
                }
                Err(e) => return Err(ContainerError::Runtime(e.to_string())),
            }
        };

        Ok(containers
            .into_iter()
            .map(|c| ContainerSummary {
                id: ContainerId::new(c.id.unwrap_or_default()),
                name: c
                    .names
                    .and_then(|names| names.first().map(|n| bare_name(n)))
                    .unwrap_or_default(),
                image: c.image.unwrap_or_default(),
                state: c
                    .state
                    .map(|s| format!("{s:?}").to_lowercase())
                    .unwrap_or_default(),
                labels: c.labels.unwrap_or_default(),
            })
            .collect())
    }
}

#[async_trait]
impl LogOps for BollardRuntime {
    async fn container_logs(
        &self,
        id: &ContainerId,
        opts: &LogOptions,
    ) -> Result<LogLineStream, LogError> {
        let options = LogsOptions {
            stdout: true,
            stderr: true,
            follow: false,
            timestamps: opts.timestamps,
            tail: opts.tail.map_or_else(|| "all".to_string(), |n| n.to_string()),
            ..Default::default()
        };
        let container = id.to_string();

        let stream = self
            .client
            .logs(id.as_str(), Some(options))
            .map(move |item| match item {
                Ok(output) => {
                    let (stream, bytes) = match output {
                        LogOutput::StdErr { message } => (LogStream::Stderr, message),
                        LogOutput::StdOut { message }
                        | LogOutput::StdIn { message }
                        | LogOutput::Console { message } => (LogStream::Stdout, message),
                    };
                    Ok(LogLine {
                        content: String::from_utf8_lossy(&bytes).into_owned(),
                        stream,
                    })
                }
                Err(e) => match daemon_error(&e) {
                    Some((404, _)) => Err(LogError::ContainerNotFound(container.clone())),
                    _ => Err(LogError::Stream(e.to_string())),
                },
            });

        Ok(Box::pin(stream))
    }
}
