// ABOUTME: Runtime command: reports which container runtime would be used.

use cloudnest::config::Config;
use cloudnest::error::Result;
use cloudnest::output::Output;
use cloudnest::runtime::{ContainerSupervisor, RuntimeMetadata};
use serde::Serialize;

#[derive(Serialize)]
struct RuntimeReport {
    available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    runtime: Option<RuntimeMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub async fn report(config: &Config, output: &Output) -> Result<()> {
    let report = match ContainerSupervisor::connect(&config.runtime).await {
        Ok(supervisor) => match supervisor.describe().await {
            Ok(metadata) => RuntimeReport {
                available: true,
                runtime: Some(metadata),
                error: None,
            },
            Err(e) => RuntimeReport {
                available: true,
                runtime: None,
                error: Some(e.to_string()),
            },
        },
        Err(e) => RuntimeReport {
            available: false,
            runtime: None,
            error: Some(e.to_string()),
        },
    };

    output.data(&report, |r| match (&r.runtime, &r.error) {
        (Some(m), _) => format!(
            "{} {} (API {}) on {}/{}",
            m.name, m.version, m.api_version, m.os, m.arch
        ),
        (None, Some(e)) if r.available => format!("runtime connected, info failed: {e}"),
        (None, Some(e)) => format!("no container runtime: {e}"),
        (None, None) => "no container runtime".to_string(),
    });
    Ok(())
}
