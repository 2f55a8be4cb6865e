// ABOUTME: Record-level commands: create, status, list, delete.
// ABOUTME: Renders app records for humans and as JSON.

use super::Context;
use super::deploy::await_deploy;
use cloudnest::app::{AppRecord, AppSpec};
use cloudnest::error::{Error, Result};
use cloudnest::output::Output;
use cloudnest::types::AppName;

pub async fn create(
    ctx: &Context,
    name: &str,
    git_url: String,
    branch: String,
    env: Vec<(String, String)>,
    no_deploy: bool,
    output: &mut Output,
) -> Result<()> {
    let name = AppName::parse(name).map_err(|e| Error::InvalidArgument(e.to_string()))?;
    let spec = env
        .into_iter()
        .fold(AppSpec::new(name, git_url).branch(branch), |spec, (k, v)| {
            spec.env(k, v)
        });

    let record = ctx.orchestrator.create_app(&ctx.owner, spec).await?;
    output.progress(&format!("Created {} ({})", record.name(), record.id));

    if no_deploy {
        output.data(&record, describe);
        return Ok(());
    }

    let handle = ctx.orchestrator.trigger_deploy(&ctx.owner, &record.id).await?;
    await_deploy(ctx, handle, output).await
}

pub async fn status(ctx: &Context, app: &str, output: &Output) -> Result<()> {
    let id = ctx.resolve(app).await?;
    let record = ctx.orchestrator.status(&ctx.owner, &id).await?;
    output.data(&record, describe);
    Ok(())
}

pub async fn list(ctx: &Context, output: &Output) -> Result<()> {
    let records = ctx.orchestrator.list(&ctx.owner).await?;
    output.data(&records, |records| {
        if records.is_empty() {
            return "No apps".to_string();
        }
        records
            .iter()
            .map(|r| {
                format!(
                    "{:<24} {:<13} {:<13} {}",
                    r.name(),
                    r.status,
                    r.runtime_kind.map(|k| k.as_str()).unwrap_or("-"),
                    r.id.short()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    });
    Ok(())
}

pub async fn delete(ctx: &Context, app: &str, output: &Output) -> Result<()> {
    let id = ctx.resolve(app).await?;
    let diagnostics = ctx.orchestrator.delete(&ctx.owner, &id).await?;
    for warning in diagnostics.warnings() {
        output.warning(&warning.message);
    }
    output.success(&format!("Deleted {app}"));
    Ok(())
}

/// Multi-line summary of one record.
pub fn describe(record: &AppRecord) -> String {
    let mut lines = vec![
        format!("{} ({})", record.name(), record.id),
        format!("  status:    {}", record.status),
        format!("  source:    {} @ {}", record.spec.git_url, record.spec.branch),
    ];
    if let Some(kind) = record.runtime_kind {
        lines.push(format!("  type:      {kind}"));
    }
    if let Some(container) = &record.container {
        lines.push(format!(
            "  container: {} ({})",
            container.name,
            container.id.short()
        ));
    }
    if let Some(deployed_at) = record.deployed_at {
        lines.push(format!("  deployed:  {}", deployed_at.to_rfc3339()));
    }
    if let Some(error) = &record.error {
        lines.push(format!("  error:     {error}"));
    }
    lines.join("\n")
}
