// ABOUTME: Deploy command and the shared wait-for-deploy helper.
// ABOUTME: Ctrl-C while waiting cancels the deploy instead of abandoning it.

use super::Context;
use super::apps::describe;
use cloudnest::app::AppStatus;
use cloudnest::deploy::DeployHandle;
use cloudnest::error::Result;
use cloudnest::output::Output;

pub async fn deploy(ctx: &Context, app: &str, output: &mut Output) -> Result<()> {
    let id = ctx.resolve(app).await?;
    let handle = ctx.orchestrator.trigger_deploy(&ctx.owner, &id).await?;
    await_deploy(ctx, handle, output).await
}

/// Block until a triggered deploy settles and report the result.
pub async fn await_deploy(ctx: &Context, handle: DeployHandle, output: &mut Output) -> Result<()> {
    output.start_timer();
    output.progress("  → Fetching, detecting and building...");

    let app_id = handle.app_id().clone();
    let wait = handle.wait();
    tokio::pin!(wait);

    let result = tokio::select! {
        result = &mut wait => result,
        _ = tokio::signal::ctrl_c() => {
            output.warning("interrupted, cancelling deploy");
            ctx.orchestrator.cancel_deploy(&ctx.owner, &app_id).await?;
            wait.await
        }
    };
    let record = result?;

    match record.status {
        AppStatus::Running => output.progress("  ✓ Container running"),
        AppStatus::Deployed => output.progress("  ✓ Built; nothing to supervise"),
        AppStatus::UnknownType => {
            output.warning("could not detect the app type; nothing was built")
        }
        _ => {}
    }
    output.data(&record, describe);
    if record.status == AppStatus::UnknownType {
        output.success(&format!("Fetched {}; nothing deployed", record.name()));
    } else {
        output.success(&format!("Deployed {}", record.name()));
    }
    Ok(())
}
