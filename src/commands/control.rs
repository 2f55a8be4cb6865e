// ABOUTME: Container control commands: stop, start, logs.

use super::Context;
use cloudnest::deploy::ControlOutcome;
use cloudnest::error::Result;
use cloudnest::output::Output;

pub async fn stop(ctx: &Context, app: &str, output: &Output) -> Result<()> {
    let id = ctx.resolve(app).await?;
    let outcome = ctx.orchestrator.stop(&ctx.owner, &id).await?;
    report(outcome, "Stopped", app, output);
    Ok(())
}

pub async fn start(ctx: &Context, app: &str, output: &Output) -> Result<()> {
    let id = ctx.resolve(app).await?;
    let outcome = ctx.orchestrator.start(&ctx.owner, &id).await?;
    report(outcome, "Started", app, output);
    Ok(())
}

pub async fn logs(ctx: &Context, app: &str, tail: Option<u64>, output: &Output) -> Result<()> {
    let id = ctx.resolve(app).await?;
    let lines = ctx.orchestrator.logs(&ctx.owner, &id, tail).await?;
    output.lines(&lines);
    Ok(())
}

fn report(outcome: ControlOutcome, verb: &str, app: &str, output: &Output) {
    match outcome {
        ControlOutcome::Done(_) => output.success(&format!("{verb} {app}")),
        ControlOutcome::NoContainer => output.warning(&format!("{app} has no container to act on")),
    }
}
