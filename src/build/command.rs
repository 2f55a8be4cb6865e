// ABOUTME: Runs external build tools (pip, npm) inside a workspace.
// ABOUTME: Failures carry the tail of the tool's stderr.

use super::BuildError;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

const STDERR_TAIL_LINES: usize = 20;

/// Run `tool` with `args` in `cwd`. `tool` may carry its own leading arguments,
/// e.g. `python3 -m pip`.
pub async fn run_tool(tool: &str, args: &[&str], cwd: &Path) -> Result<(), BuildError> {
    let mut parts = tool.split_whitespace();
    let program = parts.next().ok_or_else(|| BuildError::Command {
        program: tool.to_string(),
        message: "empty command".to_string(),
    })?;

    tracing::debug!(program, ?args, cwd = %cwd.display(), "running build tool");
    let output = Command::new(program)
        .args(parts)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| BuildError::Command {
            program: program.to_string(),
            message: e.to_string(),
        })?;

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let lines: Vec<&str> = stderr.lines().collect();
    let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
    let message = if tail.is_empty() {
        output.status.to_string()
    } else {
        format!("{}: {}", output.status, tail)
    };

    Err(BuildError::Command {
        program: program.to_string(),
        message,
    })
}
