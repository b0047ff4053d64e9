use crate::core::errors::{ExecError, VulnhawkError};
use anyhow::{Context, Result};
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;

#[derive(Debug)]
pub struct CommandOutput {
    pub stdout: String,
    #[allow(dead_code)]
    pub stderr: String,
    pub exit_code: i32,
    pub duration_ms: u128,
}

/// Run an external engine to completion. Non-zero exit, spawn failure and
/// timeout all surface as `VulnhawkError::Exec` with the stderr tail attached.
pub async fn execute(
    tool: &str,
    args: &[&str],
    cwd: &Path,
    timeout_ms: Option<u64>,
) -> Result<CommandOutput> {
    let start = Instant::now();
    tracing::debug!("Executing: {} {:?} in {}", tool, args, cwd.display());

    let mut cmd = Command::new(tool);
    cmd.args(args)
        .current_dir(cwd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = cmd
        .spawn()
        .with_context(|| format!("Failed to spawn {}", tool))?;

    // Dropping the in-flight future on timeout kills the child (kill_on_drop).
    let wait = child.wait_with_output();
    let output = match timeout_ms {
        Some(ms) => match timeout(Duration::from_millis(ms), wait).await {
            Ok(result) => result,
            Err(_) => {
                return Err(VulnhawkError::Exec(exec_error(
                    tool,
                    args,
                    cwd,
                    None,
                    format!("Command timed out after {}ms", ms),
                    start.elapsed().as_millis(),
                ))
                .into());
            }
        },
        None => wait.await,
    };

    let output = output.with_context(|| format!("Failed to collect output of {}", tool))?;
    let duration_ms = start.elapsed().as_millis();
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    let exit_code = output.status.code().unwrap_or(-1);

    if !output.status.success() {
        return Err(VulnhawkError::Exec(exec_error(
            tool,
            args,
            cwd,
            Some(exit_code),
            stderr_tail(&stderr),
            duration_ms,
        ))
        .into());
    }

    Ok(CommandOutput {
        stdout,
        stderr,
        exit_code,
        duration_ms,
    })
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().collect();
    let tail_start = lines.len().saturating_sub(10);
    lines[tail_start..].join("\n")
}

fn exec_error(
    tool: &str,
    args: &[&str],
    cwd: &Path,
    exit_code: Option<i32>,
    stderr_tail: String,
    duration_ms: u128,
) -> ExecError {
    ExecError {
        tool: tool.to_string(),
        args: args.iter().map(|s| s.to_string()).collect(),
        cwd: cwd.display().to_string(),
        exit_code,
        stderr_tail,
        duration_ms,
    }
}
