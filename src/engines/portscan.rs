use anyhow::{bail, Result};
use std::path::Path;

use crate::config::PortScanConfig;
use crate::core::models::{Artifact, ArtifactKind};
use crate::core::scheduler::{JobInput, JobOutcome, RunContext};
use crate::executors::command::execute;
use crate::utils::fs::{atomic_write, ensure_dir, non_empty_lines};

/// Port discovery over a target list or a discovered-IP artifact, with an
/// optional chained credential-bruteforce pass.
pub async fn run(bruteforce: bool, input: &JobInput, ctx: &RunContext) -> Result<JobOutcome> {
    let targets: Vec<String> = match input {
        JobInput::Targets(list) => list.clone(),
        JobInput::File(path) => non_empty_lines(path)?,
        JobInput::Expression(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
    };
    if targets.is_empty() {
        bail!("port scan received no usable targets");
    }

    let out_dir = ctx.dirs.scans.join("portscan");
    ensure_dir(&out_dir)?;
    let output_file = out_dir.join("ports.txt");

    let tool = &ctx.config.tools.portscan;
    let mut args: Vec<String> = tool.base_args.clone();
    args.extend(build_args(tool, &targets));
    let args_ref: Vec<&str> = args.iter().map(String::as_str).collect();

    let result = execute(&tool.command, &args_ref, &out_dir, None).await?;
    atomic_write(&output_file, result.stdout.as_bytes())?;
    tracing::info!(
        "Port scan over {} target(s) finished in {}ms",
        targets.len(),
        result.duration_ms
    );

    if bruteforce {
        run_bruteforce(&output_file, ctx).await;
    }

    Ok(JobOutcome {
        artifacts: vec![Artifact {
            kind: ArtifactKind::Ports,
            path: output_file,
        }],
        follow_ups: Vec::new(),
    })
}

fn build_args(tool: &PortScanConfig, targets: &[String]) -> Vec<String> {
    let mut args = vec![
        "-b".to_string(),
        tool.batch_size.to_string(),
        "--ulimit".to_string(),
        tool.ulimit.to_string(),
        "-t".to_string(),
        tool.timeout_ms.to_string(),
        "--tries".to_string(),
        tool.tries.to_string(),
        "-g".to_string(),
        "-a".to_string(),
        targets.join(","),
    ];
    if tool.service_detection {
        args.extend(["--".to_string(), "-sV".to_string()]);
    }
    args
}

/// Chained credential pass. Best-effort: a failure here is logged and never
/// fails the port scan job that triggered it.
async fn run_bruteforce(ports_file: &Path, ctx: &RunContext) {
    let tool = &ctx.config.tools.bruteforce;
    if tool.command.is_empty() {
        tracing::warn!("Bruteforce requested but no bruteforce command is configured");
        return;
    }

    let mut args: Vec<String> = tool.base_args.clone();
    args.extend(["-f".to_string(), ports_file.display().to_string()]);
    let args_ref: Vec<&str> = args.iter().map(String::as_str).collect();
    let cwd = ports_file.parent().unwrap_or(&ctx.dirs.scans);
    let timeout_ms = Some(ctx.bruteforce_timeout_secs * 1000);

    match execute(&tool.command, &args_ref, cwd, timeout_ms).await {
        Ok(result) => tracing::info!("Bruteforce pass finished in {}ms", result.duration_ms),
        Err(err) => tracing::warn!("Bruteforce pass failed (continuing): {:#}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_carry_scanner_limits_and_targets() {
        let tool = PortScanConfig::default();
        let targets = vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()];
        let joined = build_args(&tool, &targets).join(" ");
        assert!(joined.contains("-b 25000"), "{}", joined);
        assert!(joined.contains("--ulimit 35000"), "{}", joined);
        assert!(joined.contains("--tries 1"), "{}", joined);
        assert!(joined.contains("-a 10.0.0.1,10.0.0.2"), "{}", joined);
    }

    #[test]
    fn service_detection_toggles_version_probe() {
        let mut tool = PortScanConfig::default();
        assert!(build_args(&tool, &["h".to_string()]).contains(&"-sV".to_string()));
        tool.service_detection = false;
        assert!(!build_args(&tool, &["h".to_string()]).contains(&"-sV".to_string()));
    }
}
