use anyhow::Result;

use crate::core::models::{Artifact, ArtifactKind};
use crate::core::scheduler::{JobInput, JobOutcome, RunContext};
use crate::executors::command::execute;
use crate::utils::fs::{atomic_write, ensure_dir};

/// Vulnerability-template scan over a subdomain artifact.
pub async fn run(input: &JobInput, ctx: &RunContext) -> Result<JobOutcome> {
    scan(input, ctx, "nuclei", None).await
}

/// CMS-specific variant launched as a dynamic follow-up on fingerprint hits.
pub async fn run_cms(input: &JobInput, ctx: &RunContext) -> Result<JobOutcome> {
    let tags = ctx.config.tools.nuclei.cms_tags.clone();
    scan(input, ctx, "nuclei_cms", Some(tags)).await
}

async fn scan(
    input: &JobInput,
    ctx: &RunContext,
    label: &str,
    tags: Option<String>,
) -> Result<JobOutcome> {
    let out_dir = ctx.dirs.scans.join(label);
    ensure_dir(&out_dir)?;

    let list_file = match input {
        JobInput::File(path) => path.clone(),
        JobInput::Targets(list) => {
            let path = out_dir.join("targets.txt");
            atomic_write(&path, (list.join("\n") + "\n").as_bytes())?;
            path
        }
        JobInput::Expression(raw) => {
            let targets: Vec<&str> = raw
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect();
            let path = out_dir.join("targets.txt");
            atomic_write(&path, (targets.join("\n") + "\n").as_bytes())?;
            path
        }
    };

    let findings = out_dir.join("findings.txt");
    let tool = &ctx.config.tools.nuclei;
    let mut args: Vec<String> = tool.base_args.clone();
    args.extend(["-l".to_string(), list_file.display().to_string()]);
    if let Some(tags) = tags {
        args.extend(["-tags".to_string(), tags]);
    }
    args.extend(["-o".to_string(), findings.display().to_string()]);

    let args_ref: Vec<&str> = args.iter().map(String::as_str).collect();
    execute(&tool.command, &args_ref, &out_dir, tool.timeout_ms).await?;

    let mut artifacts = Vec::new();
    if findings.exists() {
        artifacts.push(Artifact {
            kind: ArtifactKind::Findings,
            path: findings,
        });
    } else {
        tracing::info!("Template scan {} produced no findings file", label);
    }

    Ok(JobOutcome {
        artifacts,
        follow_ups: Vec::new(),
    })
}
