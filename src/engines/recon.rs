use anyhow::{bail, Result};
use std::path::Path;

use crate::core::models::{Artifact, ArtifactKind};
use crate::core::scheduler::{JobInput, JobOutcome, RunContext};
use crate::core::template::ReconIntensity;
use crate::executors::command::execute;
use crate::utils::fs::ensure_dir;

const SCAN_NAME: &str = "scan";

/// Subdomain enumeration. The engine writes `subdomains.txt` (and `ips.txt`
/// for attack-surface runs) under its named scan directory.
pub async fn run(
    intensity: ReconIntensity,
    input: &JobInput,
    ctx: &RunContext,
) -> Result<JobOutcome> {
    let expression = match input {
        JobInput::Expression(raw) => raw.clone(),
        JobInput::Targets(list) => list.join(","),
        JobInput::File(path) => {
            bail!("reconnaissance does not consume artifact files: {:?}", path)
        }
    };

    let out_dir = ctx.dirs.scans.join("recon");
    ensure_dir(&out_dir)?;

    let tool = &ctx.config.tools.recon;
    let mut args: Vec<String> = tool.base_args.clone();
    args.extend(["-t".to_string(), expression]);
    args.extend(preset_args(intensity).iter().map(|s| s.to_string()));
    args.extend([
        "-o".to_string(),
        out_dir.display().to_string(),
        "-n".to_string(),
        SCAN_NAME.to_string(),
    ]);

    let args_ref: Vec<&str> = args.iter().map(String::as_str).collect();
    execute(&tool.command, &args_ref, &out_dir, tool.timeout_ms).await?;

    let mut artifacts = Vec::new();
    collect(&mut artifacts, &out_dir, ArtifactKind::Subdomains, "subdomains.txt");
    if intensity == ReconIntensity::AttackSurface {
        collect(&mut artifacts, &out_dir, ArtifactKind::Ips, "ips.txt");
    }

    Ok(JobOutcome {
        artifacts,
        follow_ups: Vec::new(),
    })
}

fn collect(artifacts: &mut Vec<Artifact>, out_dir: &Path, kind: ArtifactKind, file: &str) {
    let path = out_dir.join(SCAN_NAME).join(file);
    if path.exists() {
        artifacts.push(Artifact { kind, path });
    } else {
        tracing::warn!("Reconnaissance finished without producing {:?}", path);
    }
}

fn preset_args(intensity: ReconIntensity) -> &'static [&'static str] {
    match intensity {
        ReconIntensity::Passive => &["-p", "subdomain-enum", "-rf", "passive"],
        ReconIntensity::Normal => &["-p", "subdomain-enum"],
        ReconIntensity::Aggressive => &["-p", "subdomain-enum", "-rf", "active,aggressive"],
        ReconIntensity::AttackSurface => &["-p", "subdomain-enum", "-m", "portscan,sslcert"],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passive_preset_never_requests_active_modules() {
        let args = preset_args(ReconIntensity::Passive);
        assert!(args.contains(&"passive"));
        assert!(!args.iter().any(|a| a.contains("active")));
    }

    #[test]
    fn presets_differ_per_intensity() {
        let all = [
            preset_args(ReconIntensity::Passive),
            preset_args(ReconIntensity::Normal),
            preset_args(ReconIntensity::Aggressive),
            preset_args(ReconIntensity::AttackSurface),
        ];
        for (i, a) in all.iter().enumerate() {
            for b in all.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
