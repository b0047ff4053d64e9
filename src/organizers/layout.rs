use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::core::models::RunDirs;
use crate::utils::fs::ensure_dir;

const RUNS_ROOT: &str = "artifacts/runs";

pub fn prepare_run_dirs(run_id: &str) -> Result<RunDirs> {
    let root = PathBuf::from(RUNS_ROOT).join(run_id);
    let dirs = RunDirs {
        scans: root.join("scans"),
        reports: root.join("reports"),
        root,
    };

    ensure_dir(&dirs.root)?;
    ensure_dir(&dirs.scans)?;
    ensure_dir(&dirs.reports)?;

    Ok(dirs)
}

/// Fail early if the run directory is not actually writable.
pub fn preflight_checks(dirs: &RunDirs) -> Result<()> {
    let probe = dirs.root.join(".write_probe");
    std::fs::write(&probe, b"ok")
        .with_context(|| format!("Run directory is not writable: {:?}", dirs.root))?;
    std::fs::remove_file(&probe)
        .with_context(|| format!("Failed to clean up write probe in {:?}", dirs.root))?;
    tracing::debug!("Run directory ready: {:?}", dirs.root);
    Ok(())
}
