use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct RunDirs {
    pub root: PathBuf,    // artifacts/runs/<id>
    pub scans: PathBuf,
    pub reports: PathBuf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetKind {
    Domain,
    Ipv4,
    Cidr,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Target {
    pub raw: String,
    pub kind: TargetKind,
}

/// Classified targets in input order. No deduplication, no network validation.
#[derive(Clone, Debug, Default)]
pub struct ClassifiedTargets {
    pub targets: Vec<Target>,
}

impl ClassifiedTargets {
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn all(&self) -> Vec<String> {
        self.targets.iter().map(|t| t.raw.clone()).collect()
    }

    pub fn of_kind(&self, kind: TargetKind) -> Vec<&str> {
        self.targets
            .iter()
            .filter(|t| t.kind == kind)
            .map(|t| t.raw.as_str())
            .collect()
    }

    pub fn log_summary(&self) {
        tracing::info!(
            "Classified {} target(s): {} domain(s), {} IP(s), {} CIDR range(s)",
            self.len(),
            self.of_kind(TargetKind::Domain).len(),
            self.of_kind(TargetKind::Ipv4).len(),
            self.of_kind(TargetKind::Cidr).len()
        );
    }
}

/// Split a comma-separated target expression and bucket each entry by syntax.
/// Whitespace-only entries are dropped silently.
pub fn classify(raw: &str) -> ClassifiedTargets {
    let targets = raw
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| Target {
            raw: entry.to_string(),
            kind: kind_of(entry),
        })
        .collect();

    ClassifiedTargets { targets }
}

fn kind_of(entry: &str) -> TargetKind {
    if let Some((addr, prefix)) = entry.split_once('/') {
        let valid_prefix = prefix.parse::<u8>().map(|p| p <= 32).unwrap_or(false);
        if valid_prefix && addr.parse::<Ipv4Addr>().is_ok() {
            return TargetKind::Cidr;
        }
        return TargetKind::Domain;
    }

    if entry.parse::<Ipv4Addr>().is_ok() {
        TargetKind::Ipv4
    } else {
        TargetKind::Domain
    }
}

/// Artifact files produced by scan jobs and consumed by dependent stages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactKind {
    Subdomains,
    Ips,
    Ports,
    Findings,
    CmsSites,
}

#[derive(Clone, Debug)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
}
