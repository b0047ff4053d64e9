use serde::Serialize;

use crate::ingest::report::Finding;

/// Sentinel used by the remote scanner when a finding has no CVE assigned.
pub const NO_CVE: &str = "NOCVE";

pub const TOOL_NAME: &str = "openvas";

/// Free-text fields carried only when no CVE exists: without an identifier
/// there is no external enrichment path, so the record must be self-contained.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FindingDetails {
    pub summary: String,
    pub impact: String,
    pub poc: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VulnerabilityRecord {
    pub title: String,
    pub host: String,
    pub tool: String,
    /// Detection confidence, 0-100.
    pub confidence: u8,
    pub severity: String,
    pub cve: String,
    /// EPSS percentile, 0.0 when unavailable.
    pub epss: f64,
    pub exploitable: bool,
    pub details: Option<FindingDetails>,
}

impl VulnerabilityRecord {
    /// Record shape is a pure function of CVE presence.
    pub fn from_finding(finding: &Finding, epss: f64, exploitable: bool) -> Self {
        let details = if finding.cve == NO_CVE {
            Some(FindingDetails {
                summary: finding.description.clone(),
                impact: finding.threat.clone(),
                poc: finding.description.clone(),
            })
        } else {
            None
        };

        Self {
            title: finding.title.clone(),
            host: finding.host.clone(),
            tool: TOOL_NAME.to_string(),
            confidence: finding.confidence,
            severity: finding.severity.clone(),
            cve: finding.cve.clone(),
            epss,
            exploitable,
            details,
        }
    }

    pub fn has_cve(&self) -> bool {
        self.cve != NO_CVE
    }
}
