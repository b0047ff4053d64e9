use std::path::Path;
use std::sync::Arc;

use crate::ingest::epss::ScoreFeed;
use crate::ingest::records::{VulnerabilityRecord, NO_CVE};
use crate::ingest::report::parse_report;
use crate::sink::VulnSink;

/// EPSS percentile at or above which a finding is flagged exploitable.
pub const EXPLOITABLE_PERCENTILE: f64 = 0.65;

/// Known-noisy finding titles excluded from record emission.
const FALSE_POSITIVE_TITLES: &[&str] = &[
    "httpOnly",
    "Certificate Expired",
    "Weak Encryption",
    "Missing `secure`",
    "VNC Server Unencrypted",
    "Weak Cipher",
    "Vulnerable Cipher",
];

#[derive(Debug, Default)]
pub struct IngestOutcome {
    pub records: Vec<VulnerabilityRecord>,
    pub skipped_false_positives: usize,
}

/// Turns a completed report artifact into normalized vulnerability records
/// and forwards them to the persistence sink in discovery order.
pub struct ReportIngestionPipeline {
    feed: Arc<dyn ScoreFeed>,
    sink: Arc<dyn VulnSink>,
    org_name: String,
}

impl ReportIngestionPipeline {
    pub fn new(feed: Arc<dyn ScoreFeed>, sink: Arc<dyn VulnSink>, org_name: String) -> Self {
        Self {
            feed,
            sink,
            org_name,
        }
    }

    /// Never fails: a broken report or a rejecting sink degrades to fewer
    /// records with an error log, leaving the calling task's lifecycle alone.
    pub async fn ingest(&self, report_path: &Path) -> IngestOutcome {
        tracing::info!("Processing findings from report: {:?}", report_path);

        let xml = match std::fs::read_to_string(report_path) {
            Ok(xml) => xml,
            Err(err) => {
                tracing::error!("Failed to read report {:?}: {}", report_path, err);
                return IngestOutcome::default();
            }
        };

        let findings = match parse_report(&xml) {
            Ok(findings) => findings,
            Err(err) => {
                tracing::error!("Error parsing report {:?}: {:#}", report_path, err);
                return IngestOutcome::default();
            }
        };

        let mut outcome = IngestOutcome::default();
        for finding in findings {
            if is_false_positive(&finding.title) {
                outcome.skipped_false_positives += 1;
                continue;
            }

            let mut epss = 0.0;
            let mut exploitable = false;
            if finding.cve != NO_CVE {
                // Best-effort enrichment: any feed failure keeps the defaults.
                match self.feed.exploit_percentile(&finding.cve).await {
                    Ok(Some(percentile)) => {
                        epss = percentile;
                        exploitable = percentile >= EXPLOITABLE_PERCENTILE;
                    }
                    Ok(None) => tracing::debug!("No EPSS data for {}", finding.cve),
                    Err(err) => {
                        tracing::warn!("Failed to fetch EPSS for {}: {:#}", finding.cve, err)
                    }
                }
            }

            let record = VulnerabilityRecord::from_finding(&finding, epss, exploitable);
            tracing::info!("Found vulnerability: {} on {}", record.title, record.host);

            if !self.sink.insert(&record, &self.org_name).await {
                tracing::error!("Sink rejected record '{}' (continuing)", record.title);
            }
            outcome.records.push(record);
        }

        tracing::info!(
            "Processed {} vulnerabilities ({} skipped as false positives)",
            outcome.records.len(),
            outcome.skipped_false_positives
        );
        outcome
    }
}

fn is_false_positive(title: &str) -> bool {
    FALSE_POSITIVE_TITLES
        .iter()
        .any(|signature| title.contains(signature))
}
