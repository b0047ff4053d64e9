use async_trait::async_trait;

use crate::ingest::records::VulnerabilityRecord;

/// Append-only persistence boundary. Implementations must tolerate being
/// called at high frequency; the orchestrator expects no backpressure signal.
#[async_trait]
pub trait VulnSink: Send + Sync {
    async fn insert(&self, record: &VulnerabilityRecord, org_name: &str) -> bool;
}

/// Records every vulnerability through structured logging.
pub struct LogSink;

#[async_trait]
impl VulnSink for LogSink {
    async fn insert(&self, record: &VulnerabilityRecord, org_name: &str) -> bool {
        tracing::info!(
            "[{}] Vulnerability recorded: {} on {} (severity {}, cve {})",
            org_name,
            record.title,
            record.host,
            record.severity,
            record.cve
        );
        tracing::debug!("Vulnerability details: {:?}", record);
        true
    }
}
