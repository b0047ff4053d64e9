use anyhow::{bail, Result};
use regex::Regex;

use crate::ingest::records::NO_CVE;

/// One `<result>` element extracted from a remote scanner report.
#[derive(Clone, Debug, PartialEq)]
pub struct Finding {
    pub title: String,
    pub host: String,
    pub port: String,
    pub threat: String,
    pub severity: String,
    pub description: String,
    pub cve: String,
    pub confidence: u8,
}

/// Extract findings from a report document. A structurally broken document is
/// an error for the whole file; a finding without a title is dropped silently,
/// everything else degrades field-by-field to empty defaults.
pub fn parse_report(xml: &str) -> Result<Vec<Finding>> {
    if !xml.trim_start().starts_with('<') {
        bail!("report is not an XML document");
    }

    let result_re = Regex::new(r"(?s)<result\b[^>]*>(.*?)</result>")?;
    let mut findings = Vec::new();

    for cap in result_re.captures_iter(xml) {
        let block = &cap[1];

        let Some(title) = tag_text(block, "name") else {
            continue;
        };

        let cve = tag_text(block, "cve")
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| NO_CVE.to_string());

        let confidence = tag_text(block, "qod")
            .and_then(|qod| tag_text(&qod, "value"))
            .and_then(|value| value.parse::<u8>().ok())
            .unwrap_or(0);

        findings.push(Finding {
            title,
            host: tag_text(block, "host").unwrap_or_default(),
            port: tag_text(block, "port").unwrap_or_default(),
            threat: tag_text(block, "threat").unwrap_or_default(),
            severity: tag_text(block, "severity").unwrap_or_default(),
            description: tag_text(block, "description").unwrap_or_default(),
            cve,
            confidence,
        });
    }

    Ok(findings)
}

/// First occurrence of `<tag>...</tag>` inside a block, trimmed. Leading text
/// wins over trailing markup (the `<asset>` child inside `<host>`); elements
/// that only wrap nested markup keep it so callers can extract further.
fn tag_text(block: &str, tag: &str) -> Option<String> {
    let re = Regex::new(&format!(r"(?s)<{tag}\b[^>]*>(.*?)</{tag}>")).ok()?;
    let inner = re.captures(block)?.get(1)?.as_str();
    let text = match inner.find('<') {
        Some(idx) if !inner[..idx].trim().is_empty() => &inner[..idx],
        _ => inner,
    };
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
