use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use reqwest::redirect::Policy;
use std::time::Duration;

use crate::core::models::{Artifact, ArtifactKind};
use crate::core::scheduler::{JobInput, JobOutcome, RunContext};
use crate::core::template::{InputSource, JobKind, JobSpec};
use crate::utils::fs::{atomic_write, ensure_dir, non_empty_lines};

const CMS_MARKERS: &[&str] = &["wp-content", "wp-includes", "wp-login.php", "/wp-json/"];

/// Probe each discovered host for WordPress markers. On any hit the outcome
/// carries a follow-up CMS template scan over the hit list, which the
/// coordinator schedules as an extra stage group.
pub async fn fingerprint(input: &JobInput, ctx: &RunContext) -> Result<JobOutcome> {
    let hosts: Vec<String> = match input {
        JobInput::File(path) => non_empty_lines(path)?,
        JobInput::Targets(list) => list.clone(),
        JobInput::Expression(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(ctx.config.tools.cms.request_timeout_secs))
        .redirect(Policy::limited(3))
        .danger_accept_invalid_certs(true)
        .build()
        .context("Failed to build fingerprint HTTP client")?;

    let probes = ctx.config.concurrency.max_probe_connections.max(1);
    let hits: Vec<String> = stream::iter(hosts)
        .map(|host| {
            let client = client.clone();
            async move {
                if probe(&client, &host).await {
                    Some(host)
                } else {
                    None
                }
            }
        })
        .buffer_unordered(probes)
        .filter_map(|hit| async move { hit })
        .collect()
        .await;

    let out_dir = ctx.dirs.scans.join("cms");
    ensure_dir(&out_dir)?;
    let sites_file = out_dir.join("wordpress.txt");
    atomic_write(&sites_file, hits.join("\n").as_bytes())?;

    let follow_ups = if hits.is_empty() {
        tracing::info!("No WordPress sites detected, skipping CMS-specific scans");
        Vec::new()
    } else {
        tracing::info!("WordPress sites detected: {:?}", hits);
        vec![JobSpec::new(
            "wordpress_nuclei",
            JobKind::CmsTemplateScan,
            InputSource::Literal(hits),
        )]
    };

    Ok(JobOutcome {
        artifacts: vec![Artifact {
            kind: ArtifactKind::CmsSites,
            path: sites_file,
        }],
        follow_ups,
    })
}

async fn probe(client: &reqwest::Client, host: &str) -> bool {
    for scheme in ["https", "http"] {
        let url = format!("{}://{}/", scheme, host);
        match client.get(&url).send().await {
            Ok(response) => {
                if let Ok(body) = response.text().await {
                    if looks_like_wordpress(&body) {
                        return true;
                    }
                }
            }
            Err(err) => tracing::debug!("Probe {} failed: {}", url, err),
        }
    }
    false
}

fn looks_like_wordpress(body: &str) -> bool {
    CMS_MARKERS.iter().any(|marker| body.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_detection() {
        assert!(looks_like_wordpress(
            r#"<link rel="stylesheet" href="/wp-content/themes/site/style.css">"#
        ));
        assert!(looks_like_wordpress(r#"<script src="/wp-includes/js/a.js">"#));
        assert!(!looks_like_wordpress("<html><body>plain site</body></html>"));
    }
}
