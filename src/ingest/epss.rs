use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::config::ScoringConfig;

/// Exploit-likelihood source. Treated as unreliable: every caller wraps a
/// failure into the default score.
#[async_trait]
pub trait ScoreFeed: Send + Sync {
    async fn exploit_percentile(&self, cve: &str) -> Result<Option<f64>>;
}

/// FIRST EPSS feed: `GET {base}/data/v1/epss?cve=<id>`.
pub struct FirstEpssFeed {
    http: Client,
    base_url: String,
}

impl FirstEpssFeed {
    pub fn new(config: &ScoringConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build scoring feed HTTP client")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ScoreFeed for FirstEpssFeed {
    async fn exploit_percentile(&self, cve: &str) -> Result<Option<f64>> {
        let url = format!("{}/data/v1/epss", self.base_url);
        let body: serde_json::Value = self
            .http
            .get(&url)
            .query(&[("cve", cve)])
            .send()
            .await
            .context("EPSS request failed")?
            .error_for_status()
            .context("EPSS request rejected")?
            .json()
            .await
            .context("EPSS response was not JSON")?;

        Ok(parse_percentile(&body))
    }
}

/// The feed serializes percentiles inconsistently (string or number).
fn parse_percentile(body: &serde_json::Value) -> Option<f64> {
    let value = body.get("data")?.as_array()?.first()?.get("percentile")?;
    if let Some(number) = value.as_f64() {
        return Some(number);
    }
    value.as_str()?.trim().parse().ok()
}
