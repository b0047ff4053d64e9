use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    pub concurrency: ConcurrencyConfig,
    pub remote: RemoteConfig,
    pub scoring: ScoringConfig,
    pub tools: ToolsConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    /// Size of the worker pool that runs blocking engine invocations.
    pub max_concurrent_jobs: usize,
    /// Parallel HTTP connections used by the CMS fingerprinter.
    pub max_probe_connections: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 4,
            max_probe_connections: 8,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub base_url: String,
    pub port_range: String,
    pub poll_interval_secs: u64,
    /// Upper bound on polling iterations; None or 0 disables the bound.
    pub max_poll_rounds: Option<u32>,
    pub request_timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://openvas-api:8008".to_string(),
            port_range: "1-65535".to_string(),
            poll_interval_secs: 30,
            // 24 hours at the default interval
            max_poll_rounds: Some(2880),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.first.org".to_string(),
            request_timeout_secs: 10,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub recon: ReconConfig,
    pub portscan: PortScanConfig,
    pub nuclei: NucleiConfig,
    pub cms: CmsConfig,
    pub bruteforce: BruteforceConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconConfig {
    pub command: String,
    pub base_args: Vec<String>,
    pub timeout_ms: Option<u64>,
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            command: "bbot".to_string(),
            base_args: vec!["-y".to_string(), "--silent".to_string()],
            timeout_ms: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PortScanConfig {
    pub command: String,
    pub base_args: Vec<String>,
    pub batch_size: u32,
    pub ulimit: u32,
    /// Per-host connect timeout handed to the scanner.
    pub timeout_ms: u64,
    pub tries: u32,
    pub service_detection: bool,
}

impl Default for PortScanConfig {
    fn default() -> Self {
        Self {
            command: "rustscan".to_string(),
            base_args: Vec::new(),
            batch_size: 25000,
            ulimit: 35000,
            timeout_ms: 3500,
            tries: 1,
            service_detection: true,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct NucleiConfig {
    pub command: String,
    pub base_args: Vec<String>,
    /// Tag filter applied by the CMS-specific template scan.
    pub cms_tags: String,
    pub timeout_ms: Option<u64>,
}

impl Default for NucleiConfig {
    fn default() -> Self {
        Self {
            command: "nuclei".to_string(),
            base_args: vec!["-silent".to_string()],
            cms_tags: "wordpress".to_string(),
            timeout_ms: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CmsConfig {
    pub request_timeout_secs: u64,
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 10,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BruteforceConfig {
    /// Empty command disables the chained bruteforce pass.
    pub command: String,
    pub base_args: Vec<String>,
}

impl Default for BruteforceConfig {
    fn default() -> Self {
        Self {
            command: String::new(),
            base_args: Vec::new(),
        }
    }
}
