use super::types::GlobalConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "./vulnhawk.toml",
    "./config/vulnhawk.toml",
    "~/.config/vulnhawk/config.toml",
    "/etc/vulnhawk/config.toml",
];

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load() -> Result<GlobalConfig> {
        Self::load_with_custom_path(None)
    }

    pub fn load_with_custom_path(custom_path: Option<&Path>) -> Result<GlobalConfig> {
        if let Some(path) = custom_path {
            return Self::load_from_file(path)
                .with_context(|| format!("Failed to load config from custom path: {:?}", path));
        }

        for default_path in DEFAULT_CONFIG_PATHS {
            let path = Self::expand_path(default_path);
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => {
                        tracing::info!("Loaded configuration from: {:?}", path);
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                        continue;
                    }
                }
            }
        }

        tracing::info!("No configuration file found, using default settings");
        Ok(GlobalConfig::default())
    }

    fn load_from_file(path: &Path) -> Result<GlobalConfig> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: GlobalConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {:?}", path))?;

        Self::validate_config(&config)?;

        Ok(config)
    }

    fn validate_config(config: &GlobalConfig) -> Result<()> {
        if config.concurrency.max_concurrent_jobs == 0 {
            anyhow::bail!("max_concurrent_jobs must be greater than 0");
        }
        if config.remote.poll_interval_secs == 0 {
            anyhow::bail!("poll_interval_secs must be greater than 0");
        }
        if config.remote.base_url.is_empty() {
            anyhow::bail!("remote base_url cannot be empty");
        }
        if config.remote.port_range.is_empty() {
            anyhow::bail!("remote port_range cannot be empty");
        }

        for (name, command) in [
            ("recon", &config.tools.recon.command),
            ("portscan", &config.tools.portscan.command),
            ("nuclei", &config.tools.nuclei.command),
        ] {
            if command.is_empty() {
                anyhow::bail!("{} command cannot be empty", name);
            }
        }

        Ok(())
    }

    fn expand_path(path: &str) -> PathBuf {
        if path.starts_with("~/") {
            if let Ok(home) = std::env::var("HOME") {
                return PathBuf::from(home).join(&path[2..]);
            }
        }
        PathBuf::from(path)
    }
}
