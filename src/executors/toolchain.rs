use crate::config::GlobalConfig;
use crate::core::template::Mode;
use anyhow::{bail, Result};
use which::which;

/// Verify the engine binaries a mode actually needs before launching anything.
/// Remote-scanner runs shell out to nothing, so they need no local tools.
pub fn verify_for_mode(mode: Mode, config: &GlobalConfig) -> Result<()> {
    let required: Vec<&str> = match mode {
        Mode::Passive => vec![config.tools.recon.command.as_str()],
        Mode::Normal => vec![
            config.tools.recon.command.as_str(),
            config.tools.portscan.command.as_str(),
        ],
        Mode::Aggressive | Mode::AttackSurface => vec![
            config.tools.recon.command.as_str(),
            config.tools.portscan.command.as_str(),
            config.tools.nuclei.command.as_str(),
        ],
        Mode::Remote => Vec::new(),
    };

    let mut missing = Vec::new();
    for tool in required {
        match which(tool) {
            Ok(path) => tracing::debug!("Found {}: {:?}", tool, path),
            Err(_) => missing.push(tool.to_string()),
        }
    }

    if !missing.is_empty() {
        bail!(
            "Missing required scan engines: {}. Install them and retry",
            missing.join(", ")
        );
    }

    tracing::info!("All required scan engines found");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_mode_needs_no_local_engines() {
        let config = GlobalConfig::default();
        verify_for_mode(Mode::Remote, &config).unwrap();
    }

    #[test]
    fn missing_engine_is_reported_by_name() {
        let mut config = GlobalConfig::default();
        config.tools.recon.command = "definitely-not-a-real-binary".to_string();
        let err = verify_for_mode(Mode::Passive, &config).unwrap_err();
        assert!(format!("{:#}", err).contains("definitely-not-a-real-binary"));
    }
}
