//! `warden config` command implementation

use crate::cli::ConfigFormat;
use anyhow::anyhow;
use colored::Colorize;
use std::path::Path;
use warden_runtime::config::WardenConfig;

/// Render the effective configuration in the requested format.
pub fn render(config: &WardenConfig, format: ConfigFormat) -> anyhow::Result<String> {
    let text = match format {
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
    };
    Ok(text)
}

/// Execute the `warden config show` command
pub fn run_show(config: &WardenConfig, format: ConfigFormat) -> anyhow::Result<()> {
    println!("{}", render(config, format)?);
    Ok(())
}

/// Execute the `warden config validate` command
pub fn run_validate(path: &Path) -> anyhow::Result<()> {
    println!(
        "{} Validating config: {}",
        "->".green(),
        path.display().to_string().cyan()
    );

    let config = WardenConfig::load(path).map_err(|report| anyhow!("{report:?}"))?;

    println!("{} Configuration is valid", "✓".green());
    println!("  audit capacity:  {}", config.audit.capacity);
    println!("  capabilities:    {}", config.capabilities.len());
    if let Some(ttl) = config.registry.cache_ttl_secs {
        println!("  grant cache ttl: {ttl}s");
    }
    if let Some(timeout) = config.gateway.default_timeout_ms {
        println!("  call timeout:    {timeout}ms");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn renders_every_format() {
        let config = WardenConfig::default();
        assert!(render(&config, ConfigFormat::Toml).unwrap().contains("[audit]"));
        assert!(render(&config, ConfigFormat::Yaml).unwrap().contains("capacity: 500"));
        let json: serde_json::Value =
            serde_json::from_str(&render(&config, ConfigFormat::Json).unwrap()).unwrap();
        assert_eq!(json["audit"]["capacity"], 500);
    }

    #[test]
    fn validate_accepts_good_and_rejects_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.toml");
        fs::write(&good, "[audit]\ncapacity = 20\n").unwrap();
        assert!(run_validate(&good).is_ok());

        let bad = dir.path().join("bad.toml");
        fs::write(&bad, "[audit]\ncapacity = 0\n").unwrap();
        assert!(run_validate(&bad).is_err());
    }
}
