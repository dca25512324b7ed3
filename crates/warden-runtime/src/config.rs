//! Runtime configuration.
//!
//! ```toml
//! [audit]
//! capacity = 500
//! tracing = true
//! jsonl_path = "/var/log/warden/audit.jsonl"
//!
//! [[capabilities]]
//! name = "fs:write"
//! description = "Write files in the app data directory"
//! severity = "high"
//!
//! [registry]
//! cache_ttl_secs = 300
//!
//! [gateway]
//! default_timeout_ms = 5000
//!
//! [logging]
//! filter = "info,warden=debug"
//! json = false
//! ```

use crate::audit::DEFAULT_AUDIT_CAPACITY;
use error_stack::{Report, ResultExt};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use warden_kernel::capability::{Capability, validate_declarations};
use warden_kernel::config::{ConfigError, load_config};
use warden_kernel::error::{KernelError, KernelResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    pub audit: AuditConfig,
    pub capabilities: Vec<Capability>,
    pub registry: RegistryConfig,
    pub gateway: GatewaySettings,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Events kept in memory.
    pub capacity: usize,
    /// Mirror events into `tracing`.
    pub tracing: bool,
    /// Append events to this JSONL file.
    pub jsonl_path: Option<PathBuf>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_AUDIT_CAPACITY,
            tracing: true,
            jsonl_path: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Grant cache lifetime. Unset keeps answers until invalidated.
    pub cache_ttl_secs: Option<u64>,
}

impl RegistryConfig {
    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache_ttl_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    /// Applied to call specs without their own timeout.
    pub default_timeout_ms: Option<u64>,
}

impl GatewaySettings {
    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

impl WardenConfig {
    /// Load from any format supported by [`load_config`] and validate.
    pub fn load(path: impl AsRef<Path>) -> KernelResult<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();

        let config: Self = load_config(&display)
            .map_err(|e| Report::new(KernelError::from(e)))
            .attach(format!("loading warden config from {display}"))?;
        config
            .validate()
            .map_err(|e| Report::new(KernelError::from(e)))
            .attach(format!("validating warden config from {display}"))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.audit.capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "audit.capacity",
                reason: "must be at least 1".into(),
            });
        }
        validate_declarations(&self.capabilities).map_err(|e| ConfigError::Invalid {
            field: "capabilities",
            reason: e.to_string(),
        })?;
        if self.registry.cache_ttl_secs == Some(0) {
            return Err(ConfigError::Invalid {
                field: "registry.cache_ttl_secs",
                reason: "must be greater than zero when set".into(),
            });
        }
        if self.gateway.default_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid {
                field: "gateway.default_timeout_ms",
                reason: "must be greater than zero when set".into(),
            });
        }
        if self.logging.filter.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "logging.filter",
                reason: "cannot be empty".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use warden_kernel::capability::CapabilitySeverity;

    #[test]
    fn defaults_are_valid() {
        let config = WardenConfig::default();
        assert_eq!(config.audit.capacity, DEFAULT_AUDIT_CAPACITY);
        assert!(config.audit.tracing);
        assert!(config.gateway.default_timeout().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn loads_toml_with_partial_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("warden.toml");
        fs::write(
            &path,
            r#"
[audit]
capacity = 50

[[capabilities]]
name = "fs:write"
description = "write files"
severity = "high"

[[capabilities]]
name = "fs:read"

[gateway]
default_timeout_ms = 250
"#,
        )
        .unwrap();

        let config = WardenConfig::load(&path).unwrap();
        assert_eq!(config.audit.capacity, 50);
        assert!(config.audit.tracing);
        assert_eq!(config.capabilities.len(), 2);
        assert_eq!(config.capabilities[0].severity, CapabilitySeverity::High);
        assert_eq!(config.capabilities[1].severity, CapabilitySeverity::Medium);
        assert_eq!(
            config.gateway.default_timeout(),
            Some(Duration::from_millis(250))
        );
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut config = WardenConfig::default();
        config.audit.capacity = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "audit.capacity", .. })
        ));

        let mut config = WardenConfig::default();
        let cap = Capability::new("fs:read", "", CapabilitySeverity::Low);
        config.capabilities = vec![cap.clone(), cap];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "capabilities", .. })
        ));

        let mut config = WardenConfig::default();
        config.gateway.default_timeout_ms = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_reports_context() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("warden.yaml");
        fs::write(&path, "audit:\n  capacity: 0\n").unwrap();

        let report = WardenConfig::load(&path).unwrap_err();
        assert!(matches!(report.current_context(), KernelError::Config(_)));
        assert!(format!("{report:?}").contains("validating warden config"));
    }
}
