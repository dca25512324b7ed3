//! Capability declarations.
//!
//! A [`Capability`] is a named permission unit declared once at startup.
//! Whether it is *currently granted* is answered by the host platform
//! through [`CapabilitySource`]; caching and fail-closed evaluation live in
//! `warden-runtime`'s `CapabilityRegistry`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// Severity
// ─────────────────────────────────────────────────────────────────────────────

/// How damaging misuse of a capability would be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CapabilitySeverity {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl CapabilitySeverity {
    /// `true` for `High` and `Critical`. A missing elevated capability is
    /// reported at error level.
    pub fn is_elevated(self) -> bool {
        self >= Self::High
    }
}

impl fmt::Display for CapabilitySeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Capability
// ─────────────────────────────────────────────────────────────────────────────

/// A declared permission unit, e.g. `fs:write` or `net:fetch`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Capability {
    /// Unique stable name referenced by call specs.
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub severity: CapabilitySeverity,
}

impl Capability {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        severity: CapabilitySeverity,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            severity,
        }
    }
}

/// Check a declaration list for empty and duplicate names.
pub fn validate_declarations(declarations: &[Capability]) -> Result<(), CapabilityError> {
    let mut seen = HashSet::new();
    for cap in declarations {
        if cap.name.trim().is_empty() {
            return Err(CapabilityError::EmptyName);
        }
        if !seen.insert(cap.name.as_str()) {
            return Err(CapabilityError::DuplicateDeclaration(cap.name.clone()));
        }
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Evaluation result
// ─────────────────────────────────────────────────────────────────────────────

/// Aggregate result of checking several capabilities at once.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CapabilityCheck {
    pub granted: bool,
    /// Names that evaluated to not-granted, in request order.
    pub missing: Vec<String>,
}

impl CapabilityCheck {
    pub fn from_missing(missing: Vec<String>) -> Self {
        Self {
            granted: missing.is_empty(),
            missing,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CapabilityError {
    /// The platform permission subsystem cannot be reached.
    #[error("capability source unavailable: {0}")]
    Unavailable(String),

    /// The platform answered with an error for this capability.
    #[error("capability query for '{name}' failed: {reason}")]
    Query { name: String, reason: String },

    #[error("capability '{0}' is declared more than once")]
    DuplicateDeclaration(String),

    #[error("capability name cannot be empty")]
    EmptyName,
}

// ─────────────────────────────────────────────────────────────────────────────
// CapabilitySource trait
// ─────────────────────────────────────────────────────────────────────────────

/// Host platform's permission subsystem.
///
/// Implementations answer whether `name` is granted *right now*. Any `Err`
/// is treated by the registry as "not granted".
#[async_trait]
pub trait CapabilitySource: Send + Sync {
    async fn query_grant(&self, name: &str) -> Result<bool, CapabilityError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elevated_severities() {
        assert!(!CapabilitySeverity::Low.is_elevated());
        assert!(!CapabilitySeverity::Medium.is_elevated());
        assert!(CapabilitySeverity::High.is_elevated());
        assert!(CapabilitySeverity::Critical.is_elevated());
    }

    #[test]
    fn declarations_reject_duplicates_and_blanks() {
        let ok = vec![
            Capability::new("fs:read", "read files", CapabilitySeverity::Low),
            Capability::new("fs:write", "write files", CapabilitySeverity::High),
        ];
        assert!(validate_declarations(&ok).is_ok());

        let dup = vec![ok[0].clone(), ok[0].clone()];
        assert_eq!(
            validate_declarations(&dup),
            Err(CapabilityError::DuplicateDeclaration("fs:read".into()))
        );

        let blank = vec![Capability::new("  ", "", CapabilitySeverity::Low)];
        assert_eq!(validate_declarations(&blank), Err(CapabilityError::EmptyName));
    }

    #[test]
    fn check_from_missing() {
        assert!(CapabilityCheck::from_missing(vec![]).granted);
        let denied = CapabilityCheck::from_missing(vec!["net:fetch".into()]);
        assert!(!denied.granted);
        assert_eq!(denied.missing, vec!["net:fetch".to_string()]);
    }

    #[test]
    fn capability_deserializes_with_defaults() {
        let cap: Capability = serde_json::from_str(r#"{"name":"dialog:open"}"#).unwrap();
        assert_eq!(cap.severity, CapabilitySeverity::Medium);
        assert!(cap.description.is_empty());
    }
}
