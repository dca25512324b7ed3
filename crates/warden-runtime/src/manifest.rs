//! Static lint for capability manifest files.
//!
//! A manifest grants a set of permissions to a set of windows. The checker
//! flags manifests that are incomplete or broader than they need to be.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Permissions that grant a whole subsystem at once.
pub const HIGH_RISK_PERMISSIONS: &[&str] = &["fs:default", "path:all", "shell:all", "window:all", "*"];

/// One capability manifest file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapabilityManifest {
    #[serde(default)]
    pub identifier: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub windows: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    #[serde(default)]
    pub remote: Option<RemoteAccess>,
}

/// A permission entry: a bare identifier or an identifier with scopes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Permission {
    Name(String),
    Scoped {
        identifier: String,
        #[serde(default)]
        allow: Vec<serde_json::Value>,
        #[serde(default)]
        deny: Vec<serde_json::Value>,
    },
}

impl Permission {
    pub fn identifier(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Scoped { identifier, .. } => identifier,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteAccess {
    #[serde(default)]
    pub urls: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Warning,
    Error,
}

impl fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestIssue {
    pub severity: IssueSeverity,
    /// File the issue was found in, when checked from disk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    pub message: String,
}

impl ManifestIssue {
    fn error(message: impl Into<String>) -> Self {
        Self {
            severity: IssueSeverity::Error,
            file: None,
            message: message.into(),
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: IssueSeverity::Warning,
            file: None,
            message: message.into(),
        }
    }

    fn in_file(mut self, file: &Path) -> Self {
        self.file = Some(file.to_path_buf());
        self
    }
}

impl fmt::Display for ManifestIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}: {} ({})", self.severity, self.message, file.display()),
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

/// Lint one manifest.
pub fn check_manifest(manifest: &CapabilityManifest) -> Vec<ManifestIssue> {
    let mut issues = Vec::new();

    if manifest.identifier.trim().is_empty() {
        issues.push(ManifestIssue::error("missing identifier"));
    }
    if manifest.description.trim().is_empty() {
        issues.push(ManifestIssue::error("missing description"));
    }

    if manifest.windows.is_empty() {
        issues.push(ManifestIssue::error("no windows specified"));
    } else if manifest.windows.iter().any(|w| w == "*") {
        issues.push(ManifestIssue::warning("wildcard window access"));
    }

    if manifest.permissions.is_empty() {
        issues.push(ManifestIssue::error("no permissions specified"));
    }
    for permission in &manifest.permissions {
        let id = permission.identifier();
        if HIGH_RISK_PERMISSIONS.contains(&id) {
            issues.push(ManifestIssue::warning(format!("high-risk permission '{id}'")));
        }
    }

    if let Some(remote) = &manifest.remote {
        for url in remote.urls.iter().filter(|u| u.starts_with('*')) {
            issues.push(ManifestIssue::warning(format!("wildcard URL access '{url}'")));
        }
    }

    issues
}

/// Lint one manifest file. An unreadable or malformed file is one error issue.
pub fn check_file(path: &Path) -> Vec<ManifestIssue> {
    let parsed = std::fs::read_to_string(path)
        .map_err(|e| format!("could not read manifest: {e}"))
        .and_then(|text| {
            serde_json::from_str::<CapabilityManifest>(&text)
                .map_err(|e| format!("invalid capability manifest: {e}"))
        });

    match parsed {
        Ok(manifest) => check_manifest(&manifest)
            .into_iter()
            .map(|issue| issue.in_file(path))
            .collect(),
        Err(reason) => vec![ManifestIssue::error(reason).in_file(path)],
    }
}

/// Result of linting a directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryReport {
    /// `*.json` files inspected, sorted.
    pub files: Vec<PathBuf>,
    pub issues: Vec<ManifestIssue>,
}

impl DirectoryReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn errors(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Error)
            .count()
    }
}

/// Lint every `*.json` file directly inside `dir`.
pub fn check_directory(dir: &Path) -> std::io::Result<DirectoryReport> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();

    let issues = files.iter().flat_map(|file| check_file(file)).collect();
    Ok(DirectoryReport { files, issues })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    fn manifest(value: serde_json::Value) -> CapabilityManifest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn least_privilege_manifest_is_clean() {
        let m = manifest(json!({
            "identifier": "main-capability",
            "description": "Capability for the main window",
            "windows": ["main"],
            "permissions": [
                "core:default",
                {"identifier": "fs:allow-read-text-file", "allow": [{"path": "$APPDATA/*"}]}
            ]
        }));
        assert!(check_manifest(&m).is_empty());
    }

    #[test]
    fn missing_fields_are_errors() {
        let issues = check_manifest(&CapabilityManifest::default());
        let messages: Vec<_> = issues.iter().map(|i| i.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "missing identifier",
                "missing description",
                "no windows specified",
                "no permissions specified"
            ]
        );
        assert!(issues.iter().all(|i| i.severity == IssueSeverity::Error));
    }

    #[test]
    fn broad_grants_are_warnings() {
        let m = manifest(json!({
            "identifier": "wide",
            "description": "too much",
            "windows": ["*"],
            "permissions": ["shell:all", "fs:default", "dialog:allow-open"],
            "remote": {"urls": ["*.example.com", "https://api.example.com"]}
        }));
        let issues = check_manifest(&m);
        assert_eq!(issues.len(), 4);
        assert!(issues.iter().all(|i| i.severity == IssueSeverity::Warning));
        assert!(issues.iter().any(|i| i.message.contains("shell:all")));
        assert!(issues.iter().any(|i| i.message.contains("*.example.com")));
    }

    #[test]
    fn directory_scan_reports_invalid_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("default.json"),
            json!({
                "identifier": "default",
                "description": "d",
                "windows": ["main"],
                "permissions": ["core:default"]
            })
            .to_string(),
        )
        .unwrap();
        fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let report = check_directory(dir.path()).unwrap();
        assert_eq!(report.files.len(), 2);
        assert_eq!(report.errors(), 1);
        let issue = &report.issues[0];
        assert!(issue.message.starts_with("invalid capability manifest"));
        assert_eq!(issue.file.as_deref(), Some(dir.path().join("broken.json").as_path()));
    }

    #[test]
    fn missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_directory(&dir.path().join("absent")).is_err());
    }
}
