//! Demo privileged host used by `warden probe`.
//!
//! Each command comes with the call spec the unprivileged side uses for it:
//!
//! | Command | Params | Capability |
//! |---------|--------|------------|
//! | `greet` | `{ name }` | none |
//! | `file_info` | `{ path }` | `fs:read` |
//! | `list_directory` | `{ path, files_only? }` | `fs:read` |
//! | `handle_sensitive_data` | `{ sensitive_input }` | none |
//! | `validate_and_process_path` | `{ path }` | none |
//!
//! File paths are relative to the host root and never leave it. Sensitive
//! input is held in a [`SecretString`] on the host side and only its length
//! is reported back.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};
use warden_kernel::capability::{Capability, CapabilitySeverity};
use warden_kernel::gateway::{GatewayCallSpec, InvokeError};
use warden_kernel::secret::SecretString;
use warden_kernel::validation::{
    all_of, clean_strings, has_required_properties, is_array_of, is_clean_string,
    is_safe_relative_path, matches_type, safe_path_property, validator,
};
use warden_runtime::bridge::{CommandRouter, handler_fn};
use warden_runtime::sanitize::DefaultSanitizer;

pub const COMMANDS: &[&str] = &[
    "greet",
    "file_info",
    "list_directory",
    "handle_sensitive_data",
    "validate_and_process_path",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    pub path: String,
    pub is_directory: bool,
    pub size: u64,
    pub last_modified: u64,
    pub file_type: String,
}

/// Capabilities the demo commands rely on.
pub fn declarations() -> Vec<Capability> {
    vec![
        Capability::new("fs:read", "Read file metadata under the host root", CapabilitySeverity::Low),
        Capability::new("fs:write", "Write files under the host root", CapabilitySeverity::High),
    ]
}

/// Call spec for one demo command. `None` for unknown commands.
pub fn spec(command: &str) -> Option<GatewayCallSpec<Value, Value>> {
    let spec = match command {
        "greet" => GatewayCallSpec::new("greet")
            .with_param_validator(all_of(vec![
                validator(|v| has_required_properties(v, &["name"])),
                validator(|v| v["name"].as_str().is_some_and(|s| !s.trim().is_empty())),
            ]))
            .with_sanitizer(Arc::new(DefaultSanitizer))
            .with_result_validator(validator(|v| v.as_str().is_some_and(is_clean_string))),
        "file_info" => GatewayCallSpec::new("file_info")
            .with_param_validator(all_of(vec![safe_path_property("path"), clean_strings()]))
            .with_result_validator(matches_type::<FileInfo>())
            .require("fs:read"),
        "list_directory" => GatewayCallSpec::new("list_directory")
            .with_param_validator(all_of(vec![
                safe_path_property("path"),
                validator(|v| v.get("files_only").is_none_or(Value::is_boolean)),
            ]))
            .with_result_validator(is_array_of(matches_type::<FileInfo>()))
            .require("fs:read"),
        // No sanitizer: the secret must reach the host byte for byte.
        "handle_sensitive_data" => GatewayCallSpec::new("handle_sensitive_data")
            .with_param_validator(validator(|v| v["sensitive_input"].is_string()))
            .with_result_validator(validator(|v| v.as_str().is_some_and(is_clean_string))),
        "validate_and_process_path" => GatewayCallSpec::new("validate_and_process_path")
            .with_param_validator(safe_path_property("path"))
            .with_result_validator(validator(|v| v.as_str().is_some_and(is_clean_string))),
        _ => return None,
    };
    Some(spec)
}

/// Router with every demo command registered, confined to `root`.
pub fn router(root: PathBuf) -> CommandRouter {
    let root = Arc::new(root);
    let mut router = CommandRouter::new();

    // Registration into an empty router cannot collide.
    let _ = router.register(
        "greet",
        handler_fn(|params: Value| async move {
            let name = params["name"].as_str().unwrap_or_default();
            if name.is_empty() {
                return Err(InvokeError::Backend("name cannot be empty".into()));
            }
            Ok(json!(format!("Hello, {name}! Welcome to Warden.")))
        }),
    );

    let file_root = Arc::clone(&root);
    let _ = router.register(
        "file_info",
        handler_fn(move |params: Value| {
            let root = Arc::clone(&file_root);
            async move {
                let rel = params["path"].as_str().unwrap_or_default();
                file_info(&root, rel).and_then(to_value)
            }
        }),
    );

    let list_root = Arc::clone(&root);
    let _ = router.register(
        "list_directory",
        handler_fn(move |params: Value| {
            let root = Arc::clone(&list_root);
            async move {
                let rel = params["path"].as_str().unwrap_or_default();
                let files_only = params["files_only"].as_bool().unwrap_or(false);
                list_directory(&root, rel, files_only).and_then(to_value)
            }
        }),
    );

    let _ = router.register(
        "handle_sensitive_data",
        handler_fn(|params: Value| async move {
            let secret = match params {
                Value::Object(mut map) => match map.remove("sensitive_input") {
                    Some(Value::String(input)) => SecretString::new(input),
                    _ => return Err(InvokeError::Backend("sensitive_input must be a string".into())),
                },
                _ => return Err(InvokeError::Backend("expected an object".into())),
            };
            process_sensitive(secret).map(Value::from)
        }),
    );

    let _ = router.register(
        "validate_and_process_path",
        handler_fn(|params: Value| async move {
            let path = params["path"].as_str().unwrap_or_default();
            process_path(path).map(Value::from)
        }),
    );

    router
}

/// Check and consume a secret. The buffer is wiped when `secret` drops.
pub fn process_sensitive(secret: SecretString) -> Result<String, InvokeError> {
    if !is_clean_string(secret.expose()) {
        return Err(InvokeError::Backend("invalid input detected".into()));
    }
    Ok(format!("Processed sensitive data of length: {}", secret.len()))
}

pub fn process_path(path: &str) -> Result<String, InvokeError> {
    if !is_safe_relative_path(path) {
        return Err(InvokeError::Backend("invalid path detected".into()));
    }
    Ok(format!("Processed path: {path}"))
}

fn to_value<T: Serialize>(value: T) -> Result<Value, InvokeError> {
    serde_json::to_value(value).map_err(|e| InvokeError::Backend(e.to_string()))
}

fn resolve(root: &Path, rel: &str) -> Result<PathBuf, InvokeError> {
    let path = root.join(rel);
    let canonical_root = root
        .canonicalize()
        .map_err(|e| InvokeError::Backend(format!("host root unavailable: {e}")))?;
    let canonical = path
        .canonicalize()
        .map_err(|_| InvokeError::Backend("path does not exist".into()))?;
    if !canonical.starts_with(&canonical_root) {
        return Err(InvokeError::Backend("path is outside the host root".into()));
    }
    Ok(canonical)
}

fn describe(path: &Path, display: String) -> Result<FileInfo, InvokeError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| InvokeError::Backend(format!("cannot read metadata: {}", e.kind())))?;
    let last_modified = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d: Duration| d.as_secs());

    Ok(FileInfo {
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        path: display,
        is_directory: metadata.is_dir(),
        size: metadata.len(),
        last_modified,
        file_type: path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default(),
    })
}

pub fn file_info(root: &Path, rel: &str) -> Result<FileInfo, InvokeError> {
    let path = resolve(root, rel)?;
    describe(&path, rel.to_string())
}

pub fn list_directory(root: &Path, rel: &str, files_only: bool) -> Result<Vec<FileInfo>, InvokeError> {
    let dir = resolve(root, rel)?;
    if !dir.is_dir() {
        return Err(InvokeError::Backend("path is not a directory".into()));
    }

    let entries = std::fs::read_dir(&dir)
        .map_err(|e| InvokeError::Backend(format!("cannot read directory: {}", e.kind())))?;
    let mut files = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        let display = Path::new(rel).join(&name).to_string_lossy().into_owned();
        let Ok(info) = describe(&entry.path(), display) else {
            continue;
        };
        if files_only && info.is_directory {
            continue;
        }
        files.push(info);
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}
