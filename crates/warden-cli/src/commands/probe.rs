//! `warden probe` command implementation

use crate::cli::OutputFormat;
use crate::host;
use anyhow::{Context, anyhow, bail};
use async_trait::async_trait;
use colored::Colorize;
use serde_json::Value;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use warden_kernel::audit::{AuditEvent, AuditLevel};
use warden_kernel::capability::{CapabilityError, CapabilitySource};
use warden_runtime::WardenRuntime;
use warden_runtime::config::WardenConfig;

/// Arguments for one probe run.
#[derive(Debug, Clone)]
pub struct ProbeArgs {
    pub command: String,
    pub params: String,
    pub grants: Vec<String>,
    pub root: PathBuf,
    pub timeout_ms: Option<u64>,
    pub log_values: bool,
    pub output: OutputFormat,
}

/// Grants fixed on the command line.
#[derive(Debug, Default)]
struct GrantedSet(HashSet<String>);

#[async_trait]
impl CapabilitySource for GrantedSet {
    async fn query_grant(&self, name: &str) -> Result<bool, CapabilityError> {
        Ok(self.0.contains(name))
    }
}

/// Execute the `warden probe` command
pub async fn run(config: &WardenConfig, args: ProbeArgs) -> anyhow::Result<()> {
    let params: Value = serde_json::from_str(&args.params).context("--params is not valid JSON")?;
    let Some(mut spec) = host::spec(&args.command) else {
        bail!(
            "unknown command '{}' (available: {})",
            args.command,
            host::COMMANDS.join(", ")
        );
    };
    if let Some(ms) = args.timeout_ms {
        spec = spec.with_timeout(Duration::from_millis(ms));
    }
    spec = spec.log_params(args.log_values).log_result(args.log_values);

    let mut config = config.clone();
    if config.capabilities.is_empty() {
        config.capabilities = host::declarations();
    }

    let source = Arc::new(GrantedSet(args.grants.iter().cloned().collect()));
    let (invoker, server) = Arc::new(host::router(args.root.clone())).spawn(64);
    let runtime = WardenRuntime::from_config(&config, source, Arc::new(invoker))
        .map_err(|report| anyhow!("{report:?}"))?;

    let call = runtime
        .gateway()
        .build(spec)
        .map_err(|e| anyhow!("{e}"))?;
    let outcome = call.call(params).await;
    server.abort();

    let trail = runtime.audit().snapshot();
    match args.output {
        OutputFormat::Json => {
            let export = runtime
                .audit()
                .export_all()
                .map_err(|e| anyhow!("cannot export audit trail: {e}"))?;
            let result = outcome.as_ref().ok().cloned().unwrap_or(Value::Null);
            let document = serde_json::json!({
                "command": args.command,
                "ok": outcome.is_ok(),
                "result": result,
                "audit": serde_json::from_str::<Value>(&export)?,
            });
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
        OutputFormat::Text => {
            match &outcome {
                Ok(result) => {
                    println!("{} {}", "✓".green(), args.command.bold());
                    println!("{}", serde_json::to_string_pretty(result)?);
                }
                Err(e) => {
                    println!("{} {}: {}", "✗".red(), args.command.bold(), e.user_message());
                }
            }
            println!();
            println!("{}", "Audit trail".bold());
            for event in &trail {
                println!("  {}", format_event(event));
            }
        }
    }

    outcome.map(|_| ()).map_err(|e| anyhow!("{e}"))
}

fn format_event(event: &AuditEvent) -> String {
    let level = match event.level {
        AuditLevel::Info => event.level.to_string().green(),
        AuditLevel::Warn => event.level.to_string().yellow(),
        AuditLevel::Error | AuditLevel::Critical => event.level.to_string().red(),
    };
    let mut line = format!(
        "{} {:<8} [{}] {}",
        event.timestamp.format("%H:%M:%S%.3f"),
        level,
        event.category,
        event.message
    );
    if let Some(context) = &event.context {
        line.push(' ');
        line.push_str(&Value::Object(context.clone()).to_string().dimmed().to_string());
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_kernel::audit::AuditCategory;
    use warden_runtime::AuditLog;

    fn args(command: &str, params: &str) -> ProbeArgs {
        ProbeArgs {
            command: command.to_string(),
            params: params.to_string(),
            grants: Vec::new(),
            root: PathBuf::from("."),
            timeout_ms: None,
            log_values: false,
            output: OutputFormat::Text,
        }
    }

    #[tokio::test]
    async fn greet_succeeds_without_grants() {
        let config = WardenConfig::default();
        assert!(run(&config, args("greet", r#"{"name":"Ada"}"#)).await.is_ok());
    }

    #[tokio::test]
    async fn file_info_needs_a_grant() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "x").unwrap();
        let config = WardenConfig::default();

        let mut denied = args("file_info", r#"{"path":"a.txt"}"#);
        denied.root = dir.path().to_path_buf();
        let err = run(&config, denied.clone()).await.unwrap_err();
        assert!(err.to_string().contains("fs:read"));

        let mut granted = denied;
        granted.grants = vec!["fs:read".to_string()];
        granted.output = OutputFormat::Json;
        assert!(run(&config, granted).await.is_ok());
    }

    #[tokio::test]
    async fn rejects_unknown_commands_and_bad_json() {
        let config = WardenConfig::default();
        let err = run(&config, args("rm_rf", "{}")).await.unwrap_err();
        assert!(err.to_string().contains("greet"));
        assert!(run(&config, args("greet", "{not json")).await.is_err());
    }

    #[test]
    fn event_lines_carry_level_and_category() {
        colored::control::set_override(false);
        let log = AuditLog::new(4);
        let mut context = serde_json::Map::new();
        context.insert("shape".into(), Value::from("object"));
        let event = log.record(
            AuditLevel::Warn,
            AuditCategory::Validation,
            "bad input",
            "test",
            Some(context),
        );
        let line = format_event(&event);
        assert!(line.contains("warn"));
        assert!(line.contains("[validation] bad input"));
        assert!(line.contains(r#"{"shape":"object"}"#));
    }
}
