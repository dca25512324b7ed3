//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Warden CLI - capability manifests and privileged call gateway
#[derive(Parser)]
#[command(name = "warden")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path (toml, yaml, json, ini, ron, json5)
    #[arg(short = 'c', long, global = true, env = "WARDEN_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Lint capability manifest files for over-broad grants
    Check {
        /// Directory containing *.json capability manifests
        #[arg(default_value = "capabilities")]
        dir: PathBuf,
    },

    /// Run one demo host command through the full gateway pipeline
    Probe {
        /// Command to invoke (greet, file_info, list_directory, handle_sensitive_data,
        /// validate_and_process_path)
        command: String,

        /// Parameters as a JSON document
        #[arg(short, long, default_value = "{}")]
        params: String,

        /// Capability to grant for this run (repeatable)
        #[arg(short, long = "grant")]
        grants: Vec<String>,

        /// Root directory the file commands are confined to
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Per-call timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Record raw params and results in the audit trail
        #[arg(long)]
        log_values: bool,

        /// Output format
        #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show {
        #[arg(short, long, value_enum, default_value_t = ConfigFormat::Toml)]
        format: ConfigFormat,
    },

    /// Load and validate a configuration file
    Validate {
        /// File to validate
        path: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_probe_with_grants() {
        let cli = Cli::try_parse_from([
            "warden",
            "probe",
            "file_info",
            "--params",
            r#"{"path":"a.txt"}"#,
            "--grant",
            "fs:read",
            "-g",
            "fs:write",
            "-o",
            "json",
        ])
        .unwrap();

        match cli.command {
            Commands::Probe {
                command,
                grants,
                output,
                ..
            } => {
                assert_eq!(command, "file_info");
                assert_eq!(grants, vec!["fs:read", "fs:write"]);
                assert_eq!(output, OutputFormat::Json);
            }
            _ => panic!("expected probe"),
        }
    }
}
