//! Warden CLI - lint capability manifests and probe the privileged call gateway

mod cli;
mod commands;
mod host;

use anyhow::anyhow;
use clap::Parser;
use cli::{Cli, Commands, ConfigCommands};
use commands::probe::ProbeArgs;
use warden_runtime::config::WardenConfig;
use warden_runtime::telemetry::init_tracing;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => WardenConfig::load(path).map_err(|report| anyhow!("{report:?}"))?,
        None => WardenConfig::default(),
    };

    if cli.verbose {
        config.logging.filter = "debug".to_string();
    }
    init_tracing(&config.logging);
    tracing::debug!(config = ?cli.config, "warden starting");

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_command(cli.command, config))
}

async fn run_command(command: Commands, config: WardenConfig) -> anyhow::Result<()> {
    match command {
        Commands::Check { dir } => commands::check::run(&dir),

        Commands::Probe {
            command,
            params,
            grants,
            root,
            timeout_ms,
            log_values,
            output,
        } => {
            let args = ProbeArgs {
                command,
                params,
                grants,
                root,
                timeout_ms,
                log_values,
                output,
            };
            commands::probe::run(&config, args).await
        }

        Commands::Config(ConfigCommands::Show { format }) => {
            commands::config_cmd::run_show(&config, format)
        }

        Commands::Config(ConfigCommands::Validate { path }) => {
            commands::config_cmd::run_validate(&path)
        }
    }
}
