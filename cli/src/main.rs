// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # rhaap
//!
//! Command line front end for the Ansible Automation Platform catalog
//! integration.
//!
//! ## Commands
//!
//! - `rhaap config show|validate|generate` - Configuration management
//! - `rhaap sync [--provider NAME] [--once]` - Run the catalog entity providers
//! - `rhaap ee create --input FILE` - Scaffold an execution-environment definition
//! - `rhaap job launch|status` - Launch a job template and follow the job

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use rhaap_core::domain::config::RhaapConfig;
use std::path::PathBuf;
use tracing::debug;

mod commands;

use commands::{ConfigCommand, EeCommand, JobCommand, SyncArgs};

/// Ansible Automation Platform catalog and scaffolder tooling
#[derive(Parser)]
#[command(name = "rhaap")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "RHAAP_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error) [default: info]
    #[arg(long, global = true, env = "RHAAP_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log output format (text, json) [default: text]
    #[arg(long, global = true, env = "RHAAP_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Sync AAP organizations and job templates into the catalog
    #[command(name = "sync")]
    Sync {
        #[command(flatten)]
        args: SyncArgs,
    },

    /// Execution-environment scaffolding
    #[command(name = "ee")]
    Ee {
        #[command(subcommand)]
        command: EeCommand,
    },

    /// Job template launches
    #[command(name = "job")]
    Job {
        #[command(subcommand)]
        command: JobCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    let dotenv = dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Flags win over spec.observability.logging
    let configured = RhaapConfig::load_or_default(cli.config.clone())
        .ok()
        .and_then(|c| c.spec.observability)
        .and_then(|o| o.logging);
    let level = cli
        .log_level
        .clone()
        .or_else(|| configured.as_ref().map(|l| l.level.clone()))
        .unwrap_or_else(|| "info".to_string());
    let format = cli
        .log_format
        .clone()
        .or_else(|| configured.map(|l| l.format))
        .unwrap_or_else(|| "text".to_string());

    init_logging(&level, &format)?;
    if let Some(path) = dotenv {
        debug!(path = ?path, "Loaded environment file");
    }

    match cli.command {
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.config).await
        }
        Some(Commands::Sync { args }) => commands::sync::execute(args, cli.config).await,
        Some(Commands::Ee { command }) => commands::ee::handle_command(command, cli.config).await,
        Some(Commands::Job { command }) => commands::job::handle_command(command, cli.config).await,
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str, format: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match format {
        "json" => builder.json().init(),
        "text" => builder.compact().init(),
        other => anyhow::bail!("Unknown log format '{}'. Expected 'text' or 'json'", other),
    }

    Ok(())
}
