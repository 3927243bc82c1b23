// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use rhaap_core::domain::config::{ProviderKind, RhaapConfig};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./rhaap-config.yaml)
        #[arg(short, long, default_value = "./rhaap-config.yaml")]
        output: PathBuf,

        /// Include examples and comments
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, examples } => generate(output, examples).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = RhaapConfig::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. RHAAP_CONFIG_PATH: {}",
            std::env::var("RHAAP_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./rhaap-config.yaml");
        println!("  4. ~/.rhaap/config.yaml");
        println!("  5. /etc/rhaap/config.yaml");
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "AAP Connection:".bold());
    let base_url = if config.spec.aap.base_url.is_empty() {
        "(not set)".dimmed().to_string()
    } else {
        config.spec.aap.base_url.clone()
    };
    println!("  Base URL: {}", base_url);
    println!(
        "  Token: {}",
        if config.spec.aap.token.is_some() { "configured" } else { "(not set)" }
    );
    println!("  Verify TLS: {}", config.spec.aap.check_ssl);
    println!(
        "  Polling: every {}ms, up to {} checks",
        config.spec.aap.poll.interval_ms, config.spec.aap.poll.max_attempts
    );
    println!();

    println!("{}", "Catalog Providers:".bold());
    if config.spec.catalog.providers.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for provider in &config.spec.catalog.providers {
        let kind = match provider.kind {
            ProviderKind::Organizations => "organizations",
            ProviderKind::JobTemplates => "job-templates",
        };
        println!("  {} ({})", provider.name.bold(), kind);
        if provider.orgs.is_empty() {
            println!("    Organizations: all");
        } else {
            println!("    Organizations: {}", provider.orgs.join(", "));
        }
        println!(
            "    Schedule: every {}s, timeout {}s",
            provider.schedule.frequency_seconds, provider.schedule.timeout_seconds
        );
    }
    println!("  Output directory: {}", config.spec.catalog.output_dir.display());
    println!();

    println!("{}", "Scaffolder:".bold());
    println!("  Workspace: {}", config.spec.scaffolder.workspace_dir.display());
    println!("  Publish to SCM: {}", config.spec.scaffolder.publish_to_scm);
    println!();

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = RhaapConfig::load_or_default(config_path).context("Failed to load configuration")?;

    config.validate().context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf, with_examples: bool) -> Result<()> {
    let sample = if with_examples {
        include_str!("../../templates/config-with-examples.yaml")
    } else {
        include_str!("../../templates/config-minimal.yaml")
    };

    std::fs::write(&output, sample).with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_configs_are_valid() {
        for sample in [
            include_str!("../../templates/config-minimal.yaml"),
            include_str!("../../templates/config-with-examples.yaml"),
        ] {
            let config = RhaapConfig::from_yaml_str(sample).unwrap();
            config.validate().unwrap();
        }
    }

    #[tokio::test]
    async fn test_generate_writes_sample() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("rhaap-config.yaml");
        generate(output.clone(), true).await.unwrap();

        let config = RhaapConfig::from_yaml_file(&output).unwrap();
        assert_eq!(config.spec.catalog.providers.len(), 2);
    }
}
