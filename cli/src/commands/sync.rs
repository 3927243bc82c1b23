// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Catalog sync command
//!
//! Builds one entity provider per `spec.catalog.providers` entry and connects
//! each to the file-backed catalog, which registers it with the scheduler.
//! Providers then either run once or stay on their schedules until Ctrl+C.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

use rhaap_core::application::entity_provider::{AapEntityProvider, AapJobTemplateProvider, EntityProvider};
use rhaap_core::application::scheduler::TaskScheduler;
use rhaap_core::domain::config::{ProviderConfig, ProviderKind, RhaapConfig};
use rhaap_core::domain::platform::AapResourceSource;
use rhaap_core::infrastructure::catalog_store::LocalCatalog;

#[derive(Args)]
pub struct SyncArgs {
    /// Only run the named provider (repeatable)
    #[arg(short, long = "provider", value_name = "NAME")]
    providers: Vec<String>,

    /// Run each provider once and exit
    #[arg(long)]
    once: bool,

    /// Catalog snapshot directory (default: spec.catalog.output_dir)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,
}

pub async fn execute(args: SyncArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = super::load_config(config_path)?;
    let selected = select_providers(&config, &args.providers)?;
    if selected.is_empty() {
        println!("{}", "No catalog providers configured".yellow());
        return Ok(());
    }

    let (client, token) = super::connect(&config)?;
    let source: Arc<dyn AapResourceSource> = Arc::new(client.with_token(token));

    let output_dir = args.output.unwrap_or_else(|| config.spec.catalog.output_dir.clone());
    let catalog = LocalCatalog::file_backed(&output_dir).await?;

    let scheduler = TaskScheduler::new();
    for provider_config in selected {
        let provider = build_provider(provider_config.clone(), source.clone(), &scheduler);
        provider
            .connect(Arc::new(catalog.connection(provider_config.name.clone())))
            .await;
    }

    if args.once {
        return run_once(&scheduler, &output_dir).await;
    }

    println!(
        "Running {} provider(s), writing to {}. Press Ctrl+C to stop.",
        scheduler.len().await,
        output_dir.display()
    );

    scheduler.start().await;

    signal::ctrl_c().await.context("Failed to listen for Ctrl+C")?;
    info!("Received Ctrl+C signal, stopping providers");
    scheduler.shutdown().await;

    println!("{}", "✓ Sync stopped".green());
    Ok(())
}

async fn run_once(scheduler: &TaskScheduler, output_dir: &std::path::Path) -> Result<()> {
    let mut failures = 0usize;

    for (name, outcome) in scheduler.run_all_once().await {
        match outcome {
            Ok(summary) => println!(
                "{} {} synced {} entities in {}ms ({})",
                "✓".green(),
                name.bold(),
                summary.entity_count,
                summary.duration.as_millis(),
                summary.completed_at.to_rfc3339()
            ),
            Err(e) => {
                failures += 1;
                println!("{} {} failed: {}", "✗".red(), name.bold(), e);
            }
        }
    }

    println!("Catalog snapshots written to {}", output_dir.display());

    if failures > 0 {
        anyhow::bail!("{} provider(s) failed", failures);
    }
    Ok(())
}

/// Providers to run, in configuration order. Unknown names are an error.
fn select_providers<'a>(config: &'a RhaapConfig, names: &[String]) -> Result<Vec<&'a ProviderConfig>> {
    if names.is_empty() {
        return Ok(config.spec.catalog.providers.iter().collect());
    }

    for name in names {
        if config.provider(name).is_none() {
            anyhow::bail!("Unknown catalog provider '{}'", name);
        }
    }

    Ok(config
        .spec
        .catalog
        .providers
        .iter()
        .filter(|p| names.contains(&p.name))
        .collect())
}

fn build_provider(
    config: ProviderConfig,
    source: Arc<dyn AapResourceSource>,
    scheduler: &TaskScheduler,
) -> Arc<dyn EntityProvider> {
    match config.kind {
        ProviderKind::Organizations => {
            Arc::new(AapEntityProvider::new(config, source).with_scheduler(scheduler.clone()))
        }
        ProviderKind::JobTemplates => {
            Arc::new(AapJobTemplateProvider::new(config, source).with_scheduler(scheduler.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
apiVersion: rhaap.ansible.com/v1
kind: RhaapConfig
metadata:
  name: test
spec:
  aap:
    base_url: https://aap.example.com
  catalog:
    providers:
      - name: aap-orgs
        kind: organizations
      - name: aap-templates
        kind: job-templates
"#;

    #[test]
    fn test_select_providers() {
        let config = RhaapConfig::from_yaml_str(CONFIG).unwrap();

        let all = select_providers(&config, &[]).unwrap();
        assert_eq!(all.len(), 2);

        let one = select_providers(&config, &["aap-templates".to_string()]).unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].kind, ProviderKind::JobTemplates);

        assert!(select_providers(&config, &["missing".to_string()]).is_err());
    }
}
