// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use serde_json::Value;
use std::path::PathBuf;

use rhaap_core::domain::aap::{LaunchJobPayload, ResourceRef};

#[derive(Subcommand)]
pub enum JobCommand {
    /// Launch a job template and wait for the job to finish
    Launch {
        /// Job template ID
        #[arg(short, long, value_name = "ID")]
        template: u64,

        /// Inventory ID (when the template prompts for it)
        #[arg(long, value_name = "ID")]
        inventory: Option<u64>,

        /// Host limit pattern
        #[arg(long)]
        limit: Option<String>,

        /// Extra variables as YAML/JSON, or @FILE
        #[arg(short = 'e', long, value_name = "VARS")]
        extra_vars: Option<String>,

        /// Ansible verbosity (0-4)
        #[arg(short, long)]
        verbosity: Option<u8>,

        /// Print every job event's stdout
        #[arg(long)]
        events: bool,
    },

    /// Show a job's current status
    Status {
        /// Job ID
        #[arg(value_name = "JOB_ID")]
        job_id: u64,
    },
}

pub async fn handle_command(command: JobCommand, config_path: Option<PathBuf>) -> Result<()> {
    let config = super::load_config(config_path)?;
    let (client, token) = super::connect(&config)?;

    match command {
        JobCommand::Launch {
            template,
            inventory,
            limit,
            extra_vars,
            verbosity,
            events,
        } => {
            let payload = LaunchJobPayload {
                template: ResourceRef {
                    id: template,
                    name: String::new(),
                },
                inventory: inventory.map(|id| ResourceRef { id, name: String::new() }),
                limit,
                extra_variables: extra_vars.as_deref().map(parse_extra_vars).transpose()?,
                verbosity,
                ..Default::default()
            };

            println!("Launching job template {}...", template);
            let job = client.launch_job_template(&payload, &token).await?;

            if events {
                for event in job.events.iter().filter(|e| !e.stdout.is_empty()) {
                    println!("{}", event.stdout);
                }
            }

            println!(
                "{}",
                format!("✓ Job {} finished: {}", job.id, job.status).green()
            );
            println!("  Events: {}", job.events.len());
            println!("  Output: {}", job.url);
            Ok(())
        }
        JobCommand::Status { job_id } => {
            let job = client.get_job(job_id, &token).await?;
            let status = if job.failed {
                job.status.red()
            } else {
                job.status.normal()
            };
            println!("{:<10} {:<30} {:<12} {}", "ID", "NAME", "STATUS", "ELAPSED");
            println!("{:<10} {:<30} {:<12} {:.1}s", job.id, job.name, status, job.elapsed);
            Ok(())
        }
    }
}

/// Inline YAML/JSON, or the contents of a file when prefixed with `@`.
fn parse_extra_vars(raw: &str) -> Result<Value> {
    let content = match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read extra vars file {}", path))?,
        None => raw.to_string(),
    };
    let vars: Value = serde_yaml::from_str(&content).context("Extra vars must be YAML or JSON")?;
    if !vars.is_object() {
        anyhow::bail!("Extra vars must be a mapping");
    }
    Ok(vars)
}
