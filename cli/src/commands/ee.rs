// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Execution-environment commands
//!
//! Commands: create, schema

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rhaap_core::application::ee_definition_action::{EeDefinitionAction, EeDefinitionInput};
use rhaap_core::infrastructure::catalog_store::LocalCatalog;

#[derive(Subcommand)]
pub enum EeCommand {
    /// Generate an EE definition and its companion files
    Create {
        /// Action input as YAML or JSON (the scaffolder form values)
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Directory the EE folder is created in (default: spec.scaffolder.workspace_dir)
        #[arg(short, long, value_name = "DIR")]
        workspace: Option<PathBuf>,

        /// Write catalog-info.yaml for SCM publishing instead of registering
        #[arg(long)]
        publish: bool,
    },

    /// Print the action's input or output JSON schema
    Schema {
        /// Print the output schema instead of the input schema
        #[arg(long)]
        output: bool,
    },
}

pub async fn handle_command(command: EeCommand, config_path: Option<PathBuf>) -> Result<()> {
    match command {
        EeCommand::Create {
            input,
            workspace,
            publish,
        } => create(&input, workspace, publish, config_path).await,
        EeCommand::Schema { output } => {
            let schema = if output {
                EeDefinitionAction::output_schema()
            } else {
                EeDefinitionAction::input_schema()
            };
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(())
        }
    }
}

async fn create(
    input_path: &Path,
    workspace: Option<PathBuf>,
    publish: bool,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = super::load_config(config_path)?;
    let mut input = read_input(input_path)?;
    input.publish_to_scm |= publish || config.spec.scaffolder.publish_to_scm;

    let workspace = workspace.unwrap_or_else(|| config.spec.scaffolder.workspace_dir.clone());
    let catalog = LocalCatalog::file_backed(&config.spec.catalog.output_dir).await?;
    let action = EeDefinitionAction::new(&workspace, Arc::new(catalog))?;

    let output = action.execute(input).await?;

    println!(
        "{}",
        format!(
            "✓ EE definition generated: {}",
            workspace.join(&output.context_dir_name).display()
        )
        .green()
    );
    println!("  Owner: {}", output.owner);
    match &output.generated_entity_ref {
        Some(entity_ref) => println!("  Registered: {}", entity_ref),
        None => println!("  catalog-info.yaml written for SCM publishing"),
    }

    Ok(())
}

/// YAML is a superset of JSON, so one parser covers both input formats.
fn read_input(path: &Path) -> Result<EeDefinitionInput> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read action input {:?}", path))?;
    serde_yaml::from_str(&content).with_context(|| format!("Failed to parse action input {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_input_accepts_yaml_and_json() {
        let dir = tempfile::tempdir().unwrap();

        let yaml = dir.path().join("input.yaml");
        std::fs::write(&yaml, "eeFileName: my-ee\nbaseImage: quay.io/ee:1\npublishToSCM: true\n").unwrap();
        let input = read_input(&yaml).unwrap();
        assert_eq!(input.ee_file_name, "my-ee");
        assert!(input.publish_to_scm);

        let json = dir.path().join("input.json");
        std::fs::write(&json, r#"{"eeFileName": "json-ee", "popularCollections": ["ansible.posix"]}"#).unwrap();
        let input = read_input(&json).unwrap();
        assert_eq!(input.ee_file_name, "json-ee");
        assert_eq!(input.popular_collections, vec!["ansible.posix"]);
    }
}
