// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the rhaap CLI

pub mod config;
pub mod ee;
pub mod job;
pub mod sync;

pub use self::config::ConfigCommand;
pub use self::ee::EeCommand;
pub use self::job::JobCommand;
pub use self::sync::SyncArgs;

use anyhow::{Context, Result};
use rhaap_core::domain::config::RhaapConfig;
use rhaap_core::infrastructure::aap_client::AapClient;
use std::path::PathBuf;

/// Load and validate the configuration every command runs against.
pub fn load_config(config_path: Option<PathBuf>) -> Result<RhaapConfig> {
    let config = RhaapConfig::load_or_default(config_path).context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

/// AAP client plus the resolved API token from `spec.aap`.
pub fn connect(config: &RhaapConfig) -> Result<(AapClient, String)> {
    if config.spec.aap.base_url.is_empty() {
        anyhow::bail!("spec.aap.base_url is not configured (set it in the config file or RHAAP_BASE_URL)");
    }
    let token = config.spec.aap.resolve_token()?;
    let client = AapClient::from_config(&config.spec.aap).context("Failed to create AAP client")?;
    Ok((client, token))
}
