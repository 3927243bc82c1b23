// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Integration Configuration Types
//
// Defines the configuration manifest for the AAP catalog integration:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - AAP connection (base URL, token, TLS verification, job polling)
// - Catalog entity providers and their schedules
// - Scaffolder workspace defaults
// - Observability settings

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_API_VERSION: &str = "rhaap.ansible.com/v1";
pub const CONFIG_KIND: &str = "RhaapConfig";

/// Top-level configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RhaapConfig {
    /// API version (must be "rhaap.ansible.com/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "RhaapConfig")
    pub kind: String,

    pub metadata: ConfigMetadata,

    pub spec: RhaapConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RhaapConfigSpec {
    #[serde(default)]
    pub aap: AapConnectionConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub scaffolder: ScaffolderConfig,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observability: Option<ObservabilityConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AapConnectionConfig {
    /// Platform gateway URL, e.g. "https://aap.example.com"
    #[serde(default)]
    pub base_url: String,

    /// API token (supports "env:VAR_NAME" for environment variables)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Verify TLS certificates
    #[serde(default = "default_true")]
    pub check_ssl: bool,

    #[serde(default)]
    pub poll: PollSettings,
}

impl Default for AapConnectionConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            token: None,
            check_ssl: true,
            poll: PollSettings::default(),
        }
    }
}

impl AapConnectionConfig {
    /// Resolve the token, dereferencing "env:VAR_NAME".
    pub fn resolve_token(&self) -> anyhow::Result<String> {
        let raw = self
            .token
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("spec.aap.token is not configured"))?;

        match raw.strip_prefix("env:") {
            Some(var) => std::env::var(var)
                .map_err(|_| anyhow::anyhow!("Environment variable '{}' referenced by spec.aap.token is not set", var)),
            None => Ok(raw.to_string()),
        }
    }
}

/// Status polling used while waiting on project syncs and jobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollSettings {
    #[serde(default = "default_poll_interval")]
    pub interval_ms: u64,

    /// Give up after this many status checks
    #[serde(default = "default_poll_attempts")]
    pub max_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval(),
            max_attempts: default_poll_attempts(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,

    /// Directory the file-backed catalog writes snapshots to
    #[serde(default = "default_catalog_dir")]
    pub output_dir: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            providers: Vec::new(),
            output_dir: default_catalog_dir(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    /// Organizations, teams and users
    Organizations,
    JobTemplates,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Unique provider name, also used as the catalog location key
    pub name: String,

    pub kind: ProviderKind,

    /// Organization names to sync (empty = all)
    #[serde(default)]
    pub orgs: Vec<String>,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Turn job template surveys into template parameters
    #[serde(default = "default_true")]
    pub surveys_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_frequency")]
    pub frequency_seconds: u64,

    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            frequency_seconds: default_frequency(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl ScheduleConfig {
    pub fn frequency(&self) -> Duration {
        Duration::from_secs(self.frequency_seconds)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaffolderConfig {
    #[serde(default = "default_workspace_dir")]
    pub workspace_dir: PathBuf,

    #[serde(default)]
    pub publish_to_scm: bool,
}

impl Default for ScaffolderConfig {
    fn default() -> Self {
        Self {
            workspace_dir: default_workspace_dir(),
            publish_to_scm: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("json" or "text")
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_poll_interval() -> u64 {
    5000
}

fn default_poll_attempts() -> u32 {
    120
}

fn default_frequency() -> u64 {
    3600
}

fn default_timeout() -> u64 {
    900
}

fn default_catalog_dir() -> PathBuf {
    PathBuf::from("./catalog")
}

fn default_workspace_dir() -> PathBuf {
    PathBuf::from("./workspace")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for RhaapConfig {
    fn default() -> Self {
        Self {
            api_version: CONFIG_API_VERSION.to_string(),
            kind: CONFIG_KIND.to_string(),
            metadata: ConfigMetadata {
                name: "rhaap".to_string(),
                version: Some("1.0.0".to_string()),
            },
            spec: RhaapConfigSpec::default(),
        }
    }
}

impl RhaapConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. RHAAP_CONFIG_PATH environment variable
    /// 2. ./rhaap-config.yaml (working directory)
    /// 3. ~/.rhaap/config.yaml (user home)
    /// 4. /etc/rhaap/config.yaml (system, Unix) or C:\ProgramData\Rhaap\config.yaml (Windows)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("RHAAP_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./rhaap-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".rhaap").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/rhaap/config.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\Rhaap\\config.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using empty defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("RHAAP_BASE_URL") {
            tracing::info!("Environment override: RHAAP_BASE_URL={}", val);
            self.spec.aap.base_url = val;
        }

        if let Ok(val) = std::env::var("RHAAP_TOKEN") {
            tracing::info!("Environment override: RHAAP_TOKEN=<redacted>");
            self.spec.aap.token = Some(val);
        }

        if let Ok(val) = std::env::var("RHAAP_CHECK_SSL") {
            match val.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => {
                    tracing::info!("Environment override: RHAAP_CHECK_SSL=true");
                    self.spec.aap.check_ssl = true;
                }
                "false" | "0" | "no" | "off" => {
                    tracing::info!("Environment override: RHAAP_CHECK_SSL=false");
                    self.spec.aap.check_ssl = false;
                }
                _ => {
                    tracing::warn!(
                        "Invalid value for RHAAP_CHECK_SSL: '{}'. Expected true/false. Ignoring.",
                        val
                    );
                }
            }
        }
    }

    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.spec.catalog.providers.iter().find(|p| p.name == name)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != CONFIG_API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                CONFIG_API_VERSION
            );
        }

        if self.kind != CONFIG_KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, CONFIG_KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        let base_url = &self.spec.aap.base_url;
        if !base_url.is_empty() {
            let parsed = url::Url::parse(base_url)
                .map_err(|e| anyhow::anyhow!("spec.aap.base_url '{}' is not a valid URL: {}", base_url, e))?;
            if parsed.scheme() != "https" && parsed.scheme() != "http" {
                anyhow::bail!("spec.aap.base_url must use http or https, got '{}'", parsed.scheme());
            }
        } else if !self.spec.catalog.providers.is_empty() {
            anyhow::bail!("spec.aap.base_url is required when catalog providers are configured");
        }

        if self.spec.aap.poll.max_attempts == 0 {
            anyhow::bail!("spec.aap.poll.max_attempts must be greater than zero");
        }

        let mut names = HashSet::new();
        for provider in &self.spec.catalog.providers {
            if provider.name.is_empty() {
                anyhow::bail!("Catalog provider name cannot be empty");
            }
            if !names.insert(provider.name.as_str()) {
                anyhow::bail!("Duplicate catalog provider name: {}", provider.name);
            }
            if provider.schedule.frequency_seconds == 0 {
                anyhow::bail!("Provider '{}' schedule.frequency_seconds must be greater than zero", provider.name);
            }
            if provider.schedule.timeout_seconds == 0 {
                anyhow::bail!("Provider '{}' schedule.timeout_seconds must be greater than zero", provider.name);
            }
        }

        Ok(())
    }
}
