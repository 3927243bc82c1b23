// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! AAP Resource Types
//!
//! Read models for the Ansible Automation Platform resources this crate
//! touches through the gateway (`api/gateway/v1`) and controller
//! (`api/controller/v2`) APIs, plus the request payloads used to create
//! projects, job templates and execution environments or launch jobs.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Typed views over AAP JSON documents
//!
//! The server owns every one of these records. Fields not needed by the
//! catalog mapping or scaffolder flows are left out; `summary_fields` is
//! kept loosely typed where AAP varies it per resource.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One page of an AAP list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

/// Reference to a related resource as embedded in `summary_fields`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub id: u64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub summary_fields: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub organization: Option<u64>,
    #[serde(default)]
    pub summary_fields: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub is_superuser: bool,
}

impl User {
    /// "First Last" when either part is set, otherwise the username.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub credential_type: u64,
    #[serde(default)]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceGroup {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub is_container_group: bool,
}

/// Summary of related objects embedded in a job template document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobTemplateSummary {
    #[serde(default)]
    pub organization: Option<ResourceRef>,
    #[serde(default)]
    pub inventory: Option<ResourceRef>,
    #[serde(default)]
    pub project: Option<ResourceRef>,
    #[serde(default)]
    pub execution_environment: Option<ResourceRef>,
    #[serde(default)]
    pub credentials: Vec<Credential>,
    #[serde(default)]
    pub labels: LabelList,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelList {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub results: Vec<ResourceRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobTemplate {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub playbook: String,
    #[serde(default)]
    pub job_type: Option<String>,
    #[serde(default)]
    pub survey_enabled: bool,
    #[serde(default)]
    pub ask_inventory_on_launch: bool,
    #[serde(default)]
    pub ask_credential_on_launch: bool,
    #[serde(default)]
    pub ask_variables_on_launch: bool,
    #[serde(default)]
    pub ask_limit_on_launch: bool,
    #[serde(default)]
    pub ask_verbosity_on_launch: bool,
    #[serde(default)]
    pub ask_execution_environment_on_launch: bool,
    #[serde(default)]
    pub ask_tags_on_launch: bool,
    #[serde(default)]
    pub ask_skip_tags_on_launch: bool,
    #[serde(default)]
    pub ask_instance_groups_on_launch: bool,
    #[serde(default)]
    pub extra_vars: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub summary_fields: JobTemplateSummary,
}

/// Survey attached to a job template.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SurveySpec {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub spec: Vec<SurveyQuestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyQuestion {
    pub variable: String,
    #[serde(default)]
    pub question_name: String,
    #[serde(default)]
    pub question_description: String,
    #[serde(rename = "type")]
    pub question_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: serde_json::Value,
    /// Newline separated string or list, depending on the AAP version.
    #[serde(default)]
    pub choices: serde_json::Value,
    #[serde(default)]
    pub min: Option<serde_json::Value>,
    #[serde(default)]
    pub max: Option<serde_json::Value>,
}

impl SurveyQuestion {
    pub fn choice_list(&self) -> Vec<String> {
        match &self.choices {
            serde_json::Value::String(s) => s
                .lines()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect(),
            serde_json::Value::Array(items) => items
                .iter()
                .filter_map(|v| match v {
                    serde_json::Value::String(s) => Some(s.clone()),
                    serde_json::Value::Null => None,
                    other => Some(other.to_string()),
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Lifecycle status reported by projects, project updates and jobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceStatus {
    New,
    Pending,
    Waiting,
    Running,
    Successful,
    Failed,
    Error,
    Canceled,
    Other(String),
}

impl ResourceStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "new" => Self::New,
            "pending" => Self::Pending,
            "waiting" => Self::Waiting,
            "running" => Self::Running,
            "successful" => Self::Successful,
            "failed" => Self::Failed,
            "error" => Self::Error,
            "canceled" => Self::Canceled,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Successful | Self::Failed | Self::Error | Self::Canceled
        )
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Error | Self::Canceled)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::New => "new",
            Self::Pending => "pending",
            Self::Waiting => "waiting",
            Self::Running => "running",
            Self::Successful => "successful",
            Self::Failed => "failed",
            Self::Error => "error",
            Self::Canceled => "canceled",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub failed: bool,
    #[serde(default)]
    pub elapsed: f64,
}

/// A single job event. Only the fields used for reporting are typed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEvent {
    pub id: u64,
    #[serde(default)]
    pub counter: u64,
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub failed: bool,
    #[serde(default)]
    pub task: Option<String>,
    #[serde(default)]
    pub host_name: Option<String>,
}

// ============================================================================
// Created resources
// ============================================================================

/// Result of creating a project, job template or execution environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedResource {
    pub id: u64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub url: String,
}

/// Result of a completed job launch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchedJob {
    pub id: u64,
    pub status: String,
    pub events: Vec<JobEvent>,
    pub url: String,
}

// ============================================================================
// Request payloads
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectPayload {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub organization: ResourceRef,
    pub scm_url: String,
    #[serde(default)]
    pub scm_branch: Option<String>,
    #[serde(default)]
    pub credentials: Option<ResourceRef>,
    #[serde(default)]
    pub scm_update_on_launch: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobTemplatePayload {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub organization: ResourceRef,
    pub project: ResourceRef,
    pub inventory: ResourceRef,
    pub playbook: String,
    #[serde(default)]
    pub execution_environment: Option<ResourceRef>,
    #[serde(default)]
    pub extra_vars: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionEnvironmentPayload {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub organization: ResourceRef,
    pub image: String,
    #[serde(default = "default_pull")]
    pub pull: String,
}

fn default_pull() -> String {
    "missing".to_string()
}

/// Options accepted when launching a job template.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LaunchJobPayload {
    pub template: ResourceRef,
    #[serde(default)]
    pub inventory: Option<ResourceRef>,
    #[serde(default)]
    pub credentials: Vec<Credential>,
    #[serde(default)]
    pub extra_variables: Option<serde_json::Value>,
    #[serde(default)]
    pub limit: Option<String>,
    #[serde(default)]
    pub verbosity: Option<u8>,
    #[serde(default)]
    pub job_type: Option<String>,
    #[serde(default)]
    pub execution_environment: Option<ResourceRef>,
    #[serde(default)]
    pub forks: Option<u32>,
    #[serde(default)]
    pub job_slice_count: Option<u32>,
    #[serde(default)]
    pub timeout: Option<u32>,
    #[serde(default)]
    pub diff_mode: Option<bool>,
    #[serde(default)]
    pub job_tags: Option<String>,
    #[serde(default)]
    pub skip_tags: Option<String>,
    #[serde(default)]
    pub instance_groups: Vec<ResourceRef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_terminal_states() {
        assert!(ResourceStatus::parse("successful").is_terminal());
        assert!(ResourceStatus::parse("failed").is_terminal());
        assert!(!ResourceStatus::parse("pending").is_terminal());
        assert!(!ResourceStatus::parse("running").is_terminal());
        assert!(!ResourceStatus::parse("waiting").is_terminal());
        assert!(ResourceStatus::parse("canceled").is_failure());
        assert!(!ResourceStatus::parse("successful").is_failure());
        assert_eq!(ResourceStatus::parse("never updated").to_string(), "never updated");
    }

    #[test]
    fn test_survey_choices_from_string_and_list() {
        let q: SurveyQuestion = serde_json::from_value(serde_json::json!({
            "variable": "env",
            "type": "multiplechoice",
            "choices": "dev\nprod\n\n"
        }))
        .unwrap();
        assert_eq!(q.choice_list(), vec!["dev", "prod"]);

        let q: SurveyQuestion = serde_json::from_value(serde_json::json!({
            "variable": "env",
            "type": "multiselect",
            "choices": ["a", "b"]
        }))
        .unwrap();
        assert_eq!(q.choice_list(), vec!["a", "b"]);
    }

    #[test]
    fn test_user_display_name_falls_back_to_username() {
        let user = User {
            id: 1,
            username: "jdoe".to_string(),
            first_name: String::new(),
            last_name: " ".to_string(),
            email: String::new(),
            is_superuser: false,
        };
        assert_eq!(user.display_name(), "jdoe");
    }
}
