// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// AAP Platform Port
//
// Errors raised while talking to Ansible Automation Platform and the
// read-only resource source the catalog providers sync from. The REST
// client in `infrastructure::aap_client` is the production implementation.

use crate::domain::aap::{InstanceGroup, JobTemplate, Organization, SurveySpec, Team, User};
use async_trait::async_trait;

/// Errors that can occur during AAP operations
#[derive(Debug, thiserror::Error)]
pub enum AapError {
    #[error("Failed to send {method} request: {message}")]
    Transport { method: &'static str, message: String },

    #[error("Insufficient privileges. Please contact your administrator.")]
    InsufficientPrivileges,

    /// Structured `__all__` messages from the API, joined
    #[error("{0}")]
    Api(String),

    #[error("{method} {url} failed with HTTP {status}: {body}")]
    Http {
        method: &'static str,
        url: String,
        status: u16,
        body: String,
    },

    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("{resource} {id} finished with status '{status}'")]
    Failed {
        resource: &'static str,
        id: u64,
        status: String,
    },

    #[error("Timed out waiting for {resource} {id} after {attempts} status checks")]
    PollTimeout {
        resource: &'static str,
        id: u64,
        attempts: u32,
    },

    #[error("Cannot assign multiple credentials of the same type")]
    DuplicateCredentialType,
}

/// Read side of AAP used by the catalog providers.
///
/// Implementations carry their own credentials; callers never pass tokens.
#[async_trait]
pub trait AapResourceSource: Send + Sync {
    /// Gateway base URL, used to build deep links in entity annotations.
    fn base_url(&self) -> &str;

    async fn list_organizations(&self) -> Result<Vec<Organization>, AapError>;

    async fn list_teams(&self, organization_id: u64) -> Result<Vec<Team>, AapError>;

    async fn list_organization_users(&self, organization_id: u64) -> Result<Vec<User>, AapError>;

    async fn list_team_users(&self, team_id: u64) -> Result<Vec<User>, AapError>;

    async fn list_job_templates(&self, organization_id: Option<u64>) -> Result<Vec<JobTemplate>, AapError>;

    async fn get_survey_spec(&self, template_id: u64) -> Result<SurveySpec, AapError>;

    async fn list_template_instance_groups(&self, template_id: u64) -> Result<Vec<InstanceGroup>, AapError>;
}
