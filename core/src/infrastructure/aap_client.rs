// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! AAP REST Client
//!
//! Thin authenticated wrapper over the Ansible Automation Platform gateway
//! (`api/gateway/v1`) and controller (`api/controller/v2`) HTTP APIs.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** CRUD, job launch and status polling against AAP
//! - **Integration:** Catalog providers / scaffolder → AAP REST API
//!
//! # Behaviour
//!
//! - Every call carries `Authorization: Bearer <token>`.
//! - List endpoints are followed through `next` until it is null and the
//!   `results` of every page are concatenated in request order.
//! - Resources with an asynchronous status (projects, jobs) are polled at a
//!   fixed interval until they reach a terminal state, bounded by
//!   [`PollConfig::max_attempts`].
//! - HTTP 403 maps to [`AapError::InsufficientPrivileges`]; bodies carrying an
//!   `__all__` array map to [`AapError::Api`].
//!
//! # Usage
//!
//! ```ignore
//! let client = AapClient::builder()
//!     .base_url("https://aap.example.com")
//!     .check_ssl(false)
//!     .build()?;
//!
//! let project = client.create_project(&payload, true, &token).await?;
//! let job = client.launch_job_template(&launch, &token).await?;
//! ```

use crate::domain::aap::{
    CreatedResource, Credential, ExecutionEnvironmentPayload, InstanceGroup, Job, JobEvent,
    JobTemplate, JobTemplatePayload, LaunchJobPayload, LaunchedJob, Organization, Page,
    ProjectPayload, ResourceStatus, SurveySpec, Team, User,
};
use crate::domain::config::{AapConnectionConfig, PollSettings};
use crate::domain::platform::{AapError, AapResourceSource};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

const CONTROLLER: &str = "api/controller/v2";
const GATEWAY: &str = "api/gateway/v1";

/// Fixed-interval status polling with an upper bound on checks.
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 120,
        }
    }
}

impl From<&PollSettings> for PollConfig {
    fn from(settings: &PollSettings) -> Self {
        Self {
            interval: Duration::from_millis(settings.interval_ms),
            max_attempts: settings.max_attempts,
        }
    }
}

/// Minimal view of any document that reports a lifecycle status.
#[derive(Debug, Deserialize)]
struct StatusDocument {
    id: u64,
    #[serde(default)]
    status: Option<String>,
}

/// Resources [`AapClient::cleanup`] should remove, each scoped to an
/// organization id.
#[derive(Debug, Clone, Default)]
pub struct CleanupTargets {
    pub project: Option<(String, u64)>,
    pub job_template: Option<(String, u64)>,
    pub execution_environment: Option<(String, u64)>,
}

#[derive(Debug, Clone)]
pub struct AapClient {
    client: Client,
    base_url: String,
    poll: PollConfig,
}

impl AapClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, AapError> {
        AapClientBuilder::new().base_url(base_url).build()
    }

    /// Client for the connection described in `spec.aap`.
    pub fn from_config(config: &AapConnectionConfig) -> Result<Self, AapError> {
        AapClientBuilder::new()
            .base_url(config.base_url.clone())
            .check_ssl(config.check_ssl)
            .poll(PollConfig::from(&config.poll))
            .build()
    }

    pub fn builder() -> AapClientBuilder {
        AapClientBuilder::new()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn poll_config(&self) -> &PollConfig {
        &self.poll
    }

    /// Bind a token, producing an [`AapResourceSource`] for the providers.
    pub fn with_token(self, token: impl Into<String>) -> AuthenticatedAapClient {
        AuthenticatedAapClient {
            client: self,
            token: token.into(),
        }
    }

    // ========================================================================
    // Request primitives
    // ========================================================================

    /// Absolute URL for an API path. Absolute URLs pass through unchanged,
    /// absolute paths (e.g. a `next` link) resolve against the base URL.
    pub fn endpoint(&self, path: &str) -> Result<String, AapError> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Ok(path.to_string());
        }
        if path.starts_with('/') {
            let base = url::Url::parse(&format!("{}/", self.base_url)).map_err(|e| AapError::InvalidUrl {
                url: self.base_url.clone(),
                message: e.to_string(),
            })?;
            return base
                .join(path)
                .map(|u| u.to_string())
                .map_err(|e| AapError::InvalidUrl {
                    url: path.to_string(),
                    message: e.to_string(),
                });
        }
        Ok(format!("{}/{}", self.base_url, path))
    }

    fn endpoint_with_query(&self, path: &str, query: &[(&str, String)]) -> Result<String, AapError> {
        let raw = self.endpoint(path)?;
        let mut url = url::Url::parse(&raw).map_err(|e| AapError::InvalidUrl {
            url: raw.clone(),
            message: e.to_string(),
        })?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url.to_string())
    }

    pub async fn execute_get_request(&self, path: &str, token: &str) -> Result<Response, AapError> {
        let url = self.endpoint(path)?;
        self.send("GET", &url, token, None).await
    }

    pub async fn execute_post_request(
        &self,
        path: &str,
        token: &str,
        body: &Value,
    ) -> Result<Response, AapError> {
        let url = self.endpoint(path)?;
        self.send("POST", &url, token, Some(body)).await
    }

    pub async fn execute_delete_request(&self, path: &str, token: &str) -> Result<Response, AapError> {
        let url = self.endpoint(path)?;
        self.send("DELETE", &url, token, None).await
    }

    async fn send(
        &self,
        method: &'static str,
        url: &str,
        token: &str,
        body: Option<&Value>,
    ) -> Result<Response, AapError> {
        debug!(method, url, "Sending AAP request");

        let request = match method {
            "POST" => self.client.post(url),
            "DELETE" => self.client.delete(url),
            _ => self.client.get(url),
        };
        let mut request = request.header("Authorization", format!("Bearer {}", token));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| AapError::Transport {
            method,
            message: e.to_string(),
        })?;

        Self::check_status(method, url, response).await
    }

    async fn check_status(method: &'static str, url: &str, response: Response) -> Result<Response, AapError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::FORBIDDEN {
            return Err(AapError::InsufficientPrivileges);
        }

        let body = response.text().await.unwrap_or_default();
        if let Some(message) = api_error_message(&body) {
            return Err(AapError::Api(message));
        }

        Err(AapError::Http {
            method,
            url: url.to_string(),
            status: status.as_u16(),
            body,
        })
    }

    async fn decode<T: DeserializeOwned>(url: &str, response: Response) -> Result<T, AapError> {
        response.json::<T>().await.map_err(|e| AapError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, token: &str) -> Result<T, AapError> {
        let url = self.endpoint(path)?;
        let response = self.send("GET", &url, token, None).await?;
        Self::decode(&url, response).await
    }

    async fn post_json<T: DeserializeOwned>(&self, path: &str, token: &str, body: &Value) -> Result<T, AapError> {
        let url = self.endpoint(path)?;
        let response = self.send("POST", &url, token, Some(body)).await?;
        Self::decode(&url, response).await
    }

    // ========================================================================
    // Pagination
    // ========================================================================

    /// Follow `next` links from `path`, concatenating every page's results.
    pub async fn list_all<T: DeserializeOwned>(&self, path: &str, token: &str) -> Result<Vec<T>, AapError> {
        let mut url = self.endpoint(path)?;
        let mut results = Vec::new();
        let mut pages = 0usize;

        loop {
            let response = self.send("GET", &url, token, None).await?;
            let page: Page<T> = Self::decode(&url, response).await?;
            pages += 1;
            results.extend(page.results);

            match page.next.filter(|n| !n.is_empty()) {
                Some(next) => url = self.endpoint(&next)?,
                None => break,
            }
        }

        debug!(path, pages, items = results.len(), "Fetched paginated resource");
        Ok(results)
    }

    async fn list_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        token: &str,
    ) -> Result<Vec<T>, AapError> {
        let url = self.endpoint_with_query(path, query)?;
        self.list_all(&url, token).await
    }

    /// Raw paginated fetch of any list endpoint.
    pub async fn fetch_result(&self, path: &str, token: &str) -> Result<Vec<Value>, AapError> {
        self.list_all(path, token).await
    }

    /// All events of a job, in the order AAP pages them.
    pub async fn fetch_events(&self, job_id: u64, token: &str) -> Result<Vec<JobEvent>, AapError> {
        self.list_all(&format!("{}/jobs/{}/job_events/", CONTROLLER, job_id), token)
            .await
    }

    // ========================================================================
    // Status polling
    // ========================================================================

    /// Poll `status_path` until the status is terminal.
    ///
    /// `initial` is the status reported at creation time; a terminal value
    /// there settles immediately without another request.
    async fn wait_for_terminal(
        &self,
        resource: &'static str,
        id: u64,
        status_path: &str,
        initial: Option<String>,
        token: &str,
    ) -> Result<ResourceStatus, AapError> {
        let mut current = initial.as_deref().map(ResourceStatus::parse);
        let mut attempts = 0u32;

        loop {
            if let Some(status) = &current {
                if status.is_terminal() {
                    if status.is_failure() {
                        warn!(resource, id, status = %status, "AAP resource finished unsuccessfully");
                        return Err(AapError::Failed {
                            resource,
                            id,
                            status: status.to_string(),
                        });
                    }
                    return Ok(status.clone());
                }
            }

            if attempts >= self.poll.max_attempts {
                return Err(AapError::PollTimeout {
                    resource,
                    id,
                    attempts,
                });
            }

            if current.is_some() {
                tokio::time::sleep(self.poll.interval).await;
            }
            attempts += 1;

            let doc: StatusDocument = self.get_json(status_path, token).await?;
            let status = ResourceStatus::parse(doc.status.as_deref().unwrap_or("pending"));
            debug!(resource, id, attempt = attempts, status = %status, "Polled AAP resource status");
            current = Some(status);
        }
    }

    /// Creation-time statuses that mean work is still in flight.
    fn needs_polling(status: &str) -> bool {
        matches!(status, "new" | "pending" | "waiting" | "running")
    }

    async fn settle(
        &self,
        resource: &'static str,
        id: u64,
        status_path: &str,
        initial: Option<String>,
        token: &str,
    ) -> Result<Option<String>, AapError> {
        match initial.as_deref() {
            Some(raw) if Self::needs_polling(raw) || ResourceStatus::parse(raw).is_terminal() => {
                let status = self
                    .wait_for_terminal(resource, id, status_path, initial.clone(), token)
                    .await?;
                Ok(Some(status.to_string()))
            }
            _ => Ok(initial),
        }
    }

    // ========================================================================
    // Projects
    // ========================================================================

    pub async fn find_project(&self, name: &str, organization_id: u64, token: &str) -> Result<Option<Value>, AapError> {
        self.find_by_name("projects", name, organization_id, token).await
    }

    pub async fn create_project(
        &self,
        payload: &ProjectPayload,
        delete_if_exists: bool,
        token: &str,
    ) -> Result<CreatedResource, AapError> {
        if delete_if_exists {
            self.delete_project_if_exists(&payload.name, payload.organization.id, token)
                .await?;
        }

        let mut body = json!({
            "name": payload.name,
            "description": payload.description,
            "organization": payload.organization.id,
            "scm_type": "git",
            "scm_url": payload.scm_url,
            "scm_update_on_launch": payload.scm_update_on_launch,
        });
        if let Some(branch) = &payload.scm_branch {
            body["scm_branch"] = json!(branch);
        }
        if let Some(credential) = &payload.credentials {
            body["credential"] = json!(credential.id);
        }

        let created: StatusDocument = self
            .post_json(&format!("{}/projects/", CONTROLLER), token, &body)
            .await?;
        info!(project_id = created.id, name = %payload.name, "Created AAP project");

        let status = self
            .wait_for_terminal(
                "project",
                created.id,
                &format!("{}/projects/{}/", CONTROLLER, created.id),
                created.status,
                token,
            )
            .await?;

        Ok(CreatedResource {
            id: created.id,
            name: payload.name.clone(),
            status: Some(status.to_string()),
            url: format!("{}/execution/projects/{}/details", self.base_url, created.id),
        })
    }

    pub async fn delete_project_if_exists(&self, name: &str, organization_id: u64, token: &str) -> Result<bool, AapError> {
        self.delete_if_exists("projects", name, organization_id, token).await
    }

    // ========================================================================
    // Execution environments
    // ========================================================================

    pub async fn find_execution_environment(
        &self,
        name: &str,
        organization_id: u64,
        token: &str,
    ) -> Result<Option<Value>, AapError> {
        self.find_by_name("execution_environments", name, organization_id, token)
            .await
    }

    pub async fn create_execution_environment(
        &self,
        payload: &ExecutionEnvironmentPayload,
        delete_if_exists: bool,
        token: &str,
    ) -> Result<CreatedResource, AapError> {
        if delete_if_exists {
            self.delete_execution_environment_if_exists(&payload.name, payload.organization.id, token)
                .await?;
        }

        let body = json!({
            "name": payload.name,
            "description": payload.description,
            "organization": payload.organization.id,
            "image": payload.image,
            "pull": payload.pull,
        });

        let created: StatusDocument = self
            .post_json(&format!("{}/execution_environments/", CONTROLLER), token, &body)
            .await?;
        info!(execution_environment_id = created.id, name = %payload.name, "Created AAP execution environment");

        let status = self
            .settle(
                "execution environment",
                created.id,
                &format!("{}/execution_environments/{}/", CONTROLLER, created.id),
                created.status,
                token,
            )
            .await?;

        Ok(CreatedResource {
            id: created.id,
            name: payload.name.clone(),
            status,
            url: format!(
                "{}/execution/infrastructure/execution-environments/{}/details",
                self.base_url, created.id
            ),
        })
    }

    pub async fn delete_execution_environment_if_exists(
        &self,
        name: &str,
        organization_id: u64,
        token: &str,
    ) -> Result<bool, AapError> {
        self.delete_if_exists("execution_environments", name, organization_id, token)
            .await
    }

    // ========================================================================
    // Job templates
    // ========================================================================

    pub async fn find_job_template(&self, name: &str, organization_id: u64, token: &str) -> Result<Option<Value>, AapError> {
        self.find_by_name("job_templates", name, organization_id, token).await
    }

    pub async fn create_job_template(
        &self,
        payload: &JobTemplatePayload,
        delete_if_exists: bool,
        token: &str,
    ) -> Result<CreatedResource, AapError> {
        if delete_if_exists {
            self.delete_job_template_if_exists(&payload.name, payload.organization.id, token)
                .await?;
        }

        let mut body = json!({
            "name": payload.name,
            "description": payload.description,
            "organization": payload.organization.id,
            "project": payload.project.id,
            "inventory": payload.inventory.id,
            "playbook": payload.playbook,
        });
        if let Some(ee) = &payload.execution_environment {
            body["execution_environment"] = json!(ee.id);
        }
        if let Some(vars) = &payload.extra_vars {
            body["extra_vars"] = json!(extra_vars_string(vars));
        }

        let created: StatusDocument = self
            .post_json(&format!("{}/job_templates/", CONTROLLER), token, &body)
            .await?;
        info!(job_template_id = created.id, name = %payload.name, "Created AAP job template");

        let status = self
            .settle(
                "job template",
                created.id,
                &format!("{}/job_templates/{}/", CONTROLLER, created.id),
                created.status,
                token,
            )
            .await?;

        Ok(CreatedResource {
            id: created.id,
            name: payload.name.clone(),
            status,
            url: format!("{}/execution/templates/job-template/{}/details", self.base_url, created.id),
        })
    }

    pub async fn delete_job_template_if_exists(
        &self,
        name: &str,
        organization_id: u64,
        token: &str,
    ) -> Result<bool, AapError> {
        self.delete_if_exists("job_templates", name, organization_id, token)
            .await
    }

    /// Launch a job template and wait for the job to finish.
    ///
    /// Fails before any request when two credentials share a
    /// `credential_type`, and after polling when the job does not succeed.
    pub async fn launch_job_template(&self, payload: &LaunchJobPayload, token: &str) -> Result<LaunchedJob, AapError> {
        ensure_distinct_credential_types(&payload.credentials)?;

        let body = launch_body(payload);
        let launched: StatusDocument = self
            .post_json(
                &format!("{}/job_templates/{}/launch/", CONTROLLER, payload.template.id),
                token,
                &body,
            )
            .await?;
        info!(job_id = launched.id, template_id = payload.template.id, "Launched AAP job");

        let status = self
            .wait_for_terminal(
                "job",
                launched.id,
                &format!("{}/jobs/{}/", CONTROLLER, launched.id),
                launched.status,
                token,
            )
            .await?;

        let events = self.fetch_events(launched.id, token).await?;
        info!(job_id = launched.id, status = %status, events = events.len(), "AAP job finished");

        Ok(LaunchedJob {
            id: launched.id,
            status: status.to_string(),
            events,
            url: format!("{}/execution/jobs/playbook/{}/output", self.base_url, launched.id),
        })
    }

    pub async fn get_job(&self, job_id: u64, token: &str) -> Result<Job, AapError> {
        self.get_json(&format!("{}/jobs/{}/", CONTROLLER, job_id), token)
            .await
    }

    // ========================================================================
    // Lookup / delete helpers
    // ========================================================================

    async fn find_by_name(
        &self,
        resource: &str,
        name: &str,
        organization_id: u64,
        token: &str,
    ) -> Result<Option<Value>, AapError> {
        let url = self.endpoint_with_query(
            &format!("{}/{}/", CONTROLLER, resource),
            &[("name", name.to_string()), ("organization", organization_id.to_string())],
        )?;
        let response = self.send("GET", &url, token, None).await?;
        let page: Page<Value> = Self::decode(&url, response).await?;
        Ok(page.results.into_iter().next())
    }

    /// One list request, plus one delete when a match exists.
    async fn delete_if_exists(
        &self,
        resource: &str,
        name: &str,
        organization_id: u64,
        token: &str,
    ) -> Result<bool, AapError> {
        let Some(existing) = self.find_by_name(resource, name, organization_id, token).await? else {
            debug!(resource, name, "Nothing to delete");
            return Ok(false);
        };

        let id = existing.get("id").and_then(Value::as_u64).ok_or_else(|| AapError::Decode {
            url: format!("{}/{}/", CONTROLLER, resource),
            message: format!("{} '{}' has no numeric id", resource, name),
        })?;

        self.execute_delete_request(&format!("{}/{}/{}/", CONTROLLER, resource, id), token)
            .await?;
        info!(resource, name, id, "Deleted existing AAP resource");
        Ok(true)
    }

    /// Delete each target independently; the first failure is reported
    /// after every deletion has been attempted.
    pub async fn cleanup(&self, targets: &CleanupTargets, token: &str) -> Result<(), AapError> {
        let mut first_error = None;

        let steps: [(&str, &Option<(String, u64)>); 3] = [
            ("projects", &targets.project),
            ("job_templates", &targets.job_template),
            ("execution_environments", &targets.execution_environment),
        ];

        for (resource, target) in steps {
            let Some((name, organization_id)) = target else {
                continue;
            };
            if let Err(e) = self.delete_if_exists(resource, name, *organization_id, token).await {
                warn!(resource, name = %name, error = %e, "Cleanup step failed");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    // ========================================================================
    // Catalog reads
    // ========================================================================

    pub async fn list_organizations(&self, token: &str) -> Result<Vec<Organization>, AapError> {
        self.list_all(&format!("{}/organizations/", GATEWAY), token).await
    }

    pub async fn list_teams(&self, organization_id: u64, token: &str) -> Result<Vec<Team>, AapError> {
        self.list_with_query(
            &format!("{}/teams/", GATEWAY),
            &[("organization", organization_id.to_string())],
            token,
        )
        .await
    }

    pub async fn list_organization_users(&self, organization_id: u64, token: &str) -> Result<Vec<User>, AapError> {
        self.list_all(&format!("{}/organizations/{}/users/", GATEWAY, organization_id), token)
            .await
    }

    pub async fn list_team_users(&self, team_id: u64, token: &str) -> Result<Vec<User>, AapError> {
        self.list_all(&format!("{}/teams/{}/users/", GATEWAY, team_id), token)
            .await
    }

    pub async fn list_job_templates(&self, organization_id: Option<u64>, token: &str) -> Result<Vec<JobTemplate>, AapError> {
        let path = format!("{}/job_templates/", CONTROLLER);
        match organization_id {
            Some(id) => {
                self.list_with_query(&path, &[("organization", id.to_string())], token)
                    .await
            }
            None => self.list_all(&path, token).await,
        }
    }

    pub async fn get_survey_spec(&self, template_id: u64, token: &str) -> Result<SurveySpec, AapError> {
        self.get_json(&format!("{}/job_templates/{}/survey_spec/", CONTROLLER, template_id), token)
            .await
    }

    pub async fn list_template_instance_groups(&self, template_id: u64, token: &str) -> Result<Vec<InstanceGroup>, AapError> {
        self.list_all(&format!("{}/job_templates/{}/instance_groups/", CONTROLLER, template_id), token)
            .await
    }
}

// ============================================================================
// Builder Pattern
// ============================================================================

pub struct AapClientBuilder {
    base_url: Option<String>,
    check_ssl: bool,
    poll: PollConfig,
    timeout: Option<Duration>,
}

impl AapClientBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            check_ssl: true,
            poll: PollConfig::default(),
            timeout: None,
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn check_ssl(mut self, check: bool) -> Self {
        self.check_ssl = check;
        self
    }

    pub fn poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Per-request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<AapClient, AapError> {
        let base_url = self.base_url.unwrap_or_default();
        let base_url = base_url.trim_end_matches('/').to_string();
        url::Url::parse(&base_url).map_err(|e| AapError::InvalidUrl {
            url: base_url.clone(),
            message: e.to_string(),
        })?;

        let mut builder = Client::builder().danger_accept_invalid_certs(!self.check_ssl);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| AapError::Transport {
            method: "INIT",
            message: e.to_string(),
        })?;

        Ok(AapClient {
            client,
            base_url,
            poll: self.poll,
        })
    }
}

impl Default for AapClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Token-bound source
// ============================================================================

/// [`AapClient`] paired with the service token the providers sync with.
#[derive(Debug, Clone)]
pub struct AuthenticatedAapClient {
    client: AapClient,
    token: String,
}

impl AuthenticatedAapClient {
    pub fn client(&self) -> &AapClient {
        &self.client
    }
}

#[async_trait]
impl AapResourceSource for AuthenticatedAapClient {
    fn base_url(&self) -> &str {
        self.client.base_url()
    }

    async fn list_organizations(&self) -> Result<Vec<Organization>, AapError> {
        self.client.list_organizations(&self.token).await
    }

    async fn list_teams(&self, organization_id: u64) -> Result<Vec<Team>, AapError> {
        self.client.list_teams(organization_id, &self.token).await
    }

    async fn list_organization_users(&self, organization_id: u64) -> Result<Vec<User>, AapError> {
        self.client
            .list_organization_users(organization_id, &self.token)
            .await
    }

    async fn list_team_users(&self, team_id: u64) -> Result<Vec<User>, AapError> {
        self.client.list_team_users(team_id, &self.token).await
    }

    async fn list_job_templates(&self, organization_id: Option<u64>) -> Result<Vec<JobTemplate>, AapError> {
        self.client
            .list_job_templates(organization_id, &self.token)
            .await
    }

    async fn get_survey_spec(&self, template_id: u64) -> Result<SurveySpec, AapError> {
        self.client.get_survey_spec(template_id, &self.token).await
    }

    async fn list_template_instance_groups(&self, template_id: u64) -> Result<Vec<InstanceGroup>, AapError> {
        self.client
            .list_template_instance_groups(template_id, &self.token)
            .await
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Joined `__all__` messages from an AAP error body, if present.
fn api_error_message(body: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(body).ok()?;
    let messages = parsed.get("__all__")?.as_array()?;
    let joined = messages
        .iter()
        .map(|m| match m {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ");
    Some(joined)
}

fn ensure_distinct_credential_types(credentials: &[Credential]) -> Result<(), AapError> {
    let mut seen = HashSet::new();
    for credential in credentials {
        if !seen.insert(credential.credential_type) {
            return Err(AapError::DuplicateCredentialType);
        }
    }
    Ok(())
}

/// AAP accepts `extra_vars` as a JSON or YAML string.
fn extra_vars_string(vars: &Value) -> String {
    match vars {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn launch_body(payload: &LaunchJobPayload) -> Value {
    let mut body = json!({});

    if let Some(inventory) = &payload.inventory {
        body["inventory"] = json!(inventory.id);
    }
    if !payload.credentials.is_empty() {
        body["credentials"] = json!(payload.credentials.iter().map(|c| c.id).collect::<Vec<_>>());
    }
    if let Some(vars) = &payload.extra_variables {
        body["extra_vars"] = json!(extra_vars_string(vars));
    }
    if let Some(limit) = &payload.limit {
        body["limit"] = json!(limit);
    }
    if let Some(verbosity) = payload.verbosity {
        body["verbosity"] = json!(verbosity);
    }
    if let Some(job_type) = &payload.job_type {
        body["job_type"] = json!(job_type);
    }
    if let Some(ee) = &payload.execution_environment {
        body["execution_environment"] = json!(ee.id);
    }
    if let Some(forks) = payload.forks {
        body["forks"] = json!(forks);
    }
    if let Some(count) = payload.job_slice_count {
        body["job_slice_count"] = json!(count);
    }
    if let Some(timeout) = payload.timeout {
        body["timeout"] = json!(timeout);
    }
    if let Some(diff) = payload.diff_mode {
        body["diff_mode"] = json!(diff);
    }
    if let Some(tags) = &payload.job_tags {
        body["job_tags"] = json!(tags);
    }
    if let Some(tags) = &payload.skip_tags {
        body["skip_tags"] = json!(tags);
    }
    if !payload.instance_groups.is_empty() {
        body["instance_groups"] = json!(payload.instance_groups.iter().map(|g| g.id).collect::<Vec<_>>());
    }

    body
}
