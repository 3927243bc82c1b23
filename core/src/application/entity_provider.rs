// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! AAP Entity Providers
//!
//! Publish snapshots of AAP data into the catalog.
//!
//! # DDD Pattern: Application Service
//!
//! - **Layer:** Application
//! - **Responsibility:** Fetch → map → publish one full snapshot per run
//! - **Collaborators:**
//!   - Domain: `AapResourceSource`, `EntityProviderConnection`
//!   - Application: `entity_mapper`
//!
//! # Flow
//!
//! 1. `connect()` stores the catalog connection and, when the provider was
//!    built `with_scheduler`, registers its recurring task
//! 2. `run()` fetches every resource the provider owns, sequentially
//! 3. Resources are mapped to entities
//! 4. One `EntityMutation::Full` replaces the previous snapshot
//!
//! A fetch error aborts the run before step 4, so the catalog keeps the last
//! good snapshot and the next scheduled run starts over.

use crate::application::entity_mapper::{
    job_template_entity_name, job_template_to_template, organization_group_name, organization_to_group,
    team_group_name, team_to_group, unique_entity_names, user_entity_name, user_to_entity,
};
use crate::application::scheduler::{TaskSchedule, TaskScheduler};
use crate::domain::aap::{JobTemplate, Organization, Team, User};
use crate::domain::catalog::{DeferredEntity, Entity, EntityMutation, EntityProviderConnection};
use crate::domain::config::ProviderConfig;
use crate::domain::platform::{AapError, AapResourceSource};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Not initialized")]
    NotInitialized,

    #[error("Failed to fetch {resource} from AAP: {source}")]
    Fetch {
        resource: String,
        #[source]
        source: AapError,
    },

    #[error("Failed to apply catalog mutation: {0}")]
    Mutation(String),
}

fn fetch_error(resource: impl Into<String>) -> impl FnOnce(AapError) -> ProviderError {
    let resource = resource.into();
    move |source| ProviderError::Fetch { resource, source }
}

/// Outcome of one successful provider run.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSummary {
    pub provider: String,
    pub entity_count: usize,
    pub duration: Duration,
    pub completed_at: DateTime<Utc>,
}

#[async_trait]
pub trait EntityProvider: Send + Sync {
    /// Also used as the location key of every emitted entity.
    fn name(&self) -> &str;

    /// Attach the catalog connection. Providers built with a scheduler
    /// register their recurring task on the first call.
    async fn connect(&self, connection: Arc<dyn EntityProviderConnection>);

    async fn run(&self) -> Result<SyncSummary, ProviderError>;
}

/// Connection slot plus the shared run protocol.
struct ProviderCore {
    config: ProviderConfig,
    source: Arc<dyn AapResourceSource>,
    connection: RwLock<Option<Arc<dyn EntityProviderConnection>>>,
}

impl ProviderCore {
    fn new(config: ProviderConfig, source: Arc<dyn AapResourceSource>) -> Self {
        Self {
            config,
            source,
            connection: RwLock::new(None),
        }
    }

    /// Store the connection. Returns true the first time one is attached.
    async fn attach(&self, connection: Arc<dyn EntityProviderConnection>) -> bool {
        let previous = self.connection.write().await.replace(connection);
        debug!(provider = %self.config.name, "Provider connected");
        previous.is_none()
    }

    fn schedule(&self) -> TaskSchedule {
        TaskSchedule::from(&self.config.schedule)
    }

    async fn connection(&self) -> Result<Arc<dyn EntityProviderConnection>, ProviderError> {
        self.connection
            .read()
            .await
            .clone()
            .ok_or(ProviderError::NotInitialized)
    }

    fn defer(&self, entities: Vec<Entity>) -> Vec<DeferredEntity> {
        entities
            .into_iter()
            .map(|entity| DeferredEntity {
                entity,
                location_key: self.config.name.clone(),
            })
            .collect()
    }

    async fn publish(
        &self,
        connection: Arc<dyn EntityProviderConnection>,
        started: Instant,
        collected: Result<Vec<Entity>, ProviderError>,
    ) -> Result<SyncSummary, ProviderError> {
        let entities = match collected {
            Ok(entities) => entities,
            Err(e) => {
                warn!(provider = %self.config.name, error = %e, "AAP fetch failed, skipping catalog mutation");
                return Err(e);
            }
        };

        let entity_count = entities.len();
        connection
            .apply_mutation(EntityMutation::full(self.defer(entities)))
            .await
            .map_err(|e| ProviderError::Mutation(format!("{:#}", e)))?;

        let duration = started.elapsed();
        info!(
            provider = %self.config.name,
            entity_count,
            duration_ms = duration.as_millis() as u64,
            "Catalog sync completed"
        );

        Ok(SyncSummary {
            provider: self.config.name.clone(),
            entity_count,
            duration,
            completed_at: Utc::now(),
        })
    }

    /// Organizations the provider is configured for, matched by name
    /// case-insensitively. An empty filter keeps every organization.
    async fn organizations(&self) -> Result<Vec<Organization>, ProviderError> {
        let orgs = self
            .source
            .list_organizations()
            .await
            .map_err(fetch_error("organizations"))?;

        if self.config.orgs.is_empty() {
            return Ok(orgs);
        }

        let wanted: BTreeSet<String> = self.config.orgs.iter().map(|o| o.trim().to_lowercase()).collect();
        Ok(orgs
            .into_iter()
            .filter(|org| wanted.contains(&org.name.to_lowercase()))
            .collect())
    }
}

// ============================================================================
// Organizations, teams and users
// ============================================================================

/// Publishes organizations and teams as `Group` entities and their members
/// as `User` entities.
#[derive(Clone)]
pub struct AapEntityProvider {
    core: Arc<ProviderCore>,
    scheduler: Option<TaskScheduler>,
}

/// One organization as fetched, before mapping.
struct OrganizationSnapshot {
    org: Organization,
    teams: Vec<(Team, Vec<User>)>,
    users: Vec<User>,
}

impl AapEntityProvider {
    pub fn new(config: ProviderConfig, source: Arc<dyn AapResourceSource>) -> Self {
        Self {
            core: Arc::new(ProviderCore::new(config, source)),
            scheduler: None,
        }
    }

    /// Register the provider's recurring task with `scheduler` on connect.
    pub fn with_scheduler(mut self, scheduler: TaskScheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    async fn fetch(&self) -> Result<Vec<OrganizationSnapshot>, ProviderError> {
        let source = &self.core.source;
        let mut snapshots = Vec::new();

        for org in self.core.organizations().await? {
            debug!(organization = %org.name, "Fetching teams and users");

            let teams = source
                .list_teams(org.id)
                .await
                .map_err(fetch_error(format!("teams of organization {}", org.id)))?;
            let users = source
                .list_organization_users(org.id)
                .await
                .map_err(fetch_error(format!("users of organization {}", org.id)))?;

            let mut team_members = Vec::with_capacity(teams.len());
            for team in teams {
                let members = source
                    .list_team_users(team.id)
                    .await
                    .map_err(fetch_error(format!("users of team {}", team.id)))?;
                team_members.push((team, members));
            }

            snapshots.push(OrganizationSnapshot {
                org,
                teams: team_members,
                users,
            });
        }

        Ok(snapshots)
    }

    async fn collect(&self) -> Result<Vec<Entity>, ProviderError> {
        let base_url = self.core.source.base_url().to_string();
        let snapshots = self.fetch().await?;

        // Keyed by user id so a user in several orgs is emitted once.
        let mut users: BTreeMap<u64, (User, BTreeSet<String>)> = BTreeMap::new();
        for snapshot in &snapshots {
            let org_group = organization_group_name(&snapshot.org);
            for user in &snapshot.users {
                remember(&mut users, user, &org_group);
            }
            for (team, members) in &snapshot.teams {
                let team_group = team_group_name(&snapshot.org.name, &team.name);
                for user in members {
                    remember(&mut users, user, &team_group);
                }
            }
        }

        let names = unique_entity_names(users.values().map(|(user, _)| (user.id, user_entity_name(user))));
        let member_names =
            |members: &[User]| -> Vec<String> { members.iter().filter_map(|u| names.get(&u.id).cloned()).collect() };

        let mut entities = Vec::new();
        for snapshot in &snapshots {
            let team_groups: Vec<String> = snapshot
                .teams
                .iter()
                .map(|(team, _)| team_group_name(&snapshot.org.name, &team.name))
                .collect();
            entities.push(organization_to_group(
                &snapshot.org,
                &base_url,
                &team_groups,
                &member_names(snapshot.users.as_slice()),
            ));
            for (team, members) in &snapshot.teams {
                entities.push(team_to_group(team, &snapshot.org, &base_url, &member_names(members.as_slice())));
            }
        }

        for (user, member_of) in users.values() {
            let Some(name) = names.get(&user.id) else {
                continue;
            };
            let member_of: Vec<String> = member_of.iter().cloned().collect();
            entities.push(user_to_entity(user, name, &base_url, &member_of));
        }
        Ok(entities)
    }
}

fn remember(users: &mut BTreeMap<u64, (User, BTreeSet<String>)>, user: &User, group: &str) {
    users
        .entry(user.id)
        .or_insert_with(|| (user.clone(), BTreeSet::new()))
        .1
        .insert(group.to_string());
}

#[async_trait]
impl EntityProvider for AapEntityProvider {
    fn name(&self) -> &str {
        &self.core.config.name
    }

    async fn connect(&self, connection: Arc<dyn EntityProviderConnection>) {
        if self.core.attach(connection).await {
            if let Some(scheduler) = &self.scheduler {
                scheduler.schedule(Arc::new(self.clone()), self.core.schedule()).await;
            }
        }
    }

    async fn run(&self) -> Result<SyncSummary, ProviderError> {
        let connection = self.core.connection().await?;
        let started = Instant::now();
        info!(provider = %self.core.config.name, "Syncing AAP organizations, teams and users");
        let collected = self.collect().await;
        self.core.publish(connection, started, collected).await
    }
}

// ============================================================================
// Job templates
// ============================================================================

/// Publishes job templates as scaffolder `Template` entities.
#[derive(Clone)]
pub struct AapJobTemplateProvider {
    core: Arc<ProviderCore>,
    scheduler: Option<TaskScheduler>,
}

impl AapJobTemplateProvider {
    pub fn new(config: ProviderConfig, source: Arc<dyn AapResourceSource>) -> Self {
        Self {
            core: Arc::new(ProviderCore::new(config, source)),
            scheduler: None,
        }
    }

    /// Register the provider's recurring task with `scheduler` on connect.
    pub fn with_scheduler(mut self, scheduler: TaskScheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    async fn templates(&self) -> Result<Vec<JobTemplate>, ProviderError> {
        let source = &self.core.source;
        if self.core.config.orgs.is_empty() {
            return source
                .list_job_templates(None)
                .await
                .map_err(fetch_error("job templates"));
        }

        let mut templates = Vec::new();
        for org in self.core.organizations().await? {
            templates.extend(
                source
                    .list_job_templates(Some(org.id))
                    .await
                    .map_err(fetch_error(format!("job templates of organization {}", org.id)))?,
            );
        }
        Ok(templates)
    }

    async fn collect(&self) -> Result<Vec<Entity>, ProviderError> {
        let source = &self.core.source;
        let base_url = source.base_url().to_string();
        let templates = self.templates().await?;
        let names = unique_entity_names(templates.iter().map(|t| (t.id, job_template_entity_name(t))));
        let mut entities = Vec::with_capacity(templates.len());

        for template in &templates {
            let survey = if self.core.config.surveys_enabled && template.survey_enabled {
                Some(
                    source
                        .get_survey_spec(template.id)
                        .await
                        .map_err(fetch_error(format!("survey of job template {}", template.id)))?,
                )
            } else {
                None
            };

            let instance_groups = if template.ask_instance_groups_on_launch {
                source
                    .list_template_instance_groups(template.id)
                    .await
                    .map_err(fetch_error(format!("instance groups of job template {}", template.id)))?
            } else {
                Vec::new()
            };

            let name = names
                .get(&template.id)
                .cloned()
                .unwrap_or_else(|| job_template_entity_name(template));
            entities.push(job_template_to_template(
                template,
                &name,
                survey.as_ref(),
                &instance_groups,
                &base_url,
            ));
        }

        Ok(entities)
    }
}

#[async_trait]
impl EntityProvider for AapJobTemplateProvider {
    fn name(&self) -> &str {
        &self.core.config.name
    }

    async fn connect(&self, connection: Arc<dyn EntityProviderConnection>) {
        if self.core.attach(connection).await {
            if let Some(scheduler) = &self.scheduler {
                scheduler.schedule(Arc::new(self.clone()), self.core.schedule()).await;
            }
        }
    }

    async fn run(&self) -> Result<SyncSummary, ProviderError> {
        let connection = self.core.connection().await?;
        let started = Instant::now();
        info!(provider = %self.core.config.name, "Syncing AAP job templates");
        let collected = self.collect().await;
        self.core.publish(connection, started, collected).await
    }
}
