// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Local Catalog Store
//!
//! Stand-in for a catalog backend: keeps each provider's entities keyed by
//! entity ref and, when file-backed, mirrors every provider snapshot to
//! `<output_dir>/<location_key>.yaml` as a multi-document YAML stream.
//! Opening a file-backed catalog reads those snapshots back, so delta
//! registrations accumulate across processes.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** [`EntityProviderConnection`] / [`CatalogRegistrar`] implementation
//! - **Integration:** Entity providers / scaffolder → local snapshot files

use crate::domain::catalog::{
    replace_all, CatalogRegistrar, DeferredEntity, Entity, EntityMutation, EntityProviderConnection,
    SnapshotDiff,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Location key used for entities registered outside any provider.
pub const REGISTRAR_LOCATION_KEY: &str = "scaffolder";

type Registrations = HashMap<String, BTreeMap<String, DeferredEntity>>;

#[derive(Clone, Default)]
pub struct LocalCatalog {
    state: Arc<RwLock<Registrations>>,
    output_dir: Option<PathBuf>,
}

impl LocalCatalog {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a catalog mirrored to `output_dir`, loading every
    /// `<location_key>.yaml` snapshot already there. A missing directory is
    /// an empty catalog.
    pub async fn file_backed(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        let state = load_snapshots(&output_dir).await?;
        Ok(Self {
            state: Arc::new(RwLock::new(state)),
            output_dir: Some(output_dir),
        })
    }

    /// Connection handed to the provider registered under `location_key`.
    pub fn connection(&self, location_key: impl Into<String>) -> CatalogConnection {
        CatalogConnection {
            catalog: self.clone(),
            location_key: location_key.into(),
        }
    }

    pub async fn entities(&self, location_key: &str) -> Vec<Entity> {
        let state = self.state.read().await;
        state
            .get(location_key)
            .map(|entities| entities.values().map(|d| d.entity.clone()).collect())
            .unwrap_or_default()
    }

    pub async fn entity(&self, entity_ref: &str) -> Option<Entity> {
        let state = self.state.read().await;
        state
            .values()
            .find_map(|entities| entities.get(entity_ref))
            .map(|d| d.entity.clone())
    }

    pub async fn count(&self) -> usize {
        self.state.read().await.values().map(BTreeMap::len).sum()
    }

    /// Apply a mutation on behalf of `location_key`.
    pub async fn apply(&self, location_key: &str, mutation: EntityMutation) -> Result<SnapshotDiff> {
        let snapshot = {
            let mut state = self.state.write().await;
            let current = state.remove(location_key).unwrap_or_default();

            let (next, diff) = match mutation {
                EntityMutation::Full { entities } => replace_all(&current, entities),
                EntityMutation::Delta { added, removed } => apply_delta(current, added, removed),
            };

            info!(
                location_key,
                added = diff.added.len(),
                removed = diff.removed.len(),
                retained = diff.retained.len(),
                "Applied catalog mutation"
            );

            let snapshot: Vec<Entity> = next.values().map(|d| d.entity.clone()).collect();
            state.insert(location_key.to_string(), next);
            (snapshot, diff)
        };

        let (entities, diff) = snapshot;
        self.persist(location_key, &entities).await?;
        Ok(diff)
    }

    async fn persist(&self, location_key: &str, entities: &[Entity]) -> Result<()> {
        let Some(dir) = &self.output_dir else {
            return Ok(());
        };

        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create catalog directory {:?}", dir))?;

        let mut documents = Vec::with_capacity(entities.len());
        for entity in entities {
            documents.push(serde_yaml::to_string(entity).context("Failed to serialize entity")?);
        }

        let path = dir.join(format!("{}.yaml", location_key));
        tokio::fs::write(&path, documents.join("---\n"))
            .await
            .with_context(|| format!("Failed to write catalog snapshot {:?}", path))?;

        debug!(path = ?path, entities = entities.len(), "Wrote catalog snapshot");
        Ok(())
    }
}

async fn load_snapshots(dir: &Path) -> Result<Registrations> {
    let mut registrations = Registrations::new();
    if !tokio::fs::try_exists(dir).await.unwrap_or(false) {
        return Ok(registrations);
    }

    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to read catalog directory {:?}", dir))?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
            continue;
        }
        let Some(location_key) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
            continue;
        };

        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read catalog snapshot {:?}", path))?;
        let entities = parse_snapshot(&content).with_context(|| format!("Invalid catalog snapshot {:?}", path))?;

        debug!(path = ?path, entities = entities.len(), "Loaded catalog snapshot");
        let snapshot = entities
            .into_iter()
            .map(|entity| {
                let deferred = DeferredEntity {
                    entity,
                    location_key: location_key.clone(),
                };
                (deferred.entity.entity_ref(), deferred)
            })
            .collect();
        registrations.insert(location_key, snapshot);
    }

    Ok(registrations)
}

fn parse_snapshot(content: &str) -> Result<Vec<Entity>> {
    let mut entities = Vec::new();
    for document in serde_yaml::Deserializer::from_str(content) {
        let value = serde_yaml::Value::deserialize(document)?;
        if value.is_null() {
            continue;
        }
        entities.push(serde_yaml::from_value(value)?);
    }
    Ok(entities)
}

fn apply_delta(
    mut current: BTreeMap<String, DeferredEntity>,
    added: Vec<DeferredEntity>,
    removed: Vec<DeferredEntity>,
) -> (BTreeMap<String, DeferredEntity>, SnapshotDiff) {
    let mut diff = SnapshotDiff::default();

    for deferred in removed {
        let key = deferred.entity.entity_ref();
        if current.remove(&key).is_some() {
            diff.removed.push(key);
        }
    }
    for deferred in added {
        let key = deferred.entity.entity_ref();
        if current.insert(key.clone(), deferred).is_some() {
            diff.retained.push(key);
        } else {
            diff.added.push(key);
        }
    }

    (current, diff)
}

#[async_trait]
impl CatalogRegistrar for LocalCatalog {
    async fn register(&self, entity: Entity) -> Result<String> {
        let entity_ref = entity.entity_ref();
        let deferred = DeferredEntity {
            entity,
            location_key: REGISTRAR_LOCATION_KEY.to_string(),
        };
        self.apply(
            REGISTRAR_LOCATION_KEY,
            EntityMutation::Delta {
                added: vec![deferred],
                removed: vec![],
            },
        )
        .await?;
        Ok(entity_ref)
    }
}

/// A provider-scoped handle onto a [`LocalCatalog`].
#[derive(Clone)]
pub struct CatalogConnection {
    catalog: LocalCatalog,
    location_key: String,
}

#[async_trait]
impl EntityProviderConnection for CatalogConnection {
    async fn apply_mutation(&self, mutation: EntityMutation) -> Result<()> {
        self.catalog.apply(&self.location_key, mutation).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::CORE_API_VERSION;

    fn deferred(kind: &str, name: &str, key: &str) -> DeferredEntity {
        DeferredEntity {
            entity: Entity::new(CORE_API_VERSION, kind, name),
            location_key: key.to_string(),
        }
    }

    #[tokio::test]
    async fn test_full_mutation_replaces_provider_snapshot() {
        let catalog = LocalCatalog::in_memory();
        let conn = catalog.connection("aap-orgs");

        conn.apply_mutation(EntityMutation::full(vec![
            deferred("Group", "a", "aap-orgs"),
            deferred("Group", "b", "aap-orgs"),
        ]))
        .await
        .unwrap();
        assert_eq!(catalog.entities("aap-orgs").await.len(), 2);

        conn.apply_mutation(EntityMutation::full(vec![deferred("Group", "c", "aap-orgs")]))
            .await
            .unwrap();
        let names: Vec<_> = catalog
            .entities("aap-orgs")
            .await
            .into_iter()
            .map(|e| e.metadata.name)
            .collect();
        assert_eq!(names, vec!["c"]);
    }

    #[tokio::test]
    async fn test_providers_do_not_clobber_each_other() {
        let catalog = LocalCatalog::in_memory();
        catalog
            .connection("one")
            .apply_mutation(EntityMutation::full(vec![deferred("Group", "a", "one")]))
            .await
            .unwrap();
        catalog
            .connection("two")
            .apply_mutation(EntityMutation::full(vec![]))
            .await
            .unwrap();

        assert_eq!(catalog.count().await, 1);
        assert!(catalog.entity("group:default/a").await.is_some());
    }

    #[tokio::test]
    async fn test_delta_and_registrar() {
        let catalog = LocalCatalog::in_memory();
        let entity_ref = catalog
            .register(Entity::new(CORE_API_VERSION, "Component", "my-ee"))
            .await
            .unwrap();
        assert_eq!(entity_ref, "component:default/my-ee");

        let diff = catalog
            .apply(
                REGISTRAR_LOCATION_KEY,
                EntityMutation::Delta {
                    added: vec![],
                    removed: vec![deferred("Component", "my-ee", REGISTRAR_LOCATION_KEY)],
                },
            )
            .await
            .unwrap();
        assert_eq!(diff.removed, vec!["component:default/my-ee"]);
        assert_eq!(catalog.count().await, 0);
    }

    #[tokio::test]
    async fn test_file_backed_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = LocalCatalog::file_backed(dir.path()).await.unwrap();

        catalog
            .connection("aap-orgs")
            .apply_mutation(EntityMutation::full(vec![
                deferred("Group", "a", "aap-orgs"),
                deferred("User", "u", "aap-orgs"),
            ]))
            .await
            .unwrap();

        let written = std::fs::read_to_string(dir.path().join("aap-orgs.yaml")).unwrap();
        let docs: Vec<Entity> = serde_yaml::Deserializer::from_str(&written)
            .map(|doc| Entity::deserialize(doc).unwrap())
            .collect();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].kind, "Group");
    }

    #[tokio::test]
    async fn test_registrations_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();

        let first = LocalCatalog::file_backed(dir.path()).await.unwrap();
        first
            .register(Entity::new(CORE_API_VERSION, "Component", "first-ee"))
            .await
            .unwrap();

        let second = LocalCatalog::file_backed(dir.path()).await.unwrap();
        assert!(second.entity("component:default/first-ee").await.is_some());
        second
            .register(Entity::new(CORE_API_VERSION, "Component", "second-ee"))
            .await
            .unwrap();

        let reopened = LocalCatalog::file_backed(dir.path()).await.unwrap();
        let names: Vec<String> = reopened
            .entities(REGISTRAR_LOCATION_KEY)
            .await
            .into_iter()
            .map(|e| e.metadata.name)
            .collect();
        assert_eq!(names, vec!["first-ee", "second-ee"]);
    }

    #[tokio::test]
    async fn test_missing_directory_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = LocalCatalog::file_backed(dir.path().join("not-yet")).await.unwrap();
        assert_eq!(catalog.count().await, 0);
    }

    #[tokio::test]
    async fn test_reopened_snapshot_is_retained_on_full_sync() {
        let dir = tempfile::tempdir().unwrap();
        LocalCatalog::file_backed(dir.path())
            .await
            .unwrap()
            .connection("aap-orgs")
            .apply_mutation(EntityMutation::full(vec![deferred("Group", "a", "aap-orgs")]))
            .await
            .unwrap();

        let catalog = LocalCatalog::file_backed(dir.path()).await.unwrap();
        let diff = catalog
            .apply("aap-orgs", EntityMutation::full(vec![deferred("Group", "a", "aap-orgs")]))
            .await
            .unwrap();
        assert!(diff.is_noop());
        assert_eq!(diff.retained, vec!["group:default/a"]);
    }
}
