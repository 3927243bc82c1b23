// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Catalog Entity Model
//!
//! Descriptor documents (`apiVersion` / `kind` / `metadata` / `spec`) handed
//! to the software catalog, and the mutation envelope providers use to
//! publish them.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Backend-agnostic catalog entity and snapshot semantics
//!
//! A provider owns its entities wholesale: every sync publishes a
//! [`EntityMutation::Full`] snapshot and [`replace_all`] decides what the
//! catalog keeps.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const CORE_API_VERSION: &str = "backstage.io/v1alpha1";
pub const SCAFFOLDER_API_VERSION: &str = "scaffolder.backstage.io/v1beta3";
pub const DEFAULT_NAMESPACE: &str = "default";

pub const ANNOTATION_LOCATION: &str = "backstage.io/managed-by-location";
pub const ANNOTATION_ORIGIN_LOCATION: &str = "backstage.io/managed-by-origin-location";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityLink {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityMetadata {
    pub name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<EntityLink>,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: EntityMetadata,
    #[serde(default)]
    pub spec: serde_json::Value,
}

impl Entity {
    pub fn new(api_version: &str, kind: &str, name: impl Into<String>) -> Self {
        Self {
            api_version: api_version.to_string(),
            kind: kind.to_string(),
            metadata: EntityMetadata {
                name: name.into(),
                namespace: default_namespace(),
                ..Default::default()
            },
            spec: serde_json::Value::Object(Default::default()),
        }
    }

    /// `kind:namespace/name`, lower-cased the way the catalog compares refs.
    pub fn entity_ref(&self) -> String {
        format!(
            "{}:{}/{}",
            self.kind.to_lowercase(),
            self.metadata.namespace.to_lowercase(),
            self.metadata.name.to_lowercase()
        )
    }

    /// Stamp both location annotations with the same `url:` target.
    pub fn with_location(mut self, url: &str) -> Self {
        let location = format!("url:{}", url);
        self.metadata
            .annotations
            .insert(ANNOTATION_LOCATION.to_string(), location.clone());
        self.metadata
            .annotations
            .insert(ANNOTATION_ORIGIN_LOCATION.to_string(), location);
        self
    }
}

/// Entity plus the key of the provider location that owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeferredEntity {
    pub entity: Entity,
    #[serde(rename = "locationKey")]
    pub location_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EntityMutation {
    /// Replace everything the provider previously emitted.
    Full { entities: Vec<DeferredEntity> },
    Delta {
        added: Vec<DeferredEntity>,
        removed: Vec<DeferredEntity>,
    },
}

impl EntityMutation {
    pub fn full(entities: Vec<DeferredEntity>) -> Self {
        Self::Full { entities }
    }
}

/// Sink a provider publishes mutations into.
#[async_trait]
pub trait EntityProviderConnection: Send + Sync {
    async fn apply_mutation(&self, mutation: EntityMutation) -> anyhow::Result<()>;
}

/// Registers a single entity outside of any provider's snapshot, used when a
/// scaffolded artifact is not published to source control.
#[async_trait]
pub trait CatalogRegistrar: Send + Sync {
    /// Returns the registered entity ref.
    async fn register(&self, entity: Entity) -> anyhow::Result<String>;
}

/// Outcome of applying a full snapshot to what a provider had registered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub retained: Vec<String>,
}

impl SnapshotDiff {
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Replace a provider's registrations with a fetched snapshot.
///
/// The returned set is exactly `fetched` (later duplicates of the same entity
/// ref win), so applying the same snapshot twice yields the same catalog.
pub fn replace_all(
    current: &BTreeMap<String, DeferredEntity>,
    fetched: Vec<DeferredEntity>,
) -> (BTreeMap<String, DeferredEntity>, SnapshotDiff) {
    let mut next = BTreeMap::new();
    for deferred in fetched {
        next.insert(deferred.entity.entity_ref(), deferred);
    }

    let before: BTreeSet<&String> = current.keys().collect();
    let after: BTreeSet<&String> = next.keys().collect();

    let diff = SnapshotDiff {
        added: after.difference(&before).map(|s| s.to_string()).collect(),
        removed: before.difference(&after).map(|s| s.to_string()).collect(),
        retained: after.intersection(&before).map(|s| s.to_string()).collect(),
    };

    (next, diff)
}

/// Turn an AAP display name into a catalog-safe entity name.
///
/// `"Default Org / QA"` becomes `"default-org-qa"`.
pub fn format_entity_name(raw: &str) -> String {
    let mut name = String::with_capacity(raw.len());
    let mut pending_dash = false;
    for ch in raw.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_dash && !name.is_empty() {
                name.push('-');
            }
            pending_dash = false;
            name.push(ch);
        } else {
            pending_dash = true;
        }
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deferred(kind: &str, name: &str) -> DeferredEntity {
        DeferredEntity {
            entity: Entity::new(CORE_API_VERSION, kind, name),
            location_key: "test-provider".to_string(),
        }
    }

    #[test]
    fn test_format_entity_name() {
        assert_eq!(format_entity_name("Default"), "default");
        assert_eq!(format_entity_name("Default Org / QA"), "default-org-qa");
        assert_eq!(format_entity_name("  --Edge__Team--  "), "edge-team");
        assert_eq!(format_entity_name("already-ok-1"), "already-ok-1");
    }

    #[test]
    fn test_entity_ref_is_lowercase() {
        let entity = Entity::new(CORE_API_VERSION, "Group", "Platform");
        assert_eq!(entity.entity_ref(), "group:default/platform");
    }

    #[test]
    fn test_full_mutation_serializes_with_type_tag() {
        let mutation = EntityMutation::full(vec![deferred("Group", "a")]);
        let json = serde_json::to_value(&mutation).unwrap();
        assert_eq!(json["type"], "full");
        assert_eq!(json["entities"][0]["locationKey"], "test-provider");
        assert_eq!(json["entities"][0]["entity"]["apiVersion"], CORE_API_VERSION);
    }

    #[test]
    fn test_replace_all_reports_diff() {
        let (current, _) = replace_all(
            &BTreeMap::new(),
            vec![deferred("Group", "a"), deferred("Group", "b")],
        );

        let (next, diff) = replace_all(&current, vec![deferred("Group", "b"), deferred("User", "c")]);

        assert_eq!(next.len(), 2);
        assert_eq!(diff.added, vec!["user:default/c"]);
        assert_eq!(diff.removed, vec!["group:default/a"]);
        assert_eq!(diff.retained, vec!["group:default/b"]);
    }

    #[test]
    fn test_replace_all_is_idempotent() {
        let snapshot = vec![deferred("Group", "a"), deferred("User", "u")];
        let (first, _) = replace_all(&BTreeMap::new(), snapshot.clone());
        let (second, diff) = replace_all(&first, snapshot);
        assert_eq!(first, second);
        assert!(diff.is_noop());
    }

    #[test]
    fn test_location_annotations() {
        let entity = Entity::new(CORE_API_VERSION, "Group", "a").with_location("https://aap/x");
        assert_eq!(
            entity.metadata.annotations.get(ANNOTATION_LOCATION).map(String::as_str),
            Some("url:https://aap/x")
        );
        assert_eq!(
            entity.metadata.annotations.get(ANNOTATION_ORIGIN_LOCATION),
            entity.metadata.annotations.get(ANNOTATION_LOCATION)
        );
    }
}
