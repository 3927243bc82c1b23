// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! End-to-end catalog sync: providers read a mocked AAP and publish into a
//! file-backed local catalog.

use mockito::{Matcher, Server, ServerGuard};
use rhaap_core::application::entity_provider::{
    AapEntityProvider, AapJobTemplateProvider, EntityProvider, ProviderError,
};
use rhaap_core::domain::catalog::{DeferredEntity, Entity, EntityMutation, EntityProviderConnection, CORE_API_VERSION};
use rhaap_core::domain::config::{ProviderConfig, ProviderKind, ScheduleConfig};
use rhaap_core::infrastructure::aap_client::AapClient;
use rhaap_core::infrastructure::catalog_store::LocalCatalog;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

fn provider_config(name: &str, kind: ProviderKind, orgs: &[&str]) -> ProviderConfig {
    ProviderConfig {
        name: name.to_string(),
        kind,
        orgs: orgs.iter().map(|o| o.to_string()).collect(),
        schedule: ScheduleConfig::default(),
        surveys_enabled: true,
    }
}

fn source(server: &ServerGuard) -> Arc<rhaap_core::infrastructure::aap_client::AuthenticatedAapClient> {
    Arc::new(AapClient::new(server.url()).unwrap().with_token("service-token"))
}

async fn json_mock(server: &mut ServerGuard, path: &str, body: serde_json::Value) -> mockito::Mock {
    server
        .mock("GET", path)
        .match_query(Matcher::Any)
        .match_header("authorization", "Bearer service-token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create_async()
        .await
}

fn user(id: u64, username: &str, first: &str, last: &str) -> serde_json::Value {
    json!({ "id": id, "username": username, "first_name": first, "last_name": last, "email": format!("{}@example.com", username) })
}

#[tokio::test]
async fn test_entity_provider_publishes_filtered_org_tree() {
    let mut server = Server::new_async().await;
    let dir = TempDir::new().unwrap();

    json_mock(
        &mut server,
        "/api/gateway/v1/organizations/",
        json!({ "next": null, "results": [
            { "id": 1, "name": "Default", "description": "Default org" },
            { "id": 2, "name": "Other" }
        ]}),
    )
    .await;
    let teams = server
        .mock("GET", "/api/gateway/v1/teams/")
        .match_query(Matcher::UrlEncoded("organization".into(), "1".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "next": null, "results": [{ "id": 10, "name": "Ops", "organization": 1 }] }).to_string())
        .expect(1)
        .create_async()
        .await;
    json_mock(
        &mut server,
        "/api/gateway/v1/organizations/1/users/",
        json!({ "next": null, "results": [user(1, "alice", "Alice", "Smith"), user(2, "bob", "", "")] }),
    )
    .await;
    json_mock(
        &mut server,
        "/api/gateway/v1/teams/10/users/",
        json!({ "next": null, "results": [user(1, "alice", "Alice", "Smith")] }),
    )
    .await;

    let catalog = LocalCatalog::file_backed(dir.path()).await.unwrap();
    let provider = AapEntityProvider::new(
        provider_config("aap-orgs", ProviderKind::Organizations, &["default"]),
        source(&server),
    );
    provider.connect(Arc::new(catalog.connection("aap-orgs"))).await;

    let summary = provider.run().await.unwrap();
    assert_eq!(summary.entity_count, 4);
    assert_eq!(catalog.entities("aap-orgs").await.len(), 4);
    teams.assert_async().await;

    let org = catalog.entity("group:default/default").await.unwrap();
    assert_eq!(org.spec["type"], "organization");
    assert_eq!(org.spec["children"], json!(["default-ops"]));
    assert_eq!(org.spec["members"], json!(["alice", "bob"]));

    let team = catalog.entity("group:default/default-ops").await.unwrap();
    assert_eq!(team.spec["parent"], "default");

    let alice = catalog.entity("user:default/alice").await.unwrap();
    assert_eq!(alice.metadata.title.as_deref(), Some("Alice Smith"));
    assert_eq!(alice.spec["memberOf"], json!(["default", "default-ops"]));
    let bob = catalog.entity("user:default/bob").await.unwrap();
    assert_eq!(bob.spec["profile"]["displayName"], "bob");

    assert!(catalog.entity("group:default/other").await.is_none());

    let snapshot = std::fs::read_to_string(dir.path().join("aap-orgs.yaml")).unwrap();
    assert_eq!(snapshot.matches("kind: Group").count(), 2);
    assert_eq!(snapshot.matches("kind: User").count(), 2);
}

#[tokio::test]
async fn test_failed_fetch_keeps_previous_snapshot() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/gateway/v1/organizations/")
        .match_query(Matcher::Any)
        .with_status(502)
        .with_body("bad gateway")
        .create_async()
        .await;

    let catalog = LocalCatalog::in_memory();
    let connection = catalog.connection("aap-orgs");
    connection
        .apply_mutation(EntityMutation::full(vec![DeferredEntity {
            entity: Entity::new(CORE_API_VERSION, "Group", "existing"),
            location_key: "aap-orgs".to_string(),
        }]))
        .await
        .unwrap();

    let provider = AapEntityProvider::new(
        provider_config("aap-orgs", ProviderKind::Organizations, &[]),
        source(&server),
    );
    provider.connect(Arc::new(connection)).await;

    let err = provider.run().await.unwrap_err();
    assert!(matches!(err, ProviderError::Fetch { .. }));
    assert!(catalog.entity("group:default/existing").await.is_some());
    assert_eq!(catalog.count().await, 1);
}

#[tokio::test]
async fn test_job_template_provider_replaces_removed_templates() {
    let mut server = Server::new_async().await;

    let first = server
        .mock("GET", "/api/controller/v2/job_templates/")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({ "next": null, "results": [{
                "id": 7,
                "name": "Deploy App",
                "description": "Roll out the app",
                "survey_enabled": true,
                "ask_limit_on_launch": true,
                "summary_fields": { "organization": { "id": 1, "name": "Default" } }
            }]})
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;
    let second = server
        .mock("GET", "/api/controller/v2/job_templates/")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "next": null, "results": [] }).to_string())
        .expect(1)
        .create_async()
        .await;
    let survey = server
        .mock("GET", "/api/controller/v2/job_templates/7/survey_spec/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "name": "Deploy",
                "spec": [{ "variable": "env", "question_name": "Environment", "type": "multiplechoice",
                           "choices": "dev\nprod", "required": true }]
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let catalog = LocalCatalog::in_memory();
    let provider = AapJobTemplateProvider::new(
        provider_config("aap-templates", ProviderKind::JobTemplates, &[]),
        source(&server),
    );
    provider.connect(Arc::new(catalog.connection("aap-templates"))).await;

    provider.run().await.unwrap();
    let template = catalog.entity("template:default/default-deploy-app").await.unwrap();
    assert_eq!(template.spec["owner"], "default");
    let survey_page = &template.spec["parameters"][0];
    assert_eq!(survey_page["properties"]["env"]["enum"], json!(["dev", "prod"]));
    assert_eq!(survey_page["required"], json!(["env"]));
    assert!(template.spec["parameters"][1]["properties"].get("limit").is_some());

    let summary = provider.run().await.unwrap();
    assert_eq!(summary.entity_count, 0);
    assert!(catalog.entity("template:default/default-deploy-app").await.is_none());

    first.assert_async().await;
    second.assert_async().await;
    survey.assert_async().await;
}

#[tokio::test]
async fn test_run_before_connect_is_rejected() {
    let server = Server::new_async().await;
    let provider = AapJobTemplateProvider::new(
        provider_config("aap-templates", ProviderKind::JobTemplates, &[]),
        source(&server),
    );
    let err = provider.run().await.unwrap_err();
    assert!(matches!(err, ProviderError::NotInitialized));
}

#[tokio::test]
async fn test_same_template_name_in_two_orgs_keeps_both() {
    let mut server = Server::new_async().await;
    json_mock(
        &mut server,
        "/api/controller/v2/job_templates/",
        json!({ "next": null, "results": [
            { "id": 1, "name": "Deploy", "summary_fields": { "organization": { "id": 10, "name": "A" } } },
            { "id": 2, "name": "Deploy", "summary_fields": { "organization": { "id": 20, "name": "B" } } }
        ]}),
    )
    .await;

    let catalog = LocalCatalog::in_memory();
    let provider = AapJobTemplateProvider::new(
        provider_config("aap-templates", ProviderKind::JobTemplates, &[]),
        source(&server),
    );
    provider.connect(Arc::new(catalog.connection("aap-templates"))).await;

    let summary = provider.run().await.unwrap();
    let stored = catalog.entities("aap-templates").await;
    assert_eq!(summary.entity_count, 2);
    assert_eq!(stored.len(), 2);

    let a = catalog.entity("template:default/a-deploy").await.unwrap();
    let b = catalog.entity("template:default/b-deploy").await.unwrap();
    assert_eq!(a.spec["steps"][0]["input"]["values"]["template"]["id"], 1);
    assert_eq!(b.spec["steps"][0]["input"]["values"]["template"]["id"], 2);
}
