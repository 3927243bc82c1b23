// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Scaffolder action tests driving `ansible:create:ee-definition` with the
//! JSON a template form submits.

use rhaap_core::application::ee_definition_action::{EeDefinitionAction, EeDefinitionInput};
use rhaap_core::domain::ee_definition::EeDefinition;
use rhaap_core::infrastructure::catalog_store::{LocalCatalog, REGISTRAR_LOCATION_KEY};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

fn form_input(value: serde_json::Value) -> EeDefinitionInput {
    serde_json::from_value(value).unwrap()
}

#[tokio::test]
async fn test_form_submission_registers_component() {
    let workspace = TempDir::new().unwrap();
    let catalog = LocalCatalog::in_memory();
    let action = EeDefinitionAction::new(workspace.path(), Arc::new(catalog.clone())).unwrap();

    let input = form_input(json!({
        "eeFileName": "network-ee",
        "eeDescription": "Network automation",
        "baseImage": "registry.redhat.io/ansible-automation-platform-25/ee-minimal-rhel9:latest",
        "collections": [{ "name": "ansible.netcommon", "version": "" }],
        "popularCollections": ["cisco.ios"],
        "collectionsFile": "collections:\n  - name: cisco.ios\n    version: 9.0.0\n",
        "pythonRequirements": ["netaddr"],
        "pythonRequirementsFile": "# comment\nnetaddr\njmespath\n",
        "systemPackages": ["git"],
        "additionalBuildSteps": [{ "stepType": "append_base", "commands": ["RUN echo hi"] }],
        "tags": ["network"],
        "owner": "group:default/netops"
    }));

    let output = action.execute(input).await.unwrap();

    assert_eq!(output.context_dir_name, "network-ee");
    assert_eq!(output.owner, "group:default/netops");
    assert_eq!(output.generated_entity_ref.as_deref(), Some("component:default/network-ee"));
    let definition: EeDefinition = serde_yaml::from_str(&output.ee_definition_content).unwrap();
    let collections = definition.dependencies.galaxy.unwrap().collections;
    assert!(collections.iter().any(|c| c.name == "ansible.netcommon" && c.version.is_none()));
    // The unpinned form entry beats the file's 9.0.0 pin
    let ios = collections.iter().find(|c| c.name == "cisco.ios").unwrap();
    assert_eq!(ios.version, None);
    assert!(!output.ee_definition_content.contains("9.0.0"));
    assert!(output.ee_definition_content.contains("jmespath"));
    assert!(output.ee_definition_content.contains("microdnf"));
    assert!(output.ee_definition_content.contains("RUN echo hi"));

    let dir = workspace.path().join("network-ee");
    for file in ["network-ee.yaml", "README.md", "ansible.cfg", "docs/index.md", "network-ee-template.yaml"] {
        assert!(dir.join(file).is_file(), "missing {}", file);
    }
    assert!(!dir.join("catalog-info.yaml").exists());
    assert!(!dir.join("mcp-vars.yaml").exists());

    let written = std::fs::read_to_string(dir.join("network-ee.yaml")).unwrap();
    assert_eq!(written, output.ee_definition_content);

    let registered = catalog.entities(REGISTRAR_LOCATION_KEY).await;
    assert_eq!(registered.len(), 1);
    assert_eq!(registered[0].spec["type"], "execution-environment");
    assert_eq!(registered[0].spec["owner"], "group:default/netops");
}

#[tokio::test]
async fn test_publish_to_scm_writes_catalog_info_instead() {
    let workspace = TempDir::new().unwrap();
    let catalog = LocalCatalog::in_memory();
    let action = EeDefinitionAction::new(workspace.path(), Arc::new(catalog.clone())).unwrap();

    let input = form_input(json!({
        "eeFileName": "mcp-ee",
        "baseImage": "custom",
        "customBaseImage": "quay.io/example/ee-base:1.0",
        "mcpServers": ["github", "aws"],
        "publishToSCM": true,
        "sourceControlProvider": "Github"
    }));

    let output = action.execute(input).await.unwrap();

    assert_eq!(output.owner, "user:default/guest");
    assert!(output.generated_entity_ref.is_none());
    assert_eq!(catalog.count().await, 0);
    assert!(output.ee_definition_content.contains("quay.io/example/ee-base:1.0"));
    assert!(output.ee_definition_content.contains("ansible.mcp_builder"));
    assert!(output.ee_definition_content.contains("install_mcp"));

    let dir = workspace.path().join("mcp-ee");
    let catalog_info = std::fs::read_to_string(dir.join("catalog-info.yaml")).unwrap();
    assert!(catalog_info.contains("kind: Component"));
    assert!(catalog_info.contains("aap.ansible.com/scm-provider: Github"));

    let vars = std::fs::read_to_string(dir.join("mcp-vars.yaml")).unwrap();
    assert!(vars.contains("github"));
    assert!(vars.contains("aws"));
}

#[tokio::test]
async fn test_invalid_collections_file_writes_nothing() {
    let workspace = TempDir::new().unwrap();
    let action = EeDefinitionAction::new(workspace.path(), Arc::new(LocalCatalog::in_memory())).unwrap();

    let input = form_input(json!({
        "eeFileName": "broken-ee",
        "baseImage": "registry.example.com/ee:latest",
        "collectionsFile": "collections:\n  - version: 1.0.0\n"
    }));

    let err = action.execute(input).await.unwrap_err();
    assert!(err.to_string().starts_with("ansible:create:ee-definition: "));
    assert!(!workspace.path().join("broken-ee").exists());
}

#[tokio::test]
async fn test_registrations_accumulate_across_runs() {
    let workspace = TempDir::new().unwrap();
    let catalog_dir = TempDir::new().unwrap();

    for name in ["first-ee", "second-ee"] {
        let catalog = LocalCatalog::file_backed(catalog_dir.path()).await.unwrap();
        let action = EeDefinitionAction::new(workspace.path(), Arc::new(catalog)).unwrap();
        action
            .execute(form_input(json!({
                "eeFileName": name,
                "baseImage": "registry.example.com/ee:latest"
            })))
            .await
            .unwrap();
    }

    let snapshot =
        std::fs::read_to_string(catalog_dir.path().join(format!("{}.yaml", REGISTRAR_LOCATION_KEY))).unwrap();
    assert!(snapshot.contains("first-ee"));
    assert!(snapshot.contains("second-ee"));

    let catalog = LocalCatalog::file_backed(catalog_dir.path()).await.unwrap();
    assert_eq!(catalog.entities(REGISTRAR_LOCATION_KEY).await.len(), 2);
}
