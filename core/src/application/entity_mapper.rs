// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Entity Mapper
//!
//! Pure functions turning AAP resources into catalog entity descriptors.
//!
//! # Architecture
//!
//! - **Layer:** Application
//! - **Purpose:** Anti-corruption layer between AAP documents and the catalog
//! - **Integration:** Entity providers → `EntityMutation::Full`
//!
//! # Mapping
//!
//! | AAP resource | Entity | Name |
//! |--------------|--------|------|
//! | Organization | `Group` (type `organization`) | `<org>` |
//! | Team | `Group` (type `team`) | `<org>-<team>` |
//! | User | `User` | `<username>` |
//! | Job template | `Template` (scaffolder) | `<org>-<template>` |
//!
//! Names pass through [`format_entity_name`]. Teams and job templates are
//! prefixed with their organization because AAP only enforces name
//! uniqueness per organization. Users and job templates whose formatted
//! names still clash within one snapshot get an `-<id>` suffix, see
//! [`unique_entity_names`].

use crate::domain::aap::{InstanceGroup, JobTemplate, Organization, SurveyQuestion, SurveySpec, Team, User};
use crate::domain::catalog::{
    format_entity_name, Entity, EntityLink, CORE_API_VERSION, SCAFFOLDER_API_VERSION,
};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};

pub const ANNOTATION_AAP_ID: &str = "aap.ansible.com/id";
pub const ANNOTATION_AAP_ORGANIZATION: &str = "aap.ansible.com/organization";
pub const ANNOTATION_AAP_SUPERUSER: &str = "aap.ansible.com/is-superuser";
pub const ANNOTATION_JOB_TEMPLATE_ID: &str = "aap.ansible.com/job-template-id";

pub const GROUP_TYPE_ORGANIZATION: &str = "organization";
pub const GROUP_TYPE_TEAM: &str = "team";
pub const TEMPLATE_TYPE_JOB_TEMPLATE: &str = "job-template";

/// Scaffolder action the generated templates invoke.
pub const LAUNCH_ACTION_ID: &str = "rhaap:launch-job-template";
const LAUNCH_STEP_ID: &str = "launch-job";

pub fn organization_group_name(org: &Organization) -> String {
    format_entity_name(&org.name)
}

pub fn team_group_name(org_name: &str, team_name: &str) -> String {
    format_entity_name(&format!("{} {}", org_name, team_name))
}

pub fn user_entity_name(user: &User) -> String {
    format_entity_name(&user.username)
}

pub fn job_template_entity_name(template: &JobTemplate) -> String {
    match &template.summary_fields.organization {
        Some(org) => format_entity_name(&format!("{} {}", org.name, template.name)),
        None => format_entity_name(&template.name),
    }
}

/// Resolve `(id, name)` candidates to names unique across the batch.
///
/// Every id whose name is shared with a different id gets `<name>-<id>`, so
/// the result does not depend on fetch order.
pub fn unique_entity_names<I>(candidates: I) -> BTreeMap<u64, String>
where
    I: IntoIterator<Item = (u64, String)>,
{
    let candidates: BTreeMap<u64, String> = candidates.into_iter().collect();

    let mut owners: HashMap<&str, usize> = HashMap::new();
    for name in candidates.values() {
        *owners.entry(name.as_str()).or_default() += 1;
    }

    candidates
        .iter()
        .map(|(id, name)| {
            let unique = if owners.get(name.as_str()).copied().unwrap_or(0) > 1 {
                format!("{}-{}", name, id)
            } else {
                name.clone()
            };
            (*id, unique)
        })
        .collect()
}

fn link(url: String, title: &str) -> EntityLink {
    EntityLink {
        url,
        title: Some(title.to_string()),
        icon: None,
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

// ============================================================================
// Organizations, teams and users
// ============================================================================

pub fn organization_to_group(
    org: &Organization,
    base_url: &str,
    children: &[String],
    members: &[String],
) -> Entity {
    let mut entity = Entity::new(CORE_API_VERSION, "Group", organization_group_name(org))
        .with_location(base_url);
    entity.metadata.title = Some(org.name.clone());
    entity.metadata.description = non_empty(&org.description);
    entity
        .metadata
        .annotations
        .insert(ANNOTATION_AAP_ID.to_string(), org.id.to_string());
    entity.metadata.links.push(link(
        format!("{}/access/organizations/{}/details", base_url, org.id),
        "View in AAP",
    ));

    let mut profile = Map::new();
    profile.insert("displayName".to_string(), json!(org.name));
    if let Some(description) = non_empty(&org.description) {
        profile.insert("description".to_string(), json!(description));
    }

    entity.spec = json!({
        "type": GROUP_TYPE_ORGANIZATION,
        "profile": profile,
        "children": children,
        "members": members,
    });
    entity
}

pub fn team_to_group(team: &Team, org: &Organization, base_url: &str, members: &[String]) -> Entity {
    let mut entity = Entity::new(CORE_API_VERSION, "Group", team_group_name(&org.name, &team.name))
        .with_location(base_url);
    entity.metadata.title = Some(team.name.clone());
    entity.metadata.description = non_empty(&team.description);
    entity
        .metadata
        .annotations
        .insert(ANNOTATION_AAP_ID.to_string(), team.id.to_string());
    entity
        .metadata
        .annotations
        .insert(ANNOTATION_AAP_ORGANIZATION.to_string(), org.name.clone());
    entity.metadata.links.push(link(
        format!("{}/access/teams/{}/details", base_url, team.id),
        "View in AAP",
    ));

    entity.spec = json!({
        "type": GROUP_TYPE_TEAM,
        "profile": { "displayName": team.name },
        "parent": organization_group_name(org),
        "children": [],
        "members": members,
    });
    entity
}

pub fn user_to_entity(user: &User, name: &str, base_url: &str, member_of: &[String]) -> Entity {
    let mut entity = Entity::new(CORE_API_VERSION, "User", name).with_location(base_url);
    entity.metadata.title = Some(user.display_name());
    entity
        .metadata
        .annotations
        .insert(ANNOTATION_AAP_ID.to_string(), user.id.to_string());
    entity
        .metadata
        .annotations
        .insert(ANNOTATION_AAP_SUPERUSER.to_string(), user.is_superuser.to_string());

    let mut profile = Map::new();
    profile.insert("username".to_string(), json!(user.username));
    profile.insert("displayName".to_string(), json!(user.display_name()));
    if let Some(email) = non_empty(&user.email) {
        profile.insert("email".to_string(), json!(email));
    }

    entity.spec = json!({
        "profile": profile,
        "memberOf": member_of,
    });
    entity
}

// ============================================================================
// Job templates
// ============================================================================

/// Map a job template to a scaffolder `Template` whose form collects the
/// survey answers and prompt-on-launch values, then launches the job.
pub fn job_template_to_template(
    template: &JobTemplate,
    name: &str,
    survey: Option<&SurveySpec>,
    instance_groups: &[InstanceGroup],
    base_url: &str,
) -> Entity {
    let mut entity = Entity::new(SCAFFOLDER_API_VERSION, "Template", name).with_location(base_url);
    entity.metadata.title = Some(template.name.clone());
    entity.metadata.description = non_empty(&template.description);
    entity
        .metadata
        .annotations
        .insert(ANNOTATION_JOB_TEMPLATE_ID.to_string(), template.id.to_string());
    if let Some(org) = &template.summary_fields.organization {
        entity
            .metadata
            .annotations
            .insert(ANNOTATION_AAP_ORGANIZATION.to_string(), org.name.clone());
    }
    entity.metadata.tags = template
        .summary_fields
        .labels
        .results
        .iter()
        .map(|label| format_entity_name(&label.name))
        .filter(|tag| !tag.is_empty())
        .collect();
    entity.metadata.links.push(link(
        format!("{}/execution/templates/job-template/{}/details", base_url, template.id),
        "View in AAP",
    ));

    let owner = template
        .summary_fields
        .organization
        .as_ref()
        .map(|org| format_entity_name(&org.name))
        .unwrap_or_else(|| "unknown".to_string());

    let mut parameters = Vec::new();
    let mut extra_variables = Map::new();

    if let Some(survey) = survey.filter(|s| !s.spec.is_empty()) {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for question in &survey.spec {
            properties.insert(question.variable.clone(), survey_question_schema(question));
            if question.required {
                required.push(question.variable.clone());
            }
            extra_variables.insert(question.variable.clone(), json!(parameter_ref(&question.variable)));
        }
        let title = non_empty(&survey.name).unwrap_or_else(|| "Survey".to_string());
        let mut page = json!({ "title": title, "properties": properties, "required": required });
        if let Some(description) = non_empty(&survey.description) {
            page["description"] = json!(description);
        }
        parameters.push(page);
    }

    let (launch_properties, mut launch_input) = launch_prompts(template, instance_groups);
    if !launch_properties.is_empty() {
        parameters.push(json!({ "title": "Launch options", "properties": launch_properties }));
    }

    launch_input.insert(
        "template".to_string(),
        json!({ "id": template.id, "name": template.name }),
    );
    if !extra_variables.is_empty() {
        launch_input.insert("extra_variables".to_string(), Value::Object(extra_variables));
    }

    entity.spec = json!({
        "type": TEMPLATE_TYPE_JOB_TEMPLATE,
        "owner": owner,
        "parameters": parameters,
        "steps": [{
            "id": LAUNCH_STEP_ID,
            "name": format!("Launch {}", template.name),
            "action": LAUNCH_ACTION_ID,
            "input": { "values": launch_input },
        }],
        "output": {
            "links": [{
                "title": "View job output",
                "url": format!("${{{{ steps['{}'].output.data.url }}}}", LAUNCH_STEP_ID),
            }],
        },
    });
    entity
}

/// `${{ parameters.<name> }}`
fn parameter_ref(name: &str) -> String {
    format!("${{{{ parameters.{} }}}}", name)
}

/// Form fields and launch step inputs for every prompt-on-launch flag.
fn launch_prompts(template: &JobTemplate, instance_groups: &[InstanceGroup]) -> (Map<String, Value>, Map<String, Value>) {
    let mut properties = Map::new();
    let mut input = Map::new();
    let summary = &template.summary_fields;

    let mut prompt = |key: &str, schema: Value| {
        properties.insert(key.to_string(), schema);
        input.insert(key.to_string(), json!(parameter_ref(key)));
    };

    if template.ask_inventory_on_launch {
        let mut schema = json!({ "title": "Inventory", "type": "integer", "description": "Inventory ID" });
        if let Some(inventory) = &summary.inventory {
            schema["default"] = json!(inventory.id);
        }
        prompt("inventory", schema);
    }
    if template.ask_credential_on_launch {
        let defaults: Vec<u64> = summary.credentials.iter().map(|c| c.id).collect();
        prompt(
            "credentials",
            json!({
                "title": "Credentials",
                "type": "array",
                "items": { "type": "integer" },
                "default": defaults,
            }),
        );
    }
    if template.ask_execution_environment_on_launch {
        let mut schema = json!({ "title": "Execution environment", "type": "integer" });
        if let Some(ee) = &summary.execution_environment {
            schema["default"] = json!(ee.id);
        }
        prompt("execution_environment", schema);
    }
    if template.ask_variables_on_launch {
        let mut schema = json!({ "title": "Extra variables", "type": "string", "ui:widget": "textarea" });
        if let Some(vars) = non_empty(&template.extra_vars) {
            schema["default"] = json!(vars);
        }
        prompt("extra_vars", schema);
    }
    if template.ask_limit_on_launch {
        prompt("limit", json!({ "title": "Limit", "type": "string" }));
    }
    if template.ask_verbosity_on_launch {
        prompt(
            "verbosity",
            json!({
                "title": "Verbosity",
                "type": "integer",
                "enum": [0, 1, 2, 3, 4],
                "default": 0,
            }),
        );
    }
    if template.ask_tags_on_launch {
        prompt("job_tags", json!({ "title": "Job tags", "type": "string" }));
    }
    if template.ask_skip_tags_on_launch {
        prompt("skip_tags", json!({ "title": "Skip tags", "type": "string" }));
    }
    if template.ask_instance_groups_on_launch {
        let mut items = json!({ "type": "integer" });
        if !instance_groups.is_empty() {
            items["enum"] = json!(instance_groups.iter().map(|g| g.id).collect::<Vec<_>>());
            items["enumNames"] = json!(instance_groups.iter().map(|g| g.name.clone()).collect::<Vec<_>>());
        }
        prompt(
            "instance_groups",
            json!({ "title": "Instance groups", "type": "array", "items": items, "uniqueItems": true }),
        );
    }

    (properties, input)
}

/// JSON-schema property for one survey question.
pub fn survey_question_schema(question: &SurveyQuestion) -> Value {
    let title = non_empty(&question.question_name).unwrap_or_else(|| question.variable.clone());
    let mut schema = Map::new();
    schema.insert("title".to_string(), json!(title));
    if let Some(description) = non_empty(&question.question_description) {
        schema.insert("description".to_string(), json!(description));
    }

    let choices = question.choice_list();
    match question.question_type.as_str() {
        "integer" | "float" => {
            let json_type = if question.question_type == "integer" { "integer" } else { "number" };
            schema.insert("type".to_string(), json!(json_type));
            if let Some(min) = question.min.as_ref().filter(|v| !v.is_null()) {
                schema.insert("minimum".to_string(), min.clone());
            }
            if let Some(max) = question.max.as_ref().filter(|v| !v.is_null()) {
                schema.insert("maximum".to_string(), max.clone());
            }
        }
        "multiplechoice" => {
            schema.insert("type".to_string(), json!("string"));
            schema.insert("enum".to_string(), json!(choices));
        }
        "multiselect" => {
            schema.insert("type".to_string(), json!("array"));
            schema.insert("items".to_string(), json!({ "type": "string", "enum": choices }));
            schema.insert("uniqueItems".to_string(), json!(true));
            schema.insert("ui:widget".to_string(), json!("checkboxes"));
        }
        other => {
            schema.insert("type".to_string(), json!("string"));
            match other {
                "textarea" => {
                    schema.insert("ui:widget".to_string(), json!("textarea"));
                }
                "password" => {
                    schema.insert("ui:field".to_string(), json!("Secret"));
                }
                _ => {}
            }
            if let Some(min) = question.min.as_ref().and_then(Value::as_u64) {
                schema.insert("minLength".to_string(), json!(min));
            }
            if let Some(max) = question.max.as_ref().and_then(Value::as_u64) {
                schema.insert("maxLength".to_string(), json!(max));
            }
        }
    }

    if let Some(default) = survey_default(question) {
        schema.insert("default".to_string(), default);
    }

    Value::Object(schema)
}

/// Defaults arrive as strings for every type; multiselect separates values
/// with newlines. Passwords never carry their default into the form.
fn survey_default(question: &SurveyQuestion) -> Option<Value> {
    if question.question_type == "password" {
        return None;
    }
    match &question.default {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => match question.question_type.as_str() {
            "integer" => s.trim().parse::<i64>().ok().map(Value::from),
            "float" => s.trim().parse::<f64>().ok().map(Value::from),
            "multiselect" => Some(json!(s
                .lines()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .collect::<Vec<_>>())),
            _ => Some(json!(s)),
        },
        other => Some(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aap::{JobTemplateSummary, LabelList, ResourceRef};

    fn org() -> Organization {
        Organization {
            id: 1,
            name: "Default Org".to_string(),
            description: "The default".to_string(),
            summary_fields: Value::Null,
        }
    }

    fn template() -> JobTemplate {
        serde_json::from_value(json!({
            "id": 7,
            "name": "Deploy App",
            "description": "Deploys the app",
            "survey_enabled": true,
            "ask_inventory_on_launch": true,
            "ask_verbosity_on_launch": true,
            "summary_fields": {
                "organization": { "id": 1, "name": "Default Org" },
                "inventory": { "id": 3, "name": "Demo Inventory" },
                "credentials": [],
                "labels": { "count": 1, "results": [{ "id": 1, "name": "Prod Ready" }] }
            }
        }))
        .unwrap()
    }

    fn question(value: Value) -> SurveyQuestion {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_organization_group() {
        let entity = organization_to_group(
            &org(),
            "https://aap.example.com",
            &["default-org-ops".to_string()],
            &["alice".to_string()],
        );
        assert_eq!(entity.kind, "Group");
        assert_eq!(entity.metadata.name, "default-org");
        assert_eq!(entity.metadata.title.as_deref(), Some("Default Org"));
        assert_eq!(entity.spec["type"], "organization");
        assert_eq!(entity.spec["children"], json!(["default-org-ops"]));
        assert_eq!(entity.spec["profile"]["description"], "The default");
        assert_eq!(
            entity.metadata.links[0].url,
            "https://aap.example.com/access/organizations/1/details"
        );
    }

    #[test]
    fn test_team_group_has_parent() {
        let team = Team {
            id: 4,
            name: "Ops".to_string(),
            description: String::new(),
            organization: Some(1),
            summary_fields: Value::Null,
        };
        let entity = team_to_group(&team, &org(), "https://aap", &[]);
        assert_eq!(entity.metadata.name, "default-org-ops");
        assert_eq!(entity.spec["type"], "team");
        assert_eq!(entity.spec["parent"], "default-org");
        assert!(entity.metadata.description.is_none());
    }

    #[test]
    fn test_user_entity() {
        let user = User {
            id: 9,
            username: "Alice.Smith".to_string(),
            first_name: "Alice".to_string(),
            last_name: "Smith".to_string(),
            email: "alice@example.com".to_string(),
            is_superuser: true,
        };
        let entity = user_to_entity(&user, &user_entity_name(&user), "https://aap", &["default-org".to_string()]);
        assert_eq!(entity.metadata.name, "alice-smith");
        assert_eq!(entity.spec["profile"]["displayName"], "Alice Smith");
        assert_eq!(entity.spec["profile"]["email"], "alice@example.com");
        assert_eq!(entity.spec["memberOf"], json!(["default-org"]));
        assert_eq!(
            entity.metadata.annotations.get(ANNOTATION_AAP_SUPERUSER).map(String::as_str),
            Some("true")
        );
    }

    #[test]
    fn test_survey_question_types() {
        let text = survey_question_schema(&question(json!({
            "variable": "app_name", "question_name": "App name", "type": "text",
            "required": true, "default": "demo", "min": 1, "max": 20
        })));
        assert_eq!(text["type"], "string");
        assert_eq!(text["default"], "demo");
        assert_eq!(text["maxLength"], 20);

        let int = survey_question_schema(&question(json!({
            "variable": "replicas", "type": "integer", "default": "3", "min": 1, "max": 10
        })));
        assert_eq!(int["type"], "integer");
        assert_eq!(int["default"], 3);
        assert_eq!(int["minimum"], 1);
        assert_eq!(int["title"], "replicas");

        let float = survey_question_schema(&question(json!({ "variable": "ratio", "type": "float" })));
        assert_eq!(float["type"], "number");

        let choice = survey_question_schema(&question(json!({
            "variable": "env", "type": "multiplechoice", "choices": "dev\nprod"
        })));
        assert_eq!(choice["enum"], json!(["dev", "prod"]));

        let multi = survey_question_schema(&question(json!({
            "variable": "regions", "type": "multiselect",
            "choices": ["eu", "us"], "default": "eu\nus"
        })));
        assert_eq!(multi["type"], "array");
        assert_eq!(multi["items"]["enum"], json!(["eu", "us"]));
        assert_eq!(multi["default"], json!(["eu", "us"]));

        let secret = survey_question_schema(&question(json!({
            "variable": "pw", "type": "password", "default": "$encrypted$"
        })));
        assert_eq!(secret["ui:field"], "Secret");
        assert!(secret.get("default").is_none());
    }

    #[test]
    fn test_job_template_to_template() {
        let survey = SurveySpec {
            name: String::new(),
            description: String::new(),
            spec: vec![question(json!({
                "variable": "app_name", "question_name": "App name", "type": "text", "required": true
            }))],
        };
        let name = job_template_entity_name(&template());
        let entity = job_template_to_template(&template(), &name, Some(&survey), &[], "https://aap");

        assert_eq!(entity.api_version, SCAFFOLDER_API_VERSION);
        assert_eq!(entity.kind, "Template");
        assert_eq!(entity.metadata.name, "default-org-deploy-app");
        assert_eq!(entity.metadata.tags, vec!["prod-ready"]);
        assert_eq!(entity.spec["owner"], "default-org");

        let parameters = entity.spec["parameters"].as_array().unwrap();
        assert_eq!(parameters.len(), 2);
        assert_eq!(parameters[0]["title"], "Survey");
        assert_eq!(parameters[0]["required"], json!(["app_name"]));
        assert_eq!(parameters[1]["properties"]["inventory"]["default"], 3);
        assert!(parameters[1]["properties"].get("limit").is_none());

        let step = &entity.spec["steps"][0];
        assert_eq!(step["action"], LAUNCH_ACTION_ID);
        assert_eq!(step["input"]["values"]["template"]["id"], 7);
        assert_eq!(step["input"]["values"]["inventory"], "${{ parameters.inventory }}");
        assert_eq!(
            step["input"]["values"]["extra_variables"]["app_name"],
            "${{ parameters.app_name }}"
        );
        assert_eq!(
            entity.spec["output"]["links"][0]["url"],
            "${{ steps['launch-job'].output.data.url }}"
        );
    }

    #[test]
    fn test_template_without_prompts_has_no_parameters() {
        let plain = JobTemplate {
            survey_enabled: false,
            ask_inventory_on_launch: false,
            ask_verbosity_on_launch: false,
            summary_fields: JobTemplateSummary {
                organization: None,
                labels: LabelList::default(),
                inventory: Some(ResourceRef { id: 3, name: "x".to_string() }),
                ..Default::default()
            },
            ..template()
        };
        assert_eq!(job_template_entity_name(&plain), "deploy-app");
        let entity = job_template_to_template(&plain, "deploy-app", None, &[], "https://aap");
        assert_eq!(entity.spec["parameters"], json!([]));
        assert_eq!(entity.spec["owner"], "unknown");
        assert!(entity.metadata.annotations.get(ANNOTATION_AAP_ORGANIZATION).is_none());
    }

    #[test]
    fn test_unique_entity_names() {
        let names = unique_entity_names(vec![
            (3, "john-doe".to_string()),
            (1, "alice".to_string()),
            (2, "john-doe".to_string()),
        ]);
        assert_eq!(names[&1], "alice");
        assert_eq!(names[&2], "john-doe-2");
        assert_eq!(names[&3], "john-doe-3");
    }
}
