// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Create EE Definition Action
//!
//! Scaffolder action `ansible:create:ee-definition`: turns the execution
//! environment form into an `ansible-builder` definition plus the files that
//! travel with it.
//!
//! # DDD Pattern: Application Service
//!
//! - **Layer:** Application
//! - **Responsibility:** Merge dependency sources, validate, write files
//! - **Collaborators:**
//!   - Domain: `EeDefinition`, merge rules, `CatalogRegistrar`
//!   - Infrastructure: `SchemaValidator`, `DocumentTemplateEngine`
//!
//! # Flow
//!
//! 1. Resolve the base image (`custom` selects `customBaseImage`)
//! 2. Merge collections from the form, the uploaded requirements file, the
//!    popular picks and MCP selections
//! 3. Merge Python requirements and system packages
//! 4. Apply minimal image rules, build steps and tags
//! 5. Validate against the version 3 schema, reporting every violation
//! 6. Write `<workspace>/<eeFileName>/` and either `catalog-info.yaml`
//!    (publishing to source control) or register a `Component` directly
//!
//! # Error Handling
//!
//! Every failure surfaces as [`ActionError`], prefixed with the action id.

use crate::domain::catalog::{format_entity_name, CatalogRegistrar, Entity, CORE_API_VERSION, SCAFFOLDER_API_VERSION};
use crate::domain::ee_definition::{
    merge_collections, merge_unique, parse_line_list, AdditionalBuildSteps, BaseImage, BuildFile,
    CollectionRequirement, EeDefinition, EeDependencies, EeImages, EeOptions, GalaxyRequirements, PipPackage,
    PythonInterpreter, EE_DEFINITION_VERSION, MICRODNF_PATH, MINIMAL_IMAGE_MARKER, MINIMAL_PYTHON_PACKAGE,
    MINIMAL_PYTHON_PATH,
};
use crate::infrastructure::schema_validator::{format_violations, SchemaError, SchemaValidator};
use crate::infrastructure::template_engine::{
    DocumentTemplateEngine, ANSIBLE_CFG_TEMPLATE, DOCS_INDEX_TEMPLATE, README_TEMPLATE,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

pub const ACTION_ID: &str = "ansible:create:ee-definition";

/// `baseImage` value that selects `customBaseImage`.
pub const CUSTOM_BASE_IMAGE: &str = "custom";
pub const MCP_BUILDER_COLLECTION: &str = "ansible.mcp_builder";
pub const MCP_VARS_FILE: &str = "mcp-vars.yaml";
pub const DEFAULT_OWNER: &str = "user:default/guest";
pub const ENTITY_TYPE_EXECUTION_ENVIRONMENT: &str = "execution-environment";

const ANNOTATION_TECHDOCS_REF: &str = "backstage.io/techdocs-ref";
const ANNOTATION_SCM_PROVIDER: &str = "aap.ansible.com/scm-provider";
const BUILD_CONFIGS_DIR: &str = "configs";
const ANSIBLE_CFG_FILE: &str = "ansible.cfg";

// ============================================================================
// Input / output
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildStepInput {
    /// One of `prepend_base` … `append_final`
    pub step_type: String,
    #[serde(default)]
    pub commands: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EeDefinitionInput {
    pub ee_file_name: String,
    pub ee_description: Option<String>,
    pub base_image: String,
    pub custom_base_image: Option<String>,
    pub collections: Vec<CollectionRequirement>,
    #[serde(deserialize_with = "trimmed_entries")]
    pub popular_collections: Vec<String>,
    /// Body of an uploaded `requirements.yml`
    pub collections_file: Option<String>,
    #[serde(deserialize_with = "trimmed_entries")]
    pub python_requirements: Vec<String>,
    /// Body of an uploaded `requirements.txt`
    pub python_requirements_file: Option<String>,
    #[serde(deserialize_with = "trimmed_entries")]
    pub system_packages: Vec<String>,
    /// Body of an uploaded `bindep.txt`
    pub system_packages_file: Option<String>,
    pub additional_build_steps: Vec<BuildStepInput>,
    #[serde(deserialize_with = "trimmed_entries")]
    pub mcp_servers: Vec<String>,
    #[serde(deserialize_with = "trimmed_entries")]
    pub tags: Vec<String>,
    pub owner: Option<String>,
    #[serde(rename = "publishToSCM")]
    pub publish_to_scm: bool,
    pub source_control_provider: Option<String>,
    pub private_hub_url: Option<String>,
}

/// Form list rows arrive with stray whitespace and blank entries.
fn trimmed_entries<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let rows = Vec::<String>::deserialize(deserializer)?;
    Ok(rows
        .into_iter()
        .map(|row| row.trim().to_string())
        .filter(|row| !row.is_empty())
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EeDefinitionOutput {
    pub context_dir_name: String,
    pub ee_definition_content: String,
    pub owner: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_entity_ref: Option<String>,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum EeDefinitionError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid collections file: {0}")]
    InvalidCollectionsFile(String),

    #[error("Unknown build step type '{0}'")]
    UnknownBuildStep(String),

    #[error("EE definition failed schema validation:\n{0}")]
    SchemaViolations(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("Failed to serialize {what}: {message}")]
    Serialize { what: &'static str, message: String },

    #[error("Failed to render {file}: {message}")]
    Render { file: String, message: String },

    #[error("Failed to write {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to register catalog entity: {0}")]
    Registration(String),
}

#[derive(Debug, thiserror::Error)]
#[error("ansible:create:ee-definition: {0}")]
pub struct ActionError(#[from] pub EeDefinitionError);

fn serialize_error(what: &'static str) -> impl FnOnce(String) -> EeDefinitionError {
    move |message| EeDefinitionError::Serialize { what, message }
}

fn to_yaml<T: Serialize>(what: &'static str, value: &T) -> Result<String, EeDefinitionError> {
    serde_yaml::to_string(value).map_err(|e| serialize_error(what)(e.to_string()))
}

// ============================================================================
// Action
// ============================================================================

pub struct EeDefinitionAction {
    workspace: PathBuf,
    registrar: Arc<dyn CatalogRegistrar>,
    templates: DocumentTemplateEngine,
    definition_schema: SchemaValidator,
    requirements_schema: SchemaValidator,
}

impl EeDefinitionAction {
    pub fn new(workspace: impl Into<PathBuf>, registrar: Arc<dyn CatalogRegistrar>) -> Result<Self, ActionError> {
        let templates = DocumentTemplateEngine::new().map_err(|e| EeDefinitionError::Render {
            file: "bundled templates".to_string(),
            message: format!("{:#}", e),
        })?;
        Ok(Self {
            workspace: workspace.into(),
            registrar,
            templates,
            definition_schema: SchemaValidator::execution_environment().map_err(EeDefinitionError::from)?,
            requirements_schema: SchemaValidator::collection_requirements().map_err(EeDefinitionError::from)?,
        })
    }

    /// Build and validate the definition without touching the filesystem.
    pub fn build_definition(&self, input: &EeDefinitionInput) -> Result<EeDefinition, EeDefinitionError> {
        validate_file_name(&input.ee_file_name)?;
        let base_image = resolve_base_image(input)?;

        let mut collection_sources: Vec<CollectionRequirement> =
            input.collections.iter().cloned().map(normalize_collection).collect();
        if let Some(body) = input.collections_file.as_deref().filter(|b| !b.trim().is_empty()) {
            collection_sources.extend(self.parse_collections_file(body)?);
        }
        collection_sources.extend(input.popular_collections.iter().map(CollectionRequirement::named));
        let mcp_servers = merge_unique(&input.mcp_servers);
        if !mcp_servers.is_empty() {
            collection_sources.push(CollectionRequirement::named(MCP_BUILDER_COLLECTION));
        }
        let collections = merge_collections(collection_sources);

        let python = merge_unique(
            input
                .python_requirements
                .iter()
                .cloned()
                .chain(input.python_requirements_file.as_deref().map(parse_line_list).unwrap_or_default()),
        );
        let system = merge_unique(
            input
                .system_packages
                .iter()
                .cloned()
                .chain(input.system_packages_file.as_deref().map(parse_line_list).unwrap_or_default()),
        );

        let minimal = base_image.contains(MINIMAL_IMAGE_MARKER);
        let dependencies = EeDependencies {
            python_interpreter: minimal.then(|| PythonInterpreter {
                package_system: MINIMAL_PYTHON_PACKAGE.to_string(),
                python_path: MINIMAL_PYTHON_PATH.to_string(),
            }),
            ansible_core: minimal.then(|| PipPackage {
                package_pip: "ansible-core".to_string(),
            }),
            ansible_runner: minimal.then(|| PipPackage {
                package_pip: "ansible-runner".to_string(),
            }),
            galaxy: (!collections.is_empty()).then_some(GalaxyRequirements { collections }),
            python,
            system,
        };

        let mut build_files = vec![BuildFile {
            src: ANSIBLE_CFG_FILE.to_string(),
            dest: BUILD_CONFIGS_DIR.to_string(),
        }];
        let mut steps = AdditionalBuildSteps::default();
        steps.prepend_galaxy.push(format!(
            "ADD _build/{}/{} /etc/ansible/ansible.cfg",
            BUILD_CONFIGS_DIR, ANSIBLE_CFG_FILE
        ));

        for step in &input.additional_build_steps {
            let commands: Vec<String> = step
                .commands
                .iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();
            if commands.is_empty() {
                continue;
            }
            steps
                .push(step.step_type.trim(), &commands)
                .ok_or_else(|| EeDefinitionError::UnknownBuildStep(step.step_type.clone()))?;
        }

        if !mcp_servers.is_empty() {
            build_files.push(BuildFile {
                src: MCP_VARS_FILE.to_string(),
                dest: BUILD_CONFIGS_DIR.to_string(),
            });
            steps.append_final.extend([
                format!("COPY _build/{}/{} /tmp/{}", BUILD_CONFIGS_DIR, MCP_VARS_FILE, MCP_VARS_FILE),
                format!(
                    "RUN ansible-playbook {}.install_mcp -e @/tmp/{}",
                    MCP_BUILDER_COLLECTION, MCP_VARS_FILE
                ),
            ]);
        }

        let tags = merge_unique(&input.tags);
        let options = (minimal || !tags.is_empty()).then(|| EeOptions {
            package_manager_path: minimal.then(|| MICRODNF_PATH.to_string()),
            tags,
        });

        let definition = EeDefinition {
            version: EE_DEFINITION_VERSION,
            images: EeImages {
                base_image: BaseImage { name: base_image },
            },
            dependencies,
            additional_build_files: build_files,
            additional_build_steps: steps,
            options,
        };

        self.validate_definition(&definition)?;
        Ok(definition)
    }

    fn validate_definition(&self, definition: &EeDefinition) -> Result<(), EeDefinitionError> {
        let instance = serde_json::to_value(definition)
            .map_err(|e| serialize_error("EE definition")(e.to_string()))?;
        let violations = self.definition_schema.violations(&instance);
        if violations.is_empty() {
            return Ok(());
        }
        Err(EeDefinitionError::SchemaViolations(format_violations(&violations)))
    }

    /// Parse an uploaded `requirements.yml`, rejecting it with every schema
    /// violation when it does not match the requirements format.
    pub fn parse_collections_file(&self, body: &str) -> Result<Vec<CollectionRequirement>, EeDefinitionError> {
        let document: Value = serde_yaml::from_str(body)
            .map_err(|e| EeDefinitionError::InvalidCollectionsFile(e.to_string()))?;
        if document.is_null() {
            return Ok(Vec::new());
        }

        let violations = self.requirements_schema.violations(&document);
        if !violations.is_empty() {
            return Err(EeDefinitionError::InvalidCollectionsFile(format!(
                "\n{}",
                format_violations(&violations)
            )));
        }

        let entries = document
            .get("collections")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut collections = Vec::with_capacity(entries.len());
        for entry in entries {
            let collection = match entry {
                Value::String(name) => CollectionRequirement::named(name),
                Value::Object(mut fields) => {
                    // requirements files allow numeric versions (`version: 2.0`)
                    if let Some(version) = fields.get_mut("version").filter(|v| v.is_number()) {
                        *version = Value::String(version.to_string());
                    }
                    serde_json::from_value(Value::Object(fields))
                        .map_err(|e| EeDefinitionError::InvalidCollectionsFile(e.to_string()))?
                }
                other => {
                    return Err(EeDefinitionError::InvalidCollectionsFile(format!(
                        "unexpected collection entry {}",
                        other
                    )))
                }
            };
            collections.push(normalize_collection(collection));
        }
        Ok(collections)
    }

    /// Generate the definition and its companion files.
    pub async fn execute(&self, input: EeDefinitionInput) -> Result<EeDefinitionOutput, ActionError> {
        Ok(self.generate(input).await?)
    }

    async fn generate(&self, input: EeDefinitionInput) -> Result<EeDefinitionOutput, EeDefinitionError> {
        let definition = self.build_definition(&input)?;
        let name = input.ee_file_name.trim().to_string();
        let owner = input
            .owner
            .as_deref()
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .unwrap_or(DEFAULT_OWNER)
            .to_string();
        let description = input.ee_description.as_deref().map(str::trim).filter(|d| !d.is_empty());

        info!(
            name = %name,
            base_image = %definition.images.base_image.name,
            publish_to_scm = input.publish_to_scm,
            "Generating EE definition"
        );

        let content = to_yaml("EE definition", &definition)?;
        let definition_file = format!("{}.yaml", name);
        let template_file = format!("{}-template.yaml", name);
        let context_dir = self.workspace.join(&name);

        let collections = definition
            .dependencies
            .galaxy
            .as_ref()
            .map(|g| g.collections.clone())
            .unwrap_or_default();
        let mcp_servers = merge_unique(&input.mcp_servers);

        let readme = self.render(
            README_TEMPLATE,
            "README.md",
            &json!({
                "name": name,
                "description": description,
                "base_image": definition.images.base_image.name,
                "collections": collections,
                "python": definition.dependencies.python,
                "system": definition.dependencies.system,
                "mcp_servers": mcp_servers,
                "definition_file": definition_file,
                "template_file": template_file,
            }),
        )?;
        let ansible_cfg = self.render(
            ANSIBLE_CFG_TEMPLATE,
            ANSIBLE_CFG_FILE,
            &json!({ "private_hub_url": input.private_hub_url }),
        )?;
        let docs_index = self.render(
            DOCS_INDEX_TEMPLATE,
            "docs/index.md",
            &json!({
                "name": name,
                "description": description,
                "base_image": definition.images.base_image.name,
                "collection_count": collections.len(),
                "python_count": definition.dependencies.python.len(),
                "system_count": definition.dependencies.system.len(),
                "owner": owner,
            }),
        )?;
        let template = to_yaml(
            "software template",
            &reusable_template(&input, &definition, &name, &owner),
        )?;

        write_file(&context_dir.join(&definition_file), &content).await?;
        write_file(&context_dir.join("README.md"), &readme).await?;
        write_file(&context_dir.join(ANSIBLE_CFG_FILE), &ansible_cfg).await?;
        write_file(&context_dir.join("docs").join("index.md"), &docs_index).await?;
        write_file(&context_dir.join(&template_file), &template).await?;
        if !mcp_servers.is_empty() {
            let vars = to_yaml(MCP_VARS_FILE, &json!({ "mcp_servers": mcp_servers }))?;
            write_file(&context_dir.join(MCP_VARS_FILE), &vars).await?;
        }

        let entity = component_entity(&input, &name, &owner, description, &content);
        let generated_entity_ref = if input.publish_to_scm {
            let catalog_info = to_yaml("catalog-info.yaml", &entity)?;
            write_file(&context_dir.join("catalog-info.yaml"), &catalog_info).await?;
            None
        } else {
            let entity_ref = self
                .registrar
                .register(entity)
                .await
                .map_err(|e| EeDefinitionError::Registration(format!("{:#}", e)))?;
            info!(entity_ref = %entity_ref, "Registered EE component in catalog");
            Some(entity_ref)
        };

        Ok(EeDefinitionOutput {
            context_dir_name: name,
            ee_definition_content: content,
            owner,
            generated_entity_ref,
        })
    }

    fn render(&self, template: &str, file: &str, context: &Value) -> Result<String, EeDefinitionError> {
        self.templates
            .render(template, context)
            .map_err(|e| EeDefinitionError::Render {
                file: file.to_string(),
                message: format!("{:#}", e),
            })
    }

    /// JSON schema of the action input as consumed by the template engine.
    pub fn input_schema() -> Value {
        let string_list = json!({ "type": "array", "items": { "type": "string" } });
        json!({
            "type": "object",
            "required": ["eeFileName", "baseImage"],
            "properties": {
                "eeFileName": { "type": "string", "title": "Execution environment file name" },
                "eeDescription": { "type": "string", "title": "Description" },
                "baseImage": { "type": "string", "title": "Base image" },
                "customBaseImage": { "type": "string", "title": "Custom base image" },
                "collections": {
                    "type": "array",
                    "title": "Ansible collections",
                    "items": {
                        "type": "object",
                        "required": ["name"],
                        "properties": {
                            "name": { "type": "string" },
                            "version": { "type": "string" },
                            "source": { "type": "string" },
                            "type": { "type": "string" },
                            "signatures": string_list,
                        },
                    },
                },
                "popularCollections": string_list,
                "collectionsFile": { "type": "string", "title": "requirements.yml content" },
                "pythonRequirements": string_list,
                "pythonRequirementsFile": { "type": "string", "title": "requirements.txt content" },
                "systemPackages": string_list,
                "systemPackagesFile": { "type": "string", "title": "bindep.txt content" },
                "additionalBuildSteps": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["stepType", "commands"],
                        "properties": {
                            "stepType": {
                                "type": "string",
                                "enum": [
                                    "prepend_base", "append_base", "prepend_galaxy", "append_galaxy",
                                    "prepend_builder", "append_builder", "prepend_final", "append_final",
                                ],
                            },
                            "commands": string_list,
                        },
                    },
                },
                "mcpServers": string_list,
                "tags": string_list,
                "owner": { "type": "string" },
                "publishToSCM": { "type": "boolean", "default": false },
                "sourceControlProvider": { "type": "string" },
                "privateHubUrl": { "type": "string" },
            },
        })
    }

    pub fn output_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "contextDirName": { "type": "string" },
                "eeDefinitionContent": { "type": "string" },
                "owner": { "type": "string" },
                "generatedEntityRef": { "type": "string" },
            },
        })
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn validate_file_name(raw: &str) -> Result<(), EeDefinitionError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(EeDefinitionError::InvalidInput("eeFileName is required".to_string()));
    }
    let allowed = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !allowed || name.starts_with('.') {
        return Err(EeDefinitionError::InvalidInput(format!(
            "eeFileName '{}' may only contain letters, digits, '-', '_' and '.' and must not start with '.'",
            name
        )));
    }
    Ok(())
}

fn resolve_base_image(input: &EeDefinitionInput) -> Result<String, EeDefinitionError> {
    let selected = input.base_image.trim();
    let image = if selected == CUSTOM_BASE_IMAGE {
        input.custom_base_image.as_deref().map(str::trim).unwrap_or_default()
    } else {
        selected
    };
    if image.is_empty() {
        return Err(EeDefinitionError::InvalidInput(if selected == CUSTOM_BASE_IMAGE {
            "customBaseImage is required when baseImage is 'custom'".to_string()
        } else {
            "baseImage is required".to_string()
        }));
    }
    Ok(image.to_string())
}

/// Blank versions mean "latest" and are dropped before merging.
fn normalize_collection(mut collection: CollectionRequirement) -> CollectionRequirement {
    collection.name = collection.name.trim().to_string();
    collection.version = collection
        .version
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    collection
}

async fn write_file(path: &Path, content: &str) -> Result<(), EeDefinitionError> {
    let io_error = |source: std::io::Error| EeDefinitionError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
    }
    tokio::fs::write(path, content).await.map_err(io_error)?;
    debug!(path = ?path, bytes = content.len(), "Wrote file");
    Ok(())
}

fn entity_tags(input: &EeDefinitionInput) -> Vec<String> {
    let mut tags = vec![ENTITY_TYPE_EXECUTION_ENVIRONMENT.to_string()];
    tags.extend(input.tags.iter().map(|t| format_entity_name(t)));
    merge_unique(tags)
}

/// `Component` describing the generated execution environment.
fn component_entity(
    input: &EeDefinitionInput,
    name: &str,
    owner: &str,
    description: Option<&str>,
    content: &str,
) -> Entity {
    let mut entity = Entity::new(CORE_API_VERSION, "Component", format_entity_name(name));
    entity.metadata.title = Some(name.to_string());
    entity.metadata.description = description.map(str::to_string);
    entity.metadata.tags = entity_tags(input);
    entity
        .metadata
        .annotations
        .insert(ANNOTATION_TECHDOCS_REF.to_string(), "dir:.".to_string());
    if input.publish_to_scm {
        if let Some(provider) = input.source_control_provider.as_deref().filter(|p| !p.trim().is_empty()) {
            entity
                .metadata
                .annotations
                .insert(ANNOTATION_SCM_PROVIDER.to_string(), provider.trim().to_string());
        }
    }
    entity.spec = json!({
        "type": ENTITY_TYPE_EXECUTION_ENVIRONMENT,
        "lifecycle": "production",
        "owner": owner,
        "definition": content,
    });
    entity
}

/// Software template that reopens the form pre-filled with this definition.
fn reusable_template(input: &EeDefinitionInput, definition: &EeDefinition, name: &str, owner: &str) -> Entity {
    let mut entity = Entity::new(
        SCAFFOLDER_API_VERSION,
        "Template",
        format_entity_name(&format!("{} template", name)),
    );
    entity.metadata.title = Some(format!("{} execution environment", name));
    entity.metadata.description = Some(format!(
        "Create an execution environment definition starting from {}",
        name
    ));
    entity.metadata.tags = entity_tags(input);

    let collections: Vec<Value> = definition
        .dependencies
        .galaxy
        .as_ref()
        .map(|g| {
            g.collections
                .iter()
                .filter(|c| c.name != MCP_BUILDER_COLLECTION)
                .map(|c| match &c.version {
                    Some(version) => json!({ "name": c.name, "version": version }),
                    None => json!({ "name": c.name }),
                })
                .collect()
        })
        .unwrap_or_default();

    let fields = [
        ("eeFileName", json!({ "type": "string", "title": "Name", "default": name })),
        (
            "eeDescription",
            json!({ "type": "string", "title": "Description", "default": input.ee_description.clone().unwrap_or_default() }),
        ),
        (
            "baseImage",
            json!({ "type": "string", "title": "Base image", "default": definition.images.base_image.name }),
        ),
        (
            "collections",
            json!({
                "type": "array",
                "title": "Ansible collections",
                "items": {
                    "type": "object",
                    "required": ["name"],
                    "properties": { "name": { "type": "string" }, "version": { "type": "string" } },
                },
                "default": collections,
            }),
        ),
        (
            "pythonRequirements",
            json!({ "type": "array", "items": { "type": "string" }, "default": definition.dependencies.python }),
        ),
        (
            "systemPackages",
            json!({ "type": "array", "items": { "type": "string" }, "default": definition.dependencies.system }),
        ),
        (
            "additionalBuildSteps",
            json!({ "type": "array", "items": { "type": "object" }, "default": input.additional_build_steps }),
        ),
        (
            "mcpServers",
            json!({ "type": "array", "items": { "type": "string" }, "default": merge_unique(&input.mcp_servers) }),
        ),
        (
            "tags",
            json!({ "type": "array", "items": { "type": "string" }, "default": merge_unique(&input.tags) }),
        ),
        (
            "publishToSCM",
            json!({ "type": "boolean", "title": "Publish to source control", "default": input.publish_to_scm }),
        ),
    ];

    let mut properties = serde_json::Map::new();
    let mut step_input = serde_json::Map::new();
    for (key, schema) in fields {
        properties.insert(key.to_string(), schema);
        step_input.insert(key.to_string(), json!(format!("${{{{ parameters.{} }}}}", key)));
    }
    step_input.insert("owner".to_string(), json!(owner));

    entity.spec = json!({
        "type": ENTITY_TYPE_EXECUTION_ENVIRONMENT,
        "owner": owner,
        "parameters": [{
            "title": "Execution environment",
            "required": ["eeFileName", "baseImage"],
            "properties": properties,
        }],
        "steps": [{
            "id": "create-ee-definition",
            "name": "Create EE definition",
            "action": ACTION_ID,
            "input": step_input,
        }],
    });
    entity
}
