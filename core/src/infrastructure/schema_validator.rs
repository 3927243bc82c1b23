// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Schema validation for generated and uploaded documents.
//!
//! Wraps `jsonschema` with the two bundled schemas: the `ansible-builder`
//! version 3 definition and the `ansible-galaxy` collection requirements
//! file. Violations are collected, never short-circuited, so callers can
//! report every offending path at once.

use serde_json::Value;
use std::fmt;

const EE_DEFINITION_SCHEMA: &str = include_str!("../../schemas/execution-environment.schema.json");
const COLLECTION_REQUIREMENTS_SCHEMA: &str = include_str!("../../schemas/collection-requirements.schema.json");

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaViolation {
    /// JSON pointer into the instance, empty for the document root
    pub path: String,
    pub message: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "/" } else { &self.path };
        write!(f, "{}: {}", path, self.message)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Invalid bundled schema '{name}': {message}")]
    InvalidSchema { name: &'static str, message: String },
}

/// A compiled schema.
pub struct SchemaValidator {
    validator: jsonschema::Validator,
}

impl SchemaValidator {
    pub fn compile(name: &'static str, schema_source: &str) -> Result<Self, SchemaError> {
        let schema: Value = serde_json::from_str(schema_source).map_err(|e| SchemaError::InvalidSchema {
            name,
            message: e.to_string(),
        })?;
        let validator = jsonschema::validator_for(&schema).map_err(|e| SchemaError::InvalidSchema {
            name,
            message: e.to_string(),
        })?;
        Ok(Self { validator })
    }

    pub fn execution_environment() -> Result<Self, SchemaError> {
        Self::compile("execution-environment", EE_DEFINITION_SCHEMA)
    }

    pub fn collection_requirements() -> Result<Self, SchemaError> {
        Self::compile("collection-requirements", COLLECTION_REQUIREMENTS_SCHEMA)
    }

    /// Every violation in `instance`; empty when it conforms.
    pub fn violations(&self, instance: &Value) -> Vec<SchemaViolation> {
        self.validator
            .iter_errors(instance)
            .map(|error| SchemaViolation {
                path: error.instance_path().to_string(),
                message: error.to_string(),
            })
            .collect()
    }
}

/// One line per violation, as shown to the person filling in the form.
pub fn format_violations(violations: &[SchemaViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("- {}", v))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bundled_schemas_compile() {
        assert!(SchemaValidator::execution_environment().is_ok());
        assert!(SchemaValidator::collection_requirements().is_ok());
    }

    #[test]
    fn test_valid_definition_has_no_violations() {
        let validator = SchemaValidator::execution_environment().unwrap();
        let doc = json!({
            "version": 3,
            "images": { "base_image": { "name": "quay.io/ansible/base:latest" } },
            "dependencies": {
                "galaxy": { "collections": [{ "name": "ansible.posix" }] },
                "python": ["requests"]
            },
            "options": { "package_manager_path": "/usr/bin/microdnf" }
        });
        assert!(validator.violations(&doc).is_empty());
    }

    #[test]
    fn test_every_violation_is_reported() {
        let validator = SchemaValidator::execution_environment().unwrap();
        let doc = json!({
            "version": 2,
            "images": { "base_image": { "name": "" } },
            "unexpected": true
        });
        let violations = validator.violations(&doc);
        assert!(violations.len() >= 3, "{:?}", violations);
        assert!(violations.iter().any(|v| v.path == "/images/base_image/name"));
        assert!(violations.iter().any(|v| v.path == "/version"));
    }

    #[test]
    fn test_format_violations() {
        let text = format_violations(&[
            SchemaViolation { path: "/version".to_string(), message: "bad".to_string() },
            SchemaViolation { path: String::new(), message: "root".to_string() },
        ]);
        assert_eq!(text, "- /version: bad\n- /: root");
    }

    #[test]
    fn test_collection_requirements_schema() {
        let validator = SchemaValidator::collection_requirements().unwrap();
        assert!(validator
            .violations(&json!({ "collections": ["ansible.posix", { "name": "a.b", "version": "1.0.0" }] }))
            .is_empty());
        assert!(!validator
            .violations(&json!({ "collections": [{ "version": "1.0.0" }] }))
            .is_empty());
    }
}
