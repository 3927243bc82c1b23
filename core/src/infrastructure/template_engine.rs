// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Document Template Engine
//!
//! Renders the prose files that accompany a generated execution environment
//! (README, `ansible.cfg`, TechDocs index) from bundled Handlebars templates.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Turn a serializable context into text files
//! - **Integration:** EE definition action → workspace files
//!
//! Output is Markdown / INI, so HTML escaping is disabled.

use anyhow::{Context, Result};
use handlebars::Handlebars;
use serde::Serialize;

pub const README_TEMPLATE: &str = "readme";
pub const ANSIBLE_CFG_TEMPLATE: &str = "ansible-cfg";
pub const DOCS_INDEX_TEMPLATE: &str = "docs-index";

pub struct DocumentTemplateEngine {
    handlebars: Handlebars<'static>,
}

impl DocumentTemplateEngine {
    /// Create an engine with the bundled templates registered
    pub fn new() -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        handlebars.register_escape_fn(handlebars::no_escape);

        handlebars
            .register_template_string(README_TEMPLATE, include_str!("../../templates/readme.md.hbs"))
            .context("Invalid bundled README template")?;
        handlebars
            .register_template_string(ANSIBLE_CFG_TEMPLATE, include_str!("../../templates/ansible.cfg.hbs"))
            .context("Invalid bundled ansible.cfg template")?;
        handlebars
            .register_template_string(DOCS_INDEX_TEMPLATE, include_str!("../../templates/docs-index.md.hbs"))
            .context("Invalid bundled docs index template")?;

        Ok(Self { handlebars })
    }

    /// Render a registered template
    pub fn render<T: Serialize>(&self, name: &str, context: &T) -> Result<String> {
        self.handlebars
            .render(name, context)
            .with_context(|| format!("Failed to render template '{}'", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_readme_lists_dependencies() {
        let engine = DocumentTemplateEngine::new().unwrap();
        let readme = engine
            .render(
                README_TEMPLATE,
                &json!({
                    "name": "network-ee",
                    "base_image": "registry.redhat.io/ansible-automation-platform-25/ee-minimal-rhel9:latest",
                    "definition_file": "network-ee.yaml",
                    "collections": [{ "name": "cisco.ios", "version": "9.0.0" }, { "name": "ansible.netcommon" }],
                    "python": ["paramiko"],
                    "system": [],
                    "mcp_servers": []
                }),
            )
            .unwrap();

        assert!(readme.starts_with("# network-ee"));
        assert!(readme.contains("| `cisco.ios` | `9.0.0` |"));
        assert!(readme.contains("| `ansible.netcommon` | latest |"));
        assert!(readme.contains("- `paramiko`"));
        assert!(!readme.contains("## System packages"));
        assert!(!readme.contains("## MCP servers"));
        assert!(readme.contains("--file network-ee.yaml"));
    }

    #[test]
    fn test_no_html_escaping() {
        let engine = DocumentTemplateEngine::new().unwrap();
        let readme = engine
            .render(
                README_TEMPLATE,
                &json!({ "name": "ee", "python": ["requests>=2.0,<3"], "description": "Q&A <internal>" }),
            )
            .unwrap();
        assert!(readme.contains("- `requests>=2.0,<3`"));
        assert!(readme.contains("Q&A <internal>"));
    }

    #[test]
    fn test_ansible_cfg_private_hub_is_optional() {
        let engine = DocumentTemplateEngine::new().unwrap();
        let plain = engine.render(ANSIBLE_CFG_TEMPLATE, &json!({})).unwrap();
        assert!(plain.contains("[galaxy_server.automation_hub]"));
        assert!(!plain.contains("private_hub"));

        let with_hub = engine
            .render(ANSIBLE_CFG_TEMPLATE, &json!({ "private_hub_url": "https://hub.example.com/api/galaxy/" }))
            .unwrap();
        assert!(with_hub.contains("url = https://hub.example.com/api/galaxy/"));
    }
}
