// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Execution Environment Definition
//!
//! Typed form of an `ansible-builder` version 3 definition file together with
//! the merge rules applied when the same dependency arrives from several
//! sources (manual entry, uploaded file, popular picks).
//!
//! ## Merge rules
//!
//! | Category | Rule |
//! |----------|------|
//! | Collections | keyed by name; unpinned beats pinned; higher version beats lower |
//! | Python requirements | exact-string union, first occurrence order |
//! | System packages | exact-string union, first occurrence order |

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

pub const EE_DEFINITION_VERSION: u8 = 3;
pub const MINIMAL_IMAGE_MARKER: &str = "ee-minimal-rhel";
pub const MINIMAL_PYTHON_PACKAGE: &str = "python3.11";
pub const MINIMAL_PYTHON_PATH: &str = "/usr/bin/python3.11";
pub const MICRODNF_PATH: &str = "/usr/bin/microdnf";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionRequirement {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signatures: Vec<String>,
}

impl CollectionRequirement {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            source: None,
            kind: None,
            signatures: Vec::new(),
        }
    }

    pub fn pinned(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            version: Some(version.into()),
            ..Self::named(name)
        }
    }

    fn pinned_version(&self) -> Option<&str> {
        self.version
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty() && *v != "*")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EeDefinition {
    pub version: u8,
    pub images: EeImages,
    #[serde(default)]
    pub dependencies: EeDependencies,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_build_files: Vec<BuildFile>,
    #[serde(default, skip_serializing_if = "AdditionalBuildSteps::is_empty")]
    pub additional_build_steps: AdditionalBuildSteps,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<EeOptions>,
}

/// File copied into the build context under `_build/<dest>/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildFile {
    pub src: String,
    pub dest: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EeImages {
    pub base_image: BaseImage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseImage {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EeDependencies {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub python_interpreter: Option<PythonInterpreter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ansible_core: Option<PipPackage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ansible_runner: Option<PipPackage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub galaxy: Option<GalaxyRequirements>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub python: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub system: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PythonInterpreter {
    pub package_system: String,
    pub python_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipPackage {
    pub package_pip: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GalaxyRequirements {
    #[serde(default)]
    pub collections: Vec<CollectionRequirement>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EeOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_manager_path: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Build hooks keyed by `ansible-builder` stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdditionalBuildSteps {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prepend_base: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub append_base: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prepend_galaxy: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub append_galaxy: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prepend_builder: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub append_builder: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prepend_final: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub append_final: Vec<String>,
}

impl AdditionalBuildSteps {
    pub fn is_empty(&self) -> bool {
        self.prepend_base.is_empty()
            && self.append_base.is_empty()
            && self.prepend_galaxy.is_empty()
            && self.append_galaxy.is_empty()
            && self.prepend_builder.is_empty()
            && self.append_builder.is_empty()
            && self.prepend_final.is_empty()
            && self.append_final.is_empty()
    }

    /// Append commands to the named stage; `None` when the stage is unknown.
    pub fn push(&mut self, step_type: &str, commands: &[String]) -> Option<()> {
        let target = match step_type {
            "prepend_base" => &mut self.prepend_base,
            "append_base" => &mut self.append_base,
            "prepend_galaxy" => &mut self.prepend_galaxy,
            "append_galaxy" => &mut self.append_galaxy,
            "prepend_builder" => &mut self.prepend_builder,
            "append_builder" => &mut self.append_builder,
            "prepend_final" => &mut self.prepend_final,
            "append_final" => &mut self.append_final,
            _ => return None,
        };
        target.extend(commands.iter().cloned());
        Some(())
    }
}

// ============================================================================
// Merging
// ============================================================================

/// Merge collection lists into one entry per collection name.
///
/// Output keeps the position of each name's first appearance.
pub fn merge_collections<I>(sources: I) -> Vec<CollectionRequirement>
where
    I: IntoIterator<Item = CollectionRequirement>,
{
    let mut merged: Vec<CollectionRequirement> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for candidate in sources {
        let name = candidate.name.trim().to_string();
        if name.is_empty() {
            continue;
        }
        let candidate = CollectionRequirement { name: name.clone(), ..candidate };

        match index.get(&name) {
            None => {
                index.insert(name, merged.len());
                merged.push(candidate);
            }
            Some(&slot) => {
                if prefers(&candidate, &merged[slot]) {
                    merged[slot] = candidate;
                }
            }
        }
    }

    merged
}

/// Whether `candidate` should replace `existing` for the same collection.
fn prefers(candidate: &CollectionRequirement, existing: &CollectionRequirement) -> bool {
    match (candidate.pinned_version(), existing.pinned_version()) {
        (_, None) => false,
        (None, Some(_)) => true,
        (Some(new), Some(old)) => compare_versions(new, old) == Ordering::Greater,
    }
}

/// Exact-string union preserving first occurrence order. Entries are
/// compared as given; only empty strings are dropped.
pub fn merge_unique<I, S>(sources: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for item in sources {
        let item = item.as_ref();
        if item.is_empty() {
            continue;
        }
        if seen.insert(item.to_string()) {
            merged.push(item.to_string());
        }
    }
    merged
}

/// Compare dotted versions numerically (`2.10.0 > 2.9.1`).
///
/// Leading range operators are ignored, missing components count as zero and
/// a pre-release suffix sorts below the plain release.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let (a_core, a_pre) = split_version(a);
    let (b_core, b_pre) = split_version(b);

    let len = a_core.len().max(b_core.len());
    for i in 0..len {
        let x = a_core.get(i).copied().unwrap_or(0);
        let y = b_core.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }

    match (a_pre, b_pre) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => x.cmp(y),
    }
}

fn split_version(raw: &str) -> (Vec<u64>, Option<&str>) {
    let trimmed = raw.trim().trim_start_matches(|c: char| !c.is_ascii_digit());
    let (core, pre) = match trimmed.find(['-', '+']) {
        Some(pos) => (&trimmed[..pos], Some(&trimmed[pos + 1..])),
        None => (trimmed, None),
    };
    let parts = core
        .split('.')
        .map(|p| {
            p.chars()
                .take_while(char::is_ascii_digit)
                .collect::<String>()
                .parse::<u64>()
                .unwrap_or(0)
        })
        .collect();
    (parts, pre)
}

/// Parse a `requirements.txt` / `bindep.txt` body into entries.
pub fn parse_line_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
