pub mod fixups;
pub mod merge;
pub mod paths;

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde_json::Value;
use tokio::fs;
use tracing::{debug, error};

use crate::cache::FileCache;
use crate::config::{GeneratorConfig, PROFILE_PREFIX};
use crate::error::{GeneratorError, Result};
use crate::fetch::SimplifierClient;
use crate::types::{
    ElementDefinition, ElementValues, PathConstraint, PatternValue, ProfileEntry, ResourceMeta,
    ResourceTable, ScalarOrList, StructureDefinition,
};

use merge::merge_constraints;
use paths::{normalize_path, rename_root, type_tag};

/// Flattens profile StructureDefinitions into the path-keyed constraint
/// table.
#[derive(Debug)]
pub struct StructureResolver {
    profile_dir: PathBuf,
    client: SimplifierClient,
    cache: FileCache,
}

impl StructureResolver {
    pub fn new(config: &GeneratorConfig) -> Result<Self> {
        Ok(Self {
            profile_dir: config.profile_dir(),
            client: SimplifierClient::new(config.simplifier_base_url.clone())?,
            cache: FileCache::new(&config.cache),
        })
    }

    /// Build the full path table over every profile in the package,
    /// remediation pass included.
    pub async fn build_table(&self) -> Result<ResourceTable> {
        let mut table = ResourceTable::new();
        for structure_definition in self.load_profiles().await? {
            let structure_definition = self.with_snapshot(structure_definition).await?;
            let entry = resolve_profile(&structure_definition)?;
            table.insert(structure_definition.name.clone(), entry);
        }
        fixups::apply(&mut table);
        Ok(table)
    }

    async fn load_profiles(&self) -> Result<Vec<StructureDefinition>> {
        let mut dir_entries = fs::read_dir(&self.profile_dir).await?;
        let mut profiles = Vec::new();
        while let Some(dir_entry) = dir_entries.next_entry().await? {
            let file_name = dir_entry.file_name().to_string_lossy().into_owned();
            if !file_name.starts_with(PROFILE_PREFIX) || !file_name.ends_with(".json") {
                continue;
            }
            let raw = fs::read_to_string(dir_entry.path()).await?;
            match serde_json::from_str::<StructureDefinition>(&raw) {
                Ok(parsed) if parsed.resource_type == "StructureDefinition" => {
                    profiles.push(parsed);
                }
                Ok(_) => {}
                Err(err) => {
                    error!("Error parsing JSON file {:?}: {err}", dir_entry.path());
                }
            }
        }
        Ok(profiles)
    }

    /// Use the bundled snapshot when present, otherwise pull it from the
    /// snapshot endpoint (cached per profile name).
    async fn with_snapshot(
        &self,
        structure_definition: StructureDefinition,
    ) -> Result<StructureDefinition> {
        if structure_definition.snapshot.is_some() {
            return Ok(structure_definition);
        }
        let cache_key = format!("structureDefinition_{}", structure_definition.name);
        if let Some(cached) = self.cache.get::<StructureDefinition>(&cache_key).await
            && cached.snapshot.is_some()
        {
            debug!(
                "Returning cached structure definition for {}",
                structure_definition.name
            );
            return Ok(cached);
        }
        let fetched = self.client.fetch_snapshot(&structure_definition.name).await?;
        self.cache.put(&cache_key, &fetched).await?;
        Ok(fetched)
    }
}

/// Flatten one snapshotted profile into its table entry.
pub fn resolve_profile(structure_definition: &StructureDefinition) -> Result<ProfileEntry> {
    let snapshot = structure_definition.snapshot.as_ref().ok_or_else(|| {
        GeneratorError::parsing(format!(
            "Snapshot for {} is undefined",
            structure_definition.name
        ))
    })?;

    let elements = filter_elements(&snapshot.element);
    let mut paths: BTreeMap<String, PathConstraint> = BTreeMap::new();
    let mut pattern_leaves: BTreeMap<String, String> = BTreeMap::new();
    let mut exhaustive_codings: Vec<String> = Vec::new();

    for element in &elements {
        let id = element.id.as_deref().unwrap_or_default();
        let normalized = normalize_path(id);
        let last_segment = normalized.rsplit('.').next().unwrap_or(&normalized);
        let wire_type = element.primary_type();
        let profile_url = element.primary_profile();

        let fixed = resolve_fixed_value(&element.values, &normalized, &mut pattern_leaves);
        if element.values.has_exhaustive_pattern_coding() {
            exhaustive_codings.push(normalized.clone());
        }

        let value_set = element.binding.as_ref().and_then(|binding| {
            if binding.strength != "example" && element.values.pattern_code.is_none() {
                binding.value_set.clone()
            } else {
                None
            }
        });

        if normalized.ends_with("[x]")
            || normalized.contains("value[x]")
            || (last_segment == "extension" && profile_url.is_none())
            || wire_type == Some("BackboneElement")
        {
            continue;
        }

        let constraint = PathConstraint {
            type_tag: wire_type.map(type_tag).unwrap_or_default(),
            value_set: value_set.map(ScalarOrList::One),
            fixed_value: fixed
                .or_else(|| pattern_leaves.get(&normalized).cloned())
                .map(ScalarOrList::One),
            profile_url: profile_url.map(|url| ScalarOrList::One(url.to_string())),
        };

        match paths.get(&normalized) {
            Some(existing) => {
                let merged = merge_constraints(existing, &constraint);
                paths.insert(normalized, merged);
            }
            None => {
                paths.insert(normalized, constraint);
            }
        }
    }

    // A fully fixed coding pins the codes down; the binding on the path
    // above the `.coding` column is moot.
    for coding_path in &exhaustive_codings {
        let target = coding_path
            .strip_suffix(".coding")
            .unwrap_or(coding_path)
            .to_string();
        if let Some(entry) = paths.get_mut(&target) {
            entry.value_set = None;
        }
    }

    let paths = paths
        .into_iter()
        .map(|(path, constraint)| {
            (
                rename_root(&path, &structure_definition.name),
                constraint,
            )
        })
        .collect();

    let status_id = format!("{}.text.status", structure_definition.type_name);
    let status = structure_definition
        .differential
        .as_ref()
        .and_then(|differential| {
            differential
                .element
                .iter()
                .find(|element| element.id.as_deref() == Some(status_id.as_str()))
        })
        .and_then(|element| element.values.pattern_code.clone());

    Ok(ProfileEntry {
        resource: ResourceMeta {
            status,
            profile: format!(
                "{}|{}",
                structure_definition.url.as_deref().unwrap_or_default(),
                structure_definition.version.as_deref().unwrap_or_default()
            ),
            fhir_resource_type: structure_definition.type_name.clone(),
        },
        paths,
    })
}

/// Drop structural noise, then everything below a forbidden cardinality.
fn filter_elements(elements: &[ElementDefinition]) -> Vec<ElementDefinition> {
    let cleaned = elements.iter().filter(|element| {
        let Some(id) = element.id.as_deref() else {
            return false;
        };
        element.element_type.is_some()
            && !id.ends_with(".id")
            && !id.contains(".id.")
            && !id.contains(".meta")
            && !(id.contains(".text") && !id.ends_with(".text"))
            && element.primary_type() != Some("Narrative")
    });

    let mut forbidden_prefixes: Vec<String> = Vec::new();
    let mut kept: Vec<ElementDefinition> = Vec::new();
    for element in cleaned {
        let id = element.id.clone().unwrap_or_default();
        if element.max.as_deref() == Some("0") {
            forbidden_prefixes.push(id);
        } else if !forbidden_prefixes
            .iter()
            .any(|prefix| id.starts_with(prefix.as_str()) && !id.contains("policyRule"))
        {
            kept.push(element.clone());
        }
    }
    kept
}

/// Fixed value of an element: explicit fixed field first, then a scalar
/// pattern; a structured pattern instead contributes its leaves to the
/// auxiliary map consulted by descendant paths.
fn resolve_fixed_value(
    values: &ElementValues,
    path: &str,
    pattern_leaves: &mut BTreeMap<String, String>,
) -> Option<String> {
    if let Some(scalar) = values.fixed_scalar() {
        return Some(scalar);
    }
    match values.pattern()? {
        PatternValue::Scalar(scalar) => Some(scalar),
        PatternValue::Structured(value) => {
            collect_pattern_leaves(&value, path, pattern_leaves);
            None
        }
    }
}

/// Flatten a partial structured pattern into dotted leaf paths. Array
/// members share their parent's path; traversal uses an explicit work stack
/// so pattern depth never grows the call stack.
fn collect_pattern_leaves(value: &Value, path: &str, leaves: &mut BTreeMap<String, String>) {
    let mut stack: Vec<(String, &Value)> = Vec::new();
    if let Value::Object(map) = value {
        for (key, child) in map {
            stack.push((format!("{path}.{key}"), child));
        }
    }
    while let Some((leaf_path, current)) = stack.pop() {
        match current {
            Value::Object(map) => {
                for (key, child) in map {
                    stack.push((format!("{leaf_path}.{key}"), child));
                }
            }
            Value::Array(items) => {
                for item in items {
                    stack.push((leaf_path.clone(), item));
                }
            }
            scalar => {
                leaves.insert(leaf_path, scalar_text(scalar));
            }
        }
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
