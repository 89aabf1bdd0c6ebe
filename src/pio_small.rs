//! Trimming of the full resource table down to the PIO-Small profile set.
//!
//! An exclusion document lists, per resource, whether the whole resource is
//! out of scope and which sub-paths are cut; path translations from the
//! same document feed the excluded-path translation list shipped alongside
//! the tables.

use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, warn};

use crate::error::Result;
use crate::types::ResourceTable;

/// Exclusion document, keyed by resource name.
pub type PioSmallExclusions = BTreeMap<String, ResourceExclusions>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceExclusions {
    #[serde(rename = "wholeResourceExcluded", default)]
    pub whole_resource_excluded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
    #[serde(rename = "cardinalityReducedToOne", default, skip_serializing_if = "Vec::is_empty")]
    pub cardinality_reduced_to_one: Vec<String>,
    /// Excluded sub-paths mapped to their German label, when one exists.
    #[serde(rename = "excludedPaths", skip_serializing_if = "Option::is_none")]
    pub excluded_paths: Option<BTreeMap<String, Option<String>>>,
}

pub async fn load_exclusions(path: &Path) -> Result<PioSmallExclusions> {
    let raw = fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&raw)?)
}

/// Trim the table to the PIO-Small scope: drop excluded resources, then
/// every path containing an excluded sub-path.
pub fn trim_table(table: &ResourceTable, exclusions: &PioSmallExclusions) -> ResourceTable {
    let mut trimmed = table.clone();
    let original_count = trimmed.len();

    let mut deleted_resources = 0usize;
    let mut resources_not_found: Vec<&str> = Vec::new();
    for (resource_name, exclusion) in exclusions {
        if !exclusion.whole_resource_excluded {
            continue;
        }
        if trimmed.remove(resource_name).is_some() {
            deleted_resources += 1;
        } else {
            resources_not_found.push(resource_name);
        }
    }
    info!("Deleted {deleted_resources} of {original_count} resources for PIO Small");
    if !resources_not_found.is_empty() {
        warn!(
            "{} excluded resources were not present: {resources_not_found:?}",
            resources_not_found.len()
        );
    }

    let mut deleted_paths = 0usize;
    let mut paths_not_found: Vec<&str> = Vec::new();
    for (resource_name, exclusion) in exclusions {
        if exclusion.whole_resource_excluded {
            continue;
        }
        let Some(excluded_paths) = &exclusion.excluded_paths else {
            continue;
        };
        let Some(entry) = trimmed.get_mut(resource_name) else {
            continue;
        };
        for fragment in excluded_paths.keys() {
            let before = entry.paths.len();
            entry.paths.retain(|path, _| !path.contains(fragment.as_str()));
            let removed = before - entry.paths.len();
            deleted_paths += removed;
            if removed == 0 {
                paths_not_found.push(fragment);
            }
        }
    }
    info!("Deleted {deleted_paths} paths for PIO Small");
    if !paths_not_found.is_empty() {
        warn!(
            "{} excluded paths were not present: {paths_not_found:?}",
            paths_not_found.len()
        );
    }

    trimmed
}

/// Re-key the excluded paths for the translation list: slice qualifiers
/// (`:name`) are stripped, untranslated paths are dropped.
pub fn translation_list(exclusions: &PioSmallExclusions) -> PioSmallExclusions {
    let slice_qualifier = Regex::new(r"(:[a-zA-Z\-_]+)").expect("pattern is valid");
    exclusions
        .iter()
        .map(|(resource_name, exclusion)| {
            let mut rewritten = exclusion.clone();
            if !exclusion.whole_resource_excluded
                && let Some(excluded_paths) = &exclusion.excluded_paths
            {
                rewritten.excluded_paths = Some(
                    excluded_paths
                        .iter()
                        .filter_map(|(path, translation)| {
                            let translation = translation.clone()?;
                            Some((
                                slice_qualifier.replace_all(path, "").into_owned(),
                                Some(translation),
                            ))
                        })
                        .collect(),
                );
            }
            (resource_name.clone(), rewritten)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PathConstraint, ProfileEntry, ResourceMeta};

    fn entry(paths: &[&str]) -> ProfileEntry {
        ProfileEntry {
            resource: ResourceMeta {
                status: None,
                profile: "https://example.org/p|1.0.0".to_string(),
                fhir_resource_type: "Observation".to_string(),
            },
            paths: paths
                .iter()
                .map(|path| (path.to_string(), PathConstraint::typed("StringPIO")))
                .collect(),
        }
    }

    fn exclusion(
        whole: bool,
        excluded: &[(&str, Option<&str>)],
    ) -> ResourceExclusions {
        ResourceExclusions {
            whole_resource_excluded: whole,
            translation: None,
            cardinality_reduced_to_one: Vec::new(),
            excluded_paths: (!excluded.is_empty()).then(|| {
                excluded
                    .iter()
                    .map(|(path, translation)| {
                        (path.to_string(), translation.map(str::to_string))
                    })
                    .collect()
            }),
        }
    }

    #[test]
    fn whole_resources_and_matching_paths_are_cut() {
        let mut table = ResourceTable::new();
        table.insert("Gone".to_string(), entry(&["Gone.status"]));
        table.insert(
            "Kept".to_string(),
            entry(&["Kept.status", "Kept.note.text", "Kept.note.author"]),
        );
        let exclusions = PioSmallExclusions::from([
            ("Gone".to_string(), exclusion(true, &[])),
            ("Kept".to_string(), exclusion(false, &[("note", None)])),
        ]);

        let trimmed = trim_table(&table, &exclusions);
        assert!(!trimmed.contains_key("Gone"));
        assert_eq!(
            trimmed["Kept"].paths.keys().collect::<Vec<_>>(),
            vec!["Kept.status"]
        );
        // The input table is untouched.
        assert!(table.contains_key("Gone"));
    }

    #[test]
    fn translation_list_strips_slices_and_untranslated_paths() {
        let exclusions = PioSmallExclusions::from([(
            "Res".to_string(),
            exclusion(
                false,
                &[
                    ("Res.extension:zeit-und-datum.value", Some("Zeit und Datum")),
                    ("Res.note", None),
                ],
            ),
        )]);

        let list = translation_list(&exclusions);
        let paths = list["Res"].excluded_paths.as_ref().unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(
            paths["Res.extension.value"].as_deref(),
            Some("Zeit und Datum")
        );
    }
}
