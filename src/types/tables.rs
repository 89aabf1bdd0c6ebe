use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The full path table: profile name to its flattened entry.
pub type ResourceTable = BTreeMap<String, ProfileEntry>;

/// The terminology table: value set URL (version stripped) to its flat code list.
pub type TerminologyTable = BTreeMap<String, Vec<Concept>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileEntry {
    pub resource: ResourceMeta,
    pub paths: BTreeMap<String, PathConstraint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Canonical profile URL with version, `url|version`.
    pub profile: String,
    /// The wire-format resource type underlying the profile.
    #[serde(rename = "fhir-resource-type")]
    pub fhir_resource_type: String,
}

/// Constraint attached to one normalized element path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathConstraint {
    /// Semantic datatype tag, e.g. `StringPIO`.
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(rename = "valueSet", skip_serializing_if = "Option::is_none")]
    pub value_set: Option<ScalarOrList>,
    #[serde(rename = "fixedValue", skip_serializing_if = "Option::is_none")]
    pub fixed_value: Option<ScalarOrList>,
    #[serde(rename = "profileUrl", skip_serializing_if = "Option::is_none")]
    pub profile_url: Option<ScalarOrList>,
}

/// A field that holds either a single value or the deduplicated union of
/// several merged definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarOrList {
    One(String),
    Many(Vec<String>),
}

impl ScalarOrList {
    pub fn values(&self) -> Vec<String> {
        match self {
            ScalarOrList::One(value) => vec![value.clone()],
            ScalarOrList::Many(values) => values.clone(),
        }
    }

    /// Collapse a deduplicated value list back to a scalar when it has
    /// exactly one member.
    pub fn from_values(mut values: Vec<String>) -> Option<Self> {
        match values.len() {
            0 => None,
            1 => Some(ScalarOrList::One(values.remove(0))),
            _ => Some(ScalarOrList::Many(values)),
        }
    }
}

impl From<String> for ScalarOrList {
    fn from(value: String) -> Self {
        ScalarOrList::One(value)
    }
}

impl From<&str> for ScalarOrList {
    fn from(value: &str) -> Self {
        ScalarOrList::One(value.to_string())
    }
}

/// One code of a resolved terminology, with its German term where known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(rename = "germanDisplay", skip_serializing_if = "Option::is_none")]
    pub german_display: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl PathConstraint {
    pub fn typed(type_tag: impl Into<String>) -> Self {
        Self {
            type_tag: type_tag.into(),
            ..Self::default()
        }
    }
}
