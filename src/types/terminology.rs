use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValueSet {
    #[serde(rename = "resourceType")]
    pub resource_type: String,
    pub url: Option<String>,
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compose: Option<ValueSetCompose>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expansion: Option<ValueSetExpansion>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValueSetCompose {
    pub include: Vec<ValueSetInclude>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ValueSetInclude {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concept: Option<Vec<IncludeConcept>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Vec<IncludeFilter>>,
    /// Include-by-reference: this include adopts another value set.
    #[serde(rename = "valueSet", skip_serializing_if = "Option::is_none")]
    pub value_set: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IncludeConcept {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub designation: Option<Vec<Designation>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IncludeFilter {
    pub property: String,
    pub op: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Designation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValueSetExpansion {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contains: Option<Vec<ExpansionContains>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExpansionContains {
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub designation: Option<Vec<Designation>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodeSystem {
    #[serde(rename = "resourceType")]
    pub resource_type: String,
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<Vec<CodeSystemIdentifier>>,
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concept: Option<Vec<CodeSystemConcept>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodeSystemIdentifier {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

/// One node of a possibly hierarchical code system.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CodeSystemConcept {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub designation: Option<Vec<Designation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property: Option<Vec<ConceptProperty>>,
    /// Nested child concepts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concept: Option<Vec<CodeSystemConcept>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConceptProperty {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(rename = "valueCode", skip_serializing_if = "Option::is_none")]
    pub value_code: Option<String>,
    #[serde(rename = "valueBoolean", skip_serializing_if = "Option::is_none")]
    pub value_boolean: Option<bool>,
}

impl CodeSystemConcept {
    /// Concepts flagged deprecated are dropped from flattened lists; their
    /// children are judged on their own properties.
    pub fn is_deprecated(&self) -> bool {
        self.property.as_deref().is_some_and(|properties| {
            properties
                .iter()
                .any(|property| property.value_code.as_deref() == Some("deprecated"))
        })
    }

    /// German designation, if the concept carries one inline.
    pub fn german_designation(&self) -> Option<&str> {
        german_designation(self.designation.as_deref())
    }
}

impl IncludeConcept {
    pub fn german_designation(&self) -> Option<&str> {
        german_designation(self.designation.as_deref())
    }
}

impl ExpansionContains {
    pub fn german_designation(&self) -> Option<&str> {
        german_designation(self.designation.as_deref())
    }
}

fn german_designation(designations: Option<&[Designation]>) -> Option<&str> {
    designations?
        .iter()
        .find(|designation| designation.language.as_deref() == Some("de"))
        .map(|designation| designation.value.as_str())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConceptMap {
    #[serde(rename = "resourceType")]
    pub resource_type: String,
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<Vec<ConceptMapGroup>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConceptMapGroup {
    pub source: Option<String>,
    pub element: Vec<ConceptMapElement>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConceptMapElement {
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<Vec<ConceptMapTarget>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConceptMapTarget {
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}
