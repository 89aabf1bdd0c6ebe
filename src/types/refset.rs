use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One page of a Snowstorm `/members` search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembersPage<T> {
    pub items: Vec<T>,
    pub total: u64,
    #[serde(rename = "searchAfter", skip_serializing_if = "Option::is_none")]
    pub search_after: Option<String>,
}

/// Member of a terminology reference set, carrying the concept it points at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefSetMember {
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub released: bool,
    #[serde(rename = "referencedComponent")]
    pub referenced_component: RefSetConcept,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefSetConcept {
    #[serde(rename = "conceptId")]
    pub concept_id: String,
    /// Fully specified name.
    pub fsn: RefSetTerm,
    /// Preferred term in the requested language.
    pub pt: RefSetTerm,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefSetTerm {
    pub term: String,
    pub lang: Option<String>,
}

/// A cached, fully paginated reference-set download.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefSetDownload {
    pub items: Vec<RefSetMember>,
    pub total: u64,
}

/// Member of a language refset search grouped by concept: one German
/// description per item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageMember {
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub released: bool,
    #[serde(rename = "referencedComponent")]
    pub referenced_component: DescriptionComponent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptionComponent {
    #[serde(rename = "conceptId")]
    pub concept_id: String,
    pub term: Option<String>,
    pub lang: Option<String>,
    #[serde(rename = "acceptabilityMap", default)]
    pub acceptability_map: HashMap<String, String>,
}
