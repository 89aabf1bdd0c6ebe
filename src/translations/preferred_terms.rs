use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::FileCache;
use crate::error::Result;
use crate::fetch::{MemberQuery, TerminologyClient};
use crate::types::LanguageMember;

/// Module holding the German SNOMED extension descriptions.
const GERMAN_MODULE: &str = "11000274103";
/// Description type id for synonyms.
const SYNONYM_TYPE: &str = "900000000000013009";
/// German language reference set deciding acceptability.
const GERMAN_LANGUAGE_REFSET: &str = "31000274107";

const CACHE_KEY: &str = "germanConceptIds";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PreferredTerm {
    #[serde(rename = "conceptId")]
    concept_id: String,
    term: String,
    #[serde(rename = "languageCode")]
    language_code: String,
    #[serde(rename = "acceptabilityMap")]
    acceptability_map: HashMap<String, String>,
}

impl PreferredTerm {
    fn is_preferred(&self) -> bool {
        self.acceptability_map.get(GERMAN_LANGUAGE_REFSET).map(String::as_str)
            == Some("PREFERRED")
    }
}

/// German preferred-term index over the whole German module, keyed by
/// concept id.
#[derive(Debug, Clone, Default)]
pub struct PreferredTerms {
    terms: HashMap<String, PreferredTerm>,
}

impl PreferredTerms {
    /// Download (or reuse the cached copy of) the German module's synonym
    /// descriptions and index them by concept id.
    pub async fn load(client: &TerminologyClient, cache: &FileCache) -> Result<Self> {
        if let Some(cached) = cache.get::<HashMap<String, PreferredTerm>>(CACHE_KEY).await {
            return Ok(Self { terms: cached });
        }

        let query = MemberQuery {
            module: Some(GERMAN_MODULE.to_string()),
            lang: Some("de".to_string()),
            concept_active: true,
            group_by_concept: true,
            description_type: Some(SYNONYM_TYPE.to_string()),
            ..MemberQuery::default()
        };
        let members: Vec<LanguageMember> = client.fetch_members(&query).await;
        let terms = index_members(members);

        cache.put(CACHE_KEY, &terms).await?;
        Ok(Self { terms })
    }

    pub fn term(&self, concept_id: &str) -> Option<&str> {
        self.terms
            .get(concept_id)
            .map(|preferred| preferred.term.as_str())
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Index descriptions by concept id. Inactive, unreleased, non-German and
/// empty descriptions are skipped. Among duplicates a PREFERRED description
/// is never displaced by a non-preferred one; when neither competitor is
/// preferred the last one wins with a warning.
fn index_members(members: Vec<LanguageMember>) -> HashMap<String, PreferredTerm> {
    let mut terms: HashMap<String, PreferredTerm> = HashMap::new();
    let mut skipped = 0usize;
    let mut duplicates = 0usize;
    let fetched = members.len();

    for member in members {
        let component = member.referenced_component;
        let usable = member.active
            && member.released
            && component.lang.as_deref() == Some("de")
            && component.term.as_deref().is_some_and(|term| !term.is_empty());
        if !usable {
            skipped += 1;
            continue;
        }
        let candidate = PreferredTerm {
            concept_id: component.concept_id.clone(),
            term: component.term.unwrap_or_default(),
            language_code: "de".to_string(),
            acceptability_map: component.acceptability_map,
        };
        match terms.get(&candidate.concept_id) {
            None => {
                terms.insert(candidate.concept_id.clone(), candidate);
            }
            Some(existing) => {
                duplicates += 1;
                if candidate.is_preferred() || !existing.is_preferred() {
                    if !candidate.is_preferred() {
                        warn!(
                            "Concept {} has no preferred German term",
                            candidate.concept_id
                        );
                    }
                    terms.insert(candidate.concept_id.clone(), candidate);
                }
            }
        }
    }

    debug!(
        "Indexed {} individual German concepts out of {fetched} descriptions",
        terms.len()
    );
    if skipped > 0 {
        warn!("Not active, released or German: {skipped}/{fetched}");
    }
    if duplicates > 0 {
        warn!("Duplicate concept descriptions: {duplicates}/{fetched}");
    }

    terms
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DescriptionComponent;

    fn member(concept_id: &str, term: &str, acceptability: Option<&str>) -> LanguageMember {
        LanguageMember {
            active: true,
            released: true,
            referenced_component: DescriptionComponent {
                concept_id: concept_id.to_string(),
                term: Some(term.to_string()),
                lang: Some("de".to_string()),
                acceptability_map: acceptability
                    .map(|value| {
                        HashMap::from([(GERMAN_LANGUAGE_REFSET.to_string(), value.to_string())])
                    })
                    .unwrap_or_default(),
            },
        }
    }

    fn term(concept_id: &str, term: &str, acceptability: Option<&str>) -> PreferredTerm {
        PreferredTerm {
            concept_id: concept_id.to_string(),
            term: term.to_string(),
            language_code: "de".to_string(),
            acceptability_map: acceptability
                .map(|value| {
                    HashMap::from([(GERMAN_LANGUAGE_REFSET.to_string(), value.to_string())])
                })
                .unwrap_or_default(),
        }
    }

    #[test]
    fn preferred_flag_reads_the_language_refset() {
        assert!(term("1", "Herz", Some("PREFERRED")).is_preferred());
        assert!(!term("1", "Herz", Some("ACCEPTABLE")).is_preferred());
        assert!(!term("1", "Herz", None).is_preferred());
    }

    #[test]
    fn lookup_returns_the_indexed_term() {
        let index = PreferredTerms {
            terms: HashMap::from([("74964007".to_string(), term("74964007", "Andere", None))]),
        };
        assert_eq!(index.term("74964007"), Some("Andere"));
        assert_eq!(index.term("0"), None);
    }

    #[test]
    fn preferred_description_is_never_displaced() {
        let terms = index_members(vec![
            member("80146002", "Appendektomie", Some("PREFERRED")),
            member("80146002", "Blinddarmentfernung", Some("ACCEPTABLE")),
        ]);
        assert_eq!(terms["80146002"].term, "Appendektomie");
    }

    #[test]
    fn preferred_description_replaces_an_earlier_synonym() {
        let terms = index_members(vec![
            member("80146002", "Blinddarmentfernung", Some("ACCEPTABLE")),
            member("80146002", "Appendektomie", Some("PREFERRED")),
        ]);
        assert_eq!(terms["80146002"].term, "Appendektomie");
    }

    #[test]
    fn last_description_wins_when_neither_is_preferred() {
        let terms = index_members(vec![
            member("80146002", "Blinddarmentfernung", Some("ACCEPTABLE")),
            member("80146002", "Wurmfortsatzentfernung", None),
        ]);
        assert_eq!(terms["80146002"].term, "Wurmfortsatzentfernung");
    }

    #[test]
    fn unusable_descriptions_are_skipped() {
        let mut inactive = member("1", "Herz", Some("PREFERRED"));
        inactive.active = false;
        let mut english = member("2", "Heart", Some("PREFERRED"));
        english.referenced_component.lang = Some("en".to_string());
        let mut empty = member("3", "", Some("PREFERRED"));
        empty.referenced_component.term = Some(String::new());

        assert!(index_members(vec![inactive, english, empty]).is_empty());
    }
}
