use std::collections::HashMap;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::cache::FileCache;
use crate::fetch::SimplifierClient;
use crate::types::{ConceptMap, TerminologyTable};

/// Published concept maps carrying German display texts.
const CONCEPT_MAP_URLS: [&str; 3] = [
    "https://simplifier.net/base1x0/kbv-cm-base-terminology-complete-german/$download?format=json",
    "https://simplifier.net/ulb/kbv-cm-mio-ulb-overview/$download?format=json",
    "https://simplifier.net/basisprofil-de-r4/conceptmap-ops-snomed-category-mapping/$download?format=json",
];

/// German terms gathered from the concept maps, keyed by source system and
/// code. Later documents overwrite earlier ones during loading; application
/// to the table is additive only.
#[derive(Debug, Clone, Default)]
pub struct ConceptMapTranslations {
    by_system: HashMap<String, HashMap<String, String>>,
}

impl ConceptMapTranslations {
    pub async fn load(client: &SimplifierClient, cache: &FileCache) -> Self {
        let downloads = join_all(
            CONCEPT_MAP_URLS
                .iter()
                .map(|url| fetch_document(client, cache, url)),
        )
        .await;

        let mut by_system: HashMap<String, HashMap<String, String>> = HashMap::new();
        for document in downloads.into_iter().flatten() {
            absorb(&mut by_system, &document);
        }
        debug!(
            "Loaded concept-map translations for {} systems",
            by_system.len()
        );
        Self { by_system }
    }

    pub fn term(&self, system: &str, code: &str) -> Option<&str> {
        self.by_system.get(system)?.get(code).map(String::as_str)
    }

    /// Fill in German terms for concepts that have none yet. Returns how
    /// many were added.
    pub fn apply(&self, table: &mut TerminologyTable) -> usize {
        let mut added = 0;
        for concepts in table.values_mut() {
            for concept in concepts.iter_mut() {
                if concept.german_display.is_some() {
                    continue;
                }
                let Some(system) = concept.system.as_deref() else {
                    continue;
                };
                if let Some(term) = self.term(system, &concept.code) {
                    concept.german_display = Some(term.to_string());
                    added += 1;
                }
            }
        }
        added
    }
}

/// The cache key names the map by the second-to-last URL path segment.
fn document_name(url: &str) -> &str {
    let mut segments = url.split('/').rev();
    segments.next();
    segments.next().unwrap_or(url)
}

async fn fetch_document(
    client: &SimplifierClient,
    cache: &FileCache,
    url: &str,
) -> Option<ConceptMap> {
    let cache_key = format!("conceptMap_{}", document_name(url));
    if let Some(cached) = cache.get::<ConceptMap>(&cache_key).await
        && cached.resource_type == "ConceptMap"
    {
        return Some(cached);
    }
    let fetched = client.fetch_concept_map(url).await?;
    if let Err(err) = cache.put(&cache_key, &fetched).await {
        warn!("Could not cache ConceptMap {cache_key}: {err}");
    }
    Some(fetched)
}

/// Each element contributes its last target's display under the group's
/// source system.
fn absorb(by_system: &mut HashMap<String, HashMap<String, String>>, document: &ConceptMap) {
    for group in document.group.as_deref().unwrap_or_default() {
        let Some(source) = group.source.as_deref() else {
            continue;
        };
        let codes = by_system.entry(source.to_string()).or_default();
        for element in &group.element {
            let Some(code) = element.code.as_deref() else {
                continue;
            };
            let display = element
                .target
                .as_deref()
                .and_then(|targets| targets.last())
                .and_then(|target| target.display.as_deref());
            if let Some(display) = display {
                codes.insert(code.to_string(), display.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Concept, ConceptMapElement, ConceptMapGroup, ConceptMapTarget};

    fn document(source: &str, code: &str, displays: &[&str]) -> ConceptMap {
        ConceptMap {
            resource_type: "ConceptMap".to_string(),
            url: None,
            group: Some(vec![ConceptMapGroup {
                source: Some(source.to_string()),
                element: vec![ConceptMapElement {
                    code: Some(code.to_string()),
                    target: Some(
                        displays
                            .iter()
                            .map(|display| ConceptMapTarget {
                                code: Some("t".to_string()),
                                display: Some(display.to_string()),
                            })
                            .collect(),
                    ),
                }],
            }]),
        }
    }

    #[test]
    fn last_target_display_wins_within_an_element() {
        let mut by_system = HashMap::new();
        absorb(
            &mut by_system,
            &document("http://snomed.info/sct", "386661006", &["Temperatur", "Fieber"]),
        );
        assert_eq!(
            by_system["http://snomed.info/sct"]["386661006"],
            "Fieber"
        );
    }

    #[test]
    fn later_documents_overwrite_earlier_ones() {
        let mut by_system = HashMap::new();
        absorb(&mut by_system, &document("sys", "a", &["alt"]));
        absorb(&mut by_system, &document("sys", "a", &["neu"]));
        assert_eq!(by_system["sys"]["a"], "neu");
    }

    #[test]
    fn apply_never_overwrites_an_existing_german_term() {
        let translations = ConceptMapTranslations {
            by_system: HashMap::from([(
                "sys".to_string(),
                HashMap::from([("a".to_string(), "Neu".to_string())]),
            )]),
        };
        let mut table = TerminologyTable::new();
        table.insert(
            "http://example.org/vs".to_string(),
            vec![
                Concept {
                    code: "a".to_string(),
                    display: Some("Old".to_string()),
                    german_display: Some("Alt".to_string()),
                    system: Some("sys".to_string()),
                    version: None,
                },
                Concept {
                    code: "a".to_string(),
                    display: None,
                    german_display: None,
                    system: Some("sys".to_string()),
                    version: None,
                },
            ],
        );

        let added = translations.apply(&mut table);
        assert_eq!(added, 1);
        let concepts = &table["http://example.org/vs"];
        assert_eq!(concepts[0].german_display.as_deref(), Some("Alt"));
        assert_eq!(concepts[1].german_display.as_deref(), Some("Neu"));

        // Applying again is a no-op.
        assert_eq!(translations.apply(&mut table), 0);
    }

    #[test]
    fn document_name_is_second_to_last_segment() {
        assert_eq!(
            document_name(
                "https://simplifier.net/ulb/kbv-cm-mio-ulb-overview/$download?format=json"
            ),
            "kbv-cm-mio-ulb-overview"
        );
    }
}
