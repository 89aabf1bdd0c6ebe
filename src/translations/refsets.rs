use std::collections::HashMap;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::cache::FileCache;
use crate::fetch::{MemberQuery, TerminologyClient};
use crate::types::{RefSetDownload, RefSetMember, TerminologyTable};

/// The curated German reference sets, name and SNOMED refset id. The name
/// doubles as the cache key.
const GERMAN_REFSETS: [(&str, &str); 16] = [
    ("Allergene", "30121001000107"),
    ("Manifestation von Allergien", "30111001000102"),
    ("Unerwünschte Reaktionen bei Impfungen", "30131001000105"),
    ("Allergie/ Unverträglichkeiten bei Impfungen", "30141001000103"),
    ("Zielkrankheit von Impfungen", "30151001000101"),
    ("Immunisierung: Impfplan", "30161001000104"),
    ("MIO Basis-Profile", "71001000103"),
    ("MIO Kinderuntersuchungsheft", "10071001000102"),
    ("MIO Impfpass", "91001000102"),
    ("MIO Mutterpass", "81001000100"),
    ("ORPHAcodes", "50111001000103"),
    ("Mikroorgansimen", "30101001000100"),
    ("Substanzen", "20081001000107"),
    ("Top-Level-Konzepte und gängige Begriffe", "30191001000109"),
    ("Einheit", "30181001000106"),
    ("Impfprodukte", "30171001000108"),
];

/// German preferred terms collected from the reference sets, keyed by
/// concept id.
#[derive(Debug, Clone, Default)]
pub struct RefSetTranslations {
    terms: HashMap<String, String>,
}

impl RefSetTranslations {
    /// Download every reference set concurrently (each paginated and cached
    /// under its German name) and index preferred terms by concept id.
    pub async fn load(client: &TerminologyClient, cache: &FileCache) -> Self {
        let downloads = join_all(
            GERMAN_REFSETS
                .iter()
                .map(|&(name, id)| fetch_refset(client, cache, name, id)),
        )
        .await;

        let mut terms: HashMap<String, String> = HashMap::new();
        for download in downloads {
            for member in download.items {
                let concept = member.referenced_component;
                terms.insert(concept.concept_id, concept.pt.term);
            }
        }
        debug!("Indexed {} concepts from German reference sets", terms.len());
        Self { terms }
    }

    pub fn term(&self, concept_id: &str) -> Option<&str> {
        self.terms.get(concept_id).map(String::as_str)
    }

    /// Fill in German terms for concepts that have none yet. Returns how
    /// many were added.
    pub fn apply(&self, table: &mut TerminologyTable) -> usize {
        let mut added = 0;
        for concepts in table.values_mut() {
            for concept in concepts.iter_mut() {
                if concept.german_display.is_none()
                    && let Some(term) = self.term(&concept.code)
                {
                    concept.german_display = Some(term.to_string());
                    added += 1;
                }
            }
        }
        added
    }
}

async fn fetch_refset(
    client: &TerminologyClient,
    cache: &FileCache,
    name: &str,
    refset_id: &str,
) -> RefSetDownload {
    if let Some(cached) = cache.get::<RefSetDownload>(name).await {
        debug!(
            "Got {}/{} members of {name} from cache",
            cached.items.len(),
            cached.total
        );
        return cached;
    }

    let query = MemberQuery::for_reference_set(refset_id);
    let items: Vec<RefSetMember> = client.fetch_members(&query).await;
    let download = RefSetDownload {
        total: items.len() as u64,
        items,
    };
    debug!(
        "Got {}/{} members of {name} from the terminology server",
        download.items.len(),
        download.total
    );
    if let Err(err) = cache.put(name, &download).await {
        warn!("Could not cache reference set {name}: {err}");
    }
    download
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Concept;

    #[test]
    fn apply_is_additive_and_idempotent() {
        let translations = RefSetTranslations {
            terms: HashMap::from([("387713003".to_string(), "Operation".to_string())]),
        };
        let mut table = TerminologyTable::new();
        table.insert(
            "http://example.org/vs".to_string(),
            vec![
                Concept {
                    code: "387713003".to_string(),
                    display: Some("Surgical procedure".to_string()),
                    german_display: None,
                    system: Some("http://snomed.info/sct".to_string()),
                    version: None,
                },
                Concept {
                    code: "387713003".to_string(),
                    display: None,
                    german_display: Some("Eingriff".to_string()),
                    system: None,
                    version: None,
                },
            ],
        );

        assert_eq!(translations.apply(&mut table), 1);
        let concepts = &table["http://example.org/vs"];
        assert_eq!(concepts[0].german_display.as_deref(), Some("Operation"));
        assert_eq!(concepts[1].german_display.as_deref(), Some("Eingriff"));
        assert_eq!(translations.apply(&mut table), 0);
    }
}
