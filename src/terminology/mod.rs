//! Resolution of value-set references into flat German-translated code
//! lists.
//!
//! Every `valueSet` URL referenced by the path tables is resolved against
//! the definition packages: enumerated include concepts are translated via
//! inline designations or the preferred-term index, non-SNOMED systems are
//! expanded from their CodeSystem definitions (honoring `is-a` filters and
//! skipping deprecated concepts), and expansions contribute the codes the
//! includes did not already cover.

pub mod index;

pub use index::DefinitionIndex;

use std::collections::{HashMap, HashSet};

use futures::future::join_all;
use tracing::warn;

use crate::translations::{PreferredTerms, TranslationStats};
use crate::types::{
    CodeSystem, CodeSystemConcept, Concept, IncludeFilter, ResourceTable, TerminologyTable,
};

/// The IHE format-code value-set URL is published under a different
/// canonical than its code system.
const IHE_FORMATCODE_VALUESET: &str = "http://ihe.net/fhir/ValueSet/IHE.FormatCode.codesystem";
const IHE_FORMATCODE_CODESYSTEM: &str =
    "http://ihe.net/fhir/ihe.formatcode.fhir/CodeSystem/formatcode";

#[derive(Debug)]
pub struct TerminologyResolver {
    index: DefinitionIndex,
    preferred: PreferredTerms,
}

/// One include of a value set after local resolution, before the code
/// system pass.
#[derive(Debug, Default)]
struct ResolvedInclude {
    system: Option<String>,
    filters: Vec<IncludeFilter>,
    /// Enumerated and translated concepts; `None` when the include names a
    /// whole system (possibly filtered).
    concepts: Option<Vec<Concept>>,
}

/// Every distinct value-set URL referenced by the table, version qualifiers
/// stripped, in first-appearance order.
pub fn collect_references(table: &ResourceTable) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut references = Vec::new();
    for entry in table.values() {
        for constraint in entry.paths.values() {
            let Some(value_set) = &constraint.value_set else {
                continue;
            };
            for reference in value_set.values() {
                let bare = reference
                    .split('|')
                    .next()
                    .unwrap_or(reference.as_str())
                    .to_string();
                if seen.insert(bare.clone()) {
                    references.push(bare);
                }
            }
        }
    }
    references
}

impl TerminologyResolver {
    pub fn new(index: DefinitionIndex, preferred: PreferredTerms) -> Self {
        Self { index, preferred }
    }

    /// Resolve every reference the table carries; resolutions are
    /// independent and joined concurrently.
    pub async fn resolve_table(
        &self,
        table: &ResourceTable,
    ) -> (TerminologyTable, TranslationStats) {
        let references = collect_references(table);
        let resolutions = join_all(
            references
                .iter()
                .map(|reference| self.resolve_reference(reference)),
        )
        .await;

        let mut stats = TranslationStats::default();
        let mut resolved = TerminologyTable::new();
        for (reference, (concepts, local_stats)) in references.into_iter().zip(resolutions) {
            stats.absorb(local_stats);
            resolved.insert(reference, concepts);
        }
        (resolved, stats)
    }

    async fn resolve_reference(&self, url: &str) -> (Vec<Concept>, TranslationStats) {
        let mut stats = TranslationStats::default();
        let Some(value_set) = self.index.load_value_set(url).await else {
            warn!("No local definition for value set {url}");
            return (Vec::new(), stats);
        };

        let mut includes: Vec<ResolvedInclude> = Vec::new();
        for include in value_set
            .compose
            .as_ref()
            .map(|compose| compose.include.as_slice())
            .unwrap_or_default()
        {
            if let (Some(system), Some(concepts)) = (&include.system, &include.concept) {
                let resolved = concepts
                    .iter()
                    .map(|concept| {
                        let german = concept
                            .german_designation()
                            .or_else(|| self.preferred.term(&concept.code))
                            .map(str::to_string);
                        stats.record(german.is_some());
                        Concept {
                            code: concept.code.clone(),
                            display: german.clone().or_else(|| concept.display.clone()),
                            german_display: german,
                            system: Some(system.clone()),
                            version: include
                                .version
                                .clone()
                                .or_else(|| value_set.version.clone()),
                        }
                    })
                    .collect();
                includes.push(ResolvedInclude {
                    system: Some(system.clone()),
                    filters: include.filter.clone().unwrap_or_default(),
                    concepts: Some(resolved),
                });
            } else if let Some(references) = include.value_set.as_deref()
                && let [reference] = references
            {
                // Include-by-reference adopts the referenced set's system.
                includes.push(ResolvedInclude {
                    system: self.adopt_system(reference).await,
                    filters: include.filter.clone().unwrap_or_default(),
                    concepts: None,
                });
            } else {
                includes.push(ResolvedInclude {
                    system: include.system.clone(),
                    filters: include.filter.clone().unwrap_or_default(),
                    concepts: None,
                });
            }
        }

        for include in &mut includes {
            self.combine_with_code_system(include).await;
        }

        let expansion = value_set.expansion.as_ref().and_then(|expansion| {
            let offset = expansion.offset?;
            let total = expansion.total?;
            let contains = expansion.contains.as_deref().unwrap_or_default();
            let sliced = contains
                .iter()
                .skip(offset)
                .take(total.saturating_sub(offset))
                .filter_map(|contained| {
                    let code = contained.code.clone()?;
                    let german = contained.german_designation().map(str::to_string);
                    Some(Concept {
                        code,
                        display: german.clone().or_else(|| contained.display.clone()),
                        german_display: german,
                        system: contained.system.clone(),
                        version: contained.version.clone(),
                    })
                })
                .collect::<Vec<_>>();
            Some(sliced)
        });

        (merge_concepts(includes, expansion), stats)
    }

    /// Walk a chain of include-by-reference value sets down to a concrete
    /// system; the last include of each set decides.
    async fn adopt_system(&self, url: &str) -> Option<String> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut current = url.to_string();
        loop {
            if !visited.insert(current.clone()) {
                warn!("Cyclic value-set reference through {current}");
                return None;
            }
            let value_set = self.index.load_value_set(&current).await?;
            let include = value_set.compose.as_ref()?.include.last()?;
            if let Some(system) = &include.system {
                return Some(system.clone());
            }
            match include.value_set.as_deref() {
                Some([reference]) => current = reference.clone(),
                _ => return None,
            }
        }
    }

    /// Replace or supplement an include's concepts from the code system it
    /// names. SNOMED systems stay untouched, their content only exists
    /// remotely.
    async fn combine_with_code_system(&self, include: &mut ResolvedInclude) {
        let Some(system) = include.system.clone() else {
            return;
        };
        if system.contains("://snomed.info/sct") {
            return;
        }
        let system = if system == IHE_FORMATCODE_VALUESET {
            IHE_FORMATCODE_CODESYSTEM
        } else {
            system.as_str()
        };
        let Some(code_system) = self.index.load_code_system(system).await else {
            return;
        };
        let Some(flattened) = flatten_code_system(&code_system, &include.filters) else {
            return;
        };

        match include.concepts.take() {
            Some(enumerated) => {
                // Keep only the enumerated codes, enriched from the code
                // system where it knows them; translations already resolved
                // on the enumerated side survive as fallback.
                let subset = enumerated
                    .into_iter()
                    .filter_map(|wanted| {
                        let found = flattened.iter().find(|concept| concept.code == wanted.code)?;
                        let german = found
                            .german_display
                            .clone()
                            .or(wanted.german_display);
                        Some(Concept {
                            code: found.code.clone(),
                            display: german
                                .clone()
                                .or_else(|| found.display.clone())
                                .or(wanted.display),
                            german_display: german,
                            system: found.system.clone(),
                            version: found.version.clone(),
                        })
                    })
                    .collect();
                include.concepts = Some(subset);
            }
            None => include.concepts = Some(flattened),
        }
    }
}

/// Flatten a code system's concept tree, applying `is-a` filters first.
///
/// Returns `None` when the system defines no concepts at all. Deprecated
/// concepts are dropped at any depth while their children are still
/// visited.
fn flatten_code_system(
    code_system: &CodeSystem,
    filters: &[IncludeFilter],
) -> Option<Vec<Concept>> {
    let system = code_system.url.clone().or_else(|| {
        code_system
            .identifier
            .as_deref()?
            .first()?
            .system
            .clone()
    });
    let version = code_system.version.clone();

    let mut working: Vec<CodeSystemConcept> = code_system.concept.clone()?;
    for filter in filters {
        if filter.op != "is-a" {
            warn!("Filter operation not supported: {} {}", filter.op, filter.value);
            continue;
        }
        match find_concept(&working, &filter.value) {
            Some(anchor) => working = anchor.concept.unwrap_or_default(),
            None => warn!(
                "No concept matches is-a filter value {} in {}",
                filter.value,
                system.as_deref().unwrap_or("unnamed system")
            ),
        }
    }

    let mut flattened = Vec::new();
    let mut stack: Vec<&CodeSystemConcept> = working.iter().rev().collect();
    while let Some(node) = stack.pop() {
        for child in node.concept.as_deref().unwrap_or_default().iter().rev() {
            stack.push(child);
        }
        if node.is_deprecated() {
            continue;
        }
        let german = node.german_designation().map(str::to_string);
        flattened.push(Concept {
            code: node.code.clone(),
            display: german.clone().or_else(|| node.display.clone()),
            german_display: german,
            system: system.clone(),
            version: version.clone(),
        });
    }
    Some(flattened)
}

/// Depth-first search for a code anywhere in the concept tree.
fn find_concept(concepts: &[CodeSystemConcept], code: &str) -> Option<CodeSystemConcept> {
    let mut stack: Vec<&CodeSystemConcept> = concepts.iter().rev().collect();
    while let Some(node) = stack.pop() {
        if node.code == code {
            return Some(node.clone());
        }
        for child in node.concept.as_deref().unwrap_or_default().iter().rev() {
            stack.push(child);
        }
    }
    None
}

/// Merge include-derived concepts keyed by code (last write wins, first
/// position kept), then expansion concepts only where absent.
fn merge_concepts(
    includes: Vec<ResolvedInclude>,
    expansion: Option<Vec<Concept>>,
) -> Vec<Concept> {
    let mut order: Vec<String> = Vec::new();
    let mut merged: HashMap<String, Concept> = HashMap::new();
    for include in includes {
        for concept in include.concepts.unwrap_or_default() {
            if concept.code.is_empty() {
                continue;
            }
            if !merged.contains_key(&concept.code) {
                order.push(concept.code.clone());
            }
            merged.insert(concept.code.clone(), concept);
        }
    }
    for concept in expansion.unwrap_or_default() {
        if concept.code.is_empty() || merged.contains_key(&concept.code) {
            continue;
        }
        order.push(concept.code.clone());
        merged.insert(concept.code.clone(), concept);
    }
    order
        .iter()
        .filter_map(|code| merged.remove(code))
        .collect()
}
