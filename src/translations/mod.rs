//! German translation overlays for the value-set table.
//!
//! Three sources contribute German terms, in descending precedence: the
//! preferred-term index of the German SNOMED module (consulted while value
//! sets are resolved), the KBV/base-profile concept maps, and the named
//! German reference sets. Overlays are strictly additive: a concept that
//! already carries a German term keeps it.

pub mod concept_maps;
pub mod preferred_terms;
pub mod refsets;

pub use concept_maps::ConceptMapTranslations;
pub use preferred_terms::PreferredTerms;
pub use refsets::RefSetTranslations;

/// Per-run counters over translated codes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranslationStats {
    /// Codes that ended up with a German term.
    pub german: usize,
    /// All codes seen.
    pub total: usize,
}

impl TranslationStats {
    pub fn record(&mut self, has_german: bool) {
        self.total += 1;
        if has_german {
            self.german += 1;
        }
    }

    pub fn absorb(&mut self, other: TranslationStats) {
        self.german += other.german;
        self.total += other.total;
    }

    /// German share in percent, zero for an empty run.
    pub fn coverage_percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.german as f64 / self.total as f64 * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coverage_handles_empty_runs() {
        assert_eq!(TranslationStats::default().coverage_percent(), 0.0);
    }

    #[test]
    fn absorb_adds_both_counters() {
        let mut stats = TranslationStats { german: 1, total: 4 };
        stats.absorb(TranslationStats { german: 2, total: 6 });
        assert_eq!(stats, TranslationStats { german: 3, total: 10 });
        assert!((stats.coverage_percent() - 30.0).abs() < f64::EPSILON);
    }
}
