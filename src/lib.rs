//! # PIO Lookup Tables
//!
//! Generator for the static lookup tables a PIO (Überleitungsbogen) editor
//! consumes: per-profile path constraint tables flattened from the KBV
//! `KBV_PR_MIO_ULB` StructureDefinitions, a PIO-Small variant trimmed by an
//! exclusion list, and flat German-translated code lists for every value
//! set the tables reference.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pio_lookup_tables::*;
//!
//! # async fn example() -> Result<()> {
//! let config = GeneratorConfig::default();
//! let resolver = StructureResolver::new(&config)?;
//! let table = resolver.build_table().await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod pio_small;
pub mod structure;
pub mod terminology;
pub mod translations;
pub mod types;

pub use cache::FileCache;
pub use config::{CacheConfig, GeneratorConfig};
pub use error::{GeneratorError, Result};
pub use fetch::{SimplifierClient, TerminologyClient};
pub use structure::StructureResolver;
pub use terminology::{DefinitionIndex, TerminologyResolver};
pub use translations::{
    ConceptMapTranslations, PreferredTerms, RefSetTranslations, TranslationStats,
};
pub use types::{Concept, ProfileEntry, ResourceTable, TerminologyTable};
