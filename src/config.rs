use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{GeneratorError, Result};

/// Terminology packages scanned for ValueSet and CodeSystem definitions.
pub const TERMINOLOGY_PACKAGES: &[&str] = &[
    "hl7.fhir.r4.core",
    "de.basisprofil.r4",
    "kbv.basis",
    "kbv.mio.ueberleitungsbogen",
    "ihe.formatcode.fhir",
];

/// Package carrying the profiled StructureDefinitions.
pub const PROFILE_PACKAGE: &str = "kbv.mio.ueberleitungsbogen";

/// File name prefix of the profiles that end up in the path table.
pub const PROFILE_PREFIX: &str = "KBV_PR_MIO_ULB";

pub const DEFAULT_TERMINOLOGY_BASE_URL: &str =
    "https://browser.ihtsdotools.org/snowstorm/snomed-ct/MAIN/SNOMEDCT-DE";
pub const DEFAULT_SIMPLIFIER_BASE_URL: &str = "https://simplifier.net";

/// Snowstorm allows a handful of requests per second before throttling.
pub const DEFAULT_REQUESTS_PER_SECOND: u32 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Directory containing the installed FHIR packages.
    pub packages_dir: PathBuf,
    /// Directory with the KBV_SFHIR terminology files (shipped outside the packages).
    pub sfhir_dir: PathBuf,
    /// Exclusion document for the PIO-Small table variant.
    pub exclusions_file: PathBuf,
    /// Where the generated JSON tables are written.
    pub output_dir: PathBuf,
    pub cache: CacheConfig,
    pub terminology_base_url: Url,
    pub simplifier_base_url: Url,
    pub requests_per_second: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub root: PathBuf,
    pub expiry: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: default_cache_dir().unwrap_or_else(|_| PathBuf::from(".cache")),
            expiry: Duration::from_secs(60 * 60 * 24 * 7 * 4), // 4 weeks
        }
    }
}

/// Default cache directory under the user's home.
pub fn default_cache_dir() -> Result<PathBuf> {
    let home_dir = dirs::home_dir()
        .ok_or_else(|| GeneratorError::configuration("Unable to determine home directory"))?;
    Ok(home_dir.join(".pio-lookup-tables").join("cache"))
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            packages_dir: PathBuf::from("node_modules"),
            sfhir_dir: PathBuf::from("KBV_SFHIR"),
            exclusions_file: PathBuf::from("PioSmallExclusions.json"),
            output_dir: PathBuf::from("data"),
            cache: CacheConfig::default(),
            terminology_base_url: Url::parse(DEFAULT_TERMINOLOGY_BASE_URL)
                .expect("default terminology URL is valid"),
            simplifier_base_url: Url::parse(DEFAULT_SIMPLIFIER_BASE_URL)
                .expect("default simplifier URL is valid"),
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
        }
    }
}

impl GeneratorConfig {
    pub fn with_packages_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.packages_dir = dir.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Directory holding the profile StructureDefinitions.
    pub fn profile_dir(&self) -> PathBuf {
        self.packages_dir.join(PROFILE_PACKAGE)
    }

    /// All directories scanned for terminology definition files.
    pub fn definition_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = TERMINOLOGY_PACKAGES
            .iter()
            .map(|package| self.packages_dir.join(package))
            .collect();
        dirs.push(self.sfhir_dir.clone());
        dirs
    }
}

impl CacheConfig {
    pub fn new(root: impl AsRef<Path>, expiry: Duration) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            expiry,
        }
    }
}
