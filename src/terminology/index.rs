use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::Result;
use crate::types::{CodeSystem, ValueSet};

/// Minimal probe to classify a definition file without loading it fully.
#[derive(Debug, Deserialize)]
struct DocumentProbe {
    #[serde(rename = "resourceType")]
    resource_type: String,
    url: Option<String>,
}

/// Index of every ValueSet and CodeSystem shipped in the definition
/// packages, keyed by canonical URL. Documents are loaded lazily on lookup.
#[derive(Debug, Default)]
pub struct DefinitionIndex {
    value_sets: HashMap<String, PathBuf>,
    code_systems: HashMap<String, PathBuf>,
}

impl DefinitionIndex {
    /// Scan the package directories. Unreadable or malformed files are
    /// logged and skipped; a missing package directory is fatal.
    pub async fn scan(directories: &[PathBuf]) -> Result<Self> {
        let mut index = Self::default();
        for directory in directories {
            index.scan_directory(directory).await?;
        }
        debug!(
            "Indexed {} value sets and {} code systems",
            index.value_sets.len(),
            index.code_systems.len()
        );
        Ok(index)
    }

    async fn scan_directory(&mut self, directory: &Path) -> Result<()> {
        let mut dir_entries = fs::read_dir(directory).await?;
        while let Some(dir_entry) = dir_entries.next_entry().await? {
            let path = dir_entry.path();
            if path.extension().and_then(|extension| extension.to_str()) != Some("json") {
                continue;
            }
            let raw = match fs::read_to_string(&path).await {
                Ok(raw) => raw,
                Err(err) => {
                    warn!("Unreadable definition file {path:?}: {err}");
                    continue;
                }
            };
            let probe: DocumentProbe = match serde_json::from_str(&raw) {
                Ok(probe) => probe,
                Err(err) => {
                    warn!("Skipping malformed definition file {path:?}: {err}");
                    continue;
                }
            };
            let Some(url) = probe.url else {
                continue;
            };
            match probe.resource_type.as_str() {
                "ValueSet" => {
                    self.value_sets.insert(url, path);
                }
                "CodeSystem" => {
                    self.code_systems.insert(url, path);
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub async fn load_value_set(&self, url: &str) -> Option<ValueSet> {
        load_document(self.value_sets.get(url)?, url).await
    }

    pub async fn load_code_system(&self, url: &str) -> Option<CodeSystem> {
        load_document(self.code_systems.get(url)?, url).await
    }
}

async fn load_document<T: serde::de::DeserializeOwned>(path: &Path, url: &str) -> Option<T> {
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(err) => {
            warn!("Unreadable definition for {url} at {path:?}: {err}");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(document) => Some(document),
        Err(err) => {
            warn!("Malformed definition for {url} at {path:?}: {err}");
            None
        }
    }
}
