use std::time::Duration;

use tracing::{error, warn};
use url::Url;

use super::build_client;
use crate::error::{GeneratorError, Result};
use crate::types::{ConceptMap, StructureDefinition};

const SNAPSHOT_RETRIES: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Client for Simplifier resource downloads: profile snapshots and concept
/// map documents.
#[derive(Debug, Clone)]
pub struct SimplifierClient {
    http: reqwest::Client,
    base_url: Url,
}

impl SimplifierClient {
    pub fn new(base_url: Url) -> Result<Self> {
        Ok(Self {
            http: build_client()?,
            base_url,
        })
    }

    /// Fetch the fully resolved snapshot of the named profile.
    ///
    /// This is the one fetch path that must succeed for the pipeline to
    /// proceed: transport or shape errors are retried with a short delay and
    /// only surfaced once the retry budget is exhausted.
    pub async fn fetch_snapshot(&self, name: &str) -> Result<StructureDefinition> {
        let mut retries_left = SNAPSHOT_RETRIES;
        loop {
            match self.try_fetch_snapshot(name).await {
                Ok(structure_definition) => return Ok(structure_definition),
                Err(err) if retries_left > 0 => {
                    warn!("Error fetching snapshot for {name}, retrying ({retries_left} left): {err}");
                    tokio::time::sleep(RETRY_DELAY).await;
                    retries_left -= 1;
                }
                Err(err) => {
                    error!("Error fetching snapshot for {name}: {err}");
                    return Err(err);
                }
            }
        }
    }

    async fn try_fetch_snapshot(&self, name: &str) -> Result<StructureDefinition> {
        let url = format!(
            "{}/ulb/{name}/$downloadsnapshot?format=json",
            self.base_url.as_str().trim_end_matches('/')
        );
        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(GeneratorError::fetch(format!(
                "Snapshot request for {name} answered {}",
                response.status()
            )));
        }
        let structure_definition: StructureDefinition = response.json().await?;
        if structure_definition.resource_type != "StructureDefinition"
            || structure_definition.snapshot.is_none()
        {
            return Err(GeneratorError::parsing(format!(
                "Download for {name} is not a snapshotted StructureDefinition"
            )));
        }
        Ok(structure_definition)
    }

    /// Fetch a concept map document from an absolute download URL.
    ///
    /// Failures degrade to `None` with a logged error; a missing mapping
    /// source only costs translations, not the run.
    pub async fn fetch_concept_map(&self, url: &str) -> Option<ConceptMap> {
        let response = match self.http.get(url).send().await {
            Ok(response) => response,
            Err(err) => {
                error!("Error fetching ConceptMap from {url}: {err}");
                return None;
            }
        };
        if !response.status().is_success() {
            error!(
                "Error fetching ConceptMap from {url}: {}",
                response.status()
            );
            return None;
        }
        match response.json::<ConceptMap>().await {
            Ok(concept_map) if concept_map.resource_type == "ConceptMap" => Some(concept_map),
            Ok(_) => {
                error!("Document at {url} is not a ConceptMap");
                None
            }
            Err(err) => {
                error!("Unreadable ConceptMap from {url}: {err}");
                None
            }
        }
    }
}
