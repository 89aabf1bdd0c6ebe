use std::num::NonZeroU32;
use std::sync::Arc;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde::de::DeserializeOwned;
use tracing::{debug, error};
use url::Url;

use super::{PAGE_LIMIT, build_client};
use crate::error::Result;
use crate::types::MembersPage;

/// Rate-limited client for the Snowstorm terminology browser.
///
/// All calls from the process share one request-per-second budget; callers
/// queue on the limiter instead of failing when the ceiling is reached.
/// Pagination follows the `searchAfter` continuation token and is strictly
/// sequential, each cursor depends on the previous response.
#[derive(Debug, Clone)]
pub struct TerminologyClient {
    http: reqwest::Client,
    base_url: Url,
    limiter: Arc<DefaultDirectRateLimiter>,
}

/// Filter parameters for a `/members` search.
#[derive(Debug, Clone, Default)]
pub struct MemberQuery {
    pub reference_set: Option<String>,
    pub module: Option<String>,
    pub lang: Option<String>,
    pub concept_active: bool,
    pub group_by_concept: bool,
    /// SNOMED description type id, e.g. the synonym type.
    pub description_type: Option<String>,
}

impl MemberQuery {
    pub fn for_reference_set(id: impl Into<String>) -> Self {
        Self {
            reference_set: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn for_module(id: impl Into<String>) -> Self {
        Self {
            module: Some(id.into()),
            ..Self::default()
        }
    }

    fn query_pairs(&self, search_after: Option<&str>) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("limit", PAGE_LIMIT.to_string()),
            ("active", "true".to_string()),
        ];
        if let Some(reference_set) = &self.reference_set {
            pairs.push(("referenceSet", reference_set.clone()));
        }
        if let Some(module) = &self.module {
            pairs.push(("module", module.clone()));
        }
        if let Some(lang) = &self.lang {
            pairs.push(("lang", lang.clone()));
        }
        if self.concept_active {
            pairs.push(("conceptActive", "true".to_string()));
        }
        if self.group_by_concept {
            pairs.push(("groupByConcept", "true".to_string()));
        }
        if let Some(description_type) = &self.description_type {
            pairs.push(("type", description_type.clone()));
        }
        if let Some(cursor) = search_after {
            pairs.push(("searchAfter", cursor.to_string()));
        }
        pairs
    }
}

impl TerminologyClient {
    pub fn new(base_url: Url, requests_per_second: u32) -> Result<Self> {
        let quota = Quota::per_second(
            NonZeroU32::new(requests_per_second.max(1)).expect("ceiling is at least one"),
        );
        Ok(Self {
            http: build_client()?,
            base_url,
            limiter: Arc::new(RateLimiter::direct(quota)),
        })
    }

    fn members_url(&self) -> String {
        format!("{}/members", self.base_url.as_str().trim_end_matches('/'))
    }

    /// Fetch all members matching `query`, following the continuation token
    /// until the accumulated item count reaches the reported total.
    ///
    /// Remote failures degrade: the partial result gathered so far is
    /// returned and the problem is logged, never raised.
    pub async fn fetch_members<T: DeserializeOwned>(&self, query: &MemberQuery) -> Vec<T> {
        let url = self.members_url();
        let mut items: Vec<T> = Vec::new();
        let mut search_after: Option<String> = None;

        loop {
            self.limiter.until_ready().await;
            let response = match self
                .http
                .get(&url)
                .query(&query.query_pairs(search_after.as_deref()))
                .send()
                .await
            {
                Ok(response) => response,
                Err(err) => {
                    error!("Members request failed: {err}");
                    return items;
                }
            };
            if !response.status().is_success() {
                error!(
                    "Looks like there was a problem. Status code: {}",
                    response.status()
                );
                return items;
            }
            let page: MembersPage<T> = match response.json().await {
                Ok(page) => page,
                Err(err) => {
                    error!("Unreadable members page: {err}");
                    return items;
                }
            };

            let received = page.items.len();
            items.extend(page.items);
            debug!(
                "Fetched {received} members ({} of {} total)",
                items.len(),
                page.total
            );

            if received == 0 || items.len() as u64 >= page.total {
                return items;
            }
            match page.search_after {
                Some(cursor) => search_after = Some(cursor),
                None => return items,
            }
        }
    }
}
