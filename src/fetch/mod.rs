pub mod simplifier;
pub mod snowstorm;

pub use simplifier::SimplifierClient;
pub use snowstorm::{MemberQuery, TerminologyClient};

use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};

use crate::error::Result;

pub(crate) const PAGE_LIMIT: usize = 10_000;

/// Shared header set: the terminology services answer with German
/// designations only when asked to.
pub(crate) fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("de"));
    headers.insert(USER_AGENT, HeaderValue::from_static("pio-lookup-tables/0.1"));
    headers
}

pub(crate) fn build_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .default_headers(default_headers())
        .build()?)
}
