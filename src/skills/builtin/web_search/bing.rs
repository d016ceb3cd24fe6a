//! Bing Web Search provider.
//!
//! Calls `GET https://api.bing.microsoft.com/v7.0/search` with the key
//! in `Ocp-Apim-Subscription-Key`. The answer is `name: snippet` for the
//! first three web pages.

use serde::Deserialize;
use url::form_urlencoded;

use super::{SearchProvider, NOTHING_FOUND, USER_AGENT};
use crate::operation::NetworkRequest;

const ENDPOINT: &str = "https://api.bing.microsoft.com/v7.0/search";

const MAX_PAGES: usize = 3;

#[derive(Deserialize)]
struct BingResponse {
    #[serde(rename = "webPages")]
    web_pages: Option<BingWebPages>,
}

#[derive(Deserialize)]
struct BingWebPages {
    #[serde(default)]
    value: Vec<BingPage>,
}

#[derive(Deserialize)]
struct BingPage {
    name: Option<String>,
    snippet: Option<String>,
}

pub struct BingProvider {
    api_key: String,
    /// Market code, e.g. `ru-RU`.
    market: String,
}

impl BingProvider {
    pub fn new(api_key: &str, language: &str) -> Self {
        let lang = language.to_lowercase();
        Self {
            api_key: api_key.to_string(),
            market: format!("{lang}-{}", lang.to_uppercase()),
        }
    }
}

impl SearchProvider for BingProvider {
    fn provider_name(&self) -> &str {
        "bing"
    }

    fn request(&self, query: &str) -> Option<NetworkRequest> {
        if self.api_key.is_empty() {
            return None;
        }
        let params = form_urlencoded::Serializer::new(String::new())
            .append_pair("q", query)
            .append_pair("mkt", &self.market)
            .finish();
        Some(
            NetworkRequest::get(format!("{ENDPOINT}?{params}"))
                .header("Ocp-Apim-Subscription-Key", &self.api_key)
                .header("User-Agent", USER_AGENT),
        )
    }

    fn extract(&self, body: &str) -> anyhow::Result<String> {
        let response: BingResponse = serde_json::from_str(body)?;
        let results: Vec<String> = response
            .web_pages
            .map(|pages| pages.value)
            .unwrap_or_default()
            .into_iter()
            .take(MAX_PAGES)
            .filter_map(|page| match (page.name, page.snippet) {
                (Some(name), Some(snippet)) if !name.is_empty() && !snippet.is_empty() => {
                    Some(format!("{name}: {snippet}"))
                }
                _ => None,
            })
            .collect();

        if results.is_empty() {
            return Ok(NOTHING_FOUND.to_string());
        }
        Ok(results.join(" "))
    }
}
