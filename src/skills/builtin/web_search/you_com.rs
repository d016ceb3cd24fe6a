//! You.com index API provider.
//!
//! Calls `GET https://api.ydc-index.io/search?query=…` with the API key
//! in the `X-API-Key` header. The answer is the descriptions and
//! snippets of the first five hits.

use serde::Deserialize;
use url::form_urlencoded;

use super::{SearchProvider, USER_AGENT};
use crate::operation::NetworkRequest;

const ENDPOINT: &str = "https://api.ydc-index.io/search";

/// Number of hits read from a response.
const MAX_HITS: usize = 5;

// ── You.com API types ────────────────────────────────────

#[derive(Deserialize)]
struct YouResponse {
    #[serde(default)]
    hits: Vec<YouHit>,
    error: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct YouHit {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    snippets: Vec<String>,
}

// ── YouComProvider ───────────────────────────────────────

pub struct YouComProvider {
    api_key: String,
}

impl YouComProvider {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
        }
    }
}

impl SearchProvider for YouComProvider {
    fn provider_name(&self) -> &str {
        "you.com"
    }

    fn request(&self, query: &str) -> Option<NetworkRequest> {
        if self.api_key.is_empty() {
            return None;
        }
        let params = form_urlencoded::Serializer::new(String::new())
            .append_pair("query", query)
            .finish();
        Some(
            NetworkRequest::get(format!("{ENDPOINT}?{params}"))
                .header("X-API-Key", &self.api_key)
                .header("Accept", "application/json")
                .header("User-Agent", USER_AGENT),
        )
    }

    fn extract(&self, body: &str) -> anyhow::Result<String> {
        let response: YouResponse = serde_json::from_str(body)?;
        if let Some(error) = response.error {
            anyhow::bail!("You.com API error: {error}");
        }

        let mut parts = Vec::new();
        for hit in response.hits.into_iter().take(MAX_HITS) {
            if let Some(description) = hit.description.filter(|d| !d.is_empty()) {
                parts.push(description);
            }
            parts.extend(hit.snippets.into_iter().filter(|s| !s.trim().is_empty()));
        }
        Ok(parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_key_no_request() {
        assert!(YouComProvider::new("").request("cats").is_none());
    }

    #[test]
    fn test_request_shape() {
        let req = YouComProvider::new("secret").request("black cats").unwrap();
        assert_eq!(req.url, "https://api.ydc-index.io/search?query=black+cats");
        assert_eq!(req.headers.get("X-API-Key").map(String::as_str), Some("secret"));
    }

    #[test]
    fn test_extract_hits() {
        let body = r#"{"hits": [
            {"description": "Cats are mammals.", "snippets": ["Small.", "  "]},
            {"description": "", "snippets": ["Furry."]}
        ]}"#;
        let text = YouComProvider::new("k").extract(body).unwrap();
        assert_eq!(text, "Cats are mammals. Small. Furry.");
    }

    #[test]
    fn test_extract_limits_hits() {
        let hits: Vec<String> = (0..8)
            .map(|i| format!(r#"{{"description": "d{i}"}}"#))
            .collect();
        let body = format!(r#"{{"hits": [{}]}}"#, hits.join(","));
        let text = YouComProvider::new("k").extract(&body).unwrap();
        assert_eq!(text, "d0 d1 d2 d3 d4");
    }

    #[test]
    fn test_extract_api_error() {
        let err = YouComProvider::new("k")
            .extract(r#"{"error": "invalid key"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("invalid key"));
    }
}
