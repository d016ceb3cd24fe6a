//! DuckDuckGo instant-answer provider.
//!
//! Calls `GET https://api.duckduckgo.com/?q=…&format=json&no_html=1`.
//! The answer is `AbstractText`, else the first related topic text
//! (looking one level into topic groups).

use serde::Deserialize;
use url::form_urlencoded;

use super::{SearchProvider, USER_AGENT};
use crate::operation::NetworkRequest;

const ENDPOINT: &str = "https://api.duckduckgo.com/";

#[derive(Deserialize)]
struct DdgResponse {
    #[serde(rename = "AbstractText", default)]
    abstract_text: String,
    #[serde(rename = "RelatedTopics", default)]
    related_topics: Vec<DdgTopic>,
}

#[derive(Deserialize)]
struct DdgTopic {
    #[serde(rename = "Text")]
    text: Option<String>,
    #[serde(rename = "Topics", default)]
    topics: Vec<DdgTopic>,
}

pub struct DuckDuckGoProvider;

impl SearchProvider for DuckDuckGoProvider {
    fn provider_name(&self) -> &str {
        "duckduckgo"
    }

    fn request(&self, query: &str) -> Option<NetworkRequest> {
        let params = form_urlencoded::Serializer::new(String::new())
            .append_pair("q", query.trim().trim_matches('"'))
            .append_pair("format", "json")
            .append_pair("no_html", "1")
            .finish();
        Some(NetworkRequest::get(format!("{ENDPOINT}?{params}")).header("User-Agent", USER_AGENT))
    }

    fn extract(&self, body: &str) -> anyhow::Result<String> {
        let body = if body.trim().is_empty() { "{}" } else { body };
        let response: DdgResponse = serde_json::from_str(body)?;
        if !response.abstract_text.is_empty() {
            return Ok(response.abstract_text);
        }

        for topic in response.related_topics {
            if let Some(text) = topic.text {
                return Ok(text);
            }
            if let Some(text) = topic.topics.into_iter().find_map(|sub| sub.text) {
                return Ok(text);
            }
        }
        Ok(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let req = DuckDuckGoProvider.request("\"rust lang\"").unwrap();
        assert_eq!(
            req.url,
            "https://api.duckduckgo.com/?q=rust+lang&format=json&no_html=1"
        );
    }

    #[test]
    fn test_abstract_preferred() {
        let body = r#"{"AbstractText": "Rust is a language.", "RelatedTopics": [{"Text": "other"}]}"#;
        assert_eq!(DuckDuckGoProvider.extract(body).unwrap(), "Rust is a language.");
    }

    #[test]
    fn test_related_topics_and_groups() {
        let body = r#"{"AbstractText": "", "RelatedTopics": [{"Text": "first"}]}"#;
        assert_eq!(DuckDuckGoProvider.extract(body).unwrap(), "first");

        let body = r#"{"RelatedTopics": [{"Name": "group", "Topics": [{"Text": "nested"}]}]}"#;
        assert_eq!(DuckDuckGoProvider.extract(body).unwrap(), "nested");
    }

    #[test]
    fn test_empty_body() {
        assert_eq!(DuckDuckGoProvider.extract("").unwrap(), "");
    }
}
