//! Builtin skill: web search through a fallback chain of providers.
//!
//! Providers are tried in priority order; the first one that yields a
//! usable answer wins. Every provider request is a network
//! [`Operation`] checked by the caller's [`Guard`].
//!
//! Supported providers:
//! - **You.com** index API, when an API key is configured
//! - **Bing** Web Search, when an API key is configured
//! - **Wikipedia** summaries, native language then foreign language
//! - **DuckDuckGo** instant answers

mod bing;
mod duckduckgo;
mod wikipedia;
mod you_com;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::SearchConfig;
use crate::error::GuardError;
use crate::guard::{Guard, GuardFactory};
use crate::operation::{NetworkRequest, Operation};
use crate::skills::Skill;

pub use bing::BingProvider;
pub use duckduckgo::DuckDuckGoProvider;
pub use wikipedia::{TitleStyle, WikipediaProvider};
pub use you_com::YouComProvider;

/// Canonical answer when no provider found anything.
pub const NOTHING_FOUND: &str = "Nothing found for your query";

/// Case-insensitive marker that makes a provider answer count as empty.
const NOTHING_FOUND_MARKER: &str = "nothing found";

/// User-Agent sent by every provider.
pub(super) const USER_AGENT: &str = "ApexMind/1.0";

// ── SearchProvider trait ─────────────────────────────────

/// One search backend.
///
/// A provider does no I/O itself: it describes the single request it
/// needs, and turns the response body into answer text. This keeps the
/// Guard between every provider and the network.
pub trait SearchProvider: Send + Sync {
    /// The provider name (e.g. `"wikipedia-en"`).
    fn provider_name(&self) -> &str;

    /// Request for `query`, or `None` if the provider is not usable
    /// (e.g. no API key).
    fn request(&self, query: &str) -> Option<NetworkRequest>;

    /// Extracts answer text from a response body. Empty means no answer.
    fn extract(&self, body: &str) -> anyhow::Result<String>;
}

// ── SearchChain ──────────────────────────────────────────

pub struct SearchChain {
    providers: Vec<Box<dyn SearchProvider>>,
}

impl SearchChain {
    pub fn new(providers: Vec<Box<dyn SearchProvider>>) -> Self {
        Self { providers }
    }

    /// Default chain: You.com, Bing (only when keyed), Wikipedia in the
    /// native then the foreign language, DuckDuckGo.
    pub fn from_config(config: &SearchConfig) -> Self {
        let mut providers: Vec<Box<dyn SearchProvider>> = vec![
            Box::new(YouComProvider::new(&config.you_api_key)),
            Box::new(WikipediaProvider::new(
                &config.native_language,
                TitleStyle::Capitalized,
            )),
            Box::new(WikipediaProvider::new(
                &config.foreign_language,
                TitleStyle::Transliterated,
            )),
            Box::new(DuckDuckGoProvider),
        ];
        if !config.bing_api_key.is_empty() {
            providers.insert(
                1,
                Box::new(BingProvider::new(
                    &config.bing_api_key,
                    &config.native_language,
                )),
            );
        }
        Self::new(providers)
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.provider_name()).collect()
    }

    /// Searches for `query`, stopping at the first accepted answer.
    ///
    /// Provider failures are logged and skipped, including a provider
    /// whose host the manifest's domain list refuses. A manifest without
    /// network access aborts the chain, and so does a chain where every
    /// attempted provider was denied: the denial is returned. Otherwise,
    /// when every provider comes up empty the result is [`NOTHING_FOUND`].
    pub async fn search(&self, guard: &Guard, query: &str) -> Result<String, GuardError> {
        let query = sanitize_query(query);
        if query.is_empty() {
            return Err(GuardError::InvalidRequest("No search query found".to_string()));
        }

        let mut attempted = 0;
        let mut denied = Vec::new();

        for provider in &self.providers {
            let name = provider.provider_name();
            let Some(request) = provider.request(&query) else {
                debug!(provider = name, "Provider not configured, skipping");
                continue;
            };

            attempted += 1;
            let response = match guard
                .check_and_execute(Operation::NetworkRequest(request))
                .await
            {
                Ok(output) => output.into_http(),
                Err(e) if e.is_permission_denied() && !guard.manifest().network => return Err(e),
                Err(e) if e.is_permission_denied() => {
                    warn!(provider = name, "Search provider denied: {e}");
                    denied.push(e);
                    continue;
                }
                Err(e) => {
                    warn!(provider = name, "Search provider failed: {e}");
                    continue;
                }
            };
            let Some(response) = response else {
                continue;
            };
            if !response.is_success() {
                warn!(provider = name, status = response.status_code, "Search provider returned an error status");
                continue;
            }

            match provider.extract(&response.body) {
                Ok(text) if is_answer(&text) => {
                    info!(provider = name, "Search answered");
                    return Ok(collapse_whitespace(&text));
                }
                Ok(_) => debug!(provider = name, "No answer from provider"),
                Err(e) => warn!(provider = name, "Could not read provider response: {e}"),
            }
        }

        if attempted > 0 && denied.len() == attempted {
            if let Some(e) = denied.pop() {
                return Err(e);
            }
        }

        info!("No provider found an answer");
        Ok(NOTHING_FOUND.to_string())
    }
}

/// Accepts non-empty text that is not a "nothing found" message.
fn is_answer(text: &str) -> bool {
    !text.trim().is_empty() && !text.to_lowercase().contains(NOTHING_FOUND_MARKER)
}

/// Strips the characters `«»"?:` and surrounding whitespace.
fn sanitize_query(query: &str) -> String {
    query
        .chars()
        .filter(|c| !matches!(c, '«' | '»' | '"' | '?' | ':'))
        .collect::<String>()
        .trim()
        .to_string()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ── WebSearchSkill ───────────────────────────────────────

/// Runs the search chain under the `WebSearch` manifest.
pub struct WebSearchSkill {
    chain: Arc<SearchChain>,
    guards: Arc<GuardFactory>,
}

impl WebSearchSkill {
    pub fn new(chain: Arc<SearchChain>, guards: Arc<GuardFactory>) -> Self {
        Self { chain, guards }
    }
}

#[async_trait]
impl Skill for WebSearchSkill {
    fn name(&self) -> &str {
        "WebSearch"
    }

    fn description(&self) -> &str {
        "Perform web search queries"
    }

    fn capabilities(&self) -> Vec<String> {
        vec!["WebSearch".to_string()]
    }

    async fn execute(&self, input: &str) -> anyhow::Result<String> {
        let guard = self.guards.guard_for("WebSearch")?;
        Ok(self.chain.search(&guard, input).await?)
    }
}
