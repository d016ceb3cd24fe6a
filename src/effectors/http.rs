//! HTTP effector.
//!
//! [`HttpExecutor`] validates an approved request and hands it to an
//! [`HttpTransport`]. The default transport is `reqwest`; tests plug in
//! fakes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::GuardError;
use crate::operation::{HttpMethod, NetworkRequest};

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// HTTP connect timeout in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 5;

/// User-Agent header sent when the request does not set one.
const USER_AGENT: &str = "ApexMind/0.1";

/// What a completed request returns to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status_code: u16,
    pub body: String,
    pub headers: HashMap<String, String>,
    /// URL after redirects.
    pub final_url: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// Moves bytes over the network. Only called after validation.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(
        &self,
        request: &NetworkRequest,
        timeout: Duration,
    ) -> Result<HttpResponse, GuardError>;
}

/// `reqwest`-backed transport.
///
/// Redirects are never followed here: a 3xx response is returned as is,
/// and the Guard decides whether the `Location` hop may be requested.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, GuardError> {
        Self::with_builder(
            reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
                .user_agent(USER_AGENT),
        )
    }

    /// Builds the client from `builder`, with redirects disabled.
    pub fn with_builder(builder: reqwest::ClientBuilder) -> Result<Self, GuardError> {
        let client = builder
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| GuardError::Transport(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(
        &self,
        request: &NetworkRequest,
        timeout: Duration,
    ) -> Result<HttpResponse, GuardError> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        }
        .timeout(timeout);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(ref data) = request.data {
            builder = builder.body(data.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| GuardError::Transport(e.to_string()))?;

        let status_code = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| GuardError::Transport(e.to_string()))?;

        Ok(HttpResponse {
            status_code,
            body,
            headers,
            final_url,
        })
    }
}

pub struct HttpExecutor {
    transport: Arc<dyn HttpTransport>,
    timeout: Duration,
}

impl HttpExecutor {
    pub fn new(transport: Arc<dyn HttpTransport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    /// Validates the URL, then performs the request with the bounded
    /// timeout. Nothing touches the network when validation fails.
    pub async fn execute(&self, request: &NetworkRequest) -> Result<HttpResponse, GuardError> {
        request.parsed_url()?;

        info!(method = %request.method, url = %request.url, "Executing HTTP request");
        match self.transport.send(request, self.timeout).await {
            Ok(response) => Ok(response),
            Err(e) => {
                warn!(url = %request.url, "HTTP request failed: {e}");
                Err(e)
            }
        }
    }
}
