//! HTTP seam used by the resolver, plus the CORS relay that every
//! cross-origin request is routed through.

use crate::config::Settings;
use crate::error::{Error, Result};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use std::collections::BTreeMap;
use std::time::Duration;

// ─────────────────────────────────────────────────────────────────────────────
// Responses
// ─────────────────────────────────────────────────────────────────────────────

/// Result of a header-only probe. Header names are lowercased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
}

impl ProbeResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// A fully fetched response body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedPage {
    pub status: u16,
    pub body: String,
}

impl FetchedPage {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Fetcher Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Network access needed by the resolver pipeline.
///
/// Both calls take the final request URL; relay wrapping happens before.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Issue a `HEAD` request.
    async fn head(&self, url: &str) -> Result<ProbeResponse>;

    /// Issue a `GET` request and read the body as text.
    async fn get(&self, url: &str) -> Result<FetchedPage>;
}

/// [`Fetcher`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| Error::Application(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

fn network_error(url: &str, e: reqwest::Error) -> Error {
    Error::Network {
        url: url.to_string(),
        source: Box::new(e),
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn head(&self, url: &str) -> Result<ProbeResponse> {
        debug!("HEAD {}", url);
        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| network_error(url, e))?;

        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        Ok(ProbeResponse {
            status: response.status().as_u16(),
            headers,
        })
    }

    async fn get(&self, url: &str) -> Result<FetchedPage> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| network_error(url, e))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| network_error(url, e))?;
        Ok(FetchedPage { status, body })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// CORS Relay
// ─────────────────────────────────────────────────────────────────────────────

/// Prefix-style relay: the target URL is percent-encoded and appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsRelay {
    prefix: String,
}

impl CorsRelay {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// URL that fetches `target` through the relay.
    pub fn wrap(&self, target: &str) -> String {
        format!("{}{}", self.prefix, urlencoding::encode(target))
    }
}

impl Default for CorsRelay {
    fn default() -> Self {
        Self::new(Settings::DEFAULT_CORS_PROXY)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_encodes_target() {
        let relay = CorsRelay::default();
        assert_eq!(
            relay.wrap("https://example.com/a?b=1&c=2"),
            "https://corsproxy.io/?https%3A%2F%2Fexample.com%2Fa%3Fb%3D1%26c%3D2"
        );
    }

    #[test]
    fn test_relay_custom_prefix() {
        let relay = CorsRelay::new("http://localhost:8080/raw?url=");
        assert_eq!(
            relay.wrap("https://docs.rs"),
            "http://localhost:8080/raw?url=https%3A%2F%2Fdocs.rs"
        );
    }

    #[test]
    fn test_probe_header_lookup_is_case_insensitive() {
        let mut probe = ProbeResponse {
            status: 200,
            ..Default::default()
        };
        probe
            .headers
            .insert("x-frame-options".to_string(), "DENY".to_string());
        assert_eq!(probe.header("X-Frame-Options"), Some("DENY"));
        assert_eq!(probe.header("content-type"), None);
    }

    #[test]
    fn test_http_fetcher_builds() {
        assert!(HttpFetcher::new(&Settings::default()).is_ok());
    }
}
