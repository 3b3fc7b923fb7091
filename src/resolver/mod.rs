//! Embeddability resolution.
//!
//! Decides how a URL should be shown: a live frame, a provider embed, a
//! metadata link card, or the blocked placeholder. The pipeline is strictly
//! sequential and short-circuiting:
//!
//! 1. **oEmbed** for known rich-embed providers. Non-empty markup wins.
//! 2. **Header probe** through the CORS relay for framing restrictions.
//!    A failed probe fails open to a live frame.
//! 3. **Metadata** for blocked pages. A usable title gives a link card,
//!    otherwise the page is shown as blocked.
//!
//! Every step's failure is logged and swallowed; `resolve` itself never fails.
//! Once a frame is chosen, its load event is treated as success. No attempt is
//! made to detect a silent refusal from a loaded cross-origin frame.

mod fetch;
mod metadata;
mod providers;

pub use fetch::{CorsRelay, FetchedPage, Fetcher, HttpFetcher, ProbeResponse};
pub use metadata::{parse_link_card, LinkCardData};
pub use providers::{provider_for, providers, OEmbedData, OEmbedProvider};

use crate::config::Settings;
use crate::error::{Error, Result};
use log::{debug, info, warn};
use std::sync::Arc;

/// Header whose restrictive values mean the page refuses to be framed.
pub const FRAME_OPTIONS_HEADER: &str = "x-frame-options";

// ─────────────────────────────────────────────────────────────────────────────
// Render Decision
// ─────────────────────────────────────────────────────────────────────────────

/// Outcome of a resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderDecision {
    Oembed(OEmbedData),
    Iframe,
    LinkCard(LinkCardData),
    Blocked,
}

impl RenderDecision {
    /// Everything except a live frame counts as blocked from the frame's
    /// point of view, which is what gets recorded on saved items.
    pub fn is_blocked_equivalent(&self) -> bool {
        !matches!(self, RenderDecision::Iframe)
    }

    pub fn label(&self) -> &'static str {
        match self {
            RenderDecision::Oembed(_) => "oembed",
            RenderDecision::Iframe => "iframe",
            RenderDecision::LinkCard(_) => "link-card",
            RenderDecision::Blocked => "blocked",
        }
    }
}

/// Whether an `X-Frame-Options` value forbids cross-origin framing.
pub fn is_restrictive_frame_option(value: &str) -> bool {
    let value = value.trim();
    value.eq_ignore_ascii_case("deny") || value.eq_ignore_ascii_case("sameorigin")
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolver
// ─────────────────────────────────────────────────────────────────────────────

/// Runs the resolution pipeline against an injected [`Fetcher`].
#[derive(Clone)]
pub struct Resolver {
    fetcher: Arc<dyn Fetcher>,
    relay: CorsRelay,
    max_width: u32,
    max_height: u32,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("relay", &self.relay)
            .field("max_width", &self.max_width)
            .field("max_height", &self.max_height)
            .finish()
    }
}

impl Resolver {
    pub fn new(fetcher: Arc<dyn Fetcher>, settings: &Settings) -> Self {
        Self {
            fetcher,
            relay: CorsRelay::new(settings.cors_proxy_url.clone()),
            max_width: settings.embed_max_width,
            max_height: settings.embed_max_height,
        }
    }

    /// Resolver using a real HTTP client configured from `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let fetcher = HttpFetcher::new(settings)?;
        Ok(Self::new(Arc::new(fetcher), settings))
    }

    pub fn relay(&self) -> &CorsRelay {
        &self.relay
    }

    /// Classify `url`. Never fails.
    pub async fn resolve(&self, url: &str) -> RenderDecision {
        match self.fetch_oembed(url).await {
            Ok(Some(data)) => {
                info!("Resolved {} as oembed", url);
                return RenderDecision::Oembed(data);
            }
            Ok(None) => {}
            Err(e) => warn!("oEmbed lookup for {} failed: {}", url, e),
        }

        match self.probe_framing(url).await {
            Ok(false) => {
                debug!("No framing restriction on {}", url);
                RenderDecision::Iframe
            }
            Ok(true) => {
                debug!("{} refuses to be framed", url);
                match self.fetch_link_card(url).await {
                    Ok(Some(card)) => {
                        info!("Resolved {} as link card", url);
                        RenderDecision::LinkCard(card)
                    }
                    Ok(None) => {
                        info!("Resolved {} as blocked (no title)", url);
                        RenderDecision::Blocked
                    }
                    Err(e) => {
                        warn!("Metadata fetch for {} failed: {}", url, e);
                        RenderDecision::Blocked
                    }
                }
            }
            Err(e) => {
                let kind = if e.is_network() { "network" } else { "unexpected" };
                warn!(
                    "Header probe for {} failed ({} error), trying a frame anyway: {}",
                    url, kind, e
                );
                RenderDecision::Iframe
            }
        }
    }

    /// Provider embed descriptor, if `url` belongs to a known provider and
    /// the descriptor carries markup.
    pub async fn fetch_oembed(&self, url: &str) -> Result<Option<OEmbedData>> {
        let Some(provider) = provider_for(url) else {
            return Ok(None);
        };
        let request = self
            .relay
            .wrap(&provider.request_url(url, self.max_width, self.max_height));
        debug!("Requesting {} embed for {}", provider.name, url);

        let page = self.fetcher.get(&request).await?;
        if !page.is_success() {
            return Err(Error::HttpStatus {
                url: request,
                status: page.status,
            });
        }
        let data = OEmbedData::parse(&request, &page.body)?;
        Ok(data.has_markup().then_some(data))
    }

    /// Whether `url` sends a restrictive framing header.
    pub async fn probe_framing(&self, url: &str) -> Result<bool> {
        let probe = self.fetcher.head(&self.relay.wrap(url)).await?;
        Ok(probe
            .header(FRAME_OPTIONS_HEADER)
            .is_some_and(is_restrictive_frame_option))
    }

    /// Link card metadata for `url`, if the page has a usable title.
    pub async fn fetch_link_card(&self, url: &str) -> Result<Option<LinkCardData>> {
        let request = self.relay.wrap(url);
        let page = self.fetcher.get(&request).await?;
        if !page.is_success() {
            return Err(Error::HttpStatus {
                url: request,
                status: page.status,
            });
        }
        Ok(parse_link_card(url, &page.body))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    type HeadFn = dyn Fn(&str) -> Result<ProbeResponse> + Send + Sync;
    type GetFn = dyn Fn(&str) -> Result<FetchedPage> + Send + Sync;

    /// Scripted fetcher that records every request URL.
    pub(crate) struct FakeFetcher {
        head: Box<HeadFn>,
        get: Box<GetFn>,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeFetcher {
        pub(crate) fn new(
            head: impl Fn(&str) -> Result<ProbeResponse> + Send + Sync + 'static,
            get: impl Fn(&str) -> Result<FetchedPage> + Send + Sync + 'static,
        ) -> Self {
            Self {
                head: Box::new(head),
                get: Box::new(get),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Fetcher for FakeFetcher {
        async fn head(&self, url: &str) -> Result<ProbeResponse> {
            self.calls.lock().unwrap().push(format!("HEAD {}", url));
            (self.head)(url)
        }

        async fn get(&self, url: &str) -> Result<FetchedPage> {
            self.calls.lock().unwrap().push(format!("GET {}", url));
            (self.get)(url)
        }
    }

    pub(crate) fn probe_with(frame_options: Option<&str>) -> ProbeResponse {
        let mut headers = BTreeMap::new();
        if let Some(value) = frame_options {
            headers.insert(FRAME_OPTIONS_HEADER.to_string(), value.to_string());
        }
        ProbeResponse {
            status: 200,
            headers,
        }
    }

    pub(crate) fn ok_page(body: &str) -> FetchedPage {
        FetchedPage {
            status: 200,
            body: body.to_string(),
        }
    }

    pub(crate) fn offline(url: &str) -> Error {
        Error::Network {
            url: url.to_string(),
            source: "connection refused".into(),
        }
    }

    fn resolver(fetcher: FakeFetcher) -> (Resolver, Arc<FakeFetcher>) {
        let fetcher = Arc::new(fetcher);
        let resolver = Resolver::new(fetcher.clone(), &Settings::default());
        (resolver, fetcher)
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_oembed_short_circuits_before_probe() {
        let (resolver, fetcher) = resolver(FakeFetcher::new(
            |_| Ok(probe_with(Some("DENY"))),
            |_| Ok(ok_page(r#"{"html":"<iframe src=\"player\"></iframe>","title":"Clip"}"#)),
        ));

        let decision = resolver
            .resolve("https://www.youtube.com/embed/abc123")
            .await;

        assert!(matches!(decision, RenderDecision::Oembed(ref d) if d.title.as_deref() == Some("Clip")));
        let calls = fetcher.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].starts_with("GET https://corsproxy.io/?https%3A%2F%2Fwww.youtube.com%2Foembed"));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_empty_oembed_markup_falls_through() {
        let (resolver, fetcher) = resolver(FakeFetcher::new(
            |_| Ok(probe_with(None)),
            |_| Ok(ok_page(r#"{"html":"  "}"#)),
        ));
        assert_eq!(
            resolver.resolve("https://vimeo.com/42").await,
            RenderDecision::Iframe
        );
        assert!(fetcher.calls().iter().any(|c| c.starts_with("HEAD ")));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_oembed_failure_is_swallowed() {
        let (resolver, _) = resolver(FakeFetcher::new(
            |_| Ok(probe_with(None)),
            |url| Err(offline(url)),
        ));
        assert_eq!(
            resolver.resolve("https://soundcloud.com/a/b").await,
            RenderDecision::Iframe
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_oembed_error_status_is_swallowed() {
        let (resolver, _) = resolver(FakeFetcher::new(
            |_| Ok(probe_with(None)),
            |_| {
                Ok(FetchedPage {
                    status: 404,
                    body: String::new(),
                })
            },
        ));
        assert_eq!(
            resolver.resolve("https://youtu.be/missing").await,
            RenderDecision::Iframe
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_unrestricted_page_is_iframe_without_oembed_request() {
        let (resolver, fetcher) = resolver(FakeFetcher::new(
            |_| Ok(probe_with(Some("ALLOW-FROM https://x"))),
            |_| panic!("no GET expected"),
        ));
        assert_eq!(
            resolver.resolve("https://docs.rs").await,
            RenderDecision::Iframe
        );
        assert_eq!(
            fetcher.calls(),
            vec!["HEAD https://corsproxy.io/?https%3A%2F%2Fdocs.rs".to_string()]
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_probe_failure_fails_open() {
        let (resolver, _) = resolver(FakeFetcher::new(
            |url| Err(offline(url)),
            |_| panic!("no GET expected"),
        ));
        assert_eq!(
            resolver.resolve("https://example.com").await,
            RenderDecision::Iframe
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_blocked_page_with_title_is_link_card() {
        let (resolver, _) = resolver(FakeFetcher::new(
            |_| Ok(probe_with(Some("SAMEORIGIN"))),
            |_| Ok(ok_page("<html><head><title>Example Domain</title></head></html>")),
        ));
        match resolver.resolve("https://example.com").await {
            RenderDecision::LinkCard(card) => {
                assert_eq!(card.title, "Example Domain");
                assert_eq!(card.url, "https://example.com");
            }
            other => panic!("expected link card, got {:?}", other),
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_blocked_page_without_title_is_blocked() {
        let (resolver, _) = resolver(FakeFetcher::new(
            |_| Ok(probe_with(Some(" deny "))),
            |_| Ok(ok_page("<html><body>nothing</body></html>")),
        ));
        assert_eq!(
            resolver.resolve("https://example.com").await,
            RenderDecision::Blocked
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_blocked_page_metadata_failure_is_blocked() {
        let (resolver, _) = resolver(FakeFetcher::new(
            |_| Ok(probe_with(Some("DENY"))),
            |url| Err(offline(url)),
        ));
        assert_eq!(
            resolver.resolve("https://example.com").await,
            RenderDecision::Blocked
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_restrictive_header_never_yields_iframe() {
        for value in ["DENY", "deny", "SameOrigin", " SAMEORIGIN "] {
            let (resolver, _) = resolver(FakeFetcher::new(
                move |_| Ok(probe_with(Some(value))),
                |_| Ok(ok_page("<title>T</title>")),
            ));
            let decision = resolver.resolve("https://example.com").await;
            assert_ne!(decision, RenderDecision::Iframe, "header {:?}", value);
        }
    }

    #[test]
    fn test_restrictive_frame_option_values() {
        assert!(is_restrictive_frame_option("DENY"));
        assert!(is_restrictive_frame_option("sameorigin"));
        assert!(!is_restrictive_frame_option("ALLOWALL"));
        assert!(!is_restrictive_frame_option(""));
    }

    #[test]
    fn test_blocked_equivalence() {
        assert!(!RenderDecision::Iframe.is_blocked_equivalent());
        assert!(RenderDecision::Blocked.is_blocked_equivalent());
        assert!(RenderDecision::Oembed(OEmbedData::default()).is_blocked_equivalent());
        assert!(RenderDecision::LinkCard(LinkCardData::default()).is_blocked_equivalent());
    }
}
