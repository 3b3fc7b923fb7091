//! Rich-embed (oEmbed) providers.

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// A host pattern and the oEmbed endpoint that serves it.
#[derive(Debug)]
pub struct OEmbedProvider {
    pub name: &'static str,
    pattern: Regex,
    pub endpoint: &'static str,
}

impl OEmbedProvider {
    pub fn matches(&self, url: &str) -> bool {
        self.pattern.is_match(url)
    }

    /// Endpoint request for `url`, before relay wrapping.
    pub fn request_url(&self, url: &str, max_width: u32, max_height: u32) -> String {
        format!(
            "{}?url={}&format=json&maxwidth={}&maxheight={}",
            self.endpoint,
            urlencoding::encode(url),
            max_width,
            max_height
        )
    }
}

static PROVIDERS: OnceLock<Vec<OEmbedProvider>> = OnceLock::new();

/// The fixed provider table, checked in order.
pub fn providers() -> &'static [OEmbedProvider] {
    PROVIDERS.get_or_init(|| {
        [
            ("YouTube", r"youtube\.com|youtu\.be", "https://www.youtube.com/oembed"),
            ("Vimeo", r"vimeo\.com", "https://vimeo.com/api/oembed.json"),
            ("SoundCloud", r"soundcloud\.com", "https://soundcloud.com/oembed"),
        ]
        .into_iter()
        .filter_map(|(name, pattern, endpoint)| {
            Regex::new(pattern).ok().map(|pattern| OEmbedProvider {
                name,
                pattern,
                endpoint,
            })
        })
        .collect()
    })
}

/// First provider whose pattern matches `url`.
pub fn provider_for(url: &str) -> Option<&'static OEmbedProvider> {
    providers().iter().find(|p| p.matches(url))
}

// ─────────────────────────────────────────────────────────────────────────────
// Embed Descriptor
// ─────────────────────────────────────────────────────────────────────────────

/// oEmbed response. Only `html` is required to render; everything else is
/// informational and unknown fields are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OEmbedData {
    #[serde(default)]
    pub html: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<serde_json::Value>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl OEmbedData {
    /// Whether the descriptor carries markup worth rendering.
    pub fn has_markup(&self) -> bool {
        !self.html.trim().is_empty()
    }

    pub fn parse(url: &str, body: &str) -> Result<Self> {
        serde_json::from_str(body).map_err(|e| Error::InvalidPayload {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_matching() {
        assert_eq!(
            provider_for("https://www.youtube.com/embed/abc").map(|p| p.name),
            Some("YouTube")
        );
        assert_eq!(provider_for("https://youtu.be/abc").map(|p| p.name), Some("YouTube"));
        assert_eq!(provider_for("https://vimeo.com/1234").map(|p| p.name), Some("Vimeo"));
        assert_eq!(
            provider_for("https://soundcloud.com/artist/track").map(|p| p.name),
            Some("SoundCloud")
        );
        assert!(provider_for("https://example.com").is_none());
    }

    #[test]
    fn test_request_url_shape() {
        let provider = provider_for("https://vimeo.com/1").unwrap();
        assert_eq!(
            provider.request_url("https://vimeo.com/1", 600, 400),
            "https://vimeo.com/api/oembed.json?url=https%3A%2F%2Fvimeo.com%2F1&format=json&maxwidth=600&maxheight=400"
        );
    }

    #[test]
    fn test_parse_descriptor_keeps_extra_fields() {
        let body = r#"{"html":"<iframe></iframe>","title":"Clip","width":600,"type":"video","version":"1.0"}"#;
        let data = OEmbedData::parse("u", body).unwrap();
        assert!(data.has_markup());
        assert_eq!(data.title.as_deref(), Some("Clip"));
        assert_eq!(data.extra.get("type").and_then(|v| v.as_str()), Some("video"));
    }

    #[test]
    fn test_descriptor_without_html() {
        let data = OEmbedData::parse("u", r#"{"title":"No markup"}"#).unwrap();
        assert!(!data.has_markup());
    }

    #[test]
    fn test_invalid_descriptor() {
        assert!(matches!(
            OEmbedData::parse("u", "<html>rate limited</html>"),
            Err(Error::InvalidPayload { .. })
        ));
    }
}
