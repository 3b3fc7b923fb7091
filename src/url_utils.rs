//! URL Utilities
//!
//! Helpers for turning what a user typed or pasted into the URL a session
//! should actually load:
//!
//! - scheme completion (`example.com` becomes `https://example.com`)
//! - canonicalization of video-sharing links into their embeddable player form
//! - short display titles and favicon lookups for the session strip
//!
//! # Example
//! ```ignore
//! use crate::url_utils::canonical_url;
//!
//! let url = canonical_url("youtu.be/abc123");
//! assert_eq!(url, "https://www.youtube.com/embed/abc123");
//! ```

use regex::Regex;
use std::sync::OnceLock;
use url::Url;

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Sentinel URL of a freshly created, not yet navigated session.
pub const BLANK_URL: &str = "about:blank";

/// Title shown for blank sessions.
const NEW_TAB_TITLE: &str = "New Tab";

/// Title shown when a session URL cannot be parsed.
const INVALID_URL_TITLE: &str = "Invalid URL";

/// Embeddable player base for canonicalized video links.
const YOUTUBE_EMBED_BASE: &str = "https://www.youtube.com/embed/";

static PASTE_RE: OnceLock<Option<Regex>> = OnceLock::new();

fn paste_re() -> Option<&'static Regex> {
    PASTE_RE
        .get_or_init(|| {
            Regex::new(
                r"(?i)(https?://\S+)|(www\.\S+)|([a-z0-9-]+\.(?:com|org|net|gov|edu|io|co|ai|dev|app|tech)\S*)",
            )
            .ok()
        })
        .as_ref()
}

fn has_http_scheme(url: &str) -> bool {
    let lower = url.get(..8).unwrap_or(url).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

// ─────────────────────────────────────────────────────────────────────────────
// Normalization
// ─────────────────────────────────────────────────────────────────────────────

/// Whether `url` means "nothing to load".
pub fn is_blank(url: &str) -> bool {
    let trimmed = url.trim();
    trimmed.is_empty() || trimmed == BLANK_URL
}

/// Trim the input and prefix `https://` when no http(s) scheme is present.
///
/// Empty and blank input stays as it is. Anything else that lacks a scheme is treated as a
/// bare hostname, even if it is not a valid URL; it will be passed through
/// unchanged by [`canonicalize_for_embedding`].
pub fn normalize_scheme(raw: &str) -> String {
    let trimmed = raw.trim();
    if is_blank(trimmed) || has_http_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

/// Rewrite known video-sharing URL shapes into their embeddable player URL.
///
/// Handles `youtube.com/watch?v=ID`, `youtu.be/ID` and `youtube.com/shorts/ID`.
/// Input that does not parse as a URL, or does not match, is returned unchanged.
pub fn canonicalize_for_embedding(input: &str) -> String {
    let Ok(parsed) = Url::parse(input) else {
        return input.to_string();
    };
    let Some(host) = parsed.host_str() else {
        return input.to_string();
    };
    let path = parsed.path();
    let is_youtube = host == "www.youtube.com" || host == "youtube.com";

    let video_id = if is_youtube && path == "/watch" {
        parsed
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned())
    } else if host == "youtu.be" && path.len() > 1 {
        first_segment(&path[1..])
    } else if is_youtube && path.starts_with("/shorts/") {
        first_segment(&path["/shorts/".len()..])
    } else {
        None
    };

    match video_id {
        Some(id) if !id.is_empty() => format!("{}{}", YOUTUBE_EMBED_BASE, id),
        _ => input.to_string(),
    }
}

/// Scheme completion followed by embeddable canonicalization.
pub fn canonical_url(raw: &str) -> String {
    canonicalize_for_embedding(&normalize_scheme(raw))
}

fn first_segment(path: &str) -> Option<String> {
    path.split('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

// ─────────────────────────────────────────────────────────────────────────────
// Display Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Short title for the session strip: the hostname without a leading `www.`.
pub fn tab_title(url: &str) -> String {
    if is_blank(url) {
        return NEW_TAB_TITLE.to_string();
    }
    match Url::parse(url) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) => host.strip_prefix("www.").unwrap_or(host).to_string(),
            None => INVALID_URL_TITLE.to_string(),
        },
        Err(_) => INVALID_URL_TITLE.to_string(),
    }
}

/// Hostname of `url`, if it parses and has one.
fn hostname(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
        .filter(|host| !host.is_empty())
}

/// Favicon lookup URL for the session strip and saved item cards.
pub fn favicon_url(url: &str) -> Option<String> {
    if is_blank(url) {
        return None;
    }
    hostname(url).map(|host| format!("https://www.google.com/s2/favicons?domain={}&sz=32", host))
}

/// Pull the first URL-looking token out of pasted text.
///
/// Matches explicit `http(s)://` links, `www.` hosts, or bare names on a
/// handful of common top-level domains.
pub fn extract_url_from_paste(text: &str) -> Option<String> {
    paste_re()?.find(text).map(|m| m.as_str().to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
