//! User settings and preferences for Tabshelf
//!
//! This module defines the `Settings` struct that holds all user-configurable
//! options, with serde support for JSON persistence.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────────────────────
// Theme Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Color theme preference.
///
/// Persisted in the durable store next to the saved collections rather than
/// in `config.json`, so it travels with the user's data directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl Theme {
    /// Toggle between Light and Dark.
    pub fn toggle(&self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    /// Get a display label for the theme.
    pub fn label(&self) -> &'static str {
        match self {
            Theme::Light => "Light",
            Theme::Dark => "Dark",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Main Settings Struct
// ─────────────────────────────────────────────────────────────────────────────

/// Application settings.
///
/// This struct is serialized to JSON and persisted to the user's config directory.
/// All fields have sensible defaults via the `Default` trait and `#[serde(default)]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // ─────────────────────────────────────────────────────────────────────────
    // Network
    // ─────────────────────────────────────────────────────────────────────────
    /// Prefix prepended to every cross-origin probe. The target URL is
    /// percent-encoded and appended verbatim.
    pub cors_proxy_url: String,

    /// Timeout applied to each individual probe request
    pub request_timeout_secs: u64,

    /// User agent sent with probe requests
    pub user_agent: String,

    // ─────────────────────────────────────────────────────────────────────────
    // Rich Embeds
    // ─────────────────────────────────────────────────────────────────────────
    /// `maxwidth` requested from oEmbed providers
    pub embed_max_width: u32,

    /// `maxheight` requested from oEmbed providers
    pub embed_max_height: u32,

    /// Whether script tags inside provider markup are re-instantiated so they
    /// run. When disabled, scripts are stripped and the markup stays inert.
    pub execute_embed_scripts: bool,

    // ─────────────────────────────────────────────────────────────────────────
    // Storage
    // ─────────────────────────────────────────────────────────────────────────
    /// Directory for saved items and groups (None = platform data dir)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cors_proxy_url: Self::DEFAULT_CORS_PROXY.to_string(),
            request_timeout_secs: 10,
            user_agent: format!("tabshelf/{}", env!("CARGO_PKG_VERSION")),
            embed_max_width: 600,
            embed_max_height: 400,
            execute_embed_scripts: true,
            data_dir: None,
        }
    }
}

impl Settings {
    /// Free, open-source CORS relay used when nothing else is configured.
    pub const DEFAULT_CORS_PROXY: &'static str = "https://corsproxy.io/?";

    /// Minimum allowed request timeout
    pub const MIN_TIMEOUT_SECS: u64 = 1;
    /// Maximum allowed request timeout
    pub const MAX_TIMEOUT_SECS: u64 = 120;
    /// Minimum allowed embed dimension
    pub const MIN_EMBED_SIZE: u32 = 100;
    /// Maximum allowed embed dimension
    pub const MAX_EMBED_SIZE: u32 = 4000;

    /// Validate and sanitize settings values.
    ///
    /// Called after deserializing so that hand-edited config files can't put
    /// the application into a broken state.
    pub fn sanitize(&mut self) {
        self.request_timeout_secs = self
            .request_timeout_secs
            .clamp(Self::MIN_TIMEOUT_SECS, Self::MAX_TIMEOUT_SECS);

        self.embed_max_width = self
            .embed_max_width
            .clamp(Self::MIN_EMBED_SIZE, Self::MAX_EMBED_SIZE);
        self.embed_max_height = self
            .embed_max_height
            .clamp(Self::MIN_EMBED_SIZE, Self::MAX_EMBED_SIZE);

        // An empty relay prefix would send probes straight to the target
        if self.cors_proxy_url.trim().is_empty() {
            self.cors_proxy_url = Self::DEFAULT_CORS_PROXY.to_string();
        }

        if self.user_agent.trim().is_empty() {
            self.user_agent = Settings::default().user_agent;
        }
    }

    /// Deserialize settings from JSON and sanitize the values.
    pub fn from_json_sanitized(json: &str) -> Result<Self, serde_json::Error> {
        let mut settings: Self = serde_json::from_str(json)?;
        settings.sanitize();
        Ok(settings)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
