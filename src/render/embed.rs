//! Embedding surfaces: the sandboxed frame and provider embed markup.
//!
//! Provider markup often ships `<script>` tags. Markup injected as inert HTML
//! never runs them, so the executing path lifts every script out of the
//! markup and emits a fresh script element for it. Running third-party code
//! is a trust decision, so it sits behind [`EmbedPayloadExecutor`] and can be
//! swapped for [`InertMarkup`].

use crate::config::Settings;
use crate::export::html_escape;
use log::debug;
use scraper::{Html, Selector};

/// Sandbox tokens for the embedding frame.
pub const FRAME_SANDBOX: &str =
    "allow-forms allow-modals allow-popups allow-presentation allow-same-origin allow-scripts";

/// The frame never sends a referrer.
pub const FRAME_REFERRER_POLICY: &str = "no-referrer";

// ─────────────────────────────────────────────────────────────────────────────
// Frame Surface
// ─────────────────────────────────────────────────────────────────────────────

/// A frame to mount for a session. Its only lifecycle signal is "load
/// complete", reported back with `generation`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSurface {
    pub src: String,
    pub generation: u64,
}

impl FrameSurface {
    pub fn new(src: impl Into<String>, generation: u64) -> Self {
        Self {
            src: src.into(),
            generation,
        }
    }

    pub fn to_html(&self) -> String {
        format!(
            "<iframe src=\"{}\" title=\"Mini Tab Content\" sandbox=\"{}\" referrerpolicy=\"{}\" data-generation=\"{}\"></iframe>",
            html_escape(&self.src),
            FRAME_SANDBOX,
            FRAME_REFERRER_POLICY,
            self.generation
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Embed Payloads
// ─────────────────────────────────────────────────────────────────────────────

/// A script lifted out of provider markup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbedScript {
    /// Attributes in source order
    pub attributes: Vec<(String, String)>,
    pub inline: String,
}

impl EmbedScript {
    /// Fresh script element with the same attributes and body.
    pub fn to_html(&self) -> String {
        let attrs: String = self
            .attributes
            .iter()
            .map(|(name, value)| format!(" {}=\"{}\"", name, html_escape(value)))
            .collect();
        format!("<script{}>{}</script>", attrs, self.inline)
    }
}

/// One piece of prepared provider markup, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbedPart {
    Markup(String),
    Script(EmbedScript),
}

/// Provider markup ready to mount. Each script sits where the provider put
/// it, so widgets that locate their container from the running script still
/// find it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreparedEmbed {
    pub parts: Vec<EmbedPart>,
}

impl PreparedEmbed {
    /// The scripts to run, in order.
    pub fn scripts(&self) -> impl Iterator<Item = &EmbedScript> {
        self.parts.iter().filter_map(|part| match part {
            EmbedPart::Script(script) => Some(script),
            EmbedPart::Markup(_) => None,
        })
    }

    /// Markup with every script left out.
    pub fn markup(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                EmbedPart::Markup(html) => Some(html.as_str()),
                EmbedPart::Script(_) => None,
            })
            .collect()
    }

    pub fn to_html(&self) -> String {
        self.parts
            .iter()
            .map(|part| match part {
                EmbedPart::Markup(html) => html.clone(),
                EmbedPart::Script(script) => script.to_html(),
            })
            .collect()
    }
}

/// Turns provider markup into something safe to mount.
pub trait EmbedPayloadExecutor: Send + Sync {
    fn name(&self) -> &'static str;

    fn prepare(&self, html: &str) -> PreparedEmbed;
}

/// Re-creates every script in place so it executes once mounted.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReinstantiateScripts;

/// Drops scripts entirely; the markup is mounted as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct InertMarkup;

impl EmbedPayloadExecutor for ReinstantiateScripts {
    fn name(&self) -> &'static str {
        "reinstantiate-scripts"
    }

    fn prepare(&self, html: &str) -> PreparedEmbed {
        PreparedEmbed {
            parts: split_scripts(html),
        }
    }
}

impl EmbedPayloadExecutor for InertMarkup {
    fn name(&self) -> &'static str {
        "inert"
    }

    fn prepare(&self, html: &str) -> PreparedEmbed {
        let prepared = PreparedEmbed {
            parts: split_scripts(html),
        };
        PreparedEmbed {
            parts: vec![EmbedPart::Markup(prepared.markup())],
        }
    }
}

/// Executor selected by `execute_embed_scripts`.
pub fn executor_for(settings: &Settings) -> Box<dyn EmbedPayloadExecutor> {
    if settings.execute_embed_scripts {
        Box::new(ReinstantiateScripts)
    } else {
        Box::new(InertMarkup)
    }
}

/// Split `html` into markup runs and the scripts between them.
///
/// The fragment is serialized once; each script's own serialization is then
/// located in that output, scanning forward in document order.
fn split_scripts(html: &str) -> Vec<EmbedPart> {
    let fragment = Html::parse_fragment(html);
    let serialized = fragment.root_element().inner_html();
    let Ok(selector) = Selector::parse("script") else {
        return vec![EmbedPart::Markup(serialized)];
    };

    let mut parts = Vec::new();
    let mut cursor = 0;
    for element in fragment.select(&selector) {
        let script = EmbedScript {
            attributes: element
                .value()
                .attrs()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
            inline: element.text().collect(),
        };
        let outer = element.html();
        match serialized[cursor..].find(&outer) {
            Some(offset) => {
                let start = cursor + offset;
                if start > cursor {
                    parts.push(EmbedPart::Markup(serialized[cursor..start].to_string()));
                }
                cursor = start + outer.len();
            }
            None => debug!("Script not found in serialized embed markup, appending it"),
        }
        parts.push(EmbedPart::Script(script));
    }

    if cursor < serialized.len() {
        parts.push(EmbedPart::Markup(serialized[cursor..].to_string()));
    }
    parts
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
