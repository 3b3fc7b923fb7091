//! Per-session render state machine.
//!
//! ```text
//!   Initial ──url──▶ Loading ──decision──▶ Iframe | Oembed | LinkCard | Blocked
//!      ▲                │
//!      └──blank url─────┘
//! ```
//!
//! The machine remembers the last URL it started resolving and ignores
//! repeated syncs with the same URL, so re-rendering the owner never
//! re-triggers network probes. Each accepted URL bumps a generation counter;
//! a resolution that lands for an older generation is dropped.

mod embed;

pub use embed::{
    executor_for, EmbedPayloadExecutor, EmbedScript, FrameSurface, InertMarkup, PreparedEmbed,
    ReinstantiateScripts, FRAME_REFERRER_POLICY, FRAME_SANDBOX,
};

use crate::resolver::{LinkCardData, OEmbedData, RenderDecision};
use crate::url_utils::is_blank;
use log::debug;

// ─────────────────────────────────────────────────────────────────────────────
// State
// ─────────────────────────────────────────────────────────────────────────────

/// What a session currently shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RenderState {
    /// Nothing to load yet
    #[default]
    Initial,
    /// Waiting on the resolver
    Loading,
    Iframe,
    Oembed(OEmbedData),
    LinkCard(LinkCardData),
    Blocked,
}

impl RenderState {
    pub fn label(&self) -> &'static str {
        match self {
            RenderState::Initial => "initial",
            RenderState::Loading => "loading",
            RenderState::Iframe => "iframe",
            RenderState::Oembed(_) => "oembed",
            RenderState::LinkCard(_) => "link-card",
            RenderState::Blocked => "blocked",
        }
    }
}

impl From<RenderDecision> for RenderState {
    fn from(decision: RenderDecision) -> Self {
        match decision {
            RenderDecision::Oembed(data) => RenderState::Oembed(data),
            RenderDecision::Iframe => RenderState::Iframe,
            RenderDecision::LinkCard(data) => RenderState::LinkCard(data),
            RenderDecision::Blocked => RenderState::Blocked,
        }
    }
}

/// Permission to run one resolution. Only the newest ticket is honored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveTicket {
    pub generation: u64,
    pub url: String,
}

/// Status flags reported upward to the owning session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    pub is_loading: bool,
    pub is_blocked: bool,
}

impl StatusReport {
    pub const BLOCKED: StatusReport = StatusReport {
        is_loading: false,
        is_blocked: true,
    };
    pub const LOADED: StatusReport = StatusReport {
        is_loading: false,
        is_blocked: false,
    };
}

// ─────────────────────────────────────────────────────────────────────────────
// Machine
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct TabRenderMachine {
    state: RenderState,
    last_url: Option<String>,
    generation: u64,
}

impl TabRenderMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &RenderState {
        &self.state
    }

    /// Feed the session's current URL.
    ///
    /// Returns a ticket when a resolution must run. A URL identical to the
    /// last accepted one is ignored; a blank URL moves to `Initial` and
    /// invalidates anything in flight.
    pub fn sync(&mut self, url: &str) -> Option<ResolveTicket> {
        if self.last_url.as_deref() == Some(url) {
            debug!("Already resolving {}, skipping", url);
            return None;
        }
        self.last_url = Some(url.to_string());
        self.generation += 1;

        if is_blank(url) {
            self.state = RenderState::Initial;
            return None;
        }

        self.state = RenderState::Loading;
        Some(ResolveTicket {
            generation: self.generation,
            url: url.to_string(),
        })
    }

    pub fn is_current(&self, ticket: &ResolveTicket) -> bool {
        ticket.generation == self.generation
    }

    /// Apply a finished resolution.
    ///
    /// Blocked-equivalent decisions report `BLOCKED` straight away. A frame
    /// decision reports nothing: the session stays loading until the frame
    /// signals [`frame_loaded`](Self::frame_loaded).
    pub fn complete(
        &mut self,
        ticket: &ResolveTicket,
        decision: RenderDecision,
    ) -> Option<StatusReport> {
        if !self.is_current(ticket) {
            debug!(
                "Dropping stale resolution for {} (generation {}, now {})",
                ticket.url, ticket.generation, self.generation
            );
            return None;
        }
        let blocked = decision.is_blocked_equivalent();
        self.state = decision.into();
        blocked.then_some(StatusReport::BLOCKED)
    }

    /// The embedding surface finished loading. Always treated as success.
    ///
    /// Ignored unless a frame for the current generation is showing.
    pub fn frame_loaded(&mut self, generation: u64) -> Option<StatusReport> {
        if generation != self.generation || self.state != RenderState::Iframe {
            debug!("Ignoring load event for generation {}", generation);
            return None;
        }
        Some(StatusReport::LOADED)
    }

    /// Forget the last URL so the next sync resolves again.
    pub fn reload(&mut self) {
        self.last_url = None;
    }

    /// Frame to mount while in `Iframe`.
    pub fn surface(&self) -> Option<FrameSurface> {
        match (&self.state, &self.last_url) {
            (RenderState::Iframe, Some(url)) => Some(FrameSurface::new(url.clone(), self.generation)),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
