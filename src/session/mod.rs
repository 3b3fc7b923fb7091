//! Open browsing sessions.
//!
//! Sessions are ephemeral: they live only in memory and are never persisted.
//! Each one owns a URL, its status flags and a [`TabRenderMachine`]. At most
//! one session is active at a time.

use crate::render::{ResolveTicket, StatusReport, TabRenderMachine};
use crate::resolver::RenderDecision;
use crate::store::SavedItem;
use crate::url_utils::{canonical_url, favicon_url, is_blank, tab_title, BLANK_URL};
use log::{debug, info};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One open browsing context.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub url: String,
    pub is_loading: bool,
    pub is_blocked: bool,
    render: TabRenderMachine,
}

impl Session {
    fn new(url: String, is_loading: bool, is_blocked: bool) -> Self {
        Self {
            id: SessionId::new(),
            url,
            is_loading,
            is_blocked,
            render: TabRenderMachine::new(),
        }
    }

    pub fn render(&self) -> &TabRenderMachine {
        &self.render
    }

    pub fn title(&self) -> String {
        tab_title(&self.url)
    }

    pub fn favicon(&self) -> Option<String> {
        favicon_url(&self.url)
    }

    pub fn is_blank(&self) -> bool {
        is_blank(&self.url)
    }

    /// Push the current URL into the render machine.
    fn sync(&mut self) -> Option<PendingResolution> {
        self.render.sync(&self.url).map(|ticket| PendingResolution {
            session: self.id,
            ticket,
        })
    }
}

/// A resolution the caller must run and hand back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingResolution {
    pub session: SessionId,
    pub ticket: ResolveTicket,
}

/// Which top-level screen is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Home,
    Browser,
}

/// Result of opening a saved item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenOutcome {
    /// Session that ended up focused
    pub session: SessionId,
    /// `false` when an existing session was focused instead
    pub created: bool,
    pub pending: Option<PendingResolution>,
}

/// Result of bulk-opening a group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupOpenOutcome {
    pub focused: Option<SessionId>,
    pub created: Vec<SessionId>,
    pub pending: Vec<PendingResolution>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Session Manager
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: Vec<Session>,
    active: Option<SessionId>,
    view: View,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn active_id(&self) -> Option<SessionId> {
        self.active
    }

    pub fn active(&self) -> Option<&Session> {
        self.active.and_then(|id| self.get(id))
    }

    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    fn get_mut(&mut self, id: SessionId) -> Option<&mut Session> {
        self.sessions.iter_mut().find(|s| s.id == id)
    }

    fn focus(&mut self, id: SessionId) {
        self.active = Some(id);
        self.view = View::Browser;
    }

    /// Open a blank session and focus it.
    pub fn new_session(&mut self) -> SessionId {
        let mut session = Session::new(BLANK_URL.to_string(), false, false);
        // Blank URLs never produce a ticket
        let _ = session.sync();
        let id = session.id;
        self.sessions.push(session);
        self.focus(id);
        debug!("Opened blank session {}", id);
        id
    }

    pub fn switch_to(&mut self, id: SessionId) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        self.focus(id);
        true
    }

    /// Close a session. If it was active, the session just before it takes
    /// focus (or the new first one when the closed session was first).
    /// Closing the last session returns to the home view.
    pub fn close_session(&mut self, id: SessionId) -> bool {
        let Some(index) = self.sessions.iter().position(|s| s.id == id) else {
            return false;
        };
        self.sessions.remove(index);

        if self.active == Some(id) {
            self.active = if self.sessions.is_empty() {
                None
            } else {
                Some(self.sessions[index.saturating_sub(1)].id)
            };
        }
        if self.sessions.is_empty() {
            self.active = None;
            self.view = View::Home;
        }
        debug!("Closed session {}", id);
        true
    }

    /// Point a session at what the user typed.
    ///
    /// The input is scheme-completed and canonicalized. Status flags reset
    /// to loading/unblocked only when a new resolution actually starts.
    pub fn navigate(&mut self, id: SessionId, raw_url: &str) -> Option<PendingResolution> {
        let url = canonical_url(raw_url);
        let session = self.get_mut(id)?;
        session.url = url;
        let pending = session.sync();
        if pending.is_some() {
            session.is_loading = true;
            session.is_blocked = false;
        } else if session.is_blank() {
            session.is_loading = false;
            session.is_blocked = false;
        }
        info!("Session {} navigating to {}", id, session.url);
        pending
    }

    /// Focus the session already showing `item`, or open a new one.
    ///
    /// A new session starts loading, with `is_blocked` seeded from the item's
    /// hint. Resolution still runs in full.
    pub fn open_saved_item(&mut self, item: &SavedItem) -> OpenOutcome {
        let url = canonical_url(&item.url);
        if let Some(existing) = self
            .sessions
            .iter()
            .find(|s| s.url == url || s.url == item.url)
            .map(|s| s.id)
        {
            self.focus(existing);
            return OpenOutcome {
                session: existing,
                created: false,
                pending: None,
            };
        }

        let (id, pending) = self.push_for_item(item, url);
        self.focus(id);
        OpenOutcome {
            session: id,
            created: true,
            pending,
        }
    }

    /// Open every item whose canonical URL is not already open, focusing the
    /// first new session. When all are already open, focus the session for
    /// the first item instead and create nothing.
    pub fn open_group<'a>(
        &mut self,
        items: impl IntoIterator<Item = &'a SavedItem>,
    ) -> GroupOpenOutcome {
        let items: Vec<&SavedItem> = items.into_iter().collect();
        let Some(first) = items.first() else {
            return GroupOpenOutcome::default();
        };

        let mut open_urls: HashSet<String> = self.sessions.iter().map(|s| s.url.clone()).collect();
        let mut outcome = GroupOpenOutcome::default();
        for item in &items {
            let url = canonical_url(&item.url);
            if !open_urls.insert(url.clone()) {
                continue;
            }
            let (id, pending) = self.push_for_item(item, url);
            outcome.created.push(id);
            outcome.pending.extend(pending);
        }

        if let Some(&id) = outcome.created.first() {
            self.focus(id);
            outcome.focused = Some(id);
        } else {
            let first_url = canonical_url(&first.url);
            if let Some(id) = self.sessions.iter().find(|s| s.url == first_url).map(|s| s.id) {
                self.focus(id);
                outcome.focused = Some(id);
            }
        }
        info!("Opened {} new session(s) from group", outcome.created.len());
        outcome
    }

    fn push_for_item(&mut self, item: &SavedItem, url: String) -> (SessionId, Option<PendingResolution>) {
        let mut session = Session::new(url, true, item.embeddable.is_known_blocked());
        let pending = session.sync();
        if pending.is_none() {
            session.is_loading = false;
        }
        let id = session.id;
        self.sessions.push(session);
        (id, pending)
    }

    /// Show the browser view, activating the last session if none is active.
    pub fn go_to_tabs(&mut self) -> bool {
        if self.active.is_some() {
            self.view = View::Browser;
            return true;
        }
        match self.sessions.last().map(|s| s.id) {
            Some(id) => {
                self.focus(id);
                true
            }
            None => false,
        }
    }

    pub fn go_home(&mut self) {
        self.view = View::Home;
    }

    /// Re-run resolution for the session's current URL.
    pub fn reload(&mut self, id: SessionId) -> Option<PendingResolution> {
        let session = self.get_mut(id)?;
        session.render.reload();
        let pending = session.sync();
        if pending.is_some() {
            session.is_loading = true;
        }
        pending
    }

    /// Hand a finished resolution back to its session.
    ///
    /// Returns the session URL when the outcome is blocked-equivalent, so the
    /// caller can write the learned hint back to saved items.
    pub fn complete_resolution(
        &mut self,
        pending: &PendingResolution,
        decision: RenderDecision,
    ) -> Option<String> {
        let session = self.get_mut(pending.session)?;
        let report = session.render.complete(&pending.ticket, decision)?;
        Self::apply_report(session, report)
    }

    /// The session's frame signalled load completion.
    pub fn frame_loaded(&mut self, id: SessionId, generation: u64) -> bool {
        let Some(session) = self.get_mut(id) else {
            return false;
        };
        match session.render.frame_loaded(generation) {
            Some(report) => {
                Self::apply_report(session, report);
                true
            }
            None => false,
        }
    }

    fn apply_report(session: &mut Session, report: StatusReport) -> Option<String> {
        session.is_loading = report.is_loading;
        session.is_blocked = report.is_blocked;
        (report.is_blocked && !session.is_blank()).then(|| session.url.clone())
    }

    /// Saving needs an active session with a real URL.
    pub fn can_save_active(&self) -> bool {
        self.active().is_some_and(|s| !s.is_blank())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
