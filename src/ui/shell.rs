//! Interactive shell.
//!
//! Reads commands from stdin while resolutions run in the background. Each
//! navigation queues its resolution; results are applied as they land, and
//! stale ones (for a URL the session has since left) are dropped by the
//! session's render machine.

use super::commands::{parse_command, Command, GroupRef, HELP};
use crate::error::{Error, Result};
use crate::export::{copy_url_to_clipboard, export_session_to_file, render_session_body};
use crate::resolver::{RenderDecision, Resolver};
use crate::session::{PendingResolution, Session, SessionId, View};
use crate::state::AppState;
use crate::store::{GroupId, ItemId};
use crate::url_utils::{extract_url_from_paste, normalize_scheme, tab_title};
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use log::{debug, warn};
use std::collections::HashSet;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

type Resolved = (PendingResolution, RenderDecision);

/// Whether the shell keeps reading input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Shell {
    state: AppState,
    resolver: Resolver,
    in_flight: FuturesUnordered<BoxFuture<'static, Resolved>>,
}

impl Shell {
    pub fn new(state: AppState, resolver: Resolver) -> Self {
        Self {
            state,
            resolver,
            in_flight: FuturesUnordered::new(),
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run until `quit` or end of input.
    pub async fn run(mut self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut out = std::io::stdout();

        writeln!(
            out,
            "tabshelf {}: {} saved item(s). Type 'help' for commands.",
            env!("CARGO_PKG_VERSION"),
            self.state.store().items().len()
        )?;
        prompt(&mut out)?;

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    match parse_command(&line) {
                        Ok(Some(command)) => match self.execute(command, &mut out) {
                            Ok(Flow::Quit) => break,
                            Ok(Flow::Continue) => {}
                            Err(e) => {
                                warn!("Command failed: {}", e);
                                writeln!(out, "Error: {}", e)?;
                            }
                        },
                        Ok(None) => {}
                        Err(message) => writeln!(out, "{}", message)?,
                    }
                    prompt(&mut out)?;
                }
                Some((pending, decision)) = self.in_flight.next(), if !self.in_flight.is_empty() => {
                    self.apply(pending, decision, &mut out)?;
                }
            }
        }

        if !self.in_flight.is_empty() {
            debug!("Dropping {} unfinished resolution(s)", self.in_flight.len());
        }
        Ok(())
    }

    /// Wait for every queued resolution and apply it.
    #[cfg(test)]
    pub async fn settle(&mut self, out: &mut dyn Write) -> Result<()> {
        while let Some((pending, decision)) = self.in_flight.next().await {
            self.apply(pending, decision, out)?;
        }
        Ok(())
    }

    fn spawn(&mut self, pending: impl IntoIterator<Item = PendingResolution>) {
        for pending in pending {
            let resolver = self.resolver.clone();
            self.in_flight.push(
                async move {
                    let decision = resolver.resolve(&pending.ticket.url).await;
                    (pending, decision)
                }
                .boxed(),
            );
        }
    }

    fn apply(
        &mut self,
        pending: PendingResolution,
        decision: RenderDecision,
        out: &mut dyn Write,
    ) -> Result<()> {
        let current = self
            .state
            .sessions()
            .get(pending.session)
            .is_some_and(|s| s.render().is_current(&pending.ticket));
        let label = decision.label();

        if let Err(e) = self.state.finish_resolution(&pending, decision) {
            warn!("Failed to record blocked URL {}: {}", pending.ticket.url, e);
            writeln!(out, "Error: {}", e)?;
        }
        if current {
            writeln!(out, "\n[{}] {}", label, pending.ticket.url)?;
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lookups
    // ─────────────────────────────────────────────────────────────────────────

    fn session_at(&self, n: usize) -> Result<SessionId> {
        self.state
            .sessions()
            .sessions()
            .get(n - 1)
            .map(|s| s.id)
            .ok_or_else(|| Error::Application(format!("No session {}", n)))
    }

    fn active_session(&self) -> Result<&Session> {
        self.state
            .sessions()
            .active()
            .ok_or_else(|| Error::Application("No active session".to_string()))
    }

    fn item_at(&self, n: usize) -> Result<ItemId> {
        self.state
            .store()
            .items()
            .get(n - 1)
            .map(|i| i.id)
            .ok_or_else(|| Error::Application(format!("No saved item {}", n)))
    }

    fn group_at(&self, n: usize) -> Result<GroupId> {
        self.state
            .store()
            .groups()
            .get(n - 1)
            .map(|g| g.id)
            .ok_or_else(|| Error::Application(format!("No group {}", n)))
    }

    fn group_for(&self, group: GroupRef) -> Result<Option<GroupId>> {
        match group {
            GroupRef::Uncategorized => Ok(None),
            GroupRef::Index(n) => self.group_at(n).map(Some),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────────────────────

    pub fn execute(&mut self, command: Command, out: &mut dyn Write) -> Result<Flow> {
        match command {
            Command::NewSession => {
                self.state.new_session();
                writeln!(out, "Opened session {}", self.state.sessions().len())?;
            }
            Command::Navigate(raw) => self.navigate(&raw, out)?,
            Command::Paste(text) => match extract_url_from_paste(&text) {
                Some(url) => self.navigate(&url, out)?,
                None => writeln!(out, "No URL found in pasted text")?,
            },
            Command::ListSessions => self.list_sessions(out)?,
            Command::Switch(n) => {
                let id = self.session_at(n)?;
                self.state.sessions_mut().switch_to(id);
            }
            Command::Close(n) => {
                let id = match n {
                    Some(n) => self.session_at(n)?,
                    None => self.active_session()?.id,
                };
                self.state.sessions_mut().close_session(id);
                if self.state.sessions().view() == View::Home {
                    writeln!(out, "All sessions closed")?;
                }
            }
            Command::Reload => {
                let pending = self.state.reload_active();
                self.spawn(pending);
            }
            Command::FrameLoaded => {
                let session = self.active_session()?;
                let id = session.id;
                let surface = session.render().surface();
                match surface {
                    Some(surface) if self.state.frame_loaded(id, surface.generation) => {
                        writeln!(out, "Frame loaded")?
                    }
                    _ => writeln!(out, "Active session is not showing a frame")?,
                }
            }
            Command::Home => self.state.sessions_mut().go_home(),
            Command::GoToTabs => {
                if !self.state.sessions_mut().go_to_tabs() {
                    writeln!(out, "No open sessions")?;
                }
            }
            Command::Show => {
                let session = self.active_session()?;
                writeln!(out, "{}", render_session_body(session, self.state.executor()))?;
            }

            Command::ListSaved(query) => self.list_saved(query.as_deref(), out)?,
            Command::AddSaved { url, name } => {
                let name = if name.is_empty() {
                    tab_title(&normalize_scheme(&url))
                } else {
                    name
                };
                self.state.store_mut().add_item(&name, &url, None)?;
                writeln!(out, "Saved '{}'", name)?;
            }
            Command::SaveActive { name, group } => {
                if !self.state.can_save_active() {
                    writeln!(out, "Nothing to save")?;
                    return Ok(Flow::Continue);
                }
                let group = group.map(|g| self.group_for(g)).transpose()?.flatten();
                match self.state.save_active_session(&name, group)? {
                    Some(_) => writeln!(out, "Saved active session")?,
                    None => writeln!(out, "Nothing to save")?,
                }
            }
            Command::RenameSaved { index, name } => {
                let id = self.item_at(index)?;
                if let Some(mut item) = self.state.store().item(id).cloned() {
                    item.name = name;
                    self.state.store_mut().update_item(item)?;
                }
            }
            Command::SetSavedUrl { index, url } => {
                let id = self.item_at(index)?;
                if let Some(mut item) = self.state.store().item(id).cloned() {
                    item.url = url;
                    self.state.store_mut().update_item(item)?;
                }
            }
            Command::DeleteSaved(index) => {
                let id = self.item_at(index)?;
                self.state.store_mut().delete_item(id)?;
            }
            Command::OpenSaved(index) => {
                let id = self.item_at(index)?;
                if let Some(outcome) = self.state.open_saved(id) {
                    if !outcome.created {
                        writeln!(out, "Already open, switched to it")?;
                    }
                    self.spawn(outcome.pending);
                }
            }
            Command::MoveSaved { index, group } => {
                let id = self.item_at(index)?;
                let group = self.group_for(group)?;
                self.state.store_mut().move_item_to_group(id, group)?;
            }
            Command::DragSaved { dragged, target } => {
                let dragged = self.item_at(dragged)?;
                let target = self.item_at(target)?;
                self.state.store_mut().reorder_items(dragged, target)?;
            }

            Command::ListGroups => self.list_groups(out)?,
            Command::AddGroup(name) => {
                self.state.store_mut().add_group(&name)?;
            }
            Command::RenameGroup { index, name } => {
                let id = self.group_at(index)?;
                self.state.store_mut().rename_group(id, &name)?;
            }
            Command::DeleteGroup(index) => {
                let id = self.group_at(index)?;
                let members = self.state.store().group_item_count(id);
                self.state.store_mut().delete_group(id)?;
                writeln!(out, "Deleted group; {} item(s) are now uncategorized", members)?;
            }
            Command::DragGroup { dragged, target } => {
                let dragged = self.group_at(dragged)?;
                let target = self.group_at(target)?;
                self.state.store_mut().reorder_groups(dragged, target)?;
            }
            Command::OpenGroup(group) => {
                let group = self.group_for(group)?;
                let outcome = self.state.open_group(group);
                writeln!(out, "Opened {} new session(s)", outcome.created.len())?;
                self.spawn(outcome.pending);
            }

            Command::ToggleTheme => {
                let theme = self.state.toggle_theme()?;
                writeln!(out, "Theme: {}", theme.label())?;
            }
            Command::CopyUrl => {
                let url = self.active_session()?.url.clone();
                match copy_url_to_clipboard(&url) {
                    Ok(()) => writeln!(out, "Copied {}", url)?,
                    Err(e) => writeln!(out, "{}", e)?,
                }
            }
            Command::OpenExternal => {
                let url = self.active_session()?.url.clone();
                open::that(&url).map_err(|e| {
                    Error::Application(format!("Failed to open {} externally: {}", url, e))
                })?;
            }
            Command::Export(path) => {
                let session = self.active_session()?;
                export_session_to_file(session, self.state.executor(), self.state.theme(), &path)?;
                writeln!(out, "Exported to {}", path.display())?;
            }
            Command::Help => writeln!(out, "{}", HELP)?,
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn navigate(&mut self, raw: &str, out: &mut dyn Write) -> Result<()> {
        let pending = self.state.navigate_active(raw);
        if pending.is_none() {
            let blank = self
                .state
                .sessions()
                .active()
                .is_some_and(|s| s.is_blank());
            if blank {
                writeln!(out, "Session cleared")?;
            } else {
                writeln!(out, "Already showing that URL")?;
            }
        }
        self.spawn(pending);
        Ok(())
    }

    fn list_sessions(&self, out: &mut dyn Write) -> Result<()> {
        let sessions = self.state.sessions();
        if sessions.is_empty() {
            writeln!(out, "No open sessions")?;
            return Ok(());
        }
        for (i, session) in sessions.sessions().iter().enumerate() {
            let marker = if sessions.active_id() == Some(session.id) { "*" } else { " " };
            let mut flags = String::new();
            if session.is_loading {
                flags.push_str(" loading");
            }
            if session.is_blocked {
                flags.push_str(" blocked");
            }
            let icon = session
                .favicon()
                .map(|icon| format!(" {}", icon))
                .unwrap_or_default();
            writeln!(
                out,
                "{}{:>2}. {:<24} {} [{}{}]{}",
                marker,
                i + 1,
                session.title(),
                session.url,
                session.render().state().label(),
                flags,
                icon
            )?;
        }
        if let Some(info) = self.state.active_saved_info() {
            writeln!(
                out,
                "Active session is saved as '{}' in {}",
                info.name,
                info.group_name.as_deref().unwrap_or("Uncategorized")
            )?;
        }
        Ok(())
    }

    fn list_saved(&self, query: Option<&str>, out: &mut dyn Write) -> Result<()> {
        let store = self.state.store();
        let matching: HashSet<ItemId> = store
            .search(query.unwrap_or(""))
            .into_iter()
            .map(|i| i.id)
            .collect();
        let mut shown = 0;
        for (i, item) in store.items().iter().enumerate() {
            if !matching.contains(&item.id) {
                continue;
            }
            let group = item
                .group_id
                .and_then(|g| store.group(g))
                .map(|g| g.name.as_str())
                .unwrap_or("-");
            writeln!(
                out,
                "{:>3}. {:<24} {:<40} {:<16} {}",
                i + 1,
                item.name,
                item.url,
                group,
                item.embeddable.label()
            )?;
            shown += 1;
        }
        if shown == 0 {
            writeln!(out, "No saved items")?;
        }
        Ok(())
    }

    fn list_groups(&self, out: &mut dyn Write) -> Result<()> {
        let store = self.state.store();
        for (i, group) in store.groups().iter().enumerate() {
            writeln!(
                out,
                "{:>3}. {} ({})",
                i + 1,
                group.name,
                store.group_item_count(group.id)
            )?;
        }
        writeln!(
            out,
            "     Uncategorized ({})",
            store.items_in_group(None).len()
        )?;
        Ok(())
    }
}

fn prompt(out: &mut impl Write) -> Result<()> {
    write!(out, "> ")?;
    out.flush()?;
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
