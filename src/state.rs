//! Application state management for Tabshelf
//!
//! `AppState` owns the settings, the saved-item store, the open sessions and
//! the embed executor, and wires them together: session changes produce
//! pending resolutions, finished resolutions flow back into sessions, and
//! blocked outcomes are written back to matching saved items.

use crate::config::{Settings, Theme};
use crate::error::Result;
use crate::render::{executor_for, EmbedPayloadExecutor};
use crate::resolver::RenderDecision;
use crate::session::{GroupOpenOutcome, OpenOutcome, PendingResolution, SessionId, SessionManager};
use crate::store::{GroupId, ItemId, KeyValueStore, MemoryStore, SavedItemStore};
use log::{debug, info, warn};

/// Saved-item details for the active session, shown next to the URL bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedInfo {
    pub item: ItemId,
    pub name: String,
    pub group_name: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// App State
// ─────────────────────────────────────────────────────────────────────────────

pub struct AppState {
    pub settings: Settings,
    store: SavedItemStore,
    sessions: SessionManager,
    executor: Box<dyn EmbedPayloadExecutor>,
}

impl AppState {
    pub fn new(settings: Settings, backend: Box<dyn KeyValueStore>) -> Self {
        let executor = executor_for(&settings);
        debug!("Using '{}' embed executor", executor.name());
        Self {
            store: SavedItemStore::load(backend),
            sessions: SessionManager::new(),
            executor,
            settings,
        }
    }

    /// State backed by a throwaway in-memory store.
    pub fn in_memory(settings: Settings) -> Self {
        Self::new(settings, Box::new(MemoryStore::new()))
    }

    pub fn store(&self) -> &SavedItemStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SavedItemStore {
        &mut self.store
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn sessions_mut(&mut self) -> &mut SessionManager {
        &mut self.sessions
    }

    pub fn executor(&self) -> &dyn EmbedPayloadExecutor {
        self.executor.as_ref()
    }

    pub fn theme(&self) -> Theme {
        self.store.theme()
    }

    pub fn toggle_theme(&mut self) -> Result<Theme> {
        self.store.toggle_theme()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Session Actions
    // ─────────────────────────────────────────────────────────────────────────

    pub fn new_session(&mut self) -> SessionId {
        self.sessions.new_session()
    }

    /// Navigate the active session, opening one first if none is active.
    pub fn navigate_active(&mut self, raw_url: &str) -> Option<PendingResolution> {
        let id = match self.sessions.active_id() {
            Some(id) => id,
            None => self.sessions.new_session(),
        };
        self.sessions.navigate(id, raw_url)
    }

    pub fn reload_active(&mut self) -> Option<PendingResolution> {
        let id = self.sessions.active_id()?;
        self.sessions.reload(id)
    }

    /// Open a saved item by id. `None` if the id is unknown.
    pub fn open_saved(&mut self, id: ItemId) -> Option<OpenOutcome> {
        let Some(item) = self.store.item(id) else {
            warn!("Cannot open unknown saved item {}", id);
            return None;
        };
        Some(self.sessions.open_saved_item(item))
    }

    /// Open a group, or the uncategorized bucket with `None`.
    pub fn open_group(&mut self, group: Option<GroupId>) -> GroupOpenOutcome {
        let items = self.store.items_in_group(group);
        self.sessions.open_group(items)
    }

    /// Apply a finished resolution. A blocked outcome downgrades every saved
    /// item with the session's URL.
    pub fn finish_resolution(
        &mut self,
        pending: &PendingResolution,
        decision: RenderDecision,
    ) -> Result<()> {
        if let Some(url) = self.sessions.complete_resolution(pending, decision) {
            self.store.mark_not_embeddable(&url)?;
        }
        Ok(())
    }

    pub fn frame_loaded(&mut self, id: SessionId, generation: u64) -> bool {
        self.sessions.frame_loaded(id, generation)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Saving Sessions
    // ─────────────────────────────────────────────────────────────────────────

    pub fn can_save_active(&self) -> bool {
        self.sessions.can_save_active()
    }

    /// Save the active session. An empty name falls back to the session title.
    ///
    /// Returns `Ok(None)` when there is nothing worth saving.
    pub fn save_active_session(
        &mut self,
        name: &str,
        group: Option<GroupId>,
    ) -> Result<Option<ItemId>> {
        if !self.can_save_active() {
            info!("No active session to save");
            return Ok(None);
        }
        let Some(session) = self.sessions.active() else {
            return Ok(None);
        };
        let name = if name.trim().is_empty() {
            session.title()
        } else {
            name.trim().to_string()
        };
        let url = session.url.clone();
        let is_blocked = session.is_blocked;
        let id = self.store.save_session(&name, &url, group, is_blocked)?;
        Ok(Some(id))
    }

    /// Whether the active session's URL is saved, and under which group.
    pub fn active_saved_info(&self) -> Option<SavedInfo> {
        let session = self.sessions.active()?;
        let item = self.store.find_by_url(&session.url)?;
        Some(SavedInfo {
            item: item.id,
            name: item.name.clone(),
            group_name: item
                .group_id
                .and_then(|g| self.store.group(g))
                .map(|g| g.name.clone()),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Embeddable, SAVED_ITEMS_KEY};

    fn state() -> AppState {
        AppState::in_memory(Settings::default())
    }

    #[test]
    fn test_save_active_session_uses_blocked_flag() {
        let mut state = state();
        let pending = state.navigate_active("https://example.com").unwrap();
        state
            .finish_resolution(&pending, RenderDecision::Blocked)
            .unwrap();

        let id = state.save_active_session("", None).unwrap().unwrap();
        let item = state.store().item(id).unwrap();
        assert_eq!(item.embeddable, Embeddable::No);
        assert_eq!(item.name, "example.com");
        assert_eq!(item.url, "https://example.com");
    }

    #[test]
    fn test_save_requires_real_url() {
        let mut state = state();
        assert_eq!(state.save_active_session("x", None).unwrap(), None);
        state.new_session();
        assert!(!state.can_save_active());
        assert_eq!(state.save_active_session("x", None).unwrap(), None);
        assert!(state.store().items().is_empty());
    }

    #[test]
    fn test_blocked_outcome_downgrades_saved_item() {
        let mut state = state();
        let id = state
            .store_mut()
            .save_session("Example", "https://example.com", None, false)
            .unwrap();

        let outcome = state.open_saved(id).unwrap();
        let pending = outcome.pending.unwrap();
        state
            .finish_resolution(&pending, RenderDecision::Blocked)
            .unwrap();

        assert_eq!(state.store().item(id).unwrap().embeddable, Embeddable::No);
    }

    #[test]
    fn test_reopening_blocked_item_seeds_flag_and_resolves() {
        let mut state = state();
        let pending = state.navigate_active("https://example.com").unwrap();
        state
            .finish_resolution(&pending, RenderDecision::Blocked)
            .unwrap();
        let id = state.save_active_session("Example", None).unwrap().unwrap();
        let active = state.sessions().active_id().unwrap();
        state.sessions_mut().close_session(active);

        let outcome = state.open_saved(id).unwrap();
        assert!(outcome.created);
        assert!(outcome.pending.is_some());
        assert!(state.sessions().get(outcome.session).unwrap().is_blocked);
    }

    #[test]
    fn test_active_saved_info() {
        let mut state = state();
        let group = state.store_mut().add_group("Docs").unwrap();
        state
            .store_mut()
            .add_item("Rust docs", "docs.rs", Some(group))
            .unwrap();

        state.navigate_active("docs.rs");
        let info = state.active_saved_info().unwrap();
        assert_eq!(info.name, "Rust docs");
        assert_eq!(info.group_name.as_deref(), Some("Docs"));

        state.navigate_active("crates.io");
        assert!(state.active_saved_info().is_none());
    }

    #[test]
    fn test_open_group_uses_store_order() {
        let mut state = state();
        let group = state.store_mut().add_group("Reading").unwrap();
        state.store_mut().add_item("B", "b.example", Some(group)).unwrap();
        state.store_mut().add_item("A", "a.example", Some(group)).unwrap();
        state.store_mut().add_item("Loose", "loose.example", None).unwrap();

        let outcome = state.open_group(Some(group));
        assert_eq!(outcome.created.len(), 2);
        let focused = state.sessions().active().unwrap();
        assert_eq!(focused.url, "https://a.example");
    }

    #[test]
    fn test_write_back_failure_is_reported() {
        let mut backend = MemoryStore::new();
        let item = crate::store::SavedItem::new(
            "Example",
            "https://example.com",
            Embeddable::Yes,
            None,
        );
        crate::store::save_value(&mut backend, SAVED_ITEMS_KEY, &vec![item.clone()]).unwrap();
        backend.fail_writes_to(SAVED_ITEMS_KEY);
        let mut state = AppState::new(Settings::default(), Box::new(backend));

        let pending = state.open_saved(item.id).unwrap().pending.unwrap();
        assert!(state
            .finish_resolution(&pending, RenderDecision::Blocked)
            .is_err());
        // Session still reflects the outcome; the store is unchanged
        assert!(state.sessions().get(pending.session).unwrap().is_blocked);
        assert_eq!(state.store().item(item.id).unwrap().embeddable, Embeddable::Yes);
    }

    #[test]
    fn test_toggle_theme() {
        let mut state = state();
        assert_eq!(state.theme(), Theme::Dark);
        assert_eq!(state.toggle_theme().unwrap(), Theme::Light);
        assert_eq!(state.theme(), Theme::Light);
    }
}
