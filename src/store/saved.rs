//! Saved items and groups with drag-reorder and group membership.
//!
//! All mutations are synchronous and last-write-wins. Each one builds the
//! next version of the affected collection, persists it whole, and only then
//! replaces the in-memory copy, so a failed write leaves the store as it was.

use super::backend::{
    load_or_default, save_value, KeyValueStore, SAVED_GROUPS_KEY, SAVED_ITEMS_KEY, THEME_KEY,
};
use super::model::{Embeddable, Group, GroupId, ItemId, SavedItem};
use crate::config::Theme;
use crate::error::Result;
use crate::url_utils::normalize_scheme;
use log::{debug, error, info, warn};

// ─────────────────────────────────────────────────────────────────────────────
// Saved Item Store
// ─────────────────────────────────────────────────────────────────────────────

/// Ordered saved items and groups, backed by an injected [`KeyValueStore`].
///
/// Array position is display and drag order. Only the explicit reorder
/// operations change it; new items are prepended, new groups appended.
pub struct SavedItemStore {
    backend: Box<dyn KeyValueStore>,
    items: Vec<SavedItem>,
    groups: Vec<Group>,
    theme: Theme,
}

impl std::fmt::Debug for SavedItemStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SavedItemStore")
            .field("items", &self.items.len())
            .field("groups", &self.groups.len())
            .field("theme", &self.theme)
            .finish()
    }
}

impl SavedItemStore {
    /// Load items, groups and theme from `backend`.
    ///
    /// Missing or corrupt values fall back to empty collections and the
    /// default theme.
    pub fn load(backend: Box<dyn KeyValueStore>) -> Self {
        let items: Vec<SavedItem> = load_or_default(backend.as_ref(), SAVED_ITEMS_KEY);
        let groups: Vec<Group> = load_or_default(backend.as_ref(), SAVED_GROUPS_KEY);
        let theme: Theme = load_or_default(backend.as_ref(), THEME_KEY);
        info!(
            "Loaded {} saved item(s) in {} group(s), theme {:?}",
            items.len(),
            groups.len(),
            theme
        );
        Self {
            backend,
            items,
            groups,
            theme,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    pub fn items(&self) -> &[SavedItem] {
        &self.items
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn item(&self, id: ItemId) -> Option<&SavedItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == id)
    }

    /// First saved item whose URL is exactly `url`.
    pub fn find_by_url(&self, url: &str) -> Option<&SavedItem> {
        self.items.iter().find(|i| i.url == url)
    }

    /// Items whose name or URL contains `query`, case-insensitive.
    pub fn search(&self, query: &str) -> Vec<&SavedItem> {
        let needle = query.to_lowercase();
        self.items
            .iter()
            .filter(|i| {
                needle.is_empty()
                    || i.name.to_lowercase().contains(&needle)
                    || i.url.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Items filed under `group` (`None` = uncategorized), in store order.
    pub fn items_in_group(&self, group: Option<GroupId>) -> Vec<&SavedItem> {
        self.items.iter().filter(|i| i.in_group(group)).collect()
    }

    pub fn group_item_count(&self, group: GroupId) -> usize {
        self.items.iter().filter(|i| i.in_group(Some(group))).count()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Item Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Add an item entered by hand. Bare hostnames get an `https://` prefix
    /// and embeddability starts out unknown.
    pub fn add_item(
        &mut self,
        name: &str,
        url: &str,
        group_id: Option<GroupId>,
    ) -> Result<ItemId> {
        let item = SavedItem::new(
            name,
            normalize_scheme(url),
            Embeddable::Unknown,
            self.known_group(group_id),
        );
        self.prepend(item)
    }

    /// Save a live session. The hint reflects what the session observed.
    pub fn save_session(
        &mut self,
        name: &str,
        url: &str,
        group_id: Option<GroupId>,
        is_blocked: bool,
    ) -> Result<ItemId> {
        let item = SavedItem::new(
            name,
            url,
            Embeddable::from_blocked(is_blocked),
            self.known_group(group_id),
        );
        self.prepend(item)
    }

    fn prepend(&mut self, item: SavedItem) -> Result<ItemId> {
        let id = item.id;
        debug!("Saving item '{}' -> {}", item.name, item.url);
        let mut next = Vec::with_capacity(self.items.len() + 1);
        next.push(item);
        next.extend(self.items.iter().cloned());
        self.commit_items(next)?;
        Ok(id)
    }

    /// Replace the item with the same id. The URL is scheme-normalized.
    ///
    /// Returns `Ok(false)` if no item has that id.
    pub fn update_item(&mut self, mut updated: SavedItem) -> Result<bool> {
        let Some(pos) = self.position_of(updated.id) else {
            warn!("Cannot update unknown item {}", updated.id);
            return Ok(false);
        };
        updated.url = normalize_scheme(&updated.url);
        let mut next = self.items.clone();
        next[pos] = updated;
        self.commit_items(next)?;
        Ok(true)
    }

    pub fn delete_item(&mut self, id: ItemId) -> Result<bool> {
        let Some(pos) = self.position_of(id) else {
            warn!("Cannot delete unknown item {}", id);
            return Ok(false);
        };
        let mut next = self.items.clone();
        let removed = next.remove(pos);
        self.commit_items(next)?;
        debug!("Deleted item '{}'", removed.name);
        Ok(true)
    }

    /// Drop `dragged` onto `target`: the dragged item is removed, inserted at
    /// the target's position (ahead of it) and takes on the target's group.
    ///
    /// Works by id rather than index, so unrelated rows keep their relative
    /// order. No-op if either id is unknown or both are the same.
    pub fn reorder_items(&mut self, dragged: ItemId, target: ItemId) -> Result<bool> {
        let (Some(from), Some(to)) = (self.position_of(dragged), self.position_of(target)) else {
            return Ok(false);
        };
        if from == to {
            return Ok(false);
        }

        let mut next = self.items.clone();
        let mut moved = next.remove(from);
        moved.group_id = self.items[to].group_id;

        let Some(insert_at) = next.iter().position(|i| i.id == target) else {
            return Ok(false);
        };
        next.insert(insert_at, moved);
        self.commit_items(next)?;
        debug!("Reordered item {} onto {}", dragged, target);
        Ok(true)
    }

    /// File an item under `group`, or uncategorized with `None`.
    pub fn move_item_to_group(&mut self, id: ItemId, group: Option<GroupId>) -> Result<bool> {
        let Some(pos) = self.position_of(id) else {
            warn!("Cannot move unknown item {}", id);
            return Ok(false);
        };
        if let Some(group_id) = group {
            if self.group(group_id).is_none() {
                warn!("Cannot move item into unknown group {}", group_id);
                return Ok(false);
            }
        }
        let mut next = self.items.clone();
        next[pos].group_id = group;
        self.commit_items(next)?;
        Ok(true)
    }

    /// Record that `url` turned out to be blocked in a live session.
    ///
    /// Every item with exactly this URL is downgraded, including items that
    /// previously loaded fine. Returns how many items changed.
    pub fn mark_not_embeddable(&mut self, url: &str) -> Result<usize> {
        let changed = self
            .items
            .iter()
            .filter(|i| i.url == url && i.embeddable != Embeddable::No)
            .count();
        if changed == 0 {
            return Ok(0);
        }
        let next = self
            .items
            .iter()
            .cloned()
            .map(|mut i| {
                if i.url == url {
                    i.embeddable = Embeddable::No;
                }
                i
            })
            .collect();
        self.commit_items(next)?;
        info!("Marked {} saved item(s) for {} as not embeddable", changed, url);
        Ok(changed)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Group Mutations
    // ─────────────────────────────────────────────────────────────────────────

    pub fn add_group(&mut self, name: &str) -> Result<GroupId> {
        let group = Group::new(name.trim());
        let id = group.id;
        let mut next = self.groups.clone();
        next.push(group);
        self.commit_groups(next)?;
        Ok(id)
    }

    pub fn rename_group(&mut self, id: GroupId, name: &str) -> Result<bool> {
        let Some(pos) = self.group_position_of(id) else {
            warn!("Cannot rename unknown group {}", id);
            return Ok(false);
        };
        let mut next = self.groups.clone();
        next[pos].name = name.trim().to_string();
        self.commit_groups(next)?;
        Ok(true)
    }

    /// Delete a group and uncategorize its members in one step.
    ///
    /// Member items are never deleted. Items are written first; if the group
    /// write then fails, the previous items are written back and neither
    /// in-memory collection changes.
    pub fn delete_group(&mut self, id: GroupId) -> Result<bool> {
        let Some(pos) = self.group_position_of(id) else {
            warn!("Cannot delete unknown group {}", id);
            return Ok(false);
        };

        let next_items: Vec<SavedItem> = self
            .items
            .iter()
            .cloned()
            .map(|mut i| {
                if i.group_id == Some(id) {
                    i.group_id = None;
                }
                i
            })
            .collect();
        let mut next_groups = self.groups.clone();
        let removed = next_groups.remove(pos);

        save_value(self.backend.as_mut(), SAVED_ITEMS_KEY, &next_items)?;
        if let Err(e) = save_value(self.backend.as_mut(), SAVED_GROUPS_KEY, &next_groups) {
            if let Err(restore_err) = save_value(self.backend.as_mut(), SAVED_ITEMS_KEY, &self.items)
            {
                error!(
                    "Failed to restore saved items after aborted group delete: {}",
                    restore_err
                );
            }
            return Err(e);
        }

        self.items = next_items;
        self.groups = next_groups;
        info!("Deleted group '{}'", removed.name);
        Ok(true)
    }

    /// Drop group `dragged` onto `target`: removed, then inserted at the
    /// index the target had before the removal.
    pub fn reorder_groups(&mut self, dragged: GroupId, target: GroupId) -> Result<bool> {
        let (Some(from), Some(to)) = (
            self.group_position_of(dragged),
            self.group_position_of(target),
        ) else {
            return Ok(false);
        };
        if from == to {
            return Ok(false);
        }
        let mut next = self.groups.clone();
        let moved = next.remove(from);
        next.insert(to, moved);
        self.commit_groups(next)?;
        Ok(true)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Theme
    // ─────────────────────────────────────────────────────────────────────────

    pub fn set_theme(&mut self, theme: Theme) -> Result<()> {
        save_value(self.backend.as_mut(), THEME_KEY, &theme)?;
        if self.theme != theme {
            info!("Theme changed from {:?} to {:?}", self.theme, theme);
        }
        self.theme = theme;
        Ok(())
    }

    pub fn toggle_theme(&mut self) -> Result<Theme> {
        let next = self.theme.toggle();
        self.set_theme(next)?;
        Ok(next)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────────

    fn position_of(&self, id: ItemId) -> Option<usize> {
        self.items.iter().position(|i| i.id == id)
    }

    fn group_position_of(&self, id: GroupId) -> Option<usize> {
        self.groups.iter().position(|g| g.id == id)
    }

    fn known_group(&self, group_id: Option<GroupId>) -> Option<GroupId> {
        match group_id {
            Some(id) if self.group(id).is_none() => {
                warn!("Unknown group {}, saving as uncategorized", id);
                None
            }
            other => other,
        }
    }

    fn commit_items(&mut self, next: Vec<SavedItem>) -> Result<()> {
        save_value(self.backend.as_mut(), SAVED_ITEMS_KEY, &next)?;
        self.items = next;
        Ok(())
    }

    fn commit_groups(&mut self, next: Vec<Group>) -> Result<()> {
        save_value(self.backend.as_mut(), SAVED_GROUPS_KEY, &next)?;
        self.groups = next;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::store::MemoryStore;
    use tempfile::TempDir;

    fn empty_store() -> SavedItemStore {
        SavedItemStore::load(Box::new(MemoryStore::new()))
    }

    fn names(store: &SavedItemStore) -> Vec<&str> {
        store.items().iter().map(|i| i.name.as_str()).collect()
    }

    /// Store with items A, B, C, D (in that order) where B and C are in `g1`.
    fn seeded() -> (SavedItemStore, Vec<ItemId>, GroupId) {
        let mut store = empty_store();
        let g1 = store.add_group("Reading").unwrap();
        let d = store.add_item("D", "d.example", None).unwrap();
        let c = store.add_item("C", "c.example", Some(g1)).unwrap();
        let b = store.add_item("B", "b.example", Some(g1)).unwrap();
        let a = store.add_item("A", "a.example", None).unwrap();
        (store, vec![a, b, c, d], g1)
    }

    #[test]
    fn test_add_item_prepends_and_normalizes() {
        let mut store = empty_store();
        store.add_item("First", "first.example", None).unwrap();
        let id = store.add_item("Second", "http://second.example", None).unwrap();

        assert_eq!(names(&store), vec!["Second", "First"]);
        assert_eq!(store.items()[1].url, "https://first.example");
        let second = store.item(id).unwrap();
        assert_eq!(second.url, "http://second.example");
        assert_eq!(second.embeddable, Embeddable::Unknown);
    }

    #[test]
    fn test_add_item_unknown_group_is_uncategorized() {
        let mut store = empty_store();
        let id = store.add_item("X", "x.example", Some(GroupId::new())).unwrap();
        assert!(store.item(id).unwrap().group_id.is_none());
    }

    #[test]
    fn test_save_session_records_hint() {
        let mut store = empty_store();
        let blocked = store
            .save_session("Blocked", "https://example.com", None, true)
            .unwrap();
        let fine = store
            .save_session("Fine", "https://docs.rs", None, false)
            .unwrap();
        assert_eq!(store.item(blocked).unwrap().embeddable, Embeddable::No);
        assert_eq!(store.item(fine).unwrap().embeddable, Embeddable::Yes);
    }

    #[test]
    fn test_update_item() {
        let (mut store, ids, _) = seeded();
        let mut updated = store.item(ids[0]).unwrap().clone();
        updated.name = "Alpha".to_string();
        updated.url = "alpha.example".to_string();

        assert!(store.update_item(updated).unwrap());
        let item = store.item(ids[0]).unwrap();
        assert_eq!(item.name, "Alpha");
        assert_eq!(item.url, "https://alpha.example");
        assert_eq!(store.items().len(), 4);
    }

    #[test]
    fn test_update_unknown_item_is_noop() {
        let (mut store, _, _) = seeded();
        let stray = SavedItem::new("Stray", "https://stray", Embeddable::Unknown, None);
        assert!(!store.update_item(stray).unwrap());
        assert_eq!(store.items().len(), 4);
    }

    #[test]
    fn test_delete_item() {
        let (mut store, ids, _) = seeded();
        assert!(store.delete_item(ids[1]).unwrap());
        assert_eq!(names(&store), vec!["A", "C", "D"]);
        assert!(!store.delete_item(ids[1]).unwrap());
    }

    #[test]
    fn test_reorder_moves_ahead_of_target_and_inherits_group() {
        let (mut store, ids, g1) = seeded();
        // Drag D (uncategorized) onto B (in g1)
        assert!(store.reorder_items(ids[3], ids[1]).unwrap());

        assert_eq!(names(&store), vec!["A", "D", "B", "C"]);
        assert_eq!(store.item(ids[3]).unwrap().group_id, Some(g1));
        assert_eq!(store.items().len(), 4);
    }

    #[test]
    fn test_reorder_downward_keeps_others_in_order() {
        let (mut store, ids, _) = seeded();
        // Drag A onto C
        assert!(store.reorder_items(ids[0], ids[2]).unwrap());
        assert_eq!(names(&store), vec!["B", "A", "C", "D"]);

        let others: Vec<&str> = names(&store).into_iter().filter(|n| *n != "A").collect();
        assert_eq!(others, vec!["B", "C", "D"]);
    }

    #[test]
    fn test_reorder_noop_cases() {
        let (mut store, ids, _) = seeded();
        assert!(!store.reorder_items(ids[0], ids[0]).unwrap());
        assert!(!store.reorder_items(ids[0], ItemId::new()).unwrap());
        assert!(!store.reorder_items(ItemId::new(), ids[0]).unwrap());
        assert_eq!(names(&store), vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn test_move_item_to_group_and_back() {
        let (mut store, ids, g1) = seeded();
        assert!(store.move_item_to_group(ids[0], Some(g1)).unwrap());
        assert_eq!(store.items_in_group(Some(g1)).len(), 3);

        assert!(store.move_item_to_group(ids[0], None).unwrap());
        assert_eq!(store.item(ids[0]).unwrap().group_id, None);

        assert!(!store.move_item_to_group(ids[0], Some(GroupId::new())).unwrap());
        // Position never changes on move
        assert_eq!(names(&store), vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn test_mark_not_embeddable_overwrites_by_url() {
        let mut store = empty_store();
        let a = store
            .save_session("A", "https://example.com", None, false)
            .unwrap();
        let b = store.add_item("B", "https://example.com", None).unwrap();
        let c = store.add_item("C", "https://other.com", None).unwrap();

        assert_eq!(store.mark_not_embeddable("https://example.com").unwrap(), 2);
        assert_eq!(store.item(a).unwrap().embeddable, Embeddable::No);
        assert_eq!(store.item(b).unwrap().embeddable, Embeddable::No);
        assert_eq!(store.item(c).unwrap().embeddable, Embeddable::Unknown);

        assert_eq!(store.mark_not_embeddable("https://example.com").unwrap(), 0);
    }

    #[test]
    fn test_group_delete_unlinks_members() {
        let (mut store, ids, g1) = seeded();
        assert!(store.delete_group(g1).unwrap());

        assert!(store.groups().is_empty());
        assert_eq!(store.items().len(), 4);
        assert!(store.items().iter().all(|i| i.group_id != Some(g1)));
        assert_eq!(store.item(ids[1]).unwrap().group_id, None);
    }

    #[test]
    fn test_group_delete_keeps_other_groups() {
        let (mut store, ids, g1) = seeded();
        let g2 = store.add_group("Video").unwrap();
        store.move_item_to_group(ids[0], Some(g2)).unwrap();

        store.delete_group(g1).unwrap();
        assert_eq!(store.groups().len(), 1);
        assert_eq!(store.item(ids[0]).unwrap().group_id, Some(g2));
    }

    #[test]
    fn test_group_delete_write_failure_changes_nothing() {
        let mut backend = MemoryStore::new();
        let group = Group::new("Reading");
        let item = SavedItem::new("A", "https://a", Embeddable::Unknown, Some(group.id));
        save_value(&mut backend, SAVED_GROUPS_KEY, &vec![group.clone()]).unwrap();
        save_value(&mut backend, SAVED_ITEMS_KEY, &vec![item.clone()]).unwrap();
        backend.fail_writes_to(SAVED_GROUPS_KEY);

        let mut store = SavedItemStore::load(Box::new(backend));
        let result = store.delete_group(group.id);

        assert!(matches!(result, Err(Error::StoreWrite { .. })));
        assert_eq!(store.groups().len(), 1);
        assert_eq!(store.items()[0].group_id, Some(group.id));
    }

    #[test]
    fn test_failed_item_write_leaves_memory_untouched() {
        let mut backend = MemoryStore::new();
        backend.fail_writes_to(SAVED_ITEMS_KEY);
        let mut store = SavedItemStore::load(Box::new(backend));

        assert!(store.add_item("A", "a.example", None).is_err());
        assert!(store.items().is_empty());
    }

    #[test]
    fn test_reorder_groups() {
        let mut store = empty_store();
        let a = store.add_group("A").unwrap();
        let b = store.add_group("B").unwrap();
        let c = store.add_group("C").unwrap();

        assert!(store.reorder_groups(a, c).unwrap());
        let order: Vec<&str> = store.groups().iter().map(|g| g.name.as_str()).collect();
        assert_eq!(order, vec!["B", "C", "A"]);

        assert!(store.reorder_groups(a, b).unwrap());
        let order: Vec<&str> = store.groups().iter().map(|g| g.name.as_str()).collect();
        assert_eq!(order, vec!["A", "B", "C"]);

        assert!(!store.reorder_groups(a, a).unwrap());
    }

    #[test]
    fn test_rename_group() {
        let mut store = empty_store();
        let id = store.add_group("Old").unwrap();
        assert!(store.rename_group(id, "  New ").unwrap());
        assert_eq!(store.group(id).unwrap().name, "New");
        assert!(!store.rename_group(GroupId::new(), "x").unwrap());
    }

    #[test]
    fn test_search_matches_name_or_url() {
        let mut store = empty_store();
        store.add_item("Rust Docs", "docs.rs", None).unwrap();
        store.add_item("News", "news.ycombinator.com", None).unwrap();

        assert_eq!(store.search("rust").len(), 1);
        assert_eq!(store.search("YCOMBINATOR").len(), 1);
        assert_eq!(store.search("https").len(), 2);
        assert_eq!(store.search("").len(), 2);
        assert!(store.search("nothing").is_empty());
    }

    #[test]
    fn test_search_query_is_not_trimmed() {
        let mut store = empty_store();
        store.add_item("Rust Docs", "docs.rs", None).unwrap();
        store.add_item("News", "news.ycombinator.com", None).unwrap();

        assert_eq!(store.search(" ").len(), 1);
        assert!(store.search(" rust").is_empty());
        assert_eq!(store.search(" docs").len(), 1);
    }

    #[test]
    fn test_group_helpers() {
        let (store, _, g1) = seeded();
        assert_eq!(store.group_item_count(g1), 2);
        let uncategorized: Vec<&str> = store
            .items_in_group(None)
            .iter()
            .map(|i| i.name.as_str())
            .collect();
        assert_eq!(uncategorized, vec!["A", "D"]);
    }

    #[test]
    fn test_theme_toggle_persists() {
        let temp_dir = TempDir::new().unwrap();
        let backend = crate::store::JsonFileStore::open(temp_dir.path()).unwrap();
        let mut store = SavedItemStore::load(Box::new(backend.clone()));
        assert_eq!(store.theme(), Theme::Dark);
        assert_eq!(store.toggle_theme().unwrap(), Theme::Light);

        let reloaded = SavedItemStore::load(Box::new(backend));
        assert_eq!(reloaded.theme(), Theme::Light);
    }

    #[test]
    fn test_reload_from_disk_preserves_order_and_groups() {
        let temp_dir = TempDir::new().unwrap();
        let backend = crate::store::JsonFileStore::open(temp_dir.path()).unwrap();
        let mut store = SavedItemStore::load(Box::new(backend.clone()));
        let g = store.add_group("Docs").unwrap();
        store.add_item("Two", "two.example", Some(g)).unwrap();
        store.add_item("One", "one.example", None).unwrap();

        let reloaded = SavedItemStore::load(Box::new(backend));
        assert_eq!(names(&reloaded), vec!["One", "Two"]);
        assert_eq!(reloaded.items()[1].group_id, Some(g));
        assert_eq!(reloaded.groups()[0].name, "Docs");
    }
}
