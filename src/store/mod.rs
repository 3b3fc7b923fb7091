//! Saved items, groups and their durable storage.

mod backend;
mod model;
mod saved;

pub use backend::{
    load_or_default, save_value, JsonFileStore, KeyValueStore, MemoryStore, SAVED_GROUPS_KEY,
    SAVED_ITEMS_KEY, THEME_KEY,
};
pub use model::{Embeddable, Group, GroupId, ItemId, SavedItem};
pub use saved::SavedItemStore;
