//! Persisted data model: saved items and groups.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ─────────────────────────────────────────────────────────────────────────────
// Identifiers
// ─────────────────────────────────────────────────────────────────────────────

/// Identifier of a saved item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub Uuid);

/// Identifier of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl GroupId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for GroupId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Embeddability Hint
// ─────────────────────────────────────────────────────────────────────────────

/// What we have learned about whether a saved URL renders in a frame.
///
/// Serialized as `true`, `false` or `null` so the stored JSON keeps the
/// nullable-boolean shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum Embeddable {
    /// Loaded cleanly in a live session.
    Yes,
    /// Blocked, or only reachable through a fallback view.
    No,
    /// Added directly; never opened yet.
    #[default]
    Unknown,
}

impl Embeddable {
    /// Hint learned from a live session's blocked flag.
    pub fn from_blocked(is_blocked: bool) -> Self {
        if is_blocked {
            Embeddable::No
        } else {
            Embeddable::Yes
        }
    }

    pub fn is_known_blocked(&self) -> bool {
        matches!(self, Embeddable::No)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Embeddable::Yes => "embeddable",
            Embeddable::No => "not embeddable",
            Embeddable::Unknown => "unknown",
        }
    }
}

impl From<Option<bool>> for Embeddable {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => Embeddable::Yes,
            Some(false) => Embeddable::No,
            None => Embeddable::Unknown,
        }
    }
}

impl From<Embeddable> for Option<bool> {
    fn from(value: Embeddable) -> Self {
        match value {
            Embeddable::Yes => Some(true),
            Embeddable::No => Some(false),
            Embeddable::Unknown => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Saved Item
// ─────────────────────────────────────────────────────────────────────────────

/// A URL the user saved, optionally filed under a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedItem {
    pub id: ItemId,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub embeddable: Embeddable,
    pub created_at: DateTime<Utc>,
    /// Weak reference: cleared when the group is deleted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<GroupId>,
}

impl SavedItem {
    /// Create a new item stamped with the current time.
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        embeddable: Embeddable,
        group_id: Option<GroupId>,
    ) -> Self {
        Self {
            id: ItemId::new(),
            name: name.into(),
            url: url.into(),
            embeddable,
            created_at: Utc::now(),
            group_id,
        }
    }

    /// Whether the item sits in `group` (`None` = uncategorized).
    pub fn in_group(&self, group: Option<GroupId>) -> bool {
        self.group_id == group
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Group
// ─────────────────────────────────────────────────────────────────────────────

/// Named bucket for saved items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: GroupId::new(),
            name: name.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
