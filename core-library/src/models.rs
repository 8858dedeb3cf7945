//! Domain models for the sheet-music library
//!
//! Items and playlists as held in memory. The persisted shape lives in
//! [`crate::records`]; nothing here knows about storage.

use bridge_traits::conversion::PageImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

// =============================================================================
// ID Types
// =============================================================================

/// Unique identifier for a library item
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SheetMusicId(String);

impl SheetMusicId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an id read back from storage. Ids are opaque, so any string is accepted.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SheetMusicId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SheetMusicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a playlist
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaylistId(String);

impl PlaylistId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PlaylistId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlaylistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Library Item
// =============================================================================

/// One imported document: a display name and its rendered pages in order.
///
/// Items are immutable once created and are shared as `Arc<SheetMusicItem>`
/// between the library cache, hydrated playlists and the viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetMusicItem {
    pub id: SheetMusicId,
    pub name: String,
    pub pages: Vec<PageImage>,
    /// Import time (Unix timestamp in milliseconds)
    pub created_at: i64,
}

impl SheetMusicItem {
    pub fn new(name: impl Into<String>, pages: Vec<PageImage>, created_at: i64) -> Self {
        Self {
            id: SheetMusicId::new(),
            name: name.into(),
            pages,
            created_at,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

// =============================================================================
// Playlist
// =============================================================================

/// A named, ordered list of library item references.
///
/// `item_ids` never holds the same id twice. References to items that were
/// deleted later are kept; they are dropped when the playlist is hydrated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playlist {
    pub id: PlaylistId,
    pub name: String,
    pub item_ids: Vec<SheetMusicId>,
    /// Timestamps (Unix milliseconds)
    pub created_at: i64,
    pub updated_at: i64,
}

impl Playlist {
    /// Create an empty playlist. The caller is responsible for name validation.
    pub fn new(name: impl Into<String>, now: i64) -> Self {
        Self {
            id: PlaylistId::new(),
            name: name.into(),
            item_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn contains(&self, item_id: &SheetMusicId) -> bool {
        self.item_ids.contains(item_id)
    }

    /// Append `item_id` unless it is already a member. Returns whether it was added.
    pub fn push_unique(&mut self, item_id: SheetMusicId) -> bool {
        if self.contains(&item_id) {
            return false;
        }
        self.item_ids.push(item_id);
        true
    }

    /// Remove every occurrence of `item_id`. Returns how many were removed.
    pub fn remove_all(&mut self, item_id: &SheetMusicId) -> usize {
        let before = self.item_ids.len();
        self.item_ids.retain(|id| id != item_id);
        before - self.item_ids.len()
    }
}

/// A playlist with its references resolved to library items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HydratedPlaylist {
    pub id: PlaylistId,
    pub name: String,
    pub items: Vec<Arc<SheetMusicItem>>,
}

impl HydratedPlaylist {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
