//! # Library Manager
//!
//! Owns the set of imported sheet-music items. The record store is the
//! source of truth; the in-memory map is a write-through cache that is only
//! updated after the store accepted the write.
//!
//! The write lock is held across each store call so that mutations apply in
//! call order and a reader never observes a cache entry the store has not
//! seen yet.

use std::collections::HashMap;
use std::sync::Arc;

use bridge_traits::conversion::PageImage;
use bridge_traits::storage::{Collection, RecordStore};
use bridge_traits::time::Clock;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::error::{LibraryError, Result};
use crate::models::{SheetMusicId, SheetMusicItem};
use crate::naming::display_name;
use crate::records::{decode_item, encode_item};

#[derive(Default)]
struct LibraryState {
    items: HashMap<SheetMusicId, Arc<SheetMusicItem>>,
    loaded: bool,
    revision: u64,
}

/// Point-in-time copy of the library, tagged with the revision it was taken at.
#[derive(Debug, Clone)]
pub struct LibrarySnapshot {
    pub revision: u64,
    pub items: Vec<Arc<SheetMusicItem>>,
}

pub struct LibraryManager {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    state: RwLock<LibraryState>,
}

impl LibraryManager {
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            state: RwLock::new(LibraryState::default()),
        }
    }

    /// Replace the cache with every item in the store.
    ///
    /// # Errors
    ///
    /// Any storage or decoding failure. The cache is left untouched so a
    /// failed load never looks like an empty library.
    #[instrument(skip(self))]
    pub async fn load_all(&self) -> Result<usize> {
        let mut state = self.state.write().await;

        let records = self.store.get_all(Collection::SheetMusic).await?;
        let items = records
            .iter()
            .map(|record| decode_item(record).map(|item| (item.id.clone(), Arc::new(item))))
            .collect::<Result<HashMap<_, _>>>()?;

        let count = items.len();
        state.items = items;
        state.loaded = true;
        state.revision += 1;

        info!(count, "Loaded library");
        Ok(count)
    }

    /// Create a new item from converted pages and persist it.
    ///
    /// The display name is `file_name` without a trailing `.pdf`. Every call
    /// creates a new identity, even for identical input.
    #[instrument(skip(self, pages), fields(pages = pages.len()))]
    pub async fn import_item(
        &self,
        file_name: &str,
        pages: Vec<PageImage>,
    ) -> Result<Arc<SheetMusicItem>> {
        let item = SheetMusicItem::new(
            display_name(file_name),
            pages,
            self.clock.unix_timestamp_millis(),
        );
        let record = encode_item(&item)?;

        let mut state = self.state.write().await;
        self.store.put(Collection::SheetMusic, record).await?;

        let item = Arc::new(item);
        state.items.insert(item.id.clone(), Arc::clone(&item));
        state.revision += 1;

        info!(item_id = %item.id, name = %item.name, "Imported item");
        Ok(item)
    }

    /// Remove an item from the store and the cache.
    ///
    /// Playlists referencing the item are not touched. Returns whether the
    /// item was cached before the call.
    #[instrument(skip(self), fields(item_id = %id))]
    pub async fn delete_item(&self, id: &SheetMusicId) -> Result<bool> {
        let mut state = self.state.write().await;
        self.store.delete(Collection::SheetMusic, id.as_str()).await?;

        let existed = state.items.remove(id).is_some();
        if existed {
            state.revision += 1;
        }

        debug!(existed, "Deleted item");
        Ok(existed)
    }

    pub async fn get(&self, id: &SheetMusicId) -> Option<Arc<SheetMusicItem>> {
        self.state.read().await.items.get(id).cloned()
    }

    /// All cached items, oldest import first.
    pub async fn items(&self) -> Vec<Arc<SheetMusicItem>> {
        let state = self.state.read().await;
        sorted_items(&state.items)
    }

    /// Items plus the revision they belong to.
    ///
    /// # Errors
    ///
    /// `NotLoaded` until [`Self::load_all`] succeeded once.
    pub async fn snapshot(&self) -> Result<LibrarySnapshot> {
        let state = self.state.read().await;
        if !state.loaded {
            return Err(LibraryError::NotLoaded("library"));
        }
        Ok(LibrarySnapshot {
            revision: state.revision,
            items: sorted_items(&state.items),
        })
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.items.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn is_loaded(&self) -> bool {
        self.state.read().await.loaded
    }

    /// Bumped on every change to the cached item set.
    pub async fn revision(&self) -> u64 {
        self.state.read().await.revision
    }
}

fn sorted_items(items: &HashMap<SheetMusicId, Arc<SheetMusicItem>>) -> Vec<Arc<SheetMusicItem>> {
    let mut items: Vec<_> = items.values().cloned().collect();
    items.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.id.cmp(&b.id))
    });
    items
}
