//! # Hydration
//!
//! Joins playlists against library items. [`hydrate`] is pure: it never
//! mutates its inputs and never fails. Member ids with no matching item are
//! skipped, so deleting an item simply makes it disappear from every
//! playlist view while the stored playlist still holds the reference.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::trace;

use crate::models::{HydratedPlaylist, Playlist, SheetMusicId, SheetMusicItem};

/// Resolve every playlist's member ids, keeping playlist and member order.
pub fn hydrate(playlists: &[Playlist], items: &[Arc<SheetMusicItem>]) -> Vec<HydratedPlaylist> {
    let by_id: HashMap<&SheetMusicId, &Arc<SheetMusicItem>> =
        items.iter().map(|item| (&item.id, item)).collect();

    playlists
        .iter()
        .map(|playlist| HydratedPlaylist {
            id: playlist.id.clone(),
            name: playlist.name.clone(),
            items: playlist
                .item_ids
                .iter()
                .filter_map(|id| by_id.get(id).map(|item| Arc::clone(item)))
                .collect(),
        })
        .collect()
}

/// Revisions of the two inputs a hydration result was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HydrationKey {
    pub library_revision: u64,
    pub playlist_revision: u64,
}

/// Memoises the last [`hydrate`] result until either input changes.
#[derive(Default)]
pub struct HydrationCache {
    last: Mutex<Option<(HydrationKey, Arc<[HydratedPlaylist]>)>>,
}

impl HydrationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached result for `key`, if the inputs have not changed since.
    pub fn get(&self, key: HydrationKey) -> Option<Arc<[HydratedPlaylist]>> {
        let last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        match last.as_ref() {
            Some((cached, result)) if *cached == key => Some(Arc::clone(result)),
            _ => None,
        }
    }

    /// Return the cached result for `key` or compute and remember a new one.
    pub fn get_or_hydrate(
        &self,
        key: HydrationKey,
        playlists: &[Playlist],
        items: &[Arc<SheetMusicItem>],
    ) -> Arc<[HydratedPlaylist]> {
        if let Some(hit) = self.get(key) {
            return hit;
        }

        trace!(?key, "Hydrating playlists");
        let result: Arc<[HydratedPlaylist]> = hydrate(playlists, items).into();
        *self.last.lock().unwrap_or_else(|e| e.into_inner()) = Some((key, Arc::clone(&result)));
        result
    }

    pub fn invalidate(&self) {
        *self.last.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}
