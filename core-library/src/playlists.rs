//! # Playlist Manager
//!
//! Owns playlist identity and membership. Like the library, the cache is
//! write-through: every change is persisted as a full record replace before
//! the cached playlist is swapped.

use std::collections::HashMap;
use std::sync::Arc;

use bridge_traits::storage::{Collection, RecordStore};
use bridge_traits::time::Clock;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::error::{LibraryError, Result};
use crate::models::{Playlist, PlaylistId, SheetMusicId};
use crate::records::{decode_playlist, encode_playlist};

/// Result of [`PlaylistManager::add_member`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipOutcome {
    /// Appended and persisted; carries the updated playlist.
    Added(Playlist),
    /// The item was already a member; nothing changed.
    AlreadyPresent(Playlist),
    PlaylistNotFound,
}

/// Result of [`PlaylistManager::remove_member`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalOutcome {
    Removed(Playlist),
    NotMember,
    PlaylistNotFound,
}

#[derive(Default)]
struct PlaylistState {
    playlists: HashMap<PlaylistId, Playlist>,
    loaded: bool,
    revision: u64,
}

/// Point-in-time copy of all playlists, tagged with its revision.
#[derive(Debug, Clone)]
pub struct PlaylistSnapshot {
    pub revision: u64,
    pub playlists: Vec<Playlist>,
}

pub struct PlaylistManager {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    state: RwLock<PlaylistState>,
}

impl PlaylistManager {
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            state: RwLock::new(PlaylistState::default()),
        }
    }

    #[instrument(skip(self))]
    pub async fn load_all(&self) -> Result<usize> {
        let mut state = self.state.write().await;

        let records = self.store.get_all(Collection::Playlists).await?;
        let playlists = records
            .iter()
            .map(|record| decode_playlist(record).map(|p| (p.id.clone(), p)))
            .collect::<Result<HashMap<_, _>>>()?;

        let count = playlists.len();
        state.playlists = playlists;
        state.loaded = true;
        state.revision += 1;

        info!(count, "Loaded playlists");
        Ok(count)
    }

    /// Create an empty playlist named `name` (trimmed).
    ///
    /// Returns `None` without touching the store when the trimmed name is
    /// empty.
    #[instrument(skip(self))]
    pub async fn create(&self, name: &str) -> Result<Option<Playlist>> {
        let name = name.trim();
        if name.is_empty() {
            debug!("Ignoring playlist with blank name");
            return Ok(None);
        }

        let playlist = Playlist::new(name, self.clock.unix_timestamp_millis());
        let record = encode_playlist(&playlist)?;

        let mut state = self.state.write().await;
        self.store.put(Collection::Playlists, record).await?;
        state.playlists.insert(playlist.id.clone(), playlist.clone());
        state.revision += 1;

        info!(playlist_id = %playlist.id, name = %playlist.name, "Created playlist");
        Ok(Some(playlist))
    }

    /// Delete a playlist. Referenced items are left alone.
    ///
    /// Callers are expected to have confirmed the deletion with the user.
    /// Returns `false` when no such playlist exists.
    #[instrument(skip(self), fields(playlist_id = %id))]
    pub async fn delete(&self, id: &PlaylistId) -> Result<bool> {
        let mut state = self.state.write().await;
        if !state.playlists.contains_key(id) {
            return Ok(false);
        }

        self.store.delete(Collection::Playlists, id.as_str()).await?;
        state.playlists.remove(id);
        state.revision += 1;

        info!("Deleted playlist");
        Ok(true)
    }

    /// Append `item_id` to the end of the playlist unless already present.
    #[instrument(skip(self), fields(playlist_id = %playlist_id, item_id = %item_id))]
    pub async fn add_member(
        &self,
        playlist_id: &PlaylistId,
        item_id: &SheetMusicId,
    ) -> Result<MembershipOutcome> {
        let mut state = self.state.write().await;
        let Some(current) = state.playlists.get(playlist_id) else {
            return Ok(MembershipOutcome::PlaylistNotFound);
        };

        if current.contains(item_id) {
            debug!("Item already in playlist");
            return Ok(MembershipOutcome::AlreadyPresent(current.clone()));
        }

        let mut updated = current.clone();
        updated.push_unique(item_id.clone());
        updated.updated_at = self.clock.unix_timestamp_millis();

        self.persist(&mut state, updated.clone()).await?;
        Ok(MembershipOutcome::Added(updated))
    }

    /// Remove every occurrence of `item_id` from the playlist.
    #[instrument(skip(self), fields(playlist_id = %playlist_id, item_id = %item_id))]
    pub async fn remove_member(
        &self,
        playlist_id: &PlaylistId,
        item_id: &SheetMusicId,
    ) -> Result<RemovalOutcome> {
        let mut state = self.state.write().await;
        let Some(current) = state.playlists.get(playlist_id) else {
            return Ok(RemovalOutcome::PlaylistNotFound);
        };

        if !current.contains(item_id) {
            return Ok(RemovalOutcome::NotMember);
        }

        let mut updated = current.clone();
        let removed = updated.remove_all(item_id);
        updated.updated_at = self.clock.unix_timestamp_millis();

        self.persist(&mut state, updated.clone()).await?;
        debug!(removed, "Removed item from playlist");
        Ok(RemovalOutcome::Removed(updated))
    }

    async fn persist(&self, state: &mut PlaylistState, playlist: Playlist) -> Result<()> {
        let record = encode_playlist(&playlist)?;
        self.store.put(Collection::Playlists, record).await?;

        debug!(members = playlist.item_ids.len(), "Persisted playlist");
        state.playlists.insert(playlist.id.clone(), playlist);
        state.revision += 1;
        Ok(())
    }

    pub async fn get(&self, id: &PlaylistId) -> Option<Playlist> {
        self.state.read().await.playlists.get(id).cloned()
    }

    /// All playlists, oldest first.
    pub async fn playlists(&self) -> Vec<Playlist> {
        let state = self.state.read().await;
        sorted_playlists(&state.playlists)
    }

    /// Ids of the playlists that already contain `item_id`.
    pub async fn playlists_containing(&self, item_id: &SheetMusicId) -> Vec<PlaylistId> {
        let state = self.state.read().await;
        sorted_playlists(&state.playlists)
            .into_iter()
            .filter(|playlist| playlist.contains(item_id))
            .map(|playlist| playlist.id)
            .collect()
    }

    /// # Errors
    ///
    /// `NotLoaded` until [`Self::load_all`] succeeded once.
    pub async fn snapshot(&self) -> Result<PlaylistSnapshot> {
        let state = self.state.read().await;
        if !state.loaded {
            return Err(LibraryError::NotLoaded("playlists"));
        }
        Ok(PlaylistSnapshot {
            revision: state.revision,
            playlists: sorted_playlists(&state.playlists),
        })
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.playlists.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn is_loaded(&self) -> bool {
        self.state.read().await.loaded
    }

    pub async fn revision(&self) -> u64 {
        self.state.read().await.revision
    }
}

fn sorted_playlists(playlists: &HashMap<PlaylistId, Playlist>) -> Vec<Playlist> {
    let mut playlists: Vec<_> = playlists.values().cloned().collect();
    playlists.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    playlists
}
