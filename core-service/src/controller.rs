//! # Application Controller
//!
//! Turns user intents into manager calls, talks to the document converter
//! and decides what the user is told. It is the only layer that turns
//! errors into notices; every error is still returned to the caller.

use std::collections::HashSet;
use std::sync::Arc;

use bridge_traits::conversion::{DocumentConverter, PageImage};
use bridge_traits::error::BridgeError;
use bridge_traits::storage::RecordStore;
use bytes::Bytes;
use core_library::{
    HydratedPlaylist, HydrationCache, HydrationKey, LibraryError, LibraryManager,
    MembershipOutcome, Playlist, PlaylistId, PlaylistManager, RemovalOutcome, SheetMusicId,
    SheetMusicItem,
};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, ImportEvent, LibraryEvent, Receiver};
use core_runtime::logging::strip_path;
use tokio::sync::{watch, RwLock};
use tracing::{debug, error, info, instrument, warn};

use crate::error::{CoreError, Result};
use crate::presenter::{ConfirmationRequest, Notice, Presenter};
use crate::view::{ImportProgress, PickerEntry, PlaylistPicker, Screen, ViewState};

const EMPTY_DOCUMENT_REASON: &str = "The document has no pages";

pub struct AppController {
    store: Arc<dyn RecordStore>,
    converter: Arc<dyn DocumentConverter>,
    presenter: Arc<dyn Presenter>,
    library: Arc<LibraryManager>,
    playlists: Arc<PlaylistManager>,
    events: EventBus,
    hydration: HydrationCache,
    view: RwLock<ViewState>,
    expanded: RwLock<HashSet<PlaylistId>>,
    progress: watch::Sender<Option<ImportProgress>>,
}

impl AppController {
    pub fn new(config: CoreConfig, presenter: Arc<dyn Presenter>) -> Self {
        let library = Arc::new(LibraryManager::new(
            Arc::clone(&config.record_store),
            Arc::clone(&config.clock),
        ));
        let playlists = Arc::new(PlaylistManager::new(
            Arc::clone(&config.record_store),
            Arc::clone(&config.clock),
        ));
        let (progress, _) = watch::channel(None);

        Self {
            store: config.record_store,
            converter: config.document_converter,
            presenter,
            library,
            playlists,
            events: EventBus::new(config.event_buffer_size),
            hydration: HydrationCache::new(),
            view: RwLock::new(ViewState::default()),
            expanded: RwLock::new(HashSet::new()),
            progress,
        }
    }

    /// Open the store and load items and playlists.
    ///
    /// # Errors
    ///
    /// `LibraryUnavailable` when the store cannot be opened or read. The user
    /// is notified; the controller must not be used as if the library were
    /// empty.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<()> {
        let loaded = async {
            self.store.initialize().await?;
            let items = self.library.load_all().await?;
            let playlists = self.playlists.load_all().await?;
            Ok::<_, LibraryError>((items, playlists))
        }
        .await;

        match loaded {
            Ok((items, playlists)) => {
                info!(items, playlists, "Library ready");
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "Failed to load library");
                let message = err.to_string();
                self.presenter.notify(Notice::StorageFailed {
                    message: format!("Could not open your library: {}", message),
                });
                Err(CoreError::LibraryUnavailable(message))
            }
        }
    }

    // =========================================================================
    // Import
    // =========================================================================

    /// Convert a document and add it to the library.
    ///
    /// Progress is published after every rendered page. On failure nothing is
    /// persisted and the converter's reason is shown to the user unchanged.
    #[instrument(
        skip(self, file_name, document),
        fields(file = %strip_path(file_name), bytes = document.len())
    )]
    pub async fn import_document(
        &self,
        file_name: &str,
        document: Bytes,
    ) -> Result<Arc<SheetMusicItem>> {
        let file_name = strip_path(file_name).to_string();
        self.emit(CoreEvent::Import(ImportEvent::Started {
            file_name: file_name.clone(),
        }));
        self.set_progress(&file_name, 0, 0);

        let pages = match self.render_pages(&file_name, document).await {
            Ok(pages) => pages,
            Err(err) => {
                self.progress.send_replace(None);
                let reason = conversion_reason(err);
                warn!(reason = %reason, "Import failed");

                self.emit(CoreEvent::Import(ImportEvent::Failed {
                    file_name: file_name.clone(),
                    reason: reason.clone(),
                }));
                self.presenter.notify(Notice::ImportFailed {
                    file_name: file_name.clone(),
                    reason: reason.clone(),
                });
                return Err(CoreError::Conversion { file_name, reason });
            }
        };

        let imported = self.library.import_item(&file_name, pages).await;
        self.progress.send_replace(None);

        let item = match imported {
            Ok(item) => item,
            Err(err) => {
                self.emit(CoreEvent::Import(ImportEvent::Failed {
                    file_name: file_name.clone(),
                    reason: err.to_string(),
                }));
                return Err(self.storage_failure(err));
            }
        };

        self.emit(CoreEvent::Import(ImportEvent::Completed {
            file_name,
            item_id: item.id.to_string(),
        }));
        self.emit(CoreEvent::Library(LibraryEvent::ItemImported {
            item_id: item.id.to_string(),
            name: item.name.clone(),
            page_count: item.page_count(),
        }));
        Ok(item)
    }

    async fn render_pages(
        &self,
        file_name: &str,
        document: Bytes,
    ) -> std::result::Result<Vec<PageImage>, BridgeError> {
        let mut rendered = self.converter.open(document).await?;
        let total = rendered.page_count();
        if total == 0 {
            return Err(BridgeError::InvalidDocument(EMPTY_DOCUMENT_REASON.to_string()));
        }
        self.set_progress(file_name, 0, total);

        let mut pages = Vec::with_capacity(total);
        for index in 0..total {
            pages.push(rendered.render_page(index).await?);

            let page = index + 1;
            debug!(page, total, "Rendered page");
            self.set_progress(file_name, page, total);
            self.emit(CoreEvent::Import(ImportEvent::PageRendered {
                file_name: file_name.to_string(),
                page,
                total,
            }));
        }
        Ok(pages)
    }

    fn set_progress(&self, file_name: &str, rendered: usize, total: usize) {
        self.progress.send_replace(Some(ImportProgress {
            file_name: file_name.to_string(),
            rendered,
            total,
        }));
    }

    /// Watch the running import. `None` while idle.
    pub fn import_progress(&self) -> watch::Receiver<Option<ImportProgress>> {
        self.progress.subscribe()
    }

    // =========================================================================
    // Library
    // =========================================================================

    /// All library items, oldest import first.
    pub async fn library(&self) -> Vec<Arc<SheetMusicItem>> {
        self.library.items().await
    }

    /// Delete an item after the user confirmed.
    ///
    /// Playlists keep their reference; it disappears from hydrated views.
    /// Returns `false` when the item is unknown or the user declined.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn delete_item(&self, item_id: &SheetMusicId) -> Result<bool> {
        let Some(item) = self.library.get(item_id).await else {
            return Ok(false);
        };

        let request = ConfirmationRequest::DeleteItem {
            item_id: item_id.clone(),
            name: item.name.clone(),
        };
        if !self.presenter.confirm(&request).await {
            debug!("Deletion declined");
            return Ok(false);
        }

        if let Err(err) = self.library.delete_item(item_id).await {
            return Err(self.storage_failure(err));
        }

        {
            let mut view = self.view.write().await;
            if view.screen.open_item().is_some_and(|open| open.id == *item_id) {
                view.screen = Screen::Library;
            }
            if view.picker_for.as_ref() == Some(item_id) {
                view.picker_for = None;
            }
        }

        self.emit(CoreEvent::Library(LibraryEvent::ItemDeleted {
            item_id: item_id.to_string(),
        }));
        Ok(true)
    }

    // =========================================================================
    // Playlists
    // =========================================================================

    /// Hydrated playlists, recomputed only when items or playlists changed.
    pub async fn playlists(&self) -> Result<Arc<[HydratedPlaylist]>> {
        let key = HydrationKey {
            library_revision: self.library.revision().await,
            playlist_revision: self.playlists.revision().await,
        };
        if let Some(hit) = self.hydration.get(key) {
            return Ok(hit);
        }

        let library = self.library.snapshot().await?;
        let playlists = self.playlists.snapshot().await?;
        let key = HydrationKey {
            library_revision: library.revision,
            playlist_revision: playlists.revision,
        };
        Ok(self
            .hydration
            .get_or_hydrate(key, &playlists.playlists, &library.items))
    }

    /// Create a playlist. A blank name is ignored and yields `None`.
    #[instrument(skip(self))]
    pub async fn create_playlist(&self, name: &str) -> Result<Option<Playlist>> {
        let created = match self.playlists.create(name).await {
            Ok(created) => created,
            Err(err) => return Err(self.storage_failure(err)),
        };

        if let Some(playlist) = &created {
            self.emit(CoreEvent::Library(LibraryEvent::PlaylistCreated {
                playlist_id: playlist.id.to_string(),
                name: playlist.name.clone(),
            }));
        }
        Ok(created)
    }

    /// Delete a playlist after the user confirmed. Its items stay in the library.
    #[instrument(skip(self), fields(playlist_id = %playlist_id))]
    pub async fn delete_playlist(&self, playlist_id: &PlaylistId) -> Result<bool> {
        let Some(playlist) = self.playlists.get(playlist_id).await else {
            return Ok(false);
        };

        let request = ConfirmationRequest::DeletePlaylist {
            playlist_id: playlist_id.clone(),
            name: playlist.name.clone(),
        };
        if !self.presenter.confirm(&request).await {
            debug!("Deletion declined");
            return Ok(false);
        }

        let deleted = match self.playlists.delete(playlist_id).await {
            Ok(deleted) => deleted,
            Err(err) => return Err(self.storage_failure(err)),
        };

        if deleted {
            self.expanded.write().await.remove(playlist_id);
            self.emit(CoreEvent::Library(LibraryEvent::PlaylistDeleted {
                playlist_id: playlist_id.to_string(),
            }));
        }
        Ok(deleted)
    }

    /// Add an item to a playlist and tell the user what happened.
    ///
    /// On success the playlist picker is dismissed. An item that is already a
    /// member only produces a notice.
    #[instrument(skip(self), fields(playlist_id = %playlist_id, item_id = %item_id))]
    pub async fn add_to_playlist(
        &self,
        playlist_id: &PlaylistId,
        item_id: &SheetMusicId,
    ) -> Result<MembershipOutcome> {
        let outcome = match self.playlists.add_member(playlist_id, item_id).await {
            Ok(outcome) => outcome,
            Err(err) => return Err(self.storage_failure(err)),
        };

        match &outcome {
            MembershipOutcome::Added(playlist) => {
                self.view.write().await.picker_for = None;
                self.presenter.notify(Notice::AddedToPlaylist {
                    playlist_name: playlist.name.clone(),
                    item_name: self.item_name(item_id).await,
                });
                self.emit(CoreEvent::Library(LibraryEvent::PlaylistUpdated {
                    playlist_id: playlist.id.to_string(),
                    item_count: playlist.item_ids.len(),
                }));
            }
            MembershipOutcome::AlreadyPresent(playlist) => {
                self.presenter.notify(Notice::AlreadyInPlaylist {
                    playlist_name: playlist.name.clone(),
                    item_name: self.item_name(item_id).await,
                });
            }
            MembershipOutcome::PlaylistNotFound => {
                debug!("Playlist not found");
            }
        }
        Ok(outcome)
    }

    #[instrument(skip(self), fields(playlist_id = %playlist_id, item_id = %item_id))]
    pub async fn remove_from_playlist(
        &self,
        playlist_id: &PlaylistId,
        item_id: &SheetMusicId,
    ) -> Result<RemovalOutcome> {
        let outcome = match self.playlists.remove_member(playlist_id, item_id).await {
            Ok(outcome) => outcome,
            Err(err) => return Err(self.storage_failure(err)),
        };

        if let RemovalOutcome::Removed(playlist) = &outcome {
            self.emit(CoreEvent::Library(LibraryEvent::PlaylistUpdated {
                playlist_id: playlist.id.to_string(),
                item_count: playlist.item_ids.len(),
            }));
        }
        Ok(outcome)
    }

    /// Flip the expanded flag of a playlist row. Returns the new state.
    pub async fn toggle_expanded(&self, playlist_id: &PlaylistId) -> bool {
        let mut expanded = self.expanded.write().await;
        if expanded.remove(playlist_id) {
            false
        } else {
            expanded.insert(playlist_id.clone());
            true
        }
    }

    pub async fn is_expanded(&self, playlist_id: &PlaylistId) -> bool {
        self.expanded.read().await.contains(playlist_id)
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    pub async fn screen(&self) -> Screen {
        self.view.read().await.screen.clone()
    }

    /// Show an item in the viewer. Unknown ids leave the screen unchanged.
    pub async fn open_item(&self, item_id: &SheetMusicId) -> bool {
        let Some(item) = self.library.get(item_id).await else {
            debug!(item_id = %item_id, "Cannot open unknown item");
            return false;
        };
        self.view.write().await.screen = Screen::Viewer { item };
        true
    }

    pub async fn close_viewer(&self) {
        self.view.write().await.screen = Screen::Library;
    }

    /// Open the add-to-playlist picker for an item.
    pub async fn open_playlist_picker(&self, item_id: &SheetMusicId) -> bool {
        if self.library.get(item_id).await.is_none() {
            return false;
        }
        self.view.write().await.picker_for = Some(item_id.clone());
        true
    }

    pub async fn dismiss_playlist_picker(&self) {
        self.view.write().await.picker_for = None;
    }

    /// The open picker with one entry per playlist, oldest first.
    pub async fn playlist_picker(&self) -> Option<PlaylistPicker> {
        let item_id = self.view.read().await.picker_for.clone()?;
        let entries = self
            .playlists
            .playlists()
            .await
            .into_iter()
            .map(|playlist| PickerEntry {
                contains_item: playlist.contains(&item_id),
                playlist_id: playlist.id,
                name: playlist.name,
            })
            .collect();
        Some(PlaylistPicker { item_id, entries })
    }

    // =========================================================================
    // Plumbing
    // =========================================================================

    pub fn subscribe_events(&self) -> Receiver<CoreEvent> {
        self.events.subscribe()
    }

    pub fn library_manager(&self) -> Arc<LibraryManager> {
        Arc::clone(&self.library)
    }

    pub fn playlist_manager(&self) -> Arc<PlaylistManager> {
        Arc::clone(&self.playlists)
    }

    fn emit(&self, event: CoreEvent) {
        self.events.emit(event);
    }

    async fn item_name(&self, item_id: &SheetMusicId) -> String {
        match self.library.get(item_id).await {
            Some(item) => item.name.clone(),
            None => item_id.to_string(),
        }
    }

    fn storage_failure(&self, err: LibraryError) -> CoreError {
        error!(error = %err, "Storage operation failed");
        self.presenter.notify(Notice::StorageFailed {
            message: err.to_string(),
        });
        CoreError::Library(err)
    }
}

fn conversion_reason(err: BridgeError) -> String {
    match err {
        BridgeError::InvalidDocument(reason) => reason,
        other => other.to_string(),
    }
}
