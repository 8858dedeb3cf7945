//! Integration tests for AppController
//!
//! Drive the controller the way an interface would, with an in-memory store,
//! a scripted converter and a presenter that records what the user saw.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bridge_traits::conversion::{DocumentConverter, PageImage, RenderedDocument};
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::storage::{Collection, MemoryRecordStore, RecordStore, StoredRecord};
use bridge_traits::time::TickingClock;
use bytes::Bytes;
use core_runtime::events::{CoreEvent, ImportEvent, Receiver};
use core_service::{
    AppController, ConfirmationRequest, CoreConfig, CoreError, ImportProgress,
    MembershipOutcome, Notice, PlaylistId, Presenter, RemovalOutcome, Screen,
};
use mockall::mock;
use tokio::sync::watch;

// =============================================================================
// Fakes
// =============================================================================

#[derive(Clone, Default)]
struct ScriptedConverter {
    reject_with: Option<String>,
    fail_at_page: Option<usize>,
}

impl ScriptedConverter {
    fn rejecting(reason: &str) -> Self {
        Self {
            reject_with: Some(reason.to_string()),
            ..Self::default()
        }
    }

    fn failing_at(page: usize) -> Self {
        Self {
            fail_at_page: Some(page),
            ..Self::default()
        }
    }
}

/// Documents are a single byte holding the page count.
#[async_trait]
impl DocumentConverter for ScriptedConverter {
    async fn open(&self, document: Bytes) -> BridgeResult<Box<dyn RenderedDocument>> {
        if let Some(reason) = &self.reject_with {
            return Err(BridgeError::InvalidDocument(reason.clone()));
        }
        Ok(Box::new(ScriptedDocument {
            pages: document.first().copied().unwrap_or(0) as usize,
            fail_at_page: self.fail_at_page,
        }))
    }
}

struct ScriptedDocument {
    pages: usize,
    fail_at_page: Option<usize>,
}

#[async_trait]
impl RenderedDocument for ScriptedDocument {
    fn page_count(&self) -> usize {
        self.pages
    }

    async fn render_page(&mut self, index: usize) -> BridgeResult<PageImage> {
        if self.fail_at_page == Some(index) {
            return Err(BridgeError::InvalidDocument(format!(
                "Page {} is damaged",
                index + 1
            )));
        }
        Ok(PageImage::png(vec![index as u8]))
    }
}

/// Records the published progress each time a page is about to render.
#[derive(Clone, Default)]
struct ProgressWatchingConverter {
    progress: Arc<Mutex<Option<watch::Receiver<Option<ImportProgress>>>>>,
    seen: Arc<Mutex<Vec<(usize, usize)>>>,
}

impl ProgressWatchingConverter {
    fn watch(&self, progress: watch::Receiver<Option<ImportProgress>>) {
        *self.progress.lock().unwrap() = Some(progress);
    }

    fn seen(&self) -> Vec<(usize, usize)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentConverter for ProgressWatchingConverter {
    async fn open(&self, document: Bytes) -> BridgeResult<Box<dyn RenderedDocument>> {
        Ok(Box::new(ProgressWatchingDocument {
            pages: document.first().copied().unwrap_or(0) as usize,
            watcher: self.clone(),
        }))
    }
}

struct ProgressWatchingDocument {
    pages: usize,
    watcher: ProgressWatchingConverter,
}

#[async_trait]
impl RenderedDocument for ProgressWatchingDocument {
    fn page_count(&self) -> usize {
        self.pages
    }

    async fn render_page(&mut self, index: usize) -> BridgeResult<PageImage> {
        let current = self
            .watcher
            .progress
            .lock()
            .unwrap()
            .as_ref()
            .and_then(|progress| progress.borrow().clone());
        if let Some(current) = current {
            assert_eq!(current.file_name, "Suite.pdf");
            self.watcher
                .seen
                .lock()
                .unwrap()
                .push((current.rendered, current.total));
        }
        Ok(PageImage::png(vec![index as u8]))
    }
}

struct RecordingPresenter {
    approve: AtomicBool,
    confirmations: Mutex<Vec<ConfirmationRequest>>,
    notices: Mutex<Vec<Notice>>,
}

impl RecordingPresenter {
    fn new(approve: bool) -> Arc<Self> {
        Arc::new(Self {
            approve: AtomicBool::new(approve),
            confirmations: Mutex::new(Vec::new()),
            notices: Mutex::new(Vec::new()),
        })
    }

    fn set_approve(&self, approve: bool) {
        self.approve.store(approve, Ordering::SeqCst);
    }

    fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    fn confirmations(&self) -> Vec<ConfirmationRequest> {
        self.confirmations.lock().unwrap().clone()
    }
}

#[async_trait]
impl Presenter for RecordingPresenter {
    async fn confirm(&self, request: &ConfirmationRequest) -> bool {
        self.confirmations.lock().unwrap().push(request.clone());
        self.approve.load(Ordering::SeqCst)
    }

    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

mock! {
    pub Store {}

    #[async_trait::async_trait]
    impl RecordStore for Store {
        async fn initialize(&self) -> BridgeResult<()>;
        async fn put(&self, collection: Collection, record: StoredRecord) -> BridgeResult<()>;
        async fn get_all(&self, collection: Collection) -> BridgeResult<Vec<StoredRecord>>;
        async fn delete(&self, collection: Collection, id: &str) -> BridgeResult<()>;
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn controller_with(
    store: Arc<dyn RecordStore>,
    converter: ScriptedConverter,
    presenter: Arc<RecordingPresenter>,
) -> AppController {
    let config = CoreConfig::builder()
        .record_store(store)
        .document_converter(Arc::new(converter))
        .clock(Arc::new(TickingClock::default()))
        .build()
        .unwrap();
    AppController::new(config, presenter)
}

async fn started(
    store: Arc<MemoryRecordStore>,
    presenter: Arc<RecordingPresenter>,
) -> AppController {
    let controller = controller_with(store, ScriptedConverter::default(), presenter);
    controller.start().await.unwrap();
    controller
}

fn pdf(pages: u8) -> Bytes {
    Bytes::from(vec![pages])
}

fn drain(events: &mut Receiver<CoreEvent>) -> Vec<CoreEvent> {
    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }
    received
}

// =============================================================================
// Import
// =============================================================================

#[tokio::test]
async fn test_import_names_item_and_reports_each_page() {
    let controller = started(Arc::new(MemoryRecordStore::new()), RecordingPresenter::new(true)).await;
    let mut events = controller.subscribe_events();
    let progress = controller.import_progress();

    let item = controller
        .import_document("scores/Sonata.pdf", pdf(2))
        .await
        .unwrap();

    assert_eq!(item.name, "Sonata");
    assert_eq!(item.page_count(), 2);
    assert_eq!(item.pages[0], PageImage::png(vec![0u8]));
    assert!(progress.borrow().is_none());

    let rendered: Vec<(usize, usize)> = drain(&mut events)
        .into_iter()
        .filter_map(|event| match event {
            CoreEvent::Import(ImportEvent::PageRendered { page, total, .. }) => Some((page, total)),
            _ => None,
        })
        .collect();
    assert_eq!(rendered, vec![(1, 2), (2, 2)]);
}

#[tokio::test]
async fn test_progress_advances_one_page_at_a_time() {
    let converter = ProgressWatchingConverter::default();
    let config = CoreConfig::builder()
        .record_store(Arc::new(MemoryRecordStore::new()))
        .document_converter(Arc::new(converter.clone()))
        .clock(Arc::new(TickingClock::default()))
        .build()
        .unwrap();
    let controller = AppController::new(config, RecordingPresenter::new(true));
    controller.start().await.unwrap();
    converter.watch(controller.import_progress());

    controller
        .import_document("Suite.pdf", pdf(3))
        .await
        .unwrap();

    assert_eq!(converter.seen(), vec![(0, 3), (1, 3), (2, 3)]);
    assert!(controller.import_progress().borrow().is_none());
}

#[tokio::test]
async fn test_identical_imports_are_separate_items() {
    let controller = started(Arc::new(MemoryRecordStore::new()), RecordingPresenter::new(true)).await;

    let first = controller.import_document("Sonata.pdf", pdf(2)).await.unwrap();
    let second = controller.import_document("Sonata.pdf", pdf(2)).await.unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(controller.library().await.len(), 2);
}

#[tokio::test]
async fn test_rejected_document_shows_reason_and_changes_nothing() {
    let store = Arc::new(MemoryRecordStore::new());
    let presenter = RecordingPresenter::new(true);
    let controller = controller_with(
        store.clone(),
        ScriptedConverter::rejecting("Invalid PDF structure"),
        presenter.clone(),
    );
    controller.start().await.unwrap();

    let err = controller
        .import_document("broken.pdf", pdf(1))
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::Conversion { .. }));
    assert_eq!(err.to_string(), "Invalid PDF structure");
    assert_eq!(
        presenter.notices(),
        vec![Notice::ImportFailed {
            file_name: "broken.pdf".to_string(),
            reason: "Invalid PDF structure".to_string(),
        }]
    );
    assert!(controller.library().await.is_empty());
    assert!(store.is_empty(Collection::SheetMusic));
    assert!(controller.import_progress().borrow().is_none());
}

#[tokio::test]
async fn test_failure_mid_document_persists_nothing() {
    let store = Arc::new(MemoryRecordStore::new());
    let presenter = RecordingPresenter::new(true);
    let controller = controller_with(store.clone(), ScriptedConverter::failing_at(2), presenter.clone());
    controller.start().await.unwrap();

    let err = controller.import_document("Long.pdf", pdf(5)).await.unwrap_err();

    assert_eq!(err.to_string(), "Page 3 is damaged");
    assert!(store.is_empty(Collection::SheetMusic));
    assert!(controller.library().await.is_empty());
}

#[tokio::test]
async fn test_empty_document_is_rejected() {
    let controller = started(Arc::new(MemoryRecordStore::new()), RecordingPresenter::new(true)).await;

    let err = controller.import_document("Blank.pdf", pdf(0)).await.unwrap_err();

    assert!(matches!(err, CoreError::Conversion { .. }));
    assert!(controller.library().await.is_empty());
}

// =============================================================================
// Playlists
// =============================================================================

#[tokio::test]
async fn test_blank_playlist_name_changes_nothing() {
    let controller = started(Arc::new(MemoryRecordStore::new()), RecordingPresenter::new(true)).await;
    let before = controller.playlists().await.unwrap().len();

    assert!(controller.create_playlist("   ").await.unwrap().is_none());

    assert_eq!(controller.playlists().await.unwrap().len(), before);
}

#[tokio::test]
async fn test_playlist_survives_restart() {
    let store = Arc::new(MemoryRecordStore::new());
    {
        let controller = started(store.clone(), RecordingPresenter::new(true)).await;
        controller.create_playlist("Practice").await.unwrap().unwrap();
    }

    let controller = started(store, RecordingPresenter::new(true)).await;
    let playlists = controller.playlists().await.unwrap();

    assert_eq!(playlists.len(), 1);
    assert_eq!(playlists[0].name, "Practice");
    assert!(playlists[0].items.is_empty());
}

#[tokio::test]
async fn test_delete_playlist_requires_confirmation() {
    let presenter = RecordingPresenter::new(false);
    let controller = started(Arc::new(MemoryRecordStore::new()), presenter.clone()).await;
    let item = controller.import_document("Kept.pdf", pdf(1)).await.unwrap();
    let playlist = controller.create_playlist("Doomed").await.unwrap().unwrap();
    controller.add_to_playlist(&playlist.id, &item.id).await.unwrap();

    assert!(!controller.delete_playlist(&playlist.id).await.unwrap());
    assert_eq!(controller.playlists().await.unwrap().len(), 1);
    assert_eq!(
        presenter.confirmations(),
        vec![ConfirmationRequest::DeletePlaylist {
            playlist_id: playlist.id.clone(),
            name: "Doomed".to_string(),
        }]
    );

    presenter.set_approve(true);
    assert!(controller.delete_playlist(&playlist.id).await.unwrap());
    assert!(controller.playlists().await.unwrap().is_empty());
    assert_eq!(controller.library().await.len(), 1);
}

#[tokio::test]
async fn test_add_twice_reports_already_present() {
    let presenter = RecordingPresenter::new(true);
    let controller = started(Arc::new(MemoryRecordStore::new()), presenter.clone()).await;
    let item = controller.import_document("Sonata.pdf", pdf(1)).await.unwrap();
    let playlist = controller.create_playlist("Recital").await.unwrap().unwrap();

    assert!(controller.open_playlist_picker(&item.id).await);
    let first = controller.add_to_playlist(&playlist.id, &item.id).await.unwrap();
    assert!(matches!(first, MembershipOutcome::Added(_)));
    assert!(controller.playlist_picker().await.is_none());

    let second = controller.add_to_playlist(&playlist.id, &item.id).await.unwrap();
    assert!(matches!(second, MembershipOutcome::AlreadyPresent(_)));

    assert_eq!(
        presenter.notices(),
        vec![
            Notice::AddedToPlaylist {
                playlist_name: "Recital".to_string(),
                item_name: "Sonata".to_string(),
            },
            Notice::AlreadyInPlaylist {
                playlist_name: "Recital".to_string(),
                item_name: "Sonata".to_string(),
            },
        ]
    );

    let hydrated = controller.playlists().await.unwrap();
    assert_eq!(hydrated[0].items.len(), 1);
}

#[tokio::test]
async fn test_remove_absent_member_is_noop() {
    let controller = started(Arc::new(MemoryRecordStore::new()), RecordingPresenter::new(true)).await;
    let item = controller.import_document("Etude.pdf", pdf(1)).await.unwrap();
    let playlist = controller.create_playlist("Untouched").await.unwrap().unwrap();
    let before = controller.playlist_manager().get(&playlist.id).await;

    let outcome = controller
        .remove_from_playlist(&playlist.id, &item.id)
        .await
        .unwrap();

    assert_eq!(outcome, RemovalOutcome::NotMember);
    assert_eq!(controller.playlist_manager().get(&playlist.id).await, before);
}

#[tokio::test]
async fn test_picker_marks_existing_membership() {
    let controller = started(Arc::new(MemoryRecordStore::new()), RecordingPresenter::new(true)).await;
    let item = controller.import_document("Waltz.pdf", pdf(1)).await.unwrap();
    let with = controller.create_playlist("With").await.unwrap().unwrap();
    let without = controller.create_playlist("Without").await.unwrap().unwrap();
    controller.add_to_playlist(&with.id, &item.id).await.unwrap();

    assert!(controller.open_playlist_picker(&item.id).await);
    let picker = controller.playlist_picker().await.unwrap();

    let flags: Vec<(PlaylistId, bool)> = picker
        .entries
        .into_iter()
        .map(|entry| (entry.playlist_id, entry.contains_item))
        .collect();
    assert_eq!(flags, vec![(with.id, true), (without.id, false)]);

    controller.dismiss_playlist_picker().await;
    assert!(controller.playlist_picker().await.is_none());
}

// =============================================================================
// Items, hydration and navigation
// =============================================================================

#[tokio::test]
async fn test_deleted_item_disappears_from_playlists_and_viewer() {
    let presenter = RecordingPresenter::new(true);
    let controller = started(Arc::new(MemoryRecordStore::new()), presenter).await;
    let gone = controller.import_document("Gone.pdf", pdf(1)).await.unwrap();
    let kept = controller.import_document("Kept.pdf", pdf(1)).await.unwrap();
    let playlist = controller.create_playlist("Mixed").await.unwrap().unwrap();
    controller.add_to_playlist(&playlist.id, &gone.id).await.unwrap();
    controller.add_to_playlist(&playlist.id, &kept.id).await.unwrap();
    assert!(controller.open_item(&gone.id).await);

    assert!(controller.delete_item(&gone.id).await.unwrap());

    let hydrated = controller.playlists().await.unwrap();
    assert_eq!(hydrated[0].items.len(), 1);
    assert_eq!(hydrated[0].items[0].id, kept.id);
    assert_eq!(controller.screen().await, Screen::Library);

    let stored = controller.playlist_manager().get(&playlist.id).await.unwrap();
    assert_eq!(stored.item_ids.len(), 2);
}

#[tokio::test]
async fn test_viewer_needs_a_known_item() {
    let controller = started(Arc::new(MemoryRecordStore::new()), RecordingPresenter::new(true)).await;
    let item = controller.import_document("Minuet.pdf", pdf(2)).await.unwrap();

    assert!(!controller.open_item(&core_service::SheetMusicId::new()).await);
    assert_eq!(controller.screen().await, Screen::Library);

    assert!(controller.open_item(&item.id).await);
    assert_eq!(controller.screen().await.open_item(), Some(&item));

    controller.close_viewer().await;
    assert_eq!(controller.screen().await, Screen::Library);
}

#[tokio::test]
async fn test_hydration_is_reused_until_state_changes() {
    let controller = started(Arc::new(MemoryRecordStore::new()), RecordingPresenter::new(true)).await;
    let item = controller.import_document("Air.pdf", pdf(1)).await.unwrap();
    let playlist = controller.create_playlist("Cached").await.unwrap().unwrap();

    let first = controller.playlists().await.unwrap();
    let second = controller.playlists().await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    controller.add_to_playlist(&playlist.id, &item.id).await.unwrap();
    let third = controller.playlists().await.unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
    assert_eq!(third[0].items.len(), 1);
}

#[tokio::test]
async fn test_expanded_flags_are_not_persisted() {
    let store = Arc::new(MemoryRecordStore::new());
    let playlist_id = {
        let controller = started(store.clone(), RecordingPresenter::new(true)).await;
        let playlist = controller.create_playlist("Folded").await.unwrap().unwrap();
        assert!(controller.toggle_expanded(&playlist.id).await);
        assert!(controller.is_expanded(&playlist.id).await);
        playlist.id
    };

    let controller = started(store, RecordingPresenter::new(true)).await;
    assert!(!controller.is_expanded(&playlist_id).await);
    assert!(controller.toggle_expanded(&playlist_id).await);
    assert!(!controller.toggle_expanded(&playlist_id).await);
}

// =============================================================================
// Startup
// =============================================================================

#[tokio::test]
async fn test_unreadable_store_is_reported() {
    let mut store = MockStore::new();
    store.expect_initialize().returning(|| Ok(()));
    store
        .expect_get_all()
        .returning(|_| Err(BridgeError::NotAvailable("IndexedDB".to_string())));
    let presenter = RecordingPresenter::new(true);
    let controller = controller_with(Arc::new(store), ScriptedConverter::default(), presenter.clone());

    let err = controller.start().await.unwrap_err();

    assert!(matches!(err, CoreError::LibraryUnavailable(_)));
    assert!(presenter.notices().iter().all(Notice::is_error));
    assert_eq!(presenter.notices().len(), 1);
    assert!(matches!(
        controller.playlists().await,
        Err(CoreError::Library(_))
    ));
}

#[tokio::test]
async fn test_failed_write_is_surfaced() {
    let mut store = MockStore::new();
    store.expect_initialize().returning(|| Ok(()));
    store.expect_get_all().returning(|_| Ok(Vec::new()));
    store
        .expect_put()
        .returning(|_, _| Err(BridgeError::DatabaseError("quota exceeded".to_string())));
    let presenter = RecordingPresenter::new(true);
    let controller = controller_with(Arc::new(store), ScriptedConverter::default(), presenter.clone());
    controller.start().await.unwrap();

    let err = controller.create_playlist("Practice").await.unwrap_err();

    assert!(matches!(err, CoreError::Library(_)));
    assert_eq!(
        presenter.notices(),
        vec![Notice::StorageFailed {
            message: "Storage error: quota exceeded".to_string(),
        }]
    );
    assert!(controller.playlists().await.unwrap().is_empty());
}
