//! Navigation state. Held in memory only; a reload starts on the library.

use std::sync::Arc;

use core_library::{PlaylistId, SheetMusicId, SheetMusicItem};

/// The active screen. The viewer always carries the item it shows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Library,
    Viewer { item: Arc<SheetMusicItem> },
}

impl Screen {
    pub fn open_item(&self) -> Option<&Arc<SheetMusicItem>> {
        match self {
            Screen::Library => None,
            Screen::Viewer { item } => Some(item),
        }
    }
}

/// Progress of the running import, published after every page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportProgress {
    pub file_name: String,
    pub rendered: usize,
    /// Zero until the converter reported the page count
    pub total: usize,
}

impl ImportProgress {
    /// Completed share in `0.0..=1.0`.
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            self.rendered as f32 / self.total as f32
        }
    }
}

/// One row of the add-to-playlist picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerEntry {
    pub playlist_id: PlaylistId,
    pub name: String,
    /// The item is already a member
    pub contains_item: bool,
}

/// Add-to-playlist picker opened for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistPicker {
    pub item_id: SheetMusicId,
    pub entries: Vec<PickerEntry>,
}

#[derive(Debug, Default)]
pub(crate) struct ViewState {
    pub screen: Screen,
    pub picker_for: Option<SheetMusicId>,
}
