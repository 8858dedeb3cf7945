//! Presentation collaborator contract.
//!
//! The controller never draws anything. It asks the host to confirm
//! destructive actions and hands it short notices to show; everything else
//! the host reads from the controller's snapshots and the event bus.

use bridge_traits::platform::PlatformSendSync;
use core_library::{PlaylistId, SheetMusicId};

/// A destructive action waiting for the user's go-ahead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationRequest {
    DeletePlaylist { playlist_id: PlaylistId, name: String },
    DeleteItem { item_id: SheetMusicId, name: String },
}

impl ConfirmationRequest {
    pub fn message(&self) -> String {
        match self {
            ConfirmationRequest::DeletePlaylist { name, .. } => {
                format!("Delete playlist \"{}\"? The sheet music in it is kept.", name)
            }
            ConfirmationRequest::DeleteItem { name, .. } => {
                format!("Delete \"{}\" from the library?", name)
            }
        }
    }
}

/// Something the user should be told about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    AddedToPlaylist {
        playlist_name: String,
        item_name: String,
    },
    AlreadyInPlaylist {
        playlist_name: String,
        item_name: String,
    },
    /// The converter rejected the file. `reason` is its message, unedited.
    ImportFailed { file_name: String, reason: String },
    /// A read or write against local storage failed.
    StorageFailed { message: String },
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Notice::AddedToPlaylist {
                playlist_name,
                item_name,
            } => format!("Added \"{}\" to {}", item_name, playlist_name),
            Notice::AlreadyInPlaylist {
                playlist_name,
                item_name,
            } => format!("\"{}\" is already in {}", item_name, playlist_name),
            Notice::ImportFailed { reason, .. } => reason.clone(),
            Notice::StorageFailed { message } => message.clone(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Notice::ImportFailed { .. } | Notice::StorageFailed { .. })
    }
}

/// Host side of the user interface.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait Presenter: PlatformSendSync {
    /// Ask the user to confirm. `false` cancels the action.
    async fn confirm(&self, request: &ConfirmationRequest) -> bool;

    fn notify(&self, notice: Notice);
}
