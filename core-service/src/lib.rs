//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (record store,
//! document converter) into the sheet-music core and exposes the
//! [`AppController`] the interface talks to. Desktop apps typically enable the
//! `desktop-shims` feature (SQLite store from `bridge-desktop`), whereas
//! WebAssembly builds enable the `wasm` feature and rely on the IndexedDB and
//! pdf.js adapters from `bridge-wasm`.

pub mod controller;
pub mod error;
pub mod presenter;
pub mod view;

pub use controller::AppController;
pub use error::{CoreError, Result};
pub use presenter::{ConfirmationRequest, Notice, Presenter};
pub use view::{ImportProgress, PickerEntry, PlaylistPicker, Screen};

pub use core_library::{
    HydratedPlaylist, MembershipOutcome, Playlist, PlaylistId, RemovalOutcome, SheetMusicId,
    SheetMusicItem,
};
pub use core_runtime::config::{CoreConfig, CoreConfigBuilder};
pub use core_runtime::events::{CoreEvent, ImportEvent, LibraryEvent};

use std::sync::Arc;

#[cfg(all(feature = "wasm", target_arch = "wasm32"))]
pub use bridge_wasm::WasmBridgeConfig;
#[cfg(all(feature = "wasm", target_arch = "wasm32"))]
use bridge_wasm::build_wasm_bridges;

/// Build a controller from `config` and load the stored library.
///
/// # Errors
///
/// `LibraryUnavailable` when the store cannot be read.
pub async fn bootstrap(config: CoreConfig, presenter: Arc<dyn Presenter>) -> Result<AppController> {
    let controller = AppController::new(config, presenter);
    controller.start().await?;
    Ok(controller)
}

/// Convenience bootstrapper for WebAssembly hosts.
///
/// ```ignore
/// use core_service::{bootstrap_wasm, WasmBridgeConfig};
///
/// let config = WasmBridgeConfig::new("sheet-music-db");
/// let controller = bootstrap_wasm(config, presenter).await?;
/// let playlists = controller.playlists().await?;
/// ```
#[cfg(all(feature = "wasm", target_arch = "wasm32"))]
pub async fn bootstrap_wasm(
    config: WasmBridgeConfig,
    presenter: Arc<dyn Presenter>,
) -> Result<AppController> {
    let namespace = config.namespace.clone();
    let bridges = build_wasm_bridges(config)
        .await
        .map_err(|err| CoreError::InitializationFailed(err.to_string()))?;

    let core_config = CoreConfig::builder()
        .namespace(namespace)
        .record_store(bridges.record_store())
        .document_converter(bridges.document_converter())
        .build()?;

    bootstrap(core_config, presenter).await
}
