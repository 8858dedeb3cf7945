//! Convenience helpers for wiring the wasm bridge implementations together.
//!
//! Host shells can use [`build_wasm_bridges`] to construct the record store
//! and the document converter without writing repetitive glue code. The
//! result mirrors the role that the `bridge-desktop` crate plays for native
//! targets.

use std::sync::Arc;

use bridge_traits::{
    conversion::DocumentConverter, error::Result as BridgeResult, storage::RecordStore,
};

use crate::{IndexedDbRecordStore, JsDocumentConverter};

/// Configuration for [`build_wasm_bridges`].
#[derive(Debug, Clone)]
pub struct WasmBridgeConfig {
    /// IndexedDB database name.
    pub namespace: String,
    /// Install a panic hook that forwards panics to the browser console.
    pub panic_hook: bool,
}

impl WasmBridgeConfig {
    /// Create a new config using the provided namespace.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            panic_hook: true,
        }
    }

    /// Disable the console panic hook (the host installs its own).
    pub fn without_panic_hook(mut self) -> Self {
        self.panic_hook = false;
        self
    }
}

impl Default for WasmBridgeConfig {
    fn default() -> Self {
        Self::new("sheet-music-db")
    }
}

/// Constructed wasm bridge objects ready for injection into the core.
pub struct WasmBridgeSet {
    /// IndexedDB-backed record store.
    pub record_store: Arc<dyn RecordStore>,
    /// pdf.js-backed document converter.
    pub document_converter: Arc<dyn DocumentConverter>,
}

impl WasmBridgeSet {
    /// Convenience accessor to clone the record store.
    pub fn record_store(&self) -> Arc<dyn RecordStore> {
        Arc::clone(&self.record_store)
    }

    /// Convenience accessor to clone the document converter.
    pub fn document_converter(&self) -> Arc<dyn DocumentConverter> {
        Arc::clone(&self.document_converter)
    }
}

/// Build the default wasm bridge stack.
///
/// The record store is opened eagerly so that a browser without IndexedDB
/// is reported at startup rather than on the first import.
///
/// # Errors
///
/// `NotAvailable` when IndexedDB or the JavaScript renderer is missing.
pub async fn build_wasm_bridges(config: WasmBridgeConfig) -> BridgeResult<WasmBridgeSet> {
    if config.panic_hook {
        console_error_panic_hook::set_once();
    }

    let store = IndexedDbRecordStore::new(config.namespace);
    store.initialize().await?;

    let record_store: Arc<dyn RecordStore> = Arc::new(store);
    let document_converter: Arc<dyn DocumentConverter> = Arc::new(JsDocumentConverter::new()?);

    Ok(WasmBridgeSet {
        record_store,
        document_converter,
    })
}
