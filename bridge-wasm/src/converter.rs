//! PDF conversion through a host-provided JavaScript renderer.
//!
//! Rasterization stays on the JavaScript side (pdf.js drawing into a canvas);
//! this module only moves bytes across the boundary and maps failures onto
//! [`BridgeError`].
//!
//! # Host Requirements
//!
//! The page must expose a global `sheetMusicConverter` namespace:
//!
//! - `open(bytes: Uint8Array) -> Promise<handle>`; rejects with the reason
//!   the document cannot be read
//! - `pageCount(handle) -> number`
//! - `renderPage(handle, index) -> Promise<{ mimeType: string, data: Uint8Array }>`
//!   with a zero-based `index`
//! - `close(handle)`; releases the parsed document

use async_trait::async_trait;
use bridge_traits::{
    conversion::{DocumentConverter, PageImage, RenderedDocument},
    error::{BridgeError, Result as BridgeResult},
};
use bytes::Bytes;
use js_sys::{Promise, Reflect, Uint8Array};
use tracing::debug;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

use crate::error::{js_message, WasmError, WasmResult};

const NAMESPACE: &str = "sheetMusicConverter";
const DEFAULT_MIME_TYPE: &str = "image/png";

/// [`DocumentConverter`] backed by the page's `sheetMusicConverter` object.
#[derive(Debug, Clone, Copy)]
pub struct JsDocumentConverter;

impl JsDocumentConverter {
    /// Check that the host installed the renderer.
    pub fn new() -> WasmResult<Self> {
        let installed = Reflect::has(&js_sys::global(), &JsValue::from_str(NAMESPACE))?;
        if !installed {
            return Err(WasmError::NotAvailable(format!(
                "global `{}` renderer",
                NAMESPACE
            )));
        }
        Ok(Self)
    }
}

#[async_trait(?Send)]
impl DocumentConverter for JsDocumentConverter {
    async fn open(&self, document: Bytes) -> BridgeResult<Box<dyn RenderedDocument>> {
        let bytes = Uint8Array::from(document.as_ref());

        let promise = converter_open(&bytes).map_err(invalid_document)?;
        let handle = JsFuture::from(promise).await.map_err(invalid_document)?;

        let page_count = converter_page_count(&handle).map_err(invalid_document)?;
        if !page_count.is_finite() || page_count < 0.0 {
            return Err(BridgeError::InvalidDocument(format!(
                "Invalid page count: {}",
                page_count
            )));
        }

        debug!(bytes = document.len(), pages = page_count, "Opened document");
        Ok(Box::new(JsRenderedDocument {
            handle,
            page_count: page_count as usize,
        }))
    }
}

struct JsRenderedDocument {
    handle: JsValue,
    page_count: usize,
}

#[async_trait(?Send)]
impl RenderedDocument for JsRenderedDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    async fn render_page(&mut self, index: usize) -> BridgeResult<PageImage> {
        if index >= self.page_count {
            return Err(BridgeError::OperationFailed(format!(
                "Page {} out of range (document has {})",
                index + 1,
                self.page_count
            )));
        }

        let promise = converter_render_page(&self.handle, index as u32).map_err(invalid_document)?;
        let rendered = JsFuture::from(promise).await.map_err(invalid_document)?;

        page_from_js(&rendered)
    }
}

impl Drop for JsRenderedDocument {
    fn drop(&mut self) {
        let _ = converter_close(&self.handle);
    }
}

fn page_from_js(value: &JsValue) -> BridgeResult<PageImage> {
    let mime_type = Reflect::get(value, &JsValue::from_str("mimeType"))
        .ok()
        .and_then(|v| v.as_string())
        .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());

    let data = Reflect::get(value, &JsValue::from_str("data"))
        .ok()
        .and_then(|v| v.dyn_into::<Uint8Array>().ok())
        .ok_or_else(|| {
            BridgeError::InvalidDocument("Rendered page has no image data".to_string())
        })?;

    Ok(PageImage::new(mime_type, Bytes::from(data.to_vec())))
}

fn invalid_document(err: JsValue) -> BridgeError {
    BridgeError::InvalidDocument(js_message(&err))
}

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(catch, js_namespace = sheetMusicConverter, js_name = open)]
    fn converter_open(document: &Uint8Array) -> Result<Promise, JsValue>;

    #[wasm_bindgen(catch, js_namespace = sheetMusicConverter, js_name = pageCount)]
    fn converter_page_count(handle: &JsValue) -> Result<f64, JsValue>;

    #[wasm_bindgen(catch, js_namespace = sheetMusicConverter, js_name = renderPage)]
    fn converter_render_page(handle: &JsValue, index: u32) -> Result<Promise, JsValue>;

    #[wasm_bindgen(catch, js_namespace = sheetMusicConverter, js_name = close)]
    fn converter_close(handle: &JsValue) -> Result<(), JsValue>;
}
