//! Error types for WebAssembly bridge implementations

use bridge_traits::error::BridgeError;
use thiserror::Error;
use wasm_bindgen::JsCast;

/// Result type for WebAssembly bridge operations
pub type WasmResult<T> = Result<T, WasmError>;

/// Errors that can occur in WebAssembly bridge implementations
#[derive(Error, Debug)]
pub enum WasmError {
    /// IndexedDB operation failed
    #[error("IndexedDB error: {0}")]
    IndexedDb(String),

    /// JavaScript error from web-sys
    #[error("JavaScript error: {0}")]
    JavaScript(String),

    /// Record could not be converted to or from a JavaScript value
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A host-provided API is missing
    #[error("Not available: {0}")]
    NotAvailable(String),
}

impl From<WasmError> for BridgeError {
    fn from(err: WasmError) -> Self {
        match err {
            WasmError::IndexedDb(msg) => BridgeError::DatabaseError(msg),
            WasmError::NotAvailable(what) => BridgeError::NotAvailable(what),
            other => BridgeError::OperationFailed(other.to_string()),
        }
    }
}

impl From<wasm_bindgen::JsValue> for WasmError {
    fn from(js_value: wasm_bindgen::JsValue) -> Self {
        WasmError::JavaScript(js_message(&js_value))
    }
}

impl From<serde_wasm_bindgen::Error> for WasmError {
    fn from(err: serde_wasm_bindgen::Error) -> Self {
        WasmError::Serialization(err.to_string())
    }
}

/// Best-effort human readable message for a thrown JavaScript value.
pub(crate) fn js_message(js_value: &wasm_bindgen::JsValue) -> String {
    if let Some(msg) = js_value.as_string() {
        msg
    } else if let Some(error) = js_value.dyn_ref::<js_sys::Error>() {
        error.message().into()
    } else if let Some(exception) = js_value.dyn_ref::<web_sys::DomException>() {
        exception.message()
    } else {
        format!("{:?}", js_value)
    }
}
