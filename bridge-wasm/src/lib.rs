//! WebAssembly Bridge Implementations
//!
//! Browser implementations of the bridge traits defined in `bridge-traits`,
//! built on `web-sys` and `wasm-bindgen`.
//!
//! # Platform Support
//!
//! This crate is designed exclusively for the `wasm32-unknown-unknown` target.
//! It will not compile for native targets.
//!
//! # Implementations
//!
//! - [`IndexedDbRecordStore`]: one IndexedDB database with an object store per
//!   collection (`sheetMusic`, `playlists`)
//! - [`JsDocumentConverter`]: delegates PDF rasterization to a host-provided
//!   JavaScript renderer (pdf.js)
//!
//! # Examples
//!
//! ```ignore
//! use bridge_wasm::{build_wasm_bridges, WasmBridgeConfig};
//!
//! let bridges = build_wasm_bridges(WasmBridgeConfig::new("sheet-music-db")).await?;
//! let store = bridges.record_store();
//! ```

#![cfg(target_arch = "wasm32")]
#![warn(missing_docs)]

pub mod bootstrap;
pub mod converter;
pub mod error;
pub mod records;

// Re-export commonly used types
pub use bootstrap::{build_wasm_bridges, WasmBridgeConfig, WasmBridgeSet};
pub use converter::JsDocumentConverter;
pub use error::{WasmError, WasmResult};
pub use records::IndexedDbRecordStore;
