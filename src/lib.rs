//! Workspace facade crate.
//!
//! Exposes the feature flags that map onto the individual workspace crates so
//! host shells can depend on `sheetstand` alone. `desktop-shims` wires the
//! SQLite record store, `wasm` wires the IndexedDB store and the JavaScript
//! page rasterizer.

#[cfg(any(feature = "desktop-shims", feature = "wasm"))]
pub use core_service::*;
