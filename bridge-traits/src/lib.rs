//! # Host Bridge Traits
//!
//! Capability contracts between the sheet-music core and the host it runs in.
//!
//! ## Overview
//!
//! The core never talks to IndexedDB, SQLite or pdf.js directly. Each host
//! ships adapters for the traits below and injects them at startup:
//!
//! | Trait | Desktop (`bridge-desktop`) | Web (`bridge-wasm`) |
//! |-------|----------------------------|---------------------|
//! | [`RecordStore`](storage::RecordStore) | `SqliteRecordStore` | `IndexedDbRecordStore` |
//! | [`DocumentConverter`](conversion::DocumentConverter) | host supplied | `JsDocumentConverter` |
//! | [`Clock`](time::Clock) | [`SystemClock`](time::SystemClock) | [`SystemClock`](time::SystemClock) |
//! | [`LoggerSink`](time::LoggerSink) | optional | optional |
//!
//! ## Error Handling
//!
//! Every bridge reports failures through [`BridgeError`](error::BridgeError).
//! Adapters convert their platform errors and keep the message actionable
//! (which store, which collection, which record).
//!
//! ## Thread Safety
//!
//! Native adapters must be `Send + Sync`; on `wasm32` the bounds are relaxed
//! through the markers in [`platform`].

pub mod conversion;
pub mod error;
pub mod platform;
pub mod storage;
pub mod time;

pub use error::BridgeError;

pub use conversion::{DocumentConverter, PageImage, RenderedDocument};
pub use storage::{Collection, MemoryRecordStore, RecordStore, StoredRecord};
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, SystemClock, TickingClock};
