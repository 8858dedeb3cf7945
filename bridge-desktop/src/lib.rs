//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `RecordStore` using a SQLite file per namespace (`sqlx`)
//!
//! Document conversion is not provided here; desktop hosts inject their own
//! rasterizer through `CoreConfigBuilder::document_converter`.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::SqliteRecordStore;
//! use bridge_traits::RecordStore;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = SqliteRecordStore::in_data_dir("sheet-music-db").unwrap();
//!     store.initialize().await.unwrap();
//! }
//! ```

mod records;

pub use records::SqliteRecordStore;
