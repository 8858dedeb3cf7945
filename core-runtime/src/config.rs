//! # Core Configuration
//!
//! `CoreConfig` gathers the host capabilities and settings the sheet-music
//! core needs before it can start. It is assembled through
//! [`CoreConfigBuilder`], which fails fast with an actionable message when a
//! required capability was not provided.
//!
//! ## Required capabilities
//!
//! - `RecordStore`: where library items and playlists live. With the
//!   `desktop-shims` feature a SQLite store is created automatically.
//! - `DocumentConverter`: PDF rasterizer. There is no default; every host
//!   brings its own (pdf.js on the web).
//!
//! ## Optional
//!
//! - `Clock` (defaults to the system clock)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .namespace("sheet-music-db")
//!     .record_store(Arc::new(MemoryRecordStore::new()))
//!     .document_converter(Arc::new(MyPdfRenderer))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{Clock, DocumentConverter, RecordStore, SystemClock};
use std::path::PathBuf;
use std::sync::Arc;

/// Store name used when the host does not pick one.
pub const DEFAULT_NAMESPACE: &str = "sheet-music-db";

/// Validated configuration for the sheet-music core.
#[derive(Clone)]
pub struct CoreConfig {
    /// Name of the local database (IndexedDB name, SQLite file stem)
    pub namespace: String,

    /// Explicit SQLite file location (desktop only)
    pub database_path: Option<PathBuf>,

    /// Buffer size of the event bus
    pub event_buffer_size: usize,

    pub record_store: Arc<dyn RecordStore>,

    pub document_converter: Arc<dyn DocumentConverter>,

    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("namespace", &self.namespace)
            .field("database_path", &self.database_path)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("record_store", &"<RecordStore>")
            .field("document_converter", &"<DocumentConverter>")
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }
}

/// Builder for [`CoreConfig`].
pub struct CoreConfigBuilder {
    namespace: String,
    database_path: Option<PathBuf>,
    event_buffer_size: usize,
    record_store: Option<Arc<dyn RecordStore>>,
    document_converter: Option<Arc<dyn DocumentConverter>>,
    clock: Option<Arc<dyn Clock>>,
}

impl Default for CoreConfigBuilder {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            database_path: None,
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
            record_store: None,
            document_converter: None,
            clock: None,
        }
    }
}

impl CoreConfigBuilder {
    /// Name of the local database.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// SQLite file used by the default desktop store.
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = size;
        self
    }

    pub fn record_store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.record_store = Some(store);
        self
    }

    pub fn document_converter(mut self, converter: Arc<dyn DocumentConverter>) -> Self {
        self.document_converter = Some(converter);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Validate and produce the configuration.
    ///
    /// # Errors
    ///
    /// - `Error::Config` for a blank namespace or a zero event buffer
    /// - `Error::CapabilityMissing` when no record store or document
    ///   converter is available
    pub fn build(self) -> Result<CoreConfig> {
        let namespace = self.namespace.trim().to_string();
        if namespace.is_empty() {
            return Err(Error::Config("namespace cannot be empty".to_string()));
        }
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "event_buffer_size must be greater than zero".to_string(),
            ));
        }

        let record_store = match self.record_store {
            Some(store) => store,
            None => default_record_store(&namespace, self.database_path.as_ref())?,
        };

        let document_converter =
            self.document_converter
                .ok_or_else(|| Error::CapabilityMissing {
                    capability: "DocumentConverter".to_string(),
                    message: "No PDF rasterizer provided. \
                              Web: use bridge_wasm::JsDocumentConverter. \
                              Native: inject a DocumentConverter implementation."
                        .to_string(),
                })?;

        Ok(CoreConfig {
            namespace,
            database_path: self.database_path,
            event_buffer_size: self.event_buffer_size,
            record_store,
            document_converter,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        })
    }
}

#[cfg(all(feature = "desktop-shims", not(target_arch = "wasm32")))]
fn default_record_store(
    namespace: &str,
    database_path: Option<&PathBuf>,
) -> Result<Arc<dyn RecordStore>> {
    use bridge_desktop::SqliteRecordStore;

    let store = match database_path {
        Some(path) => SqliteRecordStore::new(path.clone()),
        None => SqliteRecordStore::in_data_dir(namespace)
            .map_err(|e| Error::Config(format!("cannot locate data directory: {}", e)))?,
    };
    Ok(Arc::new(store))
}

#[cfg(not(all(feature = "desktop-shims", not(target_arch = "wasm32"))))]
fn default_record_store(
    _namespace: &str,
    _database_path: Option<&PathBuf>,
) -> Result<Arc<dyn RecordStore>> {
    Err(Error::CapabilityMissing {
        capability: "RecordStore".to_string(),
        message: "No record store provided. \
                  Desktop: enable the `desktop-shims` feature. \
                  Web: use bridge_wasm::IndexedDbRecordStore."
            .to_string(),
    })
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::{MemoryRecordStore, RenderedDocument};
    use bytes::Bytes;

    struct RejectingConverter;

    #[async_trait]
    impl DocumentConverter for RejectingConverter {
        async fn open(&self, _document: Bytes) -> BridgeResult<Box<dyn RenderedDocument>> {
            Err(BridgeError::InvalidDocument("not a PDF".to_string()))
        }
    }

    fn complete_builder() -> CoreConfigBuilder {
        CoreConfig::builder()
            .record_store(Arc::new(MemoryRecordStore::new()))
            .document_converter(Arc::new(RejectingConverter))
    }

    #[test]
    fn test_defaults() {
        let config = complete_builder().build().unwrap();
        assert_eq!(config.namespace, DEFAULT_NAMESPACE);
        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
        assert!(config.database_path.is_none());
    }

    #[test]
    fn test_namespace_is_trimmed() {
        let config = complete_builder().namespace("  scores  ").build().unwrap();
        assert_eq!(config.namespace, "scores");
    }

    #[test]
    fn test_blank_namespace_rejected() {
        let result = complete_builder().namespace("   ").build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_zero_buffer_rejected() {
        let result = complete_builder().event_buffer_size(0).build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_missing_converter() {
        let result = CoreConfig::builder()
            .record_store(Arc::new(MemoryRecordStore::new()))
            .build();

        match result {
            Err(Error::CapabilityMissing { capability, .. }) => {
                assert_eq!(capability, "DocumentConverter")
            }
            other => panic!("expected CapabilityMissing, got {:?}", other.map(|_| ())),
        }
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_missing_store_without_shims() {
        let result = CoreConfig::builder()
            .document_converter(Arc::new(RejectingConverter))
            .build();

        assert!(matches!(
            result,
            Err(Error::CapabilityMissing { ref capability, .. }) if capability == "RecordStore"
        ));
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_desktop_shims_supply_store() {
        let dir = std::env::temp_dir().join("core-runtime-config-test.db");
        let config = CoreConfig::builder()
            .database_path(&dir)
            .document_converter(Arc::new(RejectingConverter))
            .build()
            .unwrap();
        assert_eq!(config.database_path.as_deref(), Some(dir.as_path()));
    }
}
