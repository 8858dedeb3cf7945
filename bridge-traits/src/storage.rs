//! Local Record Storage Abstraction
//!
//! The library persists exactly two kinds of records, sheet-music items and
//! playlists, each keyed by its identifier. This module defines the contract
//! every host store fulfils:
//! - Desktop: SQLite tables (`bridge-desktop`)
//! - Web: IndexedDB object stores (`bridge-wasm`)
//! - Tests and throwaway sessions: [`MemoryRecordStore`]
//!
//! Records cross the bridge as opaque [`StoredRecord`] envelopes. The store
//! never looks inside `data`; schema knowledge lives in `core-library`.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};
use crate::platform::PlatformSendSync;

/// Logical collection a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Collection {
    /// Imported documents and their rendered pages
    SheetMusic,
    /// User-defined playlists
    Playlists,
}

impl Collection {
    /// Every collection, in creation order.
    pub const ALL: [Collection; 2] = [Collection::SheetMusic, Collection::Playlists];

    /// Persisted name of the collection (object store / table name).
    pub fn name(&self) -> &'static str {
        match self {
            Collection::SheetMusic => "sheetMusic",
            Collection::Playlists => "playlists",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Envelope written to and read from a [`RecordStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    /// Record key, unique within its collection
    pub id: String,
    /// Version of the schema `data` was written with
    pub schema_version: u32,
    /// Serialized record body (JSON text)
    pub data: String,
}

impl StoredRecord {
    pub fn new(id: impl Into<String>, schema_version: u32, data: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            schema_version,
            data: data.into(),
        }
    }
}

/// Durable key-value storage partitioned into [`Collection`]s.
///
/// # Contract
///
/// - `put` is an upsert: a record with an existing id replaces the old one.
/// - `get_all` returns every record of a collection in no particular order.
/// - `delete` of an absent id succeeds without doing anything.
/// - Storage is created lazily on first access. `initialize` may be called any
///   number of times and never resets existing data.
/// - Every failure is returned to the caller. A store must not report success
///   for a write it did not perform.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::{Collection, RecordStore, StoredRecord};
///
/// async fn save(store: &dyn RecordStore) -> bridge_traits::error::Result<()> {
///     store
///         .put(Collection::Playlists, StoredRecord::new("p-1", 1, "{}"))
///         .await
/// }
/// ```
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait RecordStore: PlatformSendSync {
    /// Create the storage area and its collections if they are missing.
    async fn initialize(&self) -> Result<()>;

    /// Insert or replace a record by id.
    async fn put(&self, collection: Collection, record: StoredRecord) -> Result<()>;

    /// Read every record in a collection.
    async fn get_all(&self, collection: Collection) -> Result<Vec<StoredRecord>>;

    /// Remove a record. Missing ids are ignored.
    async fn delete(&self, collection: Collection, id: &str) -> Result<()>;
}

/// Process-local record store.
///
/// Backs tests and sessions that should leave nothing behind. Contents live
/// as long as the store value does.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    collections: Mutex<HashMap<Collection, BTreeMap<String, StoredRecord>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held in `collection`.
    pub fn len(&self, collection: Collection) -> usize {
        self.collections
            .lock()
            .map(|guard| guard.get(&collection).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: Collection) -> bool {
        self.len(collection) == 0
    }

    fn with_collection<T>(
        &self,
        collection: Collection,
        f: impl FnOnce(&mut BTreeMap<String, StoredRecord>) -> T,
    ) -> Result<T> {
        let mut guard = self
            .collections
            .lock()
            .map_err(|_| BridgeError::DatabaseError("memory store lock poisoned".to_string()))?;
        Ok(f(guard.entry(collection).or_default()))
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
impl RecordStore for MemoryRecordStore {
    async fn initialize(&self) -> Result<()> {
        for collection in Collection::ALL {
            self.with_collection(collection, |_| ())?;
        }
        Ok(())
    }

    async fn put(&self, collection: Collection, record: StoredRecord) -> Result<()> {
        self.with_collection(collection, |records| {
            records.insert(record.id.clone(), record);
        })
    }

    async fn get_all(&self, collection: Collection) -> Result<Vec<StoredRecord>> {
        self.with_collection(collection, |records| records.values().cloned().collect())
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<()> {
        self.with_collection(collection, |records| {
            records.remove(id);
        })
    }
}
