//! IndexedDB record store
//!
//! One database per namespace, one object store per [`Collection`], each keyed
//! by the record's `id` property. Records are stored as plain JavaScript
//! objects (`{ id, schemaVersion, data }`) so they stay readable from the
//! browser's developer tools.
//!
//! Rows without that envelope predate schema versioning: the whole row,
//! serialized to JSON, is returned as a version 0 record.
//!
//! The database is opened on first use. Opening creates any missing object
//! stores, which makes repeated initialization harmless.
//!
//! Writes resolve only once their transaction commits. A request can succeed
//! and its transaction still abort (quota, for one), so request success alone
//! is not reported as a stored record.

use async_trait::async_trait;
use bridge_traits::{
    error::Result as BridgeResult,
    storage::{Collection, RecordStore, StoredRecord},
};
use futures::lock::Mutex;
use js_sys::Array;
use tracing::{debug, info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    IdbDatabase, IdbObjectStore, IdbObjectStoreParameters, IdbOpenDbRequest, IdbRequest,
    IdbTransaction, IdbTransactionMode, IdbVersionChangeEvent,
};

use crate::error::{js_message, WasmError, WasmResult};

/// Browser record store backed by IndexedDB.
pub struct IndexedDbRecordStore {
    name: String,
    db: Mutex<Option<IdbDatabase>>,
}

impl IndexedDbRecordStore {
    /// Database version. Bump when object stores change.
    const DB_VERSION: f64 = 1.0;

    /// Create a store for the database called `name`. Nothing is opened yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            db: Mutex::new(None),
        }
    }

    /// IndexedDB database name.
    pub fn name(&self) -> &str {
        &self.name
    }

    async fn database(&self) -> WasmResult<IdbDatabase> {
        let mut guard = self.db.lock().await;
        if let Some(db) = guard.as_ref() {
            return Ok(db.clone());
        }

        let db = Self::open_database(&self.name).await?;
        *guard = Some(db.clone());
        Ok(db)
    }

    /// Open or create the IndexedDB database
    async fn open_database(name: &str) -> WasmResult<IdbDatabase> {
        let window = web_sys::window()
            .ok_or_else(|| WasmError::NotAvailable("window".to_string()))?;

        let idb_factory = window
            .indexed_db()?
            .ok_or_else(|| WasmError::NotAvailable("IndexedDB".to_string()))?;

        let open_request: IdbOpenDbRequest = idb_factory.open_with_f64(name, Self::DB_VERSION)?;

        let onupgradeneeded = Closure::once(move |event: IdbVersionChangeEvent| {
            let db = event
                .target()
                .and_then(|target| target.dyn_into::<IdbOpenDbRequest>().ok())
                .and_then(|request| request.result().ok())
                .and_then(|result| result.dyn_into::<IdbDatabase>().ok());

            let Some(db) = db else {
                warn!("Upgrade event without a database");
                return;
            };

            for collection in Collection::ALL {
                if db.object_store_names().contains(collection.name()) {
                    continue;
                }
                let options = IdbObjectStoreParameters::new();
                options.set_key_path(&JsValue::from_str("id"));
                if let Err(e) =
                    db.create_object_store_with_optional_parameters(collection.name(), &options)
                {
                    warn!(collection = %collection, error = %js_message(&e), "Failed to create object store");
                }
            }
        });

        open_request.set_onupgradeneeded(Some(onupgradeneeded.as_ref().unchecked_ref()));
        onupgradeneeded.forget();

        let result = JsFuture::from(request_to_promise(&open_request))
            .await
            .map_err(|e| WasmError::IndexedDb(js_message(&e)))?;

        let db = result.dyn_into::<IdbDatabase>().map_err(|_| {
            WasmError::IndexedDb("Failed to cast result to IdbDatabase".to_string())
        })?;

        info!(database = name, "Opened record database");
        Ok(db)
    }

    async fn object_store(
        &self,
        collection: Collection,
        mode: IdbTransactionMode,
    ) -> WasmResult<(IdbTransaction, IdbObjectStore)> {
        let db = self.database().await?;

        let store_names = Array::new();
        store_names.push(&JsValue::from_str(collection.name()));

        let transaction = db.transaction_with_str_sequence_and_mode(&store_names, mode)?;
        let store = transaction.object_store(collection.name())?;
        Ok((transaction, store))
    }

    async fn put_record(&self, collection: Collection, record: &StoredRecord) -> WasmResult<()> {
        let (transaction, store) = self
            .object_store(collection, IdbTransactionMode::Readwrite)
            .await?;
        let committed = transaction_to_promise(&transaction);
        let js_record = serde_wasm_bindgen::to_value(record)?;

        let request = store.put(&js_record)?;
        await_request(&request).await?;
        await_commit(committed).await?;

        debug!(collection = %collection, id = %record.id, "Stored record");
        Ok(())
    }

    async fn get_records(&self, collection: Collection) -> WasmResult<Vec<StoredRecord>> {
        let (_, store) = self
            .object_store(collection, IdbTransactionMode::Readonly)
            .await?;

        let request = store.get_all()?;
        let result = await_request(&request).await?;

        let rows: Array = result
            .dyn_into()
            .map_err(|_| WasmError::IndexedDb("getAll did not return an array".to_string()))?;

        rows.iter().map(record_from_row).collect()
    }

    async fn delete_record(&self, collection: Collection, id: &str) -> WasmResult<()> {
        let (transaction, store) = self
            .object_store(collection, IdbTransactionMode::Readwrite)
            .await?;
        let committed = transaction_to_promise(&transaction);

        let request = store.delete(&JsValue::from_str(id))?;
        await_request(&request).await?;
        await_commit(committed).await?;

        debug!(collection = %collection, id = id, "Deleted record");
        Ok(())
    }
}

#[async_trait(?Send)]
impl RecordStore for IndexedDbRecordStore {
    async fn initialize(&self) -> BridgeResult<()> {
        self.database().await?;
        Ok(())
    }

    async fn put(&self, collection: Collection, record: StoredRecord) -> BridgeResult<()> {
        Ok(self.put_record(collection, &record).await?)
    }

    async fn get_all(&self, collection: Collection) -> BridgeResult<Vec<StoredRecord>> {
        Ok(self.get_records(collection).await?)
    }

    async fn delete(&self, collection: Collection, id: &str) -> BridgeResult<()> {
        Ok(self.delete_record(collection, id).await?)
    }
}

fn record_from_row(row: JsValue) -> WasmResult<StoredRecord> {
    let has_envelope = js_sys::Reflect::get(&row, &JsValue::from_str("schemaVersion"))
        .map(|version| version.as_f64().is_some())
        .unwrap_or(false)
        && js_sys::Reflect::get(&row, &JsValue::from_str("data"))
            .map(|data| data.is_string())
            .unwrap_or(false);
    if has_envelope {
        return Ok(serde_wasm_bindgen::from_value(row)?);
    }

    let id = js_sys::Reflect::get(&row, &JsValue::from_str("id"))?
        .as_string()
        .ok_or_else(|| WasmError::Serialization("record without a string id".to_string()))?;
    let data = js_sys::JSON::stringify(&row)?
        .as_string()
        .ok_or_else(|| WasmError::Serialization(format!("record {} is not JSON", id)))?;
    Ok(StoredRecord::new(id, 0, data))
}

async fn await_request(request: &IdbRequest) -> WasmResult<JsValue> {
    JsFuture::from(request_to_promise(request))
        .await
        .map_err(|e| WasmError::IndexedDb(js_message(&e)))
}

async fn await_commit(committed: js_sys::Promise) -> WasmResult<()> {
    JsFuture::from(committed)
        .await
        .map(|_| ())
        .map_err(|e| WasmError::IndexedDb(js_message(&e)))
}

/// Promise settled by the transaction: resolves on `complete`, rejects on
/// `abort` or `error`. Must be created before the transaction can finish.
fn transaction_to_promise(transaction: &IdbTransaction) -> js_sys::Promise {
    js_sys::Promise::new(&mut |resolve, reject| {
        let oncomplete = Closure::once(move || {
            let _ = resolve.call0(&JsValue::NULL);
        });
        transaction.set_oncomplete(Some(oncomplete.as_ref().unchecked_ref()));
        oncomplete.forget();

        let failure = |fallback: &'static str| {
            let transaction = transaction.clone();
            let reject = reject.clone();
            Closure::once(move || {
                let error = transaction
                    .error()
                    .map(JsValue::from)
                    .unwrap_or_else(|| JsValue::from_str(fallback));
                let _ = reject.call1(&JsValue::NULL, &error);
            })
        };

        let onabort = failure("IndexedDB transaction aborted");
        transaction.set_onabort(Some(onabort.as_ref().unchecked_ref()));
        onabort.forget();

        let onerror = failure("IndexedDB transaction failed");
        transaction.set_onerror(Some(onerror.as_ref().unchecked_ref()));
        onerror.forget();
    })
}

/// Convert an IDB request to a Promise
fn request_to_promise(request: &IdbRequest) -> js_sys::Promise {
    js_sys::Promise::new(&mut |resolve, reject| {
        let request_clone = request.clone();
        let onsuccess = Closure::once(move || {
            let result = request_clone.result().unwrap_or(JsValue::UNDEFINED);
            let _ = resolve.call1(&JsValue::NULL, &result);
        });
        request.set_onsuccess(Some(onsuccess.as_ref().unchecked_ref()));
        onsuccess.forget();

        let request_clone = request.clone();
        let onerror = Closure::once(move || {
            let error = request_clone
                .error()
                .ok()
                .flatten()
                .map(JsValue::from)
                .unwrap_or_else(|| JsValue::from_str("IndexedDB request failed"));
            let _ = reject.call1(&JsValue::NULL, &error);
        });
        request.set_onerror(Some(onerror.as_ref().unchecked_ref()));
        onerror.forget();
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    async fn test_initialize_twice() {
        let store = IndexedDbRecordStore::new("records-init-test");
        store.initialize().await.unwrap();
        store.initialize().await.unwrap();
        assert_eq!(store.name(), "records-init-test");
    }

    #[wasm_bindgen_test]
    async fn test_put_get_delete() {
        let store = IndexedDbRecordStore::new("records-crud-test");
        let record = StoredRecord::new("item-1", 1, r#"{"name":"Etude"}"#);

        store.put(Collection::SheetMusic, record.clone()).await.unwrap();
        let records = store.get_all(Collection::SheetMusic).await.unwrap();
        assert!(records.contains(&record));

        store.delete(Collection::SheetMusic, "item-1").await.unwrap();
        let records = store.get_all(Collection::SheetMusic).await.unwrap();
        assert!(!records.iter().any(|r| r.id == "item-1"));
    }

    #[wasm_bindgen_test]
    async fn test_put_is_visible_to_fresh_store_once_resolved() {
        let record = StoredRecord::new("p-commit", 1, r#"{"name":"Scales"}"#);
        let writer = IndexedDbRecordStore::new("records-commit-test");
        writer.put(Collection::Playlists, record.clone()).await.unwrap();

        let reader = IndexedDbRecordStore::new("records-commit-test");
        let records = reader.get_all(Collection::Playlists).await.unwrap();
        assert!(records.contains(&record));
    }

    #[wasm_bindgen_test]
    fn test_unversioned_row_reads_as_legacy_record() {
        let row = js_sys::JSON::parse(r#"{"id":"old-1","name":"Minuet","pages":[]}"#).unwrap();
        let record = record_from_row(row).unwrap();

        assert_eq!(record.id, "old-1");
        assert_eq!(record.schema_version, 0);
        assert!(record.data.contains(r#""name":"Minuet""#));
    }

    #[wasm_bindgen_test]
    fn test_enveloped_row_reads_unchanged() {
        let record = StoredRecord::new("new-1", 1, r#"{"name":"Minuet"}"#);
        let row = serde_wasm_bindgen::to_value(&record).unwrap();
        assert_eq!(record_from_row(row).unwrap(), record);
    }

    #[wasm_bindgen_test]
    async fn test_aborted_transaction_rejects_commit() {
        let store = IndexedDbRecordStore::new("records-abort-test");
        let (transaction, _) = store
            .object_store(Collection::SheetMusic, IdbTransactionMode::Readwrite)
            .await
            .unwrap();
        let committed = transaction_to_promise(&transaction);

        transaction.abort().unwrap();

        assert!(matches!(
            await_commit(committed).await,
            Err(WasmError::IndexedDb(_))
        ));
    }
}
