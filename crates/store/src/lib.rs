//! Document Store: an ordered key/value map persisted to one file per
//! crawl. Values are JSON records or opaque byte blobs stored under a
//! sibling key with a fixed `^bytes` suffix.

use redb::{Database, ReadableTable, TableDefinition};
use serde_json::Value;
use sitecrawler_core::types::BLOB_SUFFIX;
use sitecrawler_core::StoreError;
use std::path::Path;
use std::sync::Mutex;
use tracing::{error, warn};

const TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("documents");

/// Bounded grow-retry envelope matching the original store's
/// doubling-retry-then-fatal behaviour. `redb` itself grows its backing
/// file automatically; this wrapper preserves the same observable
/// retry/fatal contract for any transient write failure.
const MAX_GROW_ATTEMPTS: u32 = 12;

pub struct DocumentStore {
    db: Mutex<Database>,
}

impl DocumentStore {
    /// Opens (creating if absent) the store backing `<data_dir>/<name>.crawl`.
    pub fn open(data_dir: &Path, name: &str) -> Result<Self, StoreError> {
        std::fs::create_dir_all(data_dir)
            .map_err(|e| StoreError::Backend(format!("creating data dir: {e}")))?;
        let path = data_dir.join(format!("{name}.crawl"));
        let db = Database::create(&path)
            .map_err(|e| StoreError::Backend(format!("opening store {path:?}: {e}")))?;
        Ok(DocumentStore { db: Mutex::new(db) })
    }

    fn is_blob_key(key: &str) -> bool {
        key.ends_with(BLOB_SUFFIX)
    }

    fn blob_key(key: &str) -> String {
        format!("{key}{BLOB_SUFFIX}")
    }

    /// Runs `write` inside a transaction, retrying up to
    /// `MAX_GROW_ATTEMPTS` times on backend failure before treating the
    /// store as exhausted. Exhaustion is fatal: it terminates the
    /// process (spec.md §4.1's "failure to grow the backing store is
    /// fatal").
    fn with_write_retry<F>(&self, mut write: F) -> Result<(), StoreError>
    where
        F: FnMut(&redb::WriteTransaction) -> Result<(), StoreError>,
    {
        let db = self.db.lock().expect("store mutex poisoned");
        let mut last_err = None;
        for attempt in 0..MAX_GROW_ATTEMPTS {
            let txn = match db.begin_write() {
                Ok(txn) => txn,
                Err(e) => {
                    last_err = Some(StoreError::Backend(e.to_string()));
                    warn!(attempt, "store write transaction failed, retrying");
                    continue;
                }
            };
            match write(&txn) {
                Ok(()) => {
                    return txn
                        .commit()
                        .map_err(|e| StoreError::Backend(e.to_string()));
                }
                Err(e) => {
                    last_err = Some(e);
                    warn!(attempt, "store write failed, retrying with grown capacity");
                }
            }
        }
        error!("document store exhausted after {} attempts", MAX_GROW_ATTEMPTS);
        // Matches the original's `exit(autogrow_error...)`: capacity
        // exhaustion is unrecoverable and terminates the process.
        std::process::exit(1);
        #[allow(unreachable_code)]
        Err(last_err.unwrap_or(StoreError::Exhausted(MAX_GROW_ATTEMPTS)))
    }

    pub fn put_record(&self, key: &str, record: &Value) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(record)?;
        let key = key.to_string();
        self.with_write_retry(|txn| {
            let mut table = txn
                .open_table(TABLE)
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            table
                .insert(key.as_str(), bytes.as_slice())
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            Ok(())
        })
    }

    /// Writes a `content` record whose `_content` is raw HTML.
    pub fn put_html(&self, key: &str, html: &str, mut fields: Value) -> Result<(), StoreError> {
        let obj = fields.as_object_mut().expect("fields must be a JSON object");
        obj.insert("_content".to_string(), Value::String(html.to_string()));
        obj.insert(
            "content_type".to_string(),
            Value::String("text/html".to_string()),
        );
        obj.insert("type".to_string(), Value::String("content".to_string()));
        self.put_record(key, &fields)
    }

    /// Writes a `content` record with the `"N/A"` placeholder body plus
    /// the raw bytes under the sibling `^bytes` key.
    pub fn put_blob(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
        mut fields: Value,
    ) -> Result<(), StoreError> {
        let obj = fields.as_object_mut().expect("fields must be a JSON object");
        obj.insert("_content".to_string(), Value::String("N/A".to_string()));
        obj.insert(
            "content_type".to_string(),
            Value::String(content_type.to_string()),
        );
        obj.insert("type".to_string(), Value::String("content".to_string()));
        self.put_record(key, &fields)?;

        let blob_key = Self::blob_key(key);
        let owned = bytes.to_vec();
        self.with_write_retry(move |txn| {
            let mut table = txn
                .open_table(TABLE)
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            table
                .insert(blob_key.as_str(), owned.as_slice())
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            Ok(())
        })
    }

    pub fn get_record(&self, key: &str) -> Result<Option<Value>, StoreError> {
        if Self::is_blob_key(key) {
            return Ok(None);
        }
        let db = self.db.lock().expect("store mutex poisoned");
        let txn = db
            .begin_read()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let table = match txn.open_table(TABLE) {
            Ok(t) => t,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(StoreError::Backend(e.to_string())),
        };
        match table
            .get(key)
            .map_err(|e| StoreError::Backend(e.to_string()))?
        {
            Some(v) => Ok(Some(serde_json::from_slice(v.value())?)),
            None => Ok(None),
        }
    }

    pub fn get_blob(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let blob_key = Self::blob_key(key);
        let db = self.db.lock().expect("store mutex poisoned");
        let txn = db
            .begin_read()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let table = match txn.open_table(TABLE) {
            Ok(t) => t,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(StoreError::Backend(e.to_string())),
        };
        match table
            .get(blob_key.as_str())
            .map_err(|e| StoreError::Backend(e.to_string()))?
        {
            Some(v) => Ok(Some(v.value().to_vec())),
            None => Ok(None),
        }
    }

    pub fn set_field(&self, key: &str, name: &str, value: Value) -> Result<(), StoreError> {
        let mut record = self
            .get_record(key)?
            .ok_or_else(|| StoreError::Backend(format!("no record at {key}")))?;
        record
            .as_object_mut()
            .expect("record must be a JSON object")
            .insert(name.to_string(), value);
        self.put_record(key, &record)
    }

    pub fn contains(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.get_record(key)?.is_some() || (Self::is_blob_key(key) && self.get_blob(&key[..key.len() - BLOB_SUFFIX.len()])?.is_some()))
    }

    pub fn delete(&self, key: &str) -> Result<(), StoreError> {
        let key = key.to_string();
        let blob_key = Self::blob_key(&key);
        self.with_write_retry(move |txn| {
            let mut table = txn
                .open_table(TABLE)
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            table
                .remove(key.as_str())
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            table
                .remove(blob_key.as_str())
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            Ok(())
        })
    }

    /// Iterates all (key, record) pairs, skipping blob keys.
    pub fn iterate(&self) -> Result<Vec<(String, Value)>, StoreError> {
        let db = self.db.lock().expect("store mutex poisoned");
        let txn = db
            .begin_read()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let table = match txn.open_table(TABLE) {
            Ok(t) => t,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::Backend(e.to_string())),
        };
        let mut out = Vec::new();
        for entry in table
            .iter()
            .map_err(|e| StoreError::Backend(e.to_string()))?
        {
            let (k, v) = entry.map_err(|e| StoreError::Backend(e.to_string()))?;
            let key = k.value().to_string();
            if Self::is_blob_key(&key) {
                continue;
            }
            out.push((key, serde_json::from_slice(v.value())?));
        }
        Ok(out)
    }

    /// Yields keys of `content`/`redirect`/`error` records whose field
    /// `name` equals `value`, skipping blob keys.
    pub fn filter_records_by_field(
        &self,
        name: &str,
        value: &Value,
    ) -> Result<Vec<String>, StoreError> {
        Ok(self
            .iterate()?
            .into_iter()
            .filter(|(_, record)| record.get(name) == Some(value))
            .map(|(key, _)| key)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn open_tmp() -> (tempfile::TempDir, DocumentStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(dir.path(), "test").unwrap();
        (dir, store)
    }

    #[test]
    fn put_html_then_get_record_round_trips() {
        let (_dir, store) = open_tmp();
        store
            .put_html("http://example.com", "<html></html>", json!({}))
            .unwrap();
        let record = store.get_record("http://example.com").unwrap().unwrap();
        assert_eq!(record["_content"], "<html></html>");
        assert_eq!(record["content_type"], "text/html");
    }

    #[test]
    fn put_blob_stores_sibling_bytes_key() {
        let (_dir, store) = open_tmp();
        store
            .put_blob("http://example.com/f.pdf", b"%PDF-1.4", "application/pdf", json!({}))
            .unwrap();
        let record = store
            .get_record("http://example.com/f.pdf")
            .unwrap()
            .unwrap();
        assert_eq!(record["_content"], "N/A");
        let blob = store.get_blob("http://example.com/f.pdf").unwrap().unwrap();
        assert_eq!(blob, b"%PDF-1.4");
    }

    #[test]
    fn filter_records_by_field_skips_blob_keys() {
        let (_dir, store) = open_tmp();
        store
            .put_blob("http://example.com/f.pdf", b"x", "application/pdf", json!({}))
            .unwrap();
        store
            .put_html("http://example.com/page", "<html></html>", json!({}))
            .unwrap();
        let matches = store
            .filter_records_by_field("content_type", &json!("application/pdf"))
            .unwrap();
        assert_eq!(matches, vec!["http://example.com/f.pdf".to_string()]);
    }

    #[test]
    fn iterate_excludes_blob_keys() {
        let (_dir, store) = open_tmp();
        store
            .put_blob("http://example.com/f.pdf", b"x", "application/pdf", json!({}))
            .unwrap();
        let all: Vec<_> = store.iterate().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].0, "http://example.com/f.pdf");
    }
}
