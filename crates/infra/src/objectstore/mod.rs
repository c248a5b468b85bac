//! Filesystem object store backend.
//!
//! One JSON file per record at `<root>/<kind>/<id>.json`. Writes land in a
//! temp file and are renamed into place, so readers never observe a partial
//! document. Used as the staging backend and as the read replica behind the
//! production SQLite primary.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tides_core::{RecordFilter, RecordKind, StorageBackend};
use tides_domain::{Result, TidesError};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Open (and lay out) the store rooted at `root`, one subdirectory per
    /// record kind.
    pub async fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        for kind in RecordKind::ALL {
            fs::create_dir_all(root.join(kind.as_str())).await.map_err(map_io_error)?;
        }
        debug!(root = %root.display(), "object store opened");
        Ok(Self { root })
    }

    fn record_path(&self, kind: RecordKind, id: &str) -> PathBuf {
        self.root.join(kind.as_str()).join(format!("{id}.json"))
    }

    async fn write_document(&self, path: &Path, record: &Value) -> Result<()> {
        let body = serde_json::to_vec_pretty(record)
            .map_err(|e| TidesError::Internal(format!("failed to serialize record: {e}")))?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, body).await.map_err(map_io_error)?;
        fs::rename(&tmp, path).await.map_err(map_io_error)?;
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for FsObjectStore {
    fn name(&self) -> &'static str {
        "object-store"
    }

    async fn put(&self, kind: RecordKind, id: &str, record: Value) -> Result<()> {
        self.write_document(&self.record_path(kind, id), &record).await
    }

    async fn get(&self, kind: RecordKind, id: &str) -> Result<Option<Value>> {
        match fs::read(self.record_path(kind, id)).await {
            Ok(body) => {
                let record = serde_json::from_slice(&body)
                    .map_err(|e| TidesError::Internal(format!("corrupt stored record: {e}")))?;
                Ok(Some(record))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(map_io_error(e)),
        }
    }

    async fn list(&self, kind: RecordKind, filter: &RecordFilter) -> Result<Vec<Value>> {
        let dir = self.root.join(kind.as_str());
        let mut entries = fs::read_dir(&dir).await.map_err(map_io_error)?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(map_io_error)? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        // Filenames are record ids, so path order is id order.
        paths.sort();

        let mut records = Vec::new();
        for path in paths {
            let body = fs::read(&path).await.map_err(map_io_error)?;
            let record: Value = serde_json::from_slice(&body)
                .map_err(|e| TidesError::Internal(format!("corrupt stored record: {e}")))?;
            if filter.matches(&record) {
                records.push(record);
            }
        }
        Ok(records)
    }

    async fn delete(&self, kind: RecordKind, id: &str) -> Result<()> {
        match fs::remove_file(self.record_path(kind, id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(map_io_error(e)),
        }
    }

    async fn create_if_absent(&self, kind: RecordKind, id: &str, record: Value) -> Result<bool> {
        let path = self.record_path(kind, id);
        // create_new gives the atomicity: exactly one concurrent caller wins.
        let mut file = match fs::OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(map_io_error(e)),
        };
        let body = serde_json::to_vec_pretty(&record)
            .map_err(|e| TidesError::Internal(format!("failed to serialize record: {e}")))?;
        file.write_all(&body).await.map_err(map_io_error)?;
        file.flush().await.map_err(map_io_error)?;
        Ok(true)
    }
}

fn map_io_error(err: std::io::Error) -> TidesError {
    TidesError::Unavailable(format!("object store io error: {err}"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    async fn setup() -> (FsObjectStore, TempDir) {
        let temp_dir = TempDir::new().expect("temp dir created");
        let store = FsObjectStore::open(temp_dir.path()).await.expect("store opened");
        (store, temp_dir)
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let (store, _dir) = setup().await;
        let record = json!({"id": "tide-1", "owner": "alice", "flow_type": "daily"});
        store.put(RecordKind::Tide, "tide-1", record.clone()).await.expect("put");
        assert_eq!(store.get(RecordKind::Tide, "tide-1").await.expect("get"), Some(record));
    }

    #[tokio::test]
    async fn absent_key_reads_as_none_and_deletes_quietly() {
        let (store, _dir) = setup().await;
        assert_eq!(store.get(RecordKind::Session, "missing").await.expect("get"), None);
        store.delete(RecordKind::Session, "missing").await.expect("delete");
    }

    #[tokio::test]
    async fn list_applies_the_filter_in_id_order() {
        let (store, _dir) = setup().await;
        store
            .put(RecordKind::Tide, "b", json!({"id": "b", "owner": "alice"}))
            .await
            .expect("put b");
        store
            .put(RecordKind::Tide, "a", json!({"id": "a", "owner": "alice"}))
            .await
            .expect("put a");
        store
            .put(RecordKind::Tide, "c", json!({"id": "c", "owner": "bob"}))
            .await
            .expect("put c");

        let hits = store
            .list(RecordKind::Tide, &RecordFilter::for_owner("alice"))
            .await
            .expect("list");
        let ids: Vec<&str> = hits.iter().filter_map(|r| r["id"].as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn create_if_absent_reports_the_loser() {
        let (store, _dir) = setup().await;
        let first = json!({"id": "p1", "owner": "alice", "theme": "dark"});
        assert!(store
            .create_if_absent(RecordKind::Preference, "p1", first.clone())
            .await
            .expect("first create"));
        assert!(!store
            .create_if_absent(RecordKind::Preference, "p1", json!({"id": "p1", "owner": "alice"}))
            .await
            .expect("second create"));
        assert_eq!(store.get(RecordKind::Preference, "p1").await.expect("get"), Some(first));
    }
}
