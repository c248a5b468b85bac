//! In-memory storage backend
//!
//! Concurrent map keyed by (kind, id). Serves as the mock backend for the
//! `test` environment and for unit tests across the workspace. Per-key
//! atomicity comes from the map's sharded locking; `create_if_absent` uses
//! the entry API so concurrent first-use converges on one record.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use tides_domain::{Result, TidesError};

use super::ports::{RecordFilter, RecordKind, StorageBackend};

/// In-memory backend over a concurrent map.
#[derive(Default)]
pub struct MemoryBackend {
    records: DashMap<(RecordKind, String), Value>,
    unavailable: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the backend becoming unreachable. Every subsequent call
    /// fails with `Unavailable` until cleared. Used by selector fallback
    /// tests.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of records of a kind, across all owners.
    pub fn count(&self, kind: RecordKind) -> usize {
        self.records.iter().filter(|entry| entry.key().0 == kind).count()
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(TidesError::Unavailable("memory backend marked unreachable".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn put(&self, kind: RecordKind, id: &str, record: Value) -> Result<()> {
        self.check_available()?;
        self.records.insert((kind, id.to_string()), record);
        Ok(())
    }

    async fn get(&self, kind: RecordKind, id: &str) -> Result<Option<Value>> {
        self.check_available()?;
        Ok(self.records.get(&(kind, id.to_string())).map(|entry| entry.value().clone()))
    }

    async fn list(&self, kind: RecordKind, filter: &RecordFilter) -> Result<Vec<Value>> {
        self.check_available()?;
        let mut hits: Vec<(String, Value)> = self
            .records
            .iter()
            .filter(|entry| entry.key().0 == kind && filter.matches(entry.value()))
            .map(|entry| (entry.key().1.clone(), entry.value().clone()))
            .collect();
        hits.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(hits.into_iter().map(|(_, value)| value).collect())
    }

    async fn delete(&self, kind: RecordKind, id: &str) -> Result<()> {
        self.check_available()?;
        self.records.remove(&(kind, id.to_string()));
        Ok(())
    }

    async fn create_if_absent(&self, kind: RecordKind, id: &str, record: Value) -> Result<bool> {
        self.check_available()?;
        match self.records.entry((kind, id.to_string())) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(true)
            }
        }
    }
}
