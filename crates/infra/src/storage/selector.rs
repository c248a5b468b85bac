//! Environment-driven backend selection.
//!
//! The selector runs once at process start and returns the backend stack the
//! rest of the system uses unchanged; no per-call branching. Production pairs
//! the SQLite primary with the object store as a read replica for tide and
//! preference records, so those reads survive a primary outage in degraded
//! mode.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tides_core::{MemoryBackend, RecordFilter, RecordKind, StorageBackend};
use tides_domain::{Environment, Result, StorageConfig, TidesError};
use tracing::{info, warn};

use crate::database::{DbManager, SqliteBackend};
use crate::objectstore::FsObjectStore;

/// Kinds whose reads may be served from the replica.
const READ_REPLICATED: [RecordKind; 2] = [RecordKind::Tide, RecordKind::Preference];

/// Backend stack chosen for this process, plus the database manager when the
/// stack includes SQLite (the health endpoint pings it directly).
pub struct SelectedStorage {
    pub backend: Arc<dyn StorageBackend>,
    pub db: Option<Arc<DbManager>>,
}

pub struct StorageSelector;

impl StorageSelector {
    /// Build the backend stack for `config.environment`.
    pub async fn select(config: &StorageConfig) -> Result<SelectedStorage> {
        let selected = match config.environment {
            Environment::Production => {
                let db = Self::open_database(config)?;
                let primary = Arc::new(SqliteBackend::new(Arc::clone(&db)));
                let replica = Arc::new(Self::open_object_store(config).await?);
                let backend = Arc::new(ReplicatedReads::new(primary, replica));
                SelectedStorage { backend, db: Some(db) }
            }
            Environment::Staging => {
                let backend = Arc::new(Self::open_object_store(config).await?);
                SelectedStorage { backend, db: None }
            }
            Environment::Development => {
                let db = Self::open_database(config)?;
                let backend = Arc::new(SqliteBackend::new(Arc::clone(&db)));
                SelectedStorage { backend, db: Some(db) }
            }
            Environment::Test => {
                SelectedStorage { backend: Arc::new(MemoryBackend::new()), db: None }
            }
        };
        info!(
            environment = %config.environment,
            backend = selected.backend.name(),
            "storage backend selected"
        );
        Ok(selected)
    }

    fn open_database(config: &StorageConfig) -> Result<Arc<DbManager>> {
        let manager = DbManager::new(&config.sqlite_path, config.pool_size)?;
        manager.run_migrations()?;
        Ok(Arc::new(manager))
    }

    async fn open_object_store(config: &StorageConfig) -> Result<FsObjectStore> {
        FsObjectStore::open(&config.object_store_root).await
    }
}

/// Decorator that retries failed reads against a replica.
///
/// Every write goes to the primary; the replica is populated out of band.
/// Only `Unavailable` triggers the fallback, and only for the replicated
/// kinds. Each degraded read is logged so an operator can see the primary is
/// down before clients do.
pub struct ReplicatedReads {
    primary: Arc<dyn StorageBackend>,
    replica: Arc<dyn StorageBackend>,
}

impl ReplicatedReads {
    pub fn new(primary: Arc<dyn StorageBackend>, replica: Arc<dyn StorageBackend>) -> Self {
        Self { primary, replica }
    }

    fn can_fall_back(kind: RecordKind, err: &TidesError) -> bool {
        READ_REPLICATED.contains(&kind) && matches!(err, TidesError::Unavailable(_))
    }
}

#[async_trait]
impl StorageBackend for ReplicatedReads {
    fn name(&self) -> &'static str {
        "replicated"
    }

    async fn put(&self, kind: RecordKind, id: &str, record: Value) -> Result<()> {
        self.primary.put(kind, id, record).await
    }

    async fn get(&self, kind: RecordKind, id: &str) -> Result<Option<Value>> {
        match self.primary.get(kind, id).await {
            Err(err) if Self::can_fall_back(kind, &err) => {
                warn!(
                    %kind,
                    id,
                    replica = self.replica.name(),
                    error = %err,
                    "primary read failed, serving degraded read from replica"
                );
                self.replica.get(kind, id).await
            }
            other => other,
        }
    }

    async fn list(&self, kind: RecordKind, filter: &RecordFilter) -> Result<Vec<Value>> {
        match self.primary.list(kind, filter).await {
            Err(err) if Self::can_fall_back(kind, &err) => {
                warn!(
                    %kind,
                    owner = filter.owner.as_str(),
                    replica = self.replica.name(),
                    error = %err,
                    "primary list failed, serving degraded read from replica"
                );
                self.replica.list(kind, filter).await
            }
            other => other,
        }
    }

    async fn delete(&self, kind: RecordKind, id: &str) -> Result<()> {
        self.primary.delete(kind, id).await
    }

    async fn create_if_absent(&self, kind: RecordKind, id: &str, record: Value) -> Result<bool> {
        self.primary.create_if_absent(kind, id, record).await
    }
}
