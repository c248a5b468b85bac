//! Application context wiring services over the selected backend.

use std::sync::Arc;

use tides_core::{
    AssistService, ContextService, ModelPort, PreferencesService, StorageBackend, TideService,
    TideStore,
};
use tides_domain::{Config, Result};
use tides_infra::{DbManager, HttpModelClient, StorageSelector};

/// Shared per-process dependencies, built once at startup and handed to the
/// router as `Arc<AppContext>`.
pub struct AppContext {
    pub config: Config,
    pub tides: TideService,
    pub contexts: ContextService,
    pub preferences: PreferencesService,
    pub assist: AssistService,
    pub backend_name: &'static str,
    db: Option<Arc<DbManager>>,
}

impl AppContext {
    /// Wire services over an explicit backend and model port. Production
    /// startup goes through [`AppContext::from_config`]; tests inject a
    /// memory backend and a scripted model here.
    pub fn new(
        config: Config,
        backend: Arc<dyn StorageBackend>,
        db: Option<Arc<DbManager>>,
        model: Arc<dyn ModelPort>,
    ) -> Self {
        let backend_name = backend.name();
        let store = TideStore::new(backend);
        Self {
            tides: TideService::new(store.clone()),
            contexts: ContextService::new(store.clone()),
            preferences: PreferencesService::new(store.clone()),
            assist: AssistService::new(store, model),
            backend_name,
            db,
            config,
        }
    }

    /// Select the storage stack for `config.storage.environment` and build
    /// the model client, then wire everything together.
    pub async fn from_config(config: Config) -> Result<Self> {
        let selected = StorageSelector::select(&config.storage).await?;
        let model = Arc::new(HttpModelClient::new(&config.model)?);
        Ok(Self::new(config, selected.backend, selected.db, model))
    }

    /// Liveness check: pings the database when the selected stack has one.
    pub fn healthy(&self) -> bool {
        match &self.db {
            Some(db) => db.health_check().is_ok(),
            None => true,
        }
    }
}
