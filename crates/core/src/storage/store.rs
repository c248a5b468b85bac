//! Typed store over the storage backend port
//!
//! Serializes domain entities to kind-tagged JSON records and back, and
//! bakes owner scoping into every read. Downstream services never touch raw
//! records or another owner's rows.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tides_domain::{
    EnergySample, FlowSession, FlowType, Result, TaskLink, Tide, TideStatus, TidesError,
    UserPreferences,
};

use super::ports::{RecordFilter, RecordKind, StorageBackend};

/// Typed persistence facade shared by all core services.
#[derive(Clone)]
pub struct TideStore {
    backend: Arc<dyn StorageBackend>,
}

impl TideStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Backend name, surfaced in the coordinator status payload.
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    // ------------------------------------------------------------------
    // Tides
    // ------------------------------------------------------------------

    pub async fn save_tide(&self, tide: &Tide) -> Result<()> {
        self.backend.put(RecordKind::Tide, &tide.id, encode(tide)?).await
    }

    /// Conditional create; returns false when the id already existed.
    pub async fn create_tide_if_absent(&self, tide: &Tide) -> Result<bool> {
        self.backend.create_if_absent(RecordKind::Tide, &tide.id, encode(tide)?).await
    }

    /// Owner-scoped lookup. A tide belonging to a different owner is
    /// indistinguishable from an absent one.
    pub async fn find_tide(&self, owner: &str, tide_id: &str) -> Result<Option<Tide>> {
        match self.backend.get(RecordKind::Tide, tide_id).await? {
            Some(record) => {
                let tide: Tide = decode(record)?;
                Ok((tide.owner == owner).then_some(tide))
            }
            None => Ok(None),
        }
    }

    /// Like [`find_tide`](Self::find_tide) but absence is an error.
    pub async fn get_tide(&self, owner: &str, tide_id: &str) -> Result<Tide> {
        self.find_tide(owner, tide_id)
            .await?
            .ok_or_else(|| TidesError::NotFound(format!("tide '{tide_id}' not found")))
    }

    pub async fn list_tides(
        &self,
        owner: &str,
        flow_type: Option<FlowType>,
        status: Option<TideStatus>,
    ) -> Result<Vec<Tide>> {
        let mut filter = RecordFilter::for_owner(owner);
        filter.flow_type = flow_type;
        filter.status = status;
        decode_all(self.backend.list(RecordKind::Tide, &filter).await?)
    }

    /// Tides of one flow type whose stored boundary starts on `start_date`.
    pub async fn tides_for_boundary(
        &self,
        owner: &str,
        flow_type: FlowType,
        start_date: &str,
    ) -> Result<Vec<Tide>> {
        let filter = RecordFilter::for_owner(owner)
            .with_flow_type(flow_type)
            .with_start_date(start_date);
        decode_all(self.backend.list(RecordKind::Tide, &filter).await?)
    }

    /// Delete a tide and everything it owns. The only hard-delete path;
    /// sessions, energy samples, and task links cascade.
    pub async fn delete_tide_cascade(&self, owner: &str, tide_id: &str) -> Result<()> {
        // confirm ownership before touching children
        let tide = self.get_tide(owner, tide_id).await?;

        for session in self.sessions_for(owner, &tide.id).await? {
            self.backend.delete(RecordKind::Session, &session.id).await?;
        }
        for sample in self.energy_for(owner, &tide.id).await? {
            self.backend.delete(RecordKind::Energy, &sample.id).await?;
        }
        for link in self.links_for(owner, &tide.id).await? {
            self.backend.delete(RecordKind::TaskLink, &link.id).await?;
        }
        self.backend.delete(RecordKind::Tide, &tide.id).await
    }

    // ------------------------------------------------------------------
    // Child records
    // ------------------------------------------------------------------

    pub async fn save_session(&self, session: &FlowSession) -> Result<()> {
        self.backend.put(RecordKind::Session, &session.id, encode(session)?).await
    }

    pub async fn sessions_for(&self, owner: &str, tide_id: &str) -> Result<Vec<FlowSession>> {
        let filter = RecordFilter::for_owner(owner).with_tide_id(tide_id);
        let mut sessions: Vec<FlowSession> =
            decode_all(self.backend.list(RecordKind::Session, &filter).await?)?;
        sessions.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        Ok(sessions)
    }

    pub async fn save_energy(&self, sample: &EnergySample) -> Result<()> {
        self.backend.put(RecordKind::Energy, &sample.id, encode(sample)?).await
    }

    pub async fn energy_for(&self, owner: &str, tide_id: &str) -> Result<Vec<EnergySample>> {
        let filter = RecordFilter::for_owner(owner).with_tide_id(tide_id);
        let mut samples: Vec<EnergySample> =
            decode_all(self.backend.list(RecordKind::Energy, &filter).await?)?;
        samples.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(samples)
    }

    pub async fn save_link(&self, link: &TaskLink) -> Result<()> {
        self.backend.put(RecordKind::TaskLink, &link.id, encode(link)?).await
    }

    pub async fn links_for(&self, owner: &str, tide_id: &str) -> Result<Vec<TaskLink>> {
        let filter = RecordFilter::for_owner(owner).with_tide_id(tide_id);
        let mut links: Vec<TaskLink> =
            decode_all(self.backend.list(RecordKind::TaskLink, &filter).await?)?;
        links.sort_by(|a, b| a.linked_at.cmp(&b.linked_at));
        Ok(links)
    }

    // ------------------------------------------------------------------
    // Preferences
    // ------------------------------------------------------------------

    pub async fn find_preferences(&self, owner: &str) -> Result<Option<UserPreferences>> {
        match self.backend.get(RecordKind::Preference, owner).await? {
            Some(record) => {
                let prefs: UserPreferences = decode(record)?;
                Ok((prefs.owner == owner).then_some(prefs))
            }
            None => Ok(None),
        }
    }

    pub async fn save_preferences(&self, prefs: &UserPreferences) -> Result<()> {
        self.backend.put(RecordKind::Preference, &prefs.owner, encode(prefs)?).await
    }
}

fn encode<T: Serialize>(entity: &T) -> Result<Value> {
    serde_json::to_value(entity)
        .map_err(|e| TidesError::Internal(format!("failed to encode record: {e}")))
}

fn decode<T: DeserializeOwned>(record: Value) -> Result<T> {
    serde_json::from_value(record)
        .map_err(|e| TidesError::Internal(format!("failed to decode record: {e}")))
}

fn decode_all<T: DeserializeOwned>(records: Vec<Value>) -> Result<Vec<T>> {
    records.into_iter().map(decode).collect()
}

#[cfg(test)]
mod tests {
    use tides_domain::FlowType;

    use super::*;
    use crate::storage::memory::MemoryBackend;

    fn store() -> TideStore {
        TideStore::new(Arc::new(MemoryBackend::new()))
    }

    #[tokio::test]
    async fn tide_round_trips_losslessly() {
        let store = store();
        let mut tide = Tide::new("alice", "Deep work", FlowType::Project);
        tide.description = Some("Q3 report".into());

        store.save_tide(&tide).await.unwrap();
        let fetched = store.get_tide("alice", &tide.id).await.unwrap();
        assert_eq!(fetched, tide);
    }

    #[tokio::test]
    async fn cross_owner_reads_surface_as_not_found() {
        let store = store();
        let tide = Tide::new("alice", "Private", FlowType::Daily);
        store.save_tide(&tide).await.unwrap();

        assert!(store.find_tide("mallory", &tide.id).await.unwrap().is_none());
        let err = store.get_tide("mallory", &tide.id).await.unwrap_err();
        assert_eq!(err.label(), "not_found");
    }

    #[tokio::test]
    async fn cascade_delete_removes_children() {
        let store = store();
        let tide = Tide::new("alice", "Today", FlowType::Daily);
        store.save_tide(&tide).await.unwrap();
        store.save_session(&FlowSession::new(&tide.id, "alice")).await.unwrap();
        store.save_energy(&EnergySample::new(&tide.id, "alice", 7)).await.unwrap();
        store
            .save_link(&TaskLink::new(&tide.id, "alice", "https://example.com/t/1", "Ticket"))
            .await
            .unwrap();

        store.delete_tide_cascade("alice", &tide.id).await.unwrap();

        assert!(store.find_tide("alice", &tide.id).await.unwrap().is_none());
        assert!(store.sessions_for("alice", &tide.id).await.unwrap().is_empty());
        assert!(store.energy_for("alice", &tide.id).await.unwrap().is_empty());
        assert!(store.links_for("alice", &tide.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sessions_come_back_ordered_by_start() {
        let store = store();
        let tide = Tide::new("alice", "Today", FlowType::Daily);
        store.save_tide(&tide).await.unwrap();

        let mut late = FlowSession::new(&tide.id, "alice");
        let mut early = FlowSession::new(&tide.id, "alice");
        early.started_at = late.started_at - chrono::Duration::hours(2);
        store.save_session(&late).await.unwrap();
        store.save_session(&early).await.unwrap();

        let sessions = store.sessions_for("alice", &tide.id).await.unwrap();
        assert_eq!(sessions[0].id, early.id);
        assert_eq!(sessions[1].id, late.id);
    }
}
