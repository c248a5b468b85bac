//! Storage backend port
//!
//! Uniform contract implemented by every concrete backend. Records are
//! kind-tagged JSON documents; every write is atomic per record and reads
//! reflect the most recent completed write for that id (linearizable
//! per-key, not cross-key). Key absence is a valid outcome, not an error.

use async_trait::async_trait;
use serde_json::Value;
use tides_domain::{FlowType, Result, TideStatus};

/// Entity kind tag keying every storage operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Tide,
    Session,
    Energy,
    TaskLink,
    Preference,
}

impl RecordKind {
    /// All kinds, in schema order.
    pub const ALL: [Self; 5] =
        [Self::Tide, Self::Session, Self::Energy, Self::TaskLink, Self::Preference];

    /// Stable string form used for table names and object-store directories.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tide => "tide",
            Self::Session => "session",
            Self::Energy => "energy",
            Self::TaskLink => "tasklink",
            Self::Preference => "preference",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filter applied by `list`. Owner scoping is mandatory; the remaining
/// fields narrow by the indexed attributes each kind carries.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub owner: String,
    pub flow_type: Option<FlowType>,
    pub status: Option<TideStatus>,
    pub tide_id: Option<String>,
    pub start_date: Option<String>,
}

impl RecordFilter {
    /// Filter scoped to one owner with no further narrowing.
    pub fn for_owner(owner: impl Into<String>) -> Self {
        Self { owner: owner.into(), ..Self::default() }
    }

    pub fn with_flow_type(mut self, flow_type: FlowType) -> Self {
        self.flow_type = Some(flow_type);
        self
    }

    pub fn with_status(mut self, status: TideStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_tide_id(mut self, tide_id: impl Into<String>) -> Self {
        self.tide_id = Some(tide_id.into());
        self
    }

    pub fn with_start_date(mut self, start_date: impl Into<String>) -> Self {
        self.start_date = Some(start_date.into());
        self
    }

    /// Document-level match used by backends that store whole JSON records
    /// (memory, object store). The SQLite backend expresses the same
    /// predicate through indexed columns.
    pub fn matches(&self, record: &Value) -> bool {
        if record.get("owner").and_then(Value::as_str) != Some(self.owner.as_str()) {
            return false;
        }
        if let Some(flow_type) = self.flow_type {
            if record.get("flow_type").and_then(Value::as_str) != Some(flow_type.as_str()) {
                return false;
            }
        }
        if let Some(status) = self.status {
            if record.get("status").and_then(Value::as_str) != Some(status.as_str()) {
                return false;
            }
        }
        if let Some(tide_id) = &self.tide_id {
            if record.get("tide_id").and_then(Value::as_str) != Some(tide_id.as_str()) {
                return false;
            }
        }
        if let Some(start_date) = &self.start_date {
            if record.get("start_date").and_then(Value::as_str) != Some(start_date.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Uniform persistence contract over kind-tagged records.
///
/// Failure modes: `Unavailable` when the backend is unreachable (the caller
/// may retry against a fallback), `Conflict` for optimistic-concurrency
/// rejections. Absent keys surface as `Ok(None)` from `get`.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Short backend name for selection logs and degraded-read warnings.
    fn name(&self) -> &'static str;

    /// Atomically write one record, replacing any previous version.
    async fn put(&self, kind: RecordKind, id: &str, record: Value) -> Result<()>;

    /// Read the most recent completed write for `id`.
    async fn get(&self, kind: RecordKind, id: &str) -> Result<Option<Value>>;

    /// List records of `kind` matching `filter`, ordered by id.
    async fn list(&self, kind: RecordKind, filter: &RecordFilter) -> Result<Vec<Value>>;

    /// Delete one record. Deleting an absent key is a no-op.
    async fn delete(&self, kind: RecordKind, id: &str) -> Result<()>;

    /// Conditional create closing the find-or-create race: writes the record
    /// only when `id` is absent. Returns `true` when this call created the
    /// record, `false` when it already existed.
    async fn create_if_absent(&self, kind: RecordKind, id: &str, record: Value) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tides_domain::FlowType;

    use super::*;

    #[test]
    fn filter_requires_owner_match() {
        let filter = RecordFilter::for_owner("alice");
        assert!(filter.matches(&json!({"owner": "alice"})));
        assert!(!filter.matches(&json!({"owner": "bob"})));
        assert!(!filter.matches(&json!({})));
    }

    #[test]
    fn filter_narrows_by_flow_type_and_start_date() {
        let filter = RecordFilter::for_owner("alice")
            .with_flow_type(FlowType::Daily)
            .with_start_date("2025-08-30");
        let hit = json!({"owner": "alice", "flow_type": "daily", "start_date": "2025-08-30"});
        let miss = json!({"owner": "alice", "flow_type": "weekly", "start_date": "2025-08-30"});
        assert!(filter.matches(&hit));
        assert!(!filter.matches(&miss));
    }
}
