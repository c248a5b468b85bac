//! Domain types and models
//!
//! Persisted record shapes follow these definitions exactly; field names and
//! enumerations are part of the wire contract and must round-trip losslessly
//! through any storage backend.

pub mod energy;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use energy::EnergyInput;

use crate::constants::{DEFAULT_FOCUS_BLOCK_MINUTES, DEFAULT_SESSION_MINUTES};

// ============================================================================
// Enumerations
// ============================================================================

/// FlowType: the time scope a tide covers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FlowType {
    Daily,
    Weekly,
    Monthly,
    Project,
    Seasonal,
}

impl FlowType {
    /// Stable string form used in storage filters and wire payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Project => "project",
            Self::Seasonal => "seasonal",
        }
    }

    /// Parse a wire-form flow type, rejecting anything outside the
    /// enumerated set.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            "project" => Some(Self::Project),
            "seasonal" => Some(Self::Seasonal),
            _ => None,
        }
    }
}

impl std::fmt::Display for FlowType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tide lifecycle status. Transitions only `active -> ended`; an ended tide
/// never reactivates, a new tide is created instead.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TideStatus {
    Active,
    Ended,
}

impl TideStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Ended => "ended",
        }
    }
}

/// Flow session intensity
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Intensity {
    Gentle,
    #[default]
    Moderate,
    Strong,
}

impl Intensity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gentle => "gentle",
            Self::Moderate => "moderate",
            Self::Strong => "strong",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "gentle" => Some(Self::Gentle),
            "moderate" => Some(Self::Moderate),
            "strong" => Some(Self::Strong),
            _ => None,
        }
    }
}

/// Report output representation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    #[default]
    Json,
    Text,
    Table,
}

impl ReportFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "json" => Some(Self::Json),
            "text" => Some(Self::Text),
            "table" => Some(Self::Table),
            _ => None,
        }
    }
}

// ============================================================================
// Entities
// ============================================================================

/// A named, typed workflow container.
///
/// Daily/weekly/monthly tides carry the canonical boundary dates they cover
/// (`start_date..end_date`, inclusive, `YYYY-MM-DD`). Project and seasonal
/// tides are not date-bucketed and leave the boundary empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tide {
    pub id: String,
    pub owner: String,
    pub name: String,
    pub flow_type: FlowType,
    pub status: TideStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closing_summary: Option<String>,
}

impl Tide {
    /// Create a new active tide owned by `owner`.
    pub fn new(owner: impl Into<String>, name: impl Into<String>, flow_type: FlowType) -> Self {
        Self {
            id: format!("tide-{}", Uuid::new_v4()),
            owner: owner.into(),
            name: name.into(),
            flow_type,
            status: TideStatus::Active,
            description: None,
            start_date: None,
            end_date: None,
            created_at: Utc::now(),
            ended_at: None,
            closing_summary: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == TideStatus::Active
    }
}

/// One tracked work interval bound to a tide.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlowSession {
    pub id: String,
    pub tide_id: String,
    pub owner: String,
    pub intensity: Intensity,
    pub duration_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_energy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_context: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl FlowSession {
    pub fn new(tide_id: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            id: format!("session-{}", Uuid::new_v4()),
            tide_id: tide_id.into(),
            owner: owner.into(),
            intensity: Intensity::default(),
            duration_minutes: DEFAULT_SESSION_MINUTES,
            initial_energy: None,
            work_context: None,
            started_at: Utc::now(),
        }
    }
}

/// A point-in-time energy reading attached to a tide.
///
/// `energy_level` is always the normalized 1-10 ordinal; the raw
/// number-or-label input never reaches storage (see [`EnergyInput`]).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnergySample {
    pub id: String,
    pub tide_id: String,
    pub owner: String,
    pub energy_level: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub timezone: String,
}

impl EnergySample {
    pub fn new(tide_id: impl Into<String>, owner: impl Into<String>, energy_level: u8) -> Self {
        Self {
            id: format!("energy-{}", Uuid::new_v4()),
            tide_id: tide_id.into(),
            owner: owner.into(),
            energy_level,
            context: None,
            timestamp: Utc::now(),
            timezone: "UTC".to_string(),
        }
    }
}

/// An external task reference attached to a tide. URL uniqueness is not
/// enforced; a tide may link the same task more than once.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskLink {
    pub id: String,
    pub tide_id: String,
    pub owner: String,
    pub task_url: String,
    pub task_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,
    pub linked_at: DateTime<Utc>,
}

impl TaskLink {
    pub fn new(
        tide_id: impl Into<String>,
        owner: impl Into<String>,
        task_url: impl Into<String>,
        task_title: impl Into<String>,
    ) -> Self {
        Self {
            id: format!("tasklink-{}", Uuid::new_v4()),
            tide_id: tide_id.into(),
            owner: owner.into(),
            task_url: task_url.into(),
            task_title: task_title.into(),
            task_type: None,
            linked_at: Utc::now(),
        }
    }
}

/// Per-owner preferences backing the `preferences` service and schedule
/// optimization prompts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserPreferences {
    pub owner: String,
    pub focus_block_minutes: u32,
    pub preferred_intensity: Intensity,
    pub timezone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiet_hours_start: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiet_hours_end: Option<u8>,
}

impl UserPreferences {
    pub fn for_owner(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            focus_block_minutes: DEFAULT_FOCUS_BLOCK_MINUTES,
            preferred_intensity: Intensity::default(),
            timezone: "UTC".to_string(),
            quiet_hours_start: None,
            quiet_hours_end: None,
        }
    }
}

// ============================================================================
// Reports
// ============================================================================

/// Aggregated view of a tide and its child records. Pure read; building a
/// report never mutates stored state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TideReport {
    pub tide: Tide,
    pub session_count: usize,
    pub total_session_minutes: u64,
    pub energy_sample_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_energy: Option<f64>,
    pub sessions: Vec<FlowSession>,
    pub energy_samples: Vec<EnergySample>,
    pub task_links: Vec<TaskLink>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flow_type_parse_rejects_unknown() {
        assert_eq!(FlowType::parse("daily"), Some(FlowType::Daily));
        assert_eq!(FlowType::parse("seasonal"), Some(FlowType::Seasonal));
        assert_eq!(FlowType::parse("hourly"), None);
    }

    #[test]
    fn new_tide_is_active() {
        let tide = Tide::new("owner-1", "Morning focus", FlowType::Daily);
        assert!(tide.is_active());
        assert!(tide.id.starts_with("tide-"));
        assert!(tide.ended_at.is_none());
    }

    #[test]
    fn session_defaults_follow_contract() {
        let session = FlowSession::new("tide-1", "owner-1");
        assert_eq!(session.intensity, Intensity::Moderate);
        assert_eq!(session.duration_minutes, 25);
    }

    #[test]
    fn entities_round_trip_through_json() {
        let sample = EnergySample::new("tide-1", "owner-1", 7);
        let json = serde_json::to_string(&sample).unwrap();
        let back: EnergySample = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample);
    }

    #[test]
    fn flow_type_serializes_snake_case() {
        let json = serde_json::to_value(FlowType::Daily).unwrap();
        assert_eq!(json, "daily");
    }
}
