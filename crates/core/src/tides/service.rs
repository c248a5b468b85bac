//! Tide service - lifecycle state machine and child-record operations
//!
//! States: `active`, `ended`. `create` -> active; `end` is active -> ended
//! and idempotent, except that a second end carrying new closing data is a
//! `Conflict`. There is no path from `ended` back to `active`; callers
//! create a new tide instead. Every operation is a single atomic record
//! write, so an abandoned request never leaves a half-written entity.

use chrono::{NaiveDate, Utc};
use tides_domain::boundaries;
use tides_domain::constants::MAX_SESSION_MINUTES;
use tides_domain::{
    EnergyInput, EnergySample, FlowSession, FlowType, Intensity, ReportFormat, Result, TaskLink,
    Tide, TideReport, TideStatus, TidesError,
};
use tracing::{debug, info};

use super::report::render_report;
use crate::storage::store::TideStore;

/// Core tide operations. Stateless across requests; all durable state
/// round-trips through the storage backend.
#[derive(Clone)]
pub struct TideService {
    store: TideStore,
}

impl TideService {
    pub fn new(store: TideStore) -> Self {
        Self { store }
    }

    /// Create a new tide in the `active` state.
    ///
    /// Daily tides are boundary-tagged with `date` (caller-localized,
    /// defaulting to today in UTC) and honor the one-active-daily-tide
    /// invariant: an active daily tide from a prior day rejects the create
    /// with `PriorDayTideActive`, a same-day one with `Conflict`.
    pub async fn create_tide(
        &self,
        owner: &str,
        name: &str,
        flow_type_raw: &str,
        description: Option<String>,
        date: Option<NaiveDate>,
    ) -> Result<Tide> {
        let flow_type = FlowType::parse(flow_type_raw).ok_or_else(|| {
            TidesError::Validation(format!(
                "flow_type must be one of daily, weekly, monthly, project, seasonal (got '{flow_type_raw}')"
            ))
        })?;
        if name.trim().is_empty() {
            return Err(TidesError::Validation("name must not be empty".into()));
        }

        let mut tide = Tide::new(owner, name.trim(), flow_type);
        tide.description = description;

        if flow_type == FlowType::Daily {
            let date = date.unwrap_or_else(|| Utc::now().date_naive());
            self.check_daily_invariant(owner, date).await?;
            let day = boundaries::canonical(date);
            tide.start_date = Some(day.clone());
            tide.end_date = Some(day);
        }

        self.store.save_tide(&tide).await?;
        info!(owner, tide_id = %tide.id, flow_type = %flow_type, "tide created");
        Ok(tide)
    }

    /// Record one flow session against a tide. Defaults are applied when
    /// fields are omitted: intensity=moderate, duration=25.
    pub async fn add_flow_session(
        &self,
        owner: &str,
        tide_id: &str,
        intensity_raw: Option<&str>,
        duration_minutes: Option<u32>,
        initial_energy: Option<String>,
        work_context: Option<String>,
    ) -> Result<FlowSession> {
        let tide = self.store.get_tide(owner, tide_id).await?;

        let intensity = match intensity_raw {
            Some(raw) => Intensity::parse(raw).ok_or_else(|| {
                TidesError::Validation(format!(
                    "intensity must be one of gentle, moderate, strong (got '{raw}')"
                ))
            })?,
            None => Intensity::default(),
        };
        let duration = duration_minutes.unwrap_or(tides_domain::constants::DEFAULT_SESSION_MINUTES);
        if duration == 0 || duration > MAX_SESSION_MINUTES {
            return Err(TidesError::Validation(format!(
                "duration_minutes must be between 1 and {MAX_SESSION_MINUTES} (got {duration})"
            )));
        }

        let mut session = FlowSession::new(&tide.id, owner);
        session.intensity = intensity;
        session.duration_minutes = duration;
        session.initial_energy = initial_energy;
        session.work_context = work_context;

        self.store.save_session(&session).await?;
        debug!(owner, tide_id, session_id = %session.id, "flow session recorded");
        Ok(session)
    }

    /// Normalize and append an energy sample.
    pub async fn add_energy_sample(
        &self,
        owner: &str,
        tide_id: &str,
        input: &EnergyInput,
        context: Option<String>,
        timezone: Option<String>,
    ) -> Result<EnergySample> {
        let tide = self.store.get_tide(owner, tide_id).await?;

        let mut sample = EnergySample::new(&tide.id, owner, input.normalize());
        sample.context = context;
        if let Some(tz) = timezone {
            sample.timezone = tz;
        }

        self.store.save_energy(&sample).await?;
        debug!(owner, tide_id, level = sample.energy_level, "energy sample recorded");
        Ok(sample)
    }

    /// Attach an external task reference. No dedup: the same URL may be
    /// linked more than once.
    pub async fn link_task(
        &self,
        owner: &str,
        tide_id: &str,
        task_url: &str,
        task_title: &str,
        task_type: Option<String>,
    ) -> Result<TaskLink> {
        let tide = self.store.get_tide(owner, tide_id).await?;

        if task_url.trim().is_empty() {
            return Err(TidesError::Validation("task_url must not be empty".into()));
        }
        if task_title.trim().is_empty() {
            return Err(TidesError::Validation("task_title must not be empty".into()));
        }

        let mut link = TaskLink::new(&tide.id, owner, task_url.trim(), task_title.trim());
        link.task_type = task_type;

        self.store.save_link(&link).await?;
        Ok(link)
    }

    /// Transition a tide to `ended`.
    ///
    /// Idempotent: a bare second end returns the terminal state unchanged.
    /// Supplying a closing summary once the tide is already ended is a
    /// state-machine violation and yields `Conflict`.
    pub async fn end_tide(
        &self,
        owner: &str,
        tide_id: &str,
        closing_summary: Option<String>,
    ) -> Result<Tide> {
        let mut tide = self.store.get_tide(owner, tide_id).await?;

        if tide.status == TideStatus::Ended {
            return if closing_summary.is_none() {
                Ok(tide)
            } else {
                Err(TidesError::Conflict(format!(
                    "tide '{tide_id}' is already ended; create a new tide instead of amending the closed one"
                )))
            };
        }

        tide.status = TideStatus::Ended;
        tide.ended_at = Some(Utc::now());
        tide.closing_summary = closing_summary;
        self.store.save_tide(&tide).await?;
        info!(owner, tide_id, "tide ended");
        Ok(tide)
    }

    /// Owner-initiated purge: hard-delete a tide and its children.
    pub async fn delete_tide(&self, owner: &str, tide_id: &str) -> Result<()> {
        self.store.delete_tide_cascade(owner, tide_id).await?;
        info!(owner, tide_id, "tide purged");
        Ok(())
    }

    /// Aggregate a tide and its children into the requested representation.
    /// Pure read, no mutation.
    pub async fn generate_report(
        &self,
        owner: &str,
        tide_id: &str,
        format: ReportFormat,
    ) -> Result<serde_json::Value> {
        let report = self.build_report(owner, tide_id).await?;
        Ok(render_report(&report, format))
    }

    /// Structured aggregate used by reports and assist prompts.
    pub async fn build_report(&self, owner: &str, tide_id: &str) -> Result<TideReport> {
        let tide = self.store.get_tide(owner, tide_id).await?;
        let sessions = self.store.sessions_for(owner, &tide.id).await?;
        let energy_samples = self.store.energy_for(owner, &tide.id).await?;
        let task_links = self.store.links_for(owner, &tide.id).await?;

        let total_session_minutes = sessions.iter().map(|s| u64::from(s.duration_minutes)).sum();
        let average_energy = if energy_samples.is_empty() {
            None
        } else {
            let sum: u32 = energy_samples.iter().map(|s| u32::from(s.energy_level)).sum();
            Some(f64::from(sum) / energy_samples.len() as f64)
        };

        Ok(TideReport {
            session_count: sessions.len(),
            total_session_minutes,
            energy_sample_count: energy_samples.len(),
            average_energy,
            sessions,
            energy_samples,
            task_links,
            tide,
        })
    }

    async fn check_daily_invariant(&self, owner: &str, date: NaiveDate) -> Result<()> {
        let requested = boundaries::canonical(date);
        let active_daily = self
            .store
            .list_tides(owner, Some(FlowType::Daily), Some(TideStatus::Active))
            .await?;

        for existing in active_daily {
            let Some(start) = existing.start_date.as_deref() else { continue };
            if start < requested.as_str() {
                return Err(TidesError::PriorDayTideActive(format!(
                    "tide '{}' from {start} is still active; end it before starting {requested}",
                    existing.id
                )));
            }
            if start == requested {
                return Err(TidesError::Conflict(format!(
                    "an active daily tide already exists for {requested} (tide '{}')",
                    existing.id
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::storage::memory::MemoryBackend;
    use crate::storage::ports::RecordKind;

    fn service() -> (TideService, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        (TideService::new(TideStore::new(backend.clone())), backend)
    }

    fn date(value: &str) -> NaiveDate {
        boundaries::parse_canonical(value).unwrap()
    }

    #[tokio::test]
    async fn create_succeeds_for_every_flow_type() {
        let (service, _) = service();
        for flow_type in ["daily", "weekly", "monthly", "project", "seasonal"] {
            let tide = service
                .create_tide("alice", &format!("{flow_type} tide"), flow_type, None, None)
                .await
                .unwrap();
            assert_eq!(tide.status, TideStatus::Active);
        }
    }

    #[tokio::test]
    async fn create_rejects_unknown_flow_type() {
        let (service, backend) = service();
        let err =
            service.create_tide("alice", "Bad", "hourly", None, None).await.unwrap_err();
        assert_eq!(err.label(), "validation");
        assert_eq!(backend.count(RecordKind::Tide), 0);
    }

    #[tokio::test]
    async fn prior_day_daily_tide_blocks_new_one() {
        let (service, backend) = service();
        service
            .create_tide("alice", "Yesterday", "daily", None, Some(date("2025-08-29")))
            .await
            .unwrap();

        let err = service
            .create_tide("alice", "Today", "daily", None, Some(date("2025-08-30")))
            .await
            .unwrap_err();
        assert_eq!(err.label(), "prior_day_tide_active");
        // no extra record was created
        assert_eq!(backend.count(RecordKind::Tide), 1);
    }

    #[tokio::test]
    async fn ending_prior_tide_unblocks_the_new_day() {
        let (service, _) = service();
        let yesterday = service
            .create_tide("alice", "Yesterday", "daily", None, Some(date("2025-08-29")))
            .await
            .unwrap();
        service.end_tide("alice", &yesterday.id, None).await.unwrap();

        let today = service
            .create_tide("alice", "Today", "daily", None, Some(date("2025-08-30")))
            .await
            .unwrap();
        assert_eq!(today.start_date.as_deref(), Some("2025-08-30"));
    }

    #[tokio::test]
    async fn same_day_duplicate_daily_is_a_conflict() {
        let (service, _) = service();
        service
            .create_tide("alice", "Today", "daily", None, Some(date("2025-08-30")))
            .await
            .unwrap();
        let err = service
            .create_tide("alice", "Again", "daily", None, Some(date("2025-08-30")))
            .await
            .unwrap_err();
        assert_eq!(err.label(), "conflict");
    }

    #[tokio::test]
    async fn session_defaults_and_validation() {
        let (service, _) = service();
        let tide = service.create_tide("alice", "Focus", "project", None, None).await.unwrap();

        let session = service
            .add_flow_session("alice", &tide.id, None, None, None, None)
            .await
            .unwrap();
        assert_eq!(session.intensity, Intensity::Moderate);
        assert_eq!(session.duration_minutes, 25);

        let err = service
            .add_flow_session("alice", &tide.id, Some("heroic"), None, None, None)
            .await
            .unwrap_err();
        assert_eq!(err.label(), "validation");

        let err = service
            .add_flow_session("alice", &tide.id, None, Some(0), None, None)
            .await
            .unwrap_err();
        assert_eq!(err.label(), "validation");
    }

    #[tokio::test]
    async fn session_on_unknown_tide_is_not_found() {
        let (service, _) = service();
        let err = service
            .add_flow_session("alice", "tide-missing", None, None, None, None)
            .await
            .unwrap_err();
        assert_eq!(err.label(), "not_found");
    }

    #[tokio::test]
    async fn end_tide_is_idempotent_without_closing_data() {
        let (service, _) = service();
        let tide = service.create_tide("alice", "Focus", "project", None, None).await.unwrap();

        let ended = service.end_tide("alice", &tide.id, None).await.unwrap();
        assert_eq!(ended.status, TideStatus::Ended);

        // second bare end is a no-op on the same terminal state
        let again = service.end_tide("alice", &tide.id, None).await.unwrap();
        assert_eq!(again.status, TideStatus::Ended);
        assert_eq!(again.ended_at, ended.ended_at);
    }

    #[tokio::test]
    async fn second_end_with_closing_data_conflicts() {
        let (service, _) = service();
        let tide = service.create_tide("alice", "Focus", "project", None, None).await.unwrap();
        service.end_tide("alice", &tide.id, Some("wrapped up".into())).await.unwrap();

        let err = service
            .end_tide("alice", &tide.id, Some("actually one more thing".into()))
            .await
            .unwrap_err();
        assert_eq!(err.label(), "conflict");
    }

    #[tokio::test]
    async fn report_round_trips_child_records() {
        let (service, _) = service();
        let tide = service.create_tide("alice", "Focus", "project", None, None).await.unwrap();
        let session = service
            .add_flow_session("alice", &tide.id, Some("strong"), Some(50), None, None)
            .await
            .unwrap();
        let sample = service
            .add_energy_sample("alice", &tide.id, &EnergyInput::Label("high".into()), None, None)
            .await
            .unwrap();
        let link = service
            .link_task("alice", &tide.id, "https://example.com/t/9", "Ticket 9", None)
            .await
            .unwrap();

        let report = service.build_report("alice", &tide.id).await.unwrap();
        assert_eq!(report.session_count, 1);
        assert_eq!(report.sessions[0].id, session.id);
        assert_eq!(report.energy_samples[0].id, sample.id);
        assert_eq!(report.energy_samples[0].energy_level, 9);
        assert_eq!(report.task_links[0].id, link.id);
        assert_eq!(report.total_session_minutes, 50);
        assert_eq!(report.average_energy, Some(9.0));

        let json = service
            .generate_report("alice", &tide.id, ReportFormat::Json)
            .await
            .unwrap();
        assert_eq!(json["tide"]["id"], tide.id);
        assert_eq!(json["sessions"][0]["id"], session.id);
    }

    #[tokio::test]
    async fn concurrent_energy_samples_both_persist() {
        let (service, backend) = service();
        let tide = service.create_tide("alice", "Focus", "project", None, None).await.unwrap();

        let level_input = EnergyInput::Level(4.0);
        let label_input = EnergyInput::Label("high".into());
        let first = service.add_energy_sample(
            "alice",
            &tide.id,
            &level_input,
            None,
            None,
        );
        let second = service.add_energy_sample(
            "alice",
            &tide.id,
            &label_input,
            None,
            None,
        );
        let (a, b) = tokio::join!(first, second);
        a.unwrap();
        b.unwrap();

        assert_eq!(backend.count(RecordKind::Energy), 2);
        let report = service.build_report("alice", &tide.id).await.unwrap();
        assert_eq!(report.energy_sample_count, 2);
    }

    #[tokio::test]
    async fn delete_purges_tide_and_children() {
        let (service, backend) = service();
        let tide = service.create_tide("alice", "Focus", "project", None, None).await.unwrap();
        service.add_flow_session("alice", &tide.id, None, None, None, None).await.unwrap();

        service.delete_tide("alice", &tide.id).await.unwrap();
        assert_eq!(backend.count(RecordKind::Tide), 0);
        assert_eq!(backend.count(RecordKind::Session), 0);
    }
}
