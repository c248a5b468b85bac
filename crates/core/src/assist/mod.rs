//! Assist services: insights, optimize, questions
//!
//! Each service composes owner-scoped storage reads with exactly one model
//! call. Model failures and timeouts surface as terminal failure envelopes;
//! nothing here writes entity state, so a cut-off call can never leave a
//! half-updated tide.

pub mod ports;

use chrono::NaiveDate;
use tides_domain::{Result, TideReport, TidesError, UserPreferences};
use tracing::debug;

use std::sync::Arc;

use self::ports::ModelPort;
use crate::context::ContextService;
use crate::preferences::PreferencesService;
use crate::storage::store::TideStore;
use crate::tides::TideService;

/// Timeframe an insights request covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeframe {
    Daily,
    Weekly,
    Monthly,
}

impl Timeframe {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            _ => None,
        }
    }

}

/// Model-backed assistant over the owner's tide history.
#[derive(Clone)]
pub struct AssistService {
    tides: TideService,
    contexts: ContextService,
    preferences: PreferencesService,
    model: Arc<dyn ModelPort>,
}

impl AssistService {
    pub fn new(store: TideStore, model: Arc<dyn ModelPort>) -> Self {
        Self {
            tides: TideService::new(store.clone()),
            contexts: ContextService::new(store.clone()),
            preferences: PreferencesService::new(store),
            model,
        }
    }

    /// Productivity insights for the tide covering (owner, date) in the
    /// requested timeframe. When no tide covers the bucket yet, answers
    /// without spending a model call.
    pub async fn insights(
        &self,
        owner: &str,
        timeframe: Timeframe,
        date: NaiveDate,
    ) -> Result<String> {
        let snapshot = self.contexts.list_contexts(owner, date).await?;
        let tide = match timeframe {
            Timeframe::Daily => snapshot.daily,
            Timeframe::Weekly => snapshot.weekly,
            Timeframe::Monthly => snapshot.monthly,
        };

        let Some(tide) = tide else {
            debug!(owner, ?timeframe, "insights requested for an empty bucket");
            return Ok("No activity recorded for this timeframe yet. Start a flow session and check back.".to_string());
        };

        let report = self.tides.build_report(owner, &tide.id).await?;
        let prompt = format!(
            "You are a productivity coach reviewing a work log.\n\n{}\nOffer two or three concrete insights about this {} period. Be specific and brief.",
            summarize(&report),
            timeframe_label(timeframe),
        );
        self.model.complete(&prompt).await
    }

    /// Schedule suggestions combining the current daily report with the
    /// owner's stored preferences.
    pub async fn optimize(&self, owner: &str, date: NaiveDate) -> Result<String> {
        let snapshot = self.contexts.list_contexts(owner, date).await?;
        let prefs = self.preferences.get(owner).await?;

        let summary = match snapshot.daily {
            Some(tide) => summarize(&self.tides.build_report(owner, &tide.id).await?),
            None => "No sessions recorded today.\n".to_string(),
        };
        let prompt = format!(
            "You are a scheduling assistant.\n\n{summary}\n{}\nSuggest how to structure the rest of the day around these preferences. Be brief.",
            summarize_preferences(&prefs),
        );
        self.model.complete(&prompt).await
    }

    /// Free-form question grounded in the owner's current context buckets.
    pub async fn question(&self, owner: &str, question: &str, date: NaiveDate) -> Result<String> {
        if question.trim().is_empty() {
            return Err(TidesError::Validation("question must not be empty".into()));
        }
        let snapshot = self.contexts.list_contexts(owner, date).await?;

        let mut context_lines = String::new();
        for (label, tide) in [
            ("daily", &snapshot.daily),
            ("weekly", &snapshot.weekly),
            ("monthly", &snapshot.monthly),
        ] {
            match tide {
                Some(t) => context_lines
                    .push_str(&format!("- {label}: '{}' ({})\n", t.name, t.status.as_str())),
                None => context_lines.push_str(&format!("- {label}: none yet\n")),
            }
        }
        for project in &snapshot.projects {
            context_lines.push_str(&format!("- project: '{}'\n", project.name));
        }

        let prompt = format!(
            "You are a productivity assistant. Current context for {}:\n{context_lines}\nQuestion: {}\nAnswer briefly and practically.",
            snapshot.date,
            question.trim(),
        );
        self.model.complete(&prompt).await
    }
}

fn timeframe_label(timeframe: Timeframe) -> &'static str {
    match timeframe {
        Timeframe::Daily => "daily",
        Timeframe::Weekly => "weekly",
        Timeframe::Monthly => "monthly",
    }
}

fn summarize(report: &TideReport) -> String {
    let mut out = format!(
        "Tide '{}' ({}): {} session(s), {} minute(s) of flow.\n",
        report.tide.name,
        report.tide.flow_type,
        report.session_count,
        report.total_session_minutes,
    );
    if let Some(avg) = report.average_energy {
        out.push_str(&format!(
            "Average energy {avg:.1}/10 over {} sample(s).\n",
            report.energy_sample_count
        ));
    }
    if !report.task_links.is_empty() {
        out.push_str(&format!("{} linked task(s).\n", report.task_links.len()));
    }
    out
}

fn summarize_preferences(prefs: &UserPreferences) -> String {
    let mut out = format!(
        "Preferences: {}-minute focus blocks, {} intensity, timezone {}.\n",
        prefs.focus_block_minutes,
        prefs.preferred_intensity.as_str(),
        prefs.timezone,
    );
    if let (Some(start), Some(end)) = (prefs.quiet_hours_start, prefs.quiet_hours_end) {
        out.push_str(&format!("Quiet hours {start:02}:00-{end:02}:00.\n"));
    }
    out
}
