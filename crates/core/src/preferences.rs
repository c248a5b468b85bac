//! Per-owner preferences service
//!
//! Preferences round-trip through storage under their own record kind; a
//! missing record reads as the defaults rather than an error.

use serde::{Deserialize, Serialize};
use tides_domain::{Intensity, Result, TidesError, UserPreferences};
use tracing::info;

use crate::storage::store::TideStore;

/// Partial update applied over the stored (or default) preferences.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreferencesUpdate {
    #[serde(default)]
    pub focus_block_minutes: Option<u32>,
    #[serde(default)]
    pub preferred_intensity: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub quiet_hours_start: Option<u8>,
    #[serde(default)]
    pub quiet_hours_end: Option<u8>,
}

/// Storage-backed preferences for one owner.
#[derive(Clone)]
pub struct PreferencesService {
    store: TideStore,
}

impl PreferencesService {
    pub fn new(store: TideStore) -> Self {
        Self { store }
    }

    /// Stored preferences, or the defaults when the owner has none yet.
    pub async fn get(&self, owner: &str) -> Result<UserPreferences> {
        Ok(self
            .store
            .find_preferences(owner)
            .await?
            .unwrap_or_else(|| UserPreferences::for_owner(owner)))
    }

    /// Apply a partial update and persist the result.
    pub async fn update(&self, owner: &str, update: PreferencesUpdate) -> Result<UserPreferences> {
        let mut prefs = self.get(owner).await?;

        if let Some(minutes) = update.focus_block_minutes {
            if minutes == 0 || minutes > 8 * 60 {
                return Err(TidesError::Validation(format!(
                    "focus_block_minutes must be between 1 and 480 (got {minutes})"
                )));
            }
            prefs.focus_block_minutes = minutes;
        }
        if let Some(raw) = update.preferred_intensity {
            prefs.preferred_intensity = Intensity::parse(&raw).ok_or_else(|| {
                TidesError::Validation(format!(
                    "preferred_intensity must be one of gentle, moderate, strong (got '{raw}')"
                ))
            })?;
        }
        if let Some(timezone) = update.timezone {
            if timezone.trim().is_empty() {
                return Err(TidesError::Validation("timezone must not be empty".into()));
            }
            prefs.timezone = timezone;
        }
        for (label, hour) in [
            ("quiet_hours_start", update.quiet_hours_start),
            ("quiet_hours_end", update.quiet_hours_end),
        ] {
            if let Some(hour) = hour {
                if hour > 23 {
                    return Err(TidesError::Validation(format!(
                        "{label} must be an hour between 0 and 23 (got {hour})"
                    )));
                }
            }
        }
        if let Some(start) = update.quiet_hours_start {
            prefs.quiet_hours_start = Some(start);
        }
        if let Some(end) = update.quiet_hours_end {
            prefs.quiet_hours_end = Some(end);
        }

        self.store.save_preferences(&prefs).await?;
        info!(owner, "preferences updated");
        Ok(prefs)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::storage::memory::MemoryBackend;

    fn service() -> PreferencesService {
        PreferencesService::new(TideStore::new(Arc::new(MemoryBackend::new())))
    }

    #[tokio::test]
    async fn absent_preferences_read_as_defaults() {
        let prefs = service().get("alice").await.unwrap();
        assert_eq!(prefs.focus_block_minutes, 90);
        assert_eq!(prefs.preferred_intensity, Intensity::Moderate);
        assert_eq!(prefs.timezone, "UTC");
    }

    #[tokio::test]
    async fn update_round_trips_through_storage() {
        let service = service();
        let update = PreferencesUpdate {
            focus_block_minutes: Some(50),
            preferred_intensity: Some("strong".into()),
            timezone: Some("Europe/Berlin".into()),
            quiet_hours_start: Some(22),
            quiet_hours_end: Some(7),
        };
        service.update("alice", update).await.unwrap();

        let prefs = service.get("alice").await.unwrap();
        assert_eq!(prefs.focus_block_minutes, 50);
        assert_eq!(prefs.preferred_intensity, Intensity::Strong);
        assert_eq!(prefs.timezone, "Europe/Berlin");
        assert_eq!(prefs.quiet_hours_start, Some(22));
    }

    #[tokio::test]
    async fn invalid_updates_are_rejected() {
        let service = service();
        let err = service
            .update("alice", PreferencesUpdate { focus_block_minutes: Some(0), ..Default::default() })
            .await
            .unwrap_err();
        assert_eq!(err.label(), "validation");

        let err = service
            .update(
                "alice",
                PreferencesUpdate { quiet_hours_start: Some(24), ..Default::default() },
            )
            .await
            .unwrap_err();
        assert_eq!(err.label(), "validation");
    }
}
