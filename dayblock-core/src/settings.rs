//! Scheduler settings: work window, work days, minimum block length, timezone.

use std::collections::BTreeSet;

use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{SettingsError, StorageError};
use crate::slot_finder::WorkWindow;
use crate::storage::Storage;
use crate::task::MAX_DURATION_MINUTES;
use crate::time::format_hhmm;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(with = "crate::time::hhmm")]
    pub work_start: NaiveTime,
    #[serde(with = "crate::time::hhmm")]
    pub work_end: NaiveTime,
    /// 0 = Sunday .. 6 = Saturday.
    pub work_days: BTreeSet<u8>,
    /// Shortest block a placement may occupy.
    pub min_block_minutes: u32,
    #[serde(default = "default_timezone")]
    pub timezone: Tz,
}

fn default_timezone() -> Tz {
    Tz::UTC
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            work_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            work_end: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
            work_days: (1..=5).collect(),
            min_block_minutes: 15,
            timezone: default_timezone(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.work_start >= self.work_end {
            return Err(SettingsError::InvertedWindow {
                start: format_hhmm(self.work_start),
                end: format_hhmm(self.work_end),
            });
        }
        if self.work_days.is_empty() {
            return Err(SettingsError::EmptyWorkDays);
        }
        if let Some(&bad) = self.work_days.iter().find(|d| **d > 6) {
            return Err(SettingsError::InvalidWeekday(bad));
        }
        if !(1..=MAX_DURATION_MINUTES).contains(&self.min_block_minutes) {
            return Err(SettingsError::MinBlockOutOfRange(self.min_block_minutes));
        }
        Ok(())
    }

    /// Minutes a task of `duration` minutes occupies once placed.
    pub fn placement_minutes(&self, duration: u32) -> u32 {
        duration.max(self.min_block_minutes)
    }

    pub fn work_window(&self) -> WorkWindow {
        WorkWindow {
            tz: self.timezone,
            days: self.work_days.clone(),
            start: self.work_start,
            end: self.work_end,
        }
    }
}

/// Parse a weekday list like "1,2,3,4,5" or "1-5".
pub fn parse_work_days(raw: &str) -> Result<BTreeSet<u8>, SettingsError> {
    let mut days = BTreeSet::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let parse = |s: &str| -> Result<u8, SettingsError> {
            let d: u8 = s
                .trim()
                .parse()
                .map_err(|_| SettingsError::InvalidWorkDays(raw.to_string()))?;
            if d > 6 {
                return Err(SettingsError::InvalidWeekday(d));
            }
            Ok(d)
        };
        match part.split_once('-') {
            Some((lo, hi)) => {
                let (lo, hi) = (parse(lo)?, parse(hi)?);
                days.extend(lo..=hi);
            }
            None => {
                days.insert(parse(part)?);
            }
        }
    }
    if days.is_empty() {
        return Err(SettingsError::EmptyWorkDays);
    }
    Ok(days)
}

pub fn parse_timezone(raw: &str) -> Result<Tz, SettingsError> {
    raw.trim()
        .parse()
        .map_err(|_| SettingsError::InvalidTimezone(raw.to_string()))
}

/// Stored settings, or the defaults written back to the store when none exist.
pub async fn load_or_init_settings<S: Storage + ?Sized>(
    storage: &S,
) -> Result<Settings, StorageError> {
    match storage.get_settings().await? {
        Some(settings) => Ok(settings),
        None => storage.upsert_settings(Settings::default()).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn defaults_are_weekday_nine_to_five() {
        let s = Settings::default();
        assert_eq!(format_hhmm(s.work_start), "09:00");
        assert_eq!(format_hhmm(s.work_end), "17:00");
        assert_eq!(s.work_days, BTreeSet::from([1, 2, 3, 4, 5]));
        assert_eq!(s.min_block_minutes, 15);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn rejects_inverted_window_and_empty_days() {
        let mut s = Settings::default();
        s.work_end = s.work_start;
        assert!(matches!(
            s.validate(),
            Err(SettingsError::InvertedWindow { .. })
        ));

        let mut s = Settings::default();
        s.work_days.clear();
        assert_eq!(s.validate(), Err(SettingsError::EmptyWorkDays));

        let mut s = Settings::default();
        s.work_days.insert(7);
        assert_eq!(s.validate(), Err(SettingsError::InvalidWeekday(7)));
    }

    #[test]
    fn json_uses_hhmm_strings() {
        let json = serde_json::to_string(&Settings::default()).unwrap();
        assert!(json.contains("\"work_start\":\"09:00\""));
        assert!(json.contains("\"work_days\":[1,2,3,4,5]"));
        assert!(json.contains("\"timezone\":\"UTC\""));

        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Settings::default());
    }

    #[test]
    fn placement_respects_min_block() {
        let s = Settings::default();
        assert_eq!(s.placement_minutes(5), 15);
        assert_eq!(s.placement_minutes(45), 45);
    }

    #[test]
    fn parses_work_day_lists() {
        assert_eq!(parse_work_days("1-5").unwrap(), BTreeSet::from([1, 2, 3, 4, 5]));
        assert_eq!(parse_work_days("0, 6").unwrap(), BTreeSet::from([0, 6]));
        assert!(parse_work_days("1,9").is_err());
        assert!(parse_work_days("").is_err());
    }

    #[tokio::test]
    async fn missing_settings_are_materialized() {
        let store = MemoryStorage::new();
        assert!(store.get_settings().await.unwrap().is_none());

        let s = load_or_init_settings(&store).await.unwrap();
        assert_eq!(s, Settings::default());
        assert_eq!(store.get_settings().await.unwrap(), Some(Settings::default()));
    }
}
