//! Recurring habits and their weekly calendar blocks.
//!
//! Habit blocks are fixed busy time for the scheduler; they are written once
//! per week and never moved or reconciled against each other.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{Days, Duration, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::block::{BlockType, NewTimeBlock};
use crate::error::{StorageError, ValidationError};
use crate::storage::Storage;
use crate::task::validate_duration;
use crate::time::{TimeSlot, is_hex_color, local_instant, start_of_day, weekday_number};

pub const DEFAULT_HABIT_COLOR: &str = "#8B5CF6";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreferredTime {
    #[default]
    Morning,
    Afternoon,
    Evening,
}

impl PreferredTime {
    /// Start used when a habit has no fixed start time.
    pub fn default_start(self) -> NaiveTime {
        let hour = match self {
            PreferredTime::Morning => 8,
            PreferredTime::Afternoon => 13,
            PreferredTime::Evening => 18,
        };
        NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN)
    }
}

impl fmt::Display for PreferredTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PreferredTime::Morning => "morning",
            PreferredTime::Afternoon => "afternoon",
            PreferredTime::Evening => "evening",
        })
    }
}

impl FromStr for PreferredTime {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "morning" => Ok(PreferredTime::Morning),
            "afternoon" => Ok(PreferredTime::Afternoon),
            "evening" => Ok(PreferredTime::Evening),
            other => Err(ValidationError::UnknownPreferredTime(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub id: String,
    pub title: String,
    /// Minutes.
    pub duration: u32,
    #[serde(default)]
    pub preferred_time: PreferredTime,
    /// 0 = Sunday .. 6 = Saturday.
    pub days_of_week: BTreeSet<u8>,
    pub color: String,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Fixed start; overrides `preferred_time`.
    #[serde(default, with = "crate::time::hhmm_opt")]
    pub start_time: Option<NaiveTime>,
}

fn default_active() -> bool {
    true
}

impl Habit {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            duration: 30,
            preferred_time: PreferredTime::Morning,
            days_of_week: (1..=5).collect(),
            color: DEFAULT_HABIT_COLOR.to_string(),
            active: true,
            start_time: None,
        }
    }

    pub fn with_duration(mut self, minutes: u32) -> Self {
        self.duration = minutes;
        self
    }

    pub fn with_days(mut self, days: impl IntoIterator<Item = u8>) -> Self {
        self.days_of_week = days.into_iter().collect();
        self
    }

    pub fn with_preferred_time(mut self, preferred: PreferredTime) -> Self {
        self.preferred_time = preferred;
        self
    }

    pub fn with_start_time(mut self, start: NaiveTime) -> Self {
        self.start_time = Some(start);
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn start_of_day(&self) -> NaiveTime {
        self.start_time
            .unwrap_or_else(|| self.preferred_time.default_start())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        validate_duration(self.duration)?;
        if let Some(&bad) = self.days_of_week.iter().find(|d| **d > 6) {
            return Err(ValidationError::InvalidWeekday(bad));
        }
        if !is_hex_color(&self.color) {
            return Err(ValidationError::InvalidColor(self.color.clone()));
        }
        Ok(())
    }
}

/// Partial update for a stored habit. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HabitPatch {
    pub title: Option<String>,
    pub duration: Option<u32>,
    pub preferred_time: Option<PreferredTime>,
    pub days_of_week: Option<BTreeSet<u8>>,
    pub color: Option<String>,
    pub active: Option<bool>,
    pub start_time: Option<Option<NaiveTime>>,
}

impl HabitPatch {
    pub fn active(active: bool) -> Self {
        Self {
            active: Some(active),
            ..Self::default()
        }
    }

    /// Checks only the fields this patch sets.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(ValidationError::EmptyTitle);
            }
        }
        if let Some(duration) = self.duration {
            validate_duration(duration)?;
        }
        if let Some(&bad) = self
            .days_of_week
            .iter()
            .flatten()
            .find(|d| **d > 6)
        {
            return Err(ValidationError::InvalidWeekday(bad));
        }
        if let Some(color) = &self.color {
            if !is_hex_color(color) {
                return Err(ValidationError::InvalidColor(color.clone()));
            }
        }
        Ok(())
    }

    pub fn apply(&self, habit: &mut Habit) {
        if let Some(title) = &self.title {
            habit.title = title.clone();
        }
        if let Some(duration) = self.duration {
            habit.duration = duration;
        }
        if let Some(preferred) = self.preferred_time {
            habit.preferred_time = preferred;
        }
        if let Some(days) = &self.days_of_week {
            habit.days_of_week = days.clone();
        }
        if let Some(color) = &self.color {
            habit.color = color.clone();
        }
        if let Some(active) = self.active {
            habit.active = active;
        }
        if let Some(start) = self.start_time {
            habit.start_time = start;
        }
    }
}

/// Blocks for `habit` in the Sunday-started week beginning at `week_start`.
///
/// Inactive habits produce nothing.
pub fn habit_blocks_for_week(habit: &Habit, week_start: NaiveDate, tz: Tz) -> Vec<NewTimeBlock> {
    if !habit.active {
        return Vec::new();
    }

    let start = habit.start_of_day();
    let length = Duration::minutes(i64::from(habit.duration));

    (0..7u64)
        .filter_map(|offset| week_start.checked_add_days(Days::new(offset)))
        .filter(|day| habit.days_of_week.contains(&weekday_number(*day)))
        .map(|day| {
            let begin = local_instant(tz, day, start).with_timezone(&Utc);
            NewTimeBlock::for_habit(habit, TimeSlot::new(begin, begin + length))
        })
        .collect()
}

/// Write this week's blocks for every active habit.
///
/// Habit blocks starting inside the week are replaced, so re-running is safe.
/// A block carried over from the previous week is left alone.
/// Returns the number of blocks created.
pub async fn plan_habit_week<S: Storage + ?Sized>(
    storage: &S,
    week_start: NaiveDate,
    tz: Tz,
) -> Result<usize, StorageError> {
    let week_end = week_start
        .checked_add_days(Days::new(7))
        .unwrap_or(NaiveDate::MAX);
    let range_start = start_of_day(tz, week_start).with_timezone(&Utc);
    let range_end = start_of_day(tz, week_end).with_timezone(&Utc);

    let existing = storage.list_time_blocks(range_start, range_end).await?;
    let stale = existing.iter().filter(|b| {
        b.block_type == BlockType::Habit && b.start_time >= range_start && b.start_time < range_end
    });
    for block in stale {
        storage.delete_time_block(&block.id).await?;
    }

    let mut created = 0;
    for habit in storage.list_habits().await? {
        for block in habit_blocks_for_week(&habit, week_start, tz) {
            storage.create_time_block(block).await?;
            created += 1;
        }
    }

    debug!(week = %week_start, created, "planned habit week");
    Ok(created)
}
