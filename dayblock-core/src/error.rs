//! Error types shared across the core.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Field-level validation failures for tasks, habits and blocks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("title must be non-empty")]
    EmptyTitle,

    #[error("duration must be between 5 and 480 minutes, got {0}")]
    DurationOutOfRange(u32),

    #[error("invalid color '{0}' (expected #RRGGBB)")]
    InvalidColor(String),

    #[error("weekday must be 0..=6, got {0}")]
    InvalidWeekday(u8),

    #[error("interval must end after it starts ({start} .. {end})")]
    EmptyInterval {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("unknown priority '{0}' (expected critical, high, medium or low)")]
    UnknownPriority(String),

    #[error("unknown status '{0}' (expected todo, in_progress or done)")]
    UnknownStatus(String),

    #[error("unknown preferred time '{0}' (expected morning, afternoon or evening)")]
    UnknownPreferredTime(String),
}

/// Rejections for scheduler settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("invalid time of day '{0}' (expected HH:MM)")]
    InvalidTime(String),

    #[error("work window is empty: start {start} is not before end {end}")]
    InvertedWindow { start: String, end: String },

    #[error("at least one work day is required")]
    EmptyWorkDays,

    #[error("weekday must be 0..=6, got {0}")]
    InvalidWeekday(u8),

    #[error("invalid work day list '{0}' (expected e.g. 1,2,3 or 1-5)")]
    InvalidWorkDays(String),

    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("min block minutes must be between 1 and 480, got {0}")]
    MinBlockOutOfRange(u32),
}

/// Failures reported by a [`Storage`](crate::storage::Storage) backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} already exists: {id}")]
    Conflict { kind: &'static str, id: String },

    #[error("invalid record: {0}")]
    Invalid(#[from] ValidationError),

    #[error("invalid settings: {0}")]
    InvalidSettings(#[from] SettingsError),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}

/// A scheduling run that could not complete.
///
/// Placements committed before the failure are kept.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("auto-schedule aborted: {0}")]
    Storage(#[from] StorageError),
}
