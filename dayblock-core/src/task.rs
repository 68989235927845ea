//! Task model consumed by the auto-scheduler.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::time::{TimeSlot, is_hex_color};

pub const MIN_DURATION_MINUTES: u32 = 5;
pub const MAX_DURATION_MINUTES: u32 = 480;
pub const DEFAULT_TASK_COLOR: &str = "#3B82F6";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "todo" => Ok(TaskStatus::Todo),
            "in_progress" | "in-progress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            other => Err(ValidationError::UnknownStatus(other.to_string())),
        }
    }
}

/// Task priority. Stored as a lowercase string.
///
/// Parsing user input is strict; deserializing stored records is lenient and
/// maps unrecognized values to `Medium`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum Priority {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Sort rank: lower is placed first.
    pub fn rank(self) -> u8 {
        match self {
            Priority::Critical => 0,
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "critical" => Ok(Priority::Critical),
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(ValidationError::UnknownPriority(other.to_string())),
        }
    }
}

impl From<String> for Priority {
    fn from(s: String) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl From<Priority> for &'static str {
    fn from(p: Priority) -> Self {
        p.as_str()
    }
}

/// A unit of work the scheduler can place on the calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,

    /// Minutes, 5..=480.
    pub duration: u32,

    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,

    /// Set together with `scheduled_end` once the task is placed.
    #[serde(default)]
    pub scheduled_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scheduled_end: Option<DateTime<Utc>>,

    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default = "default_task_color")]
    pub color: String,
}

fn default_task_color() -> String {
    DEFAULT_TASK_COLOR.to_string()
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            priority: Priority::Medium,
            duration: 30,
            deadline: None,
            scheduled_start: None,
            scheduled_end: None,
            status: TaskStatus::Todo,
            color: default_task_color(),
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_duration(mut self, minutes: u32) -> Self {
        self.duration = minutes;
        self
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn with_schedule(mut self, slot: TimeSlot) -> Self {
        self.scheduled_start = Some(slot.start);
        self.scheduled_end = Some(slot.end);
        self
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduled_start.is_some()
    }

    pub fn scheduled_slot(&self) -> Option<TimeSlot> {
        match (self.scheduled_start, self.scheduled_end) {
            (Some(start), Some(end)) => Some(TimeSlot::new(start, end)),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        validate_duration(self.duration)?;
        if !is_hex_color(&self.color) {
            return Err(ValidationError::InvalidColor(self.color.clone()));
        }
        if let Some(slot) = self.scheduled_slot() {
            if slot.is_empty() {
                return Err(ValidationError::EmptyInterval {
                    start: slot.start,
                    end: slot.end,
                });
            }
        }
        Ok(())
    }
}

pub(crate) fn validate_duration(minutes: u32) -> Result<(), ValidationError> {
    if (MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&minutes) {
        Ok(())
    } else {
        Err(ValidationError::DurationOutOfRange(minutes))
    }
}

/// Partial update for a stored task. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub priority: Option<Priority>,
    pub duration: Option<u32>,
    pub deadline: Option<Option<DateTime<Utc>>>,
    /// `Some(None)` clears the schedule.
    pub schedule: Option<Option<TimeSlot>>,
    pub status: Option<TaskStatus>,
    pub color: Option<String>,
}

impl TaskPatch {
    pub fn schedule(slot: TimeSlot) -> Self {
        Self {
            schedule: Some(Some(slot)),
            ..Self::default()
        }
    }

    pub fn clear_schedule() -> Self {
        Self {
            schedule: Some(None),
            ..Self::default()
        }
    }

    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Checks only the fields this patch sets; stored fields it leaves alone
    /// are not revisited.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(ValidationError::EmptyTitle);
            }
        }
        if let Some(duration) = self.duration {
            validate_duration(duration)?;
        }
        if let Some(color) = &self.color {
            if !is_hex_color(color) {
                return Err(ValidationError::InvalidColor(color.clone()));
            }
        }
        if let Some(Some(slot)) = self.schedule {
            if slot.is_empty() {
                return Err(ValidationError::EmptyInterval {
                    start: slot.start,
                    end: slot.end,
                });
            }
        }
        Ok(())
    }

    pub fn apply(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(duration) = self.duration {
            task.duration = duration;
        }
        if let Some(deadline) = self.deadline {
            task.deadline = deadline;
        }
        if let Some(schedule) = self.schedule {
            task.scheduled_start = schedule.map(|s| s.start);
            task.scheduled_end = schedule.map(|s| s.end);
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(color) = &self.color {
            task.color = color.clone();
        }
    }
}
