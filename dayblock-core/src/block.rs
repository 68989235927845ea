//! Calendar time blocks: the busy intervals the scheduler must avoid.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::habit::{DEFAULT_HABIT_COLOR, Habit};
use crate::task::{DEFAULT_TASK_COLOR, Task};
use crate::time::{TimeSlot, is_hex_color};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    #[default]
    Task,
    Habit,
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockType::Task => f.write_str("task"),
            BlockType::Habit => f.write_str("habit"),
        }
    }
}

/// A stored block on the calendar, `[start_time, end_time)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBlock {
    pub id: String,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub block_type: BlockType,
    /// Id of the task or habit this block was created for.
    #[serde(default)]
    pub reference_id: Option<String>,
    pub color: String,
}

impl TimeBlock {
    pub fn slot(&self) -> TimeSlot {
        TimeSlot::new(self.start_time, self.end_time)
    }
}

/// A block that has not been stored yet; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTimeBlock {
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub block_type: BlockType,
    pub reference_id: Option<String>,
    pub color: String,
}

/// Title and color for a block, replacing values a legacy record may carry
/// that a block would reject.
fn block_label(
    title: &str,
    color: &str,
    fallback_title: &str,
    fallback_color: &str,
) -> (String, String) {
    let title = if title.trim().is_empty() {
        fallback_title
    } else {
        title
    };
    let color = if is_hex_color(color) {
        color
    } else {
        fallback_color
    };
    (title.to_string(), color.to_string())
}

impl NewTimeBlock {
    pub fn for_task(task: &Task, slot: TimeSlot) -> Self {
        let (title, color) =
            block_label(&task.title, &task.color, "Untitled task", DEFAULT_TASK_COLOR);
        Self {
            title,
            start_time: slot.start,
            end_time: slot.end,
            block_type: BlockType::Task,
            reference_id: Some(task.id.clone()),
            color,
        }
    }

    pub fn for_habit(habit: &Habit, slot: TimeSlot) -> Self {
        let (title, color) =
            block_label(&habit.title, &habit.color, "Untitled habit", DEFAULT_HABIT_COLOR);
        Self {
            title,
            start_time: slot.start,
            end_time: slot.end,
            block_type: BlockType::Habit,
            reference_id: Some(habit.id.clone()),
            color,
        }
    }

    pub fn slot(&self) -> TimeSlot {
        TimeSlot::new(self.start_time, self.end_time)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if self.slot().is_empty() {
            return Err(ValidationError::EmptyInterval {
                start: self.start_time,
                end: self.end_time,
            });
        }
        if !is_hex_color(&self.color) {
            return Err(ValidationError::InvalidColor(self.color.clone()));
        }
        Ok(())
    }

    pub fn into_block(self, id: impl Into<String>) -> TimeBlock {
        TimeBlock {
            id: id.into(),
            title: self.title,
            start_time: self.start_time,
            end_time: self.end_time,
            block_type: self.block_type,
            reference_id: self.reference_id,
            color: self.color,
        }
    }
}
