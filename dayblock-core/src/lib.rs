//! dayblock-core: task auto-scheduling onto a 15-minute work calendar.

pub mod block;
pub mod busy;
pub mod error;
pub mod habit;
pub mod lifecycle;
pub mod scheduler;
pub mod selector;
pub mod settings;
pub mod slot_finder;
pub mod storage;
pub mod task;
pub mod time;

pub use block::{BlockType, NewTimeBlock, TimeBlock};
pub use busy::BusySet;
pub use error::{ScheduleError, SettingsError, StorageError, ValidationError};
pub use habit::{Habit, HabitPatch, PreferredTime, habit_blocks_for_week, plan_habit_week};
pub use scheduler::{AutoScheduler, Placement, ScheduleReport, TaskOutcome};
pub use selector::select_tasks;
pub use settings::{Settings, load_or_init_settings};
pub use slot_finder::{WorkWindow, find_slot};
pub use storage::{MemoryStorage, Storage, StoreSnapshot};
pub use task::{Priority, Task, TaskPatch, TaskStatus};
pub use time::TimeSlot;
