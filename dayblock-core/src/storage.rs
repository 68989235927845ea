//! Persistence collaborator for the scheduler, plus an in-memory backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::block::{BlockType, NewTimeBlock, TimeBlock};
use crate::error::StorageError;
use crate::habit::{Habit, HabitPatch};
use crate::settings::Settings;
use crate::task::{Task, TaskPatch};

/// CRUD operations over tasks, habits, time blocks and settings.
///
/// Every call may suspend and may fail; callers propagate failures.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn list_tasks(&self) -> Result<Vec<Task>, StorageError>;
    async fn get_task(&self, id: &str) -> Result<Option<Task>, StorageError>;
    async fn create_task(&self, task: Task) -> Result<Task, StorageError>;
    async fn update_task(&self, id: &str, patch: TaskPatch) -> Result<Task, StorageError>;
    /// Also removes blocks referencing the task.
    async fn delete_task(&self, id: &str) -> Result<(), StorageError>;

    async fn list_habits(&self) -> Result<Vec<Habit>, StorageError>;
    async fn get_habit(&self, id: &str) -> Result<Option<Habit>, StorageError>;
    async fn create_habit(&self, habit: Habit) -> Result<Habit, StorageError>;
    async fn update_habit(&self, id: &str, patch: HabitPatch) -> Result<Habit, StorageError>;
    /// Also removes blocks referencing the habit.
    async fn delete_habit(&self, id: &str) -> Result<(), StorageError>;

    /// Blocks overlapping `[start, end)`, ordered by start time.
    async fn list_time_blocks(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TimeBlock>, StorageError>;
    async fn create_time_block(&self, block: NewTimeBlock) -> Result<TimeBlock, StorageError>;
    async fn delete_time_block(&self, id: &str) -> Result<(), StorageError>;
    /// Returns the number of blocks removed.
    async fn delete_time_blocks_by_reference(&self, reference_id: &str)
    -> Result<usize, StorageError>;
    async fn delete_time_blocks_by_type(&self, block_type: BlockType)
    -> Result<usize, StorageError>;

    async fn get_settings(&self) -> Result<Option<Settings>, StorageError>;
    async fn upsert_settings(&self, settings: Settings) -> Result<Settings, StorageError>;
}

/// Serializable contents of a store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub habits: Vec<Habit>,
    #[serde(default)]
    pub time_blocks: Vec<TimeBlock>,
    #[serde(default)]
    pub settings: Option<Settings>,
}

/// In-process store. Records keep insertion order.
///
/// Created records are validated in full, updates only on the fields the
/// patch sets. Snapshots loaded with [`MemoryStorage::from_snapshot`] are
/// taken as-is.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: RwLock<StoreSnapshot>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            inner: RwLock::new(snapshot),
        }
    }

    pub async fn snapshot(&self) -> StoreSnapshot {
        self.inner.read().await.clone()
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn list_tasks(&self) -> Result<Vec<Task>, StorageError> {
        Ok(self.inner.read().await.tasks.clone())
    }

    async fn get_task(&self, id: &str) -> Result<Option<Task>, StorageError> {
        let db = self.inner.read().await;
        Ok(db.tasks.iter().find(|t| t.id == id).cloned())
    }

    async fn create_task(&self, mut task: Task) -> Result<Task, StorageError> {
        if task.id.is_empty() {
            task.id = new_id();
        }
        task.validate()?;

        let mut db = self.inner.write().await;
        if db.tasks.iter().any(|t| t.id == task.id) {
            return Err(StorageError::Conflict {
                kind: "task",
                id: task.id,
            });
        }
        db.tasks.push(task.clone());
        Ok(task)
    }

    async fn update_task(&self, id: &str, patch: TaskPatch) -> Result<Task, StorageError> {
        patch.validate()?;
        let mut db = self.inner.write().await;
        let task = db
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| StorageError::not_found("task", id))?;

        patch.apply(task);
        Ok(task.clone())
    }

    async fn delete_task(&self, id: &str) -> Result<(), StorageError> {
        let mut db = self.inner.write().await;
        let before = db.tasks.len();
        db.tasks.retain(|t| t.id != id);
        if db.tasks.len() == before {
            return Err(StorageError::not_found("task", id));
        }
        db.time_blocks
            .retain(|b| b.reference_id.as_deref() != Some(id));
        Ok(())
    }

    async fn list_habits(&self) -> Result<Vec<Habit>, StorageError> {
        Ok(self.inner.read().await.habits.clone())
    }

    async fn get_habit(&self, id: &str) -> Result<Option<Habit>, StorageError> {
        let db = self.inner.read().await;
        Ok(db.habits.iter().find(|h| h.id == id).cloned())
    }

    async fn create_habit(&self, mut habit: Habit) -> Result<Habit, StorageError> {
        if habit.id.is_empty() {
            habit.id = new_id();
        }
        habit.validate()?;

        let mut db = self.inner.write().await;
        if db.habits.iter().any(|h| h.id == habit.id) {
            return Err(StorageError::Conflict {
                kind: "habit",
                id: habit.id,
            });
        }
        db.habits.push(habit.clone());
        Ok(habit)
    }

    async fn update_habit(&self, id: &str, patch: HabitPatch) -> Result<Habit, StorageError> {
        patch.validate()?;
        let mut db = self.inner.write().await;
        let habit = db
            .habits
            .iter_mut()
            .find(|h| h.id == id)
            .ok_or_else(|| StorageError::not_found("habit", id))?;

        patch.apply(habit);
        Ok(habit.clone())
    }

    async fn delete_habit(&self, id: &str) -> Result<(), StorageError> {
        let mut db = self.inner.write().await;
        let before = db.habits.len();
        db.habits.retain(|h| h.id != id);
        if db.habits.len() == before {
            return Err(StorageError::not_found("habit", id));
        }
        db.time_blocks
            .retain(|b| b.reference_id.as_deref() != Some(id));
        Ok(())
    }

    async fn list_time_blocks(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TimeBlock>, StorageError> {
        let db = self.inner.read().await;
        let mut blocks: Vec<TimeBlock> = db
            .time_blocks
            .iter()
            .filter(|b| b.start_time < end && b.end_time > start)
            .cloned()
            .collect();
        blocks.sort_by_key(|b| (b.start_time, b.end_time));
        Ok(blocks)
    }

    async fn create_time_block(&self, block: NewTimeBlock) -> Result<TimeBlock, StorageError> {
        block.validate()?;
        let stored = block.into_block(new_id());
        self.inner.write().await.time_blocks.push(stored.clone());
        Ok(stored)
    }

    async fn delete_time_block(&self, id: &str) -> Result<(), StorageError> {
        let mut db = self.inner.write().await;
        let before = db.time_blocks.len();
        db.time_blocks.retain(|b| b.id != id);
        if db.time_blocks.len() == before {
            return Err(StorageError::not_found("time block", id));
        }
        Ok(())
    }

    async fn delete_time_blocks_by_reference(
        &self,
        reference_id: &str,
    ) -> Result<usize, StorageError> {
        let mut db = self.inner.write().await;
        let before = db.time_blocks.len();
        db.time_blocks
            .retain(|b| b.reference_id.as_deref() != Some(reference_id));
        Ok(before - db.time_blocks.len())
    }

    async fn delete_time_blocks_by_type(
        &self,
        block_type: BlockType,
    ) -> Result<usize, StorageError> {
        let mut db = self.inner.write().await;
        let before = db.time_blocks.len();
        db.time_blocks.retain(|b| b.block_type != block_type);
        Ok(before - db.time_blocks.len())
    }

    async fn get_settings(&self) -> Result<Option<Settings>, StorageError> {
        Ok(self.inner.read().await.settings.clone())
    }

    async fn upsert_settings(&self, settings: Settings) -> Result<Settings, StorageError> {
        settings.validate()?;
        self.inner.write().await.settings = Some(settings.clone());
        Ok(settings)
    }
}
