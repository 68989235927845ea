//! Task state transitions that keep the calendar in sync.

use tracing::debug;

use crate::block::NewTimeBlock;
use crate::error::StorageError;
use crate::storage::Storage;
use crate::task::{Task, TaskPatch, TaskStatus};

pub async fn start_task<S: Storage + ?Sized>(storage: &S, id: &str) -> Result<Task, StorageError> {
    storage
        .update_task(id, TaskPatch::status(TaskStatus::InProgress))
        .await
}

/// Mark done, drop the schedule and remove the task's blocks.
pub async fn complete_task<S: Storage + ?Sized>(
    storage: &S,
    id: &str,
) -> Result<Task, StorageError> {
    let patch = TaskPatch {
        status: Some(TaskStatus::Done),
        schedule: Some(None),
        ..TaskPatch::default()
    };
    let task = storage.update_task(id, patch).await?;
    let removed = storage.delete_time_blocks_by_reference(id).await?;
    debug!(task = %id, removed, "completed");
    Ok(task)
}

/// Take the task off the calendar so the next run can place it again.
pub async fn clear_schedule<S: Storage + ?Sized>(
    storage: &S,
    id: &str,
) -> Result<Task, StorageError> {
    let task = storage.update_task(id, TaskPatch::clear_schedule()).await?;
    let removed = storage.delete_time_blocks_by_reference(id).await?;
    debug!(task = %id, removed, "unscheduled");
    Ok(task)
}

/// Apply an edit and keep the task's block in step with it.
///
/// A scheduled task whose duration changes is taken off the calendar so the
/// next run can place it at its new length.
pub async fn edit_task<S: Storage + ?Sized>(
    storage: &S,
    id: &str,
    mut patch: TaskPatch,
) -> Result<Task, StorageError> {
    let before = storage
        .get_task(id)
        .await?
        .ok_or_else(|| StorageError::not_found("task", id))?;

    let resized = patch.duration.is_some_and(|d| d != before.duration);
    if resized && before.is_scheduled() {
        patch.schedule = Some(None);
    }
    let task = storage.update_task(id, patch).await?;

    if before.is_scheduled() {
        storage.delete_time_blocks_by_reference(id).await?;
        if let Some(slot) = task.scheduled_slot() {
            storage
                .create_time_block(NewTimeBlock::for_task(&task, slot))
                .await?;
        }
    }
    debug!(task = %id, resized, "edited");
    Ok(task)
}

pub async fn delete_task<S: Storage + ?Sized>(storage: &S, id: &str) -> Result<(), StorageError> {
    storage.delete_task(id).await?;
    debug!(task = %id, "deleted");
    Ok(())
}
