//! Auto-schedule orchestration.
//!
//! One run:
//! - load settings (defaults are written back when absent)
//! - select and order the open, unscheduled tasks
//! - load the horizon's blocks into a busy set
//! - place each task first-fit, committing task + block before the next one
//!
//! Placements are committed one by one; a storage failure stops the run and
//! leaves earlier placements in place.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::block::{NewTimeBlock, TimeBlock};
use crate::busy::BusySet;
use crate::error::ScheduleError;
use crate::selector::select_tasks;
use crate::settings::load_or_init_settings;
use crate::slot_finder::find_slot;
use crate::storage::Storage;
use crate::task::TaskPatch;
use crate::time::{TimeSlot, horizon};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Placed(TimeSlot),
    /// No conflict-free slot inside the horizon.
    Unplaced,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    pub task_id: String,
    pub title: String,
    pub placement: Placement,
}

/// Per-task result of one run, in placement order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleReport {
    pub outcomes: Vec<TaskOutcome>,
}

impl ScheduleReport {
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn placed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.placement, Placement::Placed(_)))
            .count()
    }

    pub fn unplaced_count(&self) -> usize {
        self.attempted() - self.placed_count()
    }

    pub fn placed(&self) -> impl Iterator<Item = (&TaskOutcome, TimeSlot)> {
        self.outcomes.iter().filter_map(|o| match o.placement {
            Placement::Placed(slot) => Some((o, slot)),
            Placement::Unplaced => None,
        })
    }

    /// e.g. "3 of 5 tasks scheduled".
    pub fn summary(&self) -> String {
        format!(
            "{} of {} tasks scheduled",
            self.placed_count(),
            self.attempted()
        )
    }
}

/// Places unscheduled tasks into free work time.
///
/// Runs are serialized: a second caller waits for the running pass and then
/// sees its placements.
pub struct AutoScheduler<S: Storage + ?Sized> {
    storage: Arc<S>,
    run_guard: Mutex<()>,
}

impl<S: Storage + ?Sized> AutoScheduler<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            storage,
            run_guard: Mutex::new(()),
        }
    }

    pub async fn auto_schedule(&self) -> Result<ScheduleReport, ScheduleError> {
        self.auto_schedule_at(Utc::now()).await
    }

    /// Run one pass as if the current instant were `now`.
    #[instrument(name = "auto_schedule", skip(self))]
    pub async fn auto_schedule_at(&self, now: DateTime<Utc>) -> Result<ScheduleReport, ScheduleError> {
        let _run = self.run_guard.lock().await;
        let storage = self.storage.as_ref();

        let settings = load_or_init_settings(storage).await?;
        if let Err(err) = settings.validate() {
            warn!(%err, "stored settings are malformed; no slot will fit");
        }

        let queue = select_tasks(storage.list_tasks().await?);
        if queue.is_empty() {
            debug!("no tasks need placement");
            return Ok(ScheduleReport::default());
        }

        let range = horizon(now, settings.timezone);
        let window = settings.work_window();
        let mut busy: BusySet = storage
            .list_time_blocks(range.start, range.end)
            .await?
            .iter()
            .map(TimeBlock::slot)
            .collect();

        info!(tasks = queue.len(), busy = busy.len(), "auto-schedule started");

        let mut outcomes = Vec::with_capacity(queue.len());
        for task in queue {
            let minutes = settings.placement_minutes(task.duration);
            let length = Duration::minutes(i64::from(minutes));

            let placement = match find_slot(range, length, &busy, &window, now) {
                Some(slot) => {
                    storage
                        .update_task(&task.id, TaskPatch::schedule(slot))
                        .await?;
                    storage
                        .create_time_block(NewTimeBlock::for_task(&task, slot))
                        .await?;
                    busy.insert(slot);
                    debug!(task = %task.id, %slot, "placed");
                    Placement::Placed(slot)
                }
                None => {
                    debug!(task = %task.id, minutes, "no free slot in horizon");
                    Placement::Unplaced
                }
            };

            outcomes.push(TaskOutcome {
                task_id: task.id,
                title: task.title,
                placement,
            });
        }

        let report = ScheduleReport { outcomes };
        info!(
            placed = report.placed_count(),
            unplaced = report.unplaced_count(),
            "auto-schedule finished"
        );
        Ok(report)
    }
}
