//! Task selector: which tasks to place, and in what order.
//!
//! Ordering (stable):
//! - priority rank ASC (critical first)
//! - deadline ASC, tasks with a deadline before tasks without
//! - otherwise input order

use std::cmp::Ordering;

use crate::task::{Task, TaskStatus};

/// Not done and not already on the calendar.
pub fn needs_placement(task: &Task) -> bool {
    task.status != TaskStatus::Done && task.scheduled_start.is_none()
}

pub fn placement_order(a: &Task, b: &Task) -> Ordering {
    a.priority
        .rank()
        .cmp(&b.priority.rank())
        .then_with(|| match (a.deadline, b.deadline) {
            (Some(da), Some(db)) => da.cmp(&db),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}

/// Filter and order the tasks an auto-schedule run should attempt.
pub fn select_tasks(tasks: Vec<Task>) -> Vec<Task> {
    let mut queue: Vec<Task> = tasks.into_iter().filter(needs_placement).collect();
    // sort_by is stable, so equal keys keep their input order.
    queue.sort_by(placement_order);
    queue
}
