//! Slot finder: earliest-fit scan for one task on a 15-minute grid.
//!
//! The scan walks calendar days in the work-window timezone:
//! - skip days that are not work days
//! - start at the day's work start, or at the cursor rounded up to the next
//!   quarter hour when the cursor is already past it
//! - step in 15-minute increments while the slot still ends inside the window
//! - return the first candidate that overlaps no busy interval
//!
//! No lookahead: the first fit wins.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;

use crate::busy::BusySet;
use crate::time::{
    SLOT_STEP_MINUTES, TimeSlot, ceil_to_quarter_hour, local_instant, start_of_day, weekday_number,
};

/// Days and hours in which placements are allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkWindow {
    pub tz: Tz,
    /// 0 = Sunday .. 6 = Saturday.
    pub days: BTreeSet<u8>,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl WorkWindow {
    pub fn is_work_day(&self, date: NaiveDate) -> bool {
        self.days.contains(&weekday_number(date))
    }

    /// `[day_start, day_end]` on `date`, as instants.
    pub fn bounds_on(&self, date: NaiveDate) -> (DateTime<Tz>, DateTime<Tz>) {
        (
            local_instant(self.tz, date, self.start),
            local_instant(self.tz, date, self.end),
        )
    }
}

/// Find the earliest conflict-free slot of `duration` inside `range`.
///
/// Never returns a slot starting before `now`. Returns `None` when nothing
/// fits before `range.end`, including when `duration` is longer than the
/// daily window or the window itself is empty.
pub fn find_slot(
    range: TimeSlot,
    duration: Duration,
    busy: &BusySet,
    window: &WorkWindow,
    now: DateTime<Utc>,
) -> Option<TimeSlot> {
    if duration <= Duration::zero() {
        return None;
    }

    let step = Duration::minutes(SLOT_STEP_MINUTES);
    let mut cursor = range.start.max(now).with_timezone(&window.tz);

    while cursor < range.end {
        let date = cursor.date_naive();
        let Some(next_day) = date.succ_opt() else {
            break;
        };

        if !window.is_work_day(date) {
            cursor = start_of_day(window.tz, next_day);
            continue;
        }

        let (day_start, day_end) = window.bounds_on(date);
        let mut slot_start = if cursor > day_start {
            ceil_to_quarter_hour(cursor)
        } else {
            day_start
        };

        while slot_start + duration <= day_end {
            let candidate = TimeSlot::new(
                slot_start.with_timezone(&Utc),
                (slot_start + duration).with_timezone(&Utc),
            );
            if candidate.end > range.end {
                break;
            }
            if !busy.conflicts_with(&candidate) {
                return Some(candidate);
            }
            slot_start += step;
        }

        cursor = start_of_day(window.tz, next_day);
    }

    None
}
