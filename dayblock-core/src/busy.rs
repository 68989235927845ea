//! Ordered set of busy intervals threaded through a scheduling run.

use crate::time::TimeSlot;

/// Busy intervals kept sorted by start time.
///
/// Intervals may overlap each other (habit blocks are never reconciled);
/// only candidate placements are checked against the set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BusySet {
    slots: Vec<TimeSlot>,
}

impl BusySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn insert(&mut self, slot: TimeSlot) {
        let idx = self.slots.partition_point(|s| s.start <= slot.start);
        self.slots.insert(idx, slot);
    }

    /// True if `candidate` overlaps any busy interval (touching is allowed).
    pub fn conflicts_with(&self, candidate: &TimeSlot) -> bool {
        // Only intervals starting before the candidate ends can overlap it.
        let upto = self.slots.partition_point(|s| s.start < candidate.end);
        self.slots[..upto].iter().any(|busy| busy.overlaps(candidate))
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimeSlot> {
        self.slots.iter()
    }
}

impl FromIterator<TimeSlot> for BusySet {
    fn from_iter<I: IntoIterator<Item = TimeSlot>>(iter: I) -> Self {
        let mut slots: Vec<TimeSlot> = iter.into_iter().collect();
        slots.sort();
        Self { slots }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn slot(h1: u32, m1: u32, h2: u32, m2: u32) -> TimeSlot {
        TimeSlot::new(
            Utc.with_ymd_and_hms(2026, 3, 2, h1, m1, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 2, h2, m2, 0).unwrap(),
        )
    }

    #[test]
    fn insert_keeps_start_order() {
        let mut busy = BusySet::new();
        busy.insert(slot(13, 0, 14, 0));
        busy.insert(slot(9, 0, 10, 0));
        busy.insert(slot(11, 0, 11, 30));

        let starts: Vec<_> = busy.iter().map(|s| s.start).collect();
        let mut sorted = starts.clone();
        sorted.sort();
        assert_eq!(starts, sorted);
        assert_eq!(busy.len(), 3);
    }

    #[test]
    fn detects_conflicts_but_allows_touching() {
        let busy: BusySet = [slot(9, 0, 10, 0), slot(12, 0, 13, 0)].into_iter().collect();

        assert!(busy.conflicts_with(&slot(9, 30, 10, 0)));
        assert!(busy.conflicts_with(&slot(11, 45, 12, 15)));
        assert!(!busy.conflicts_with(&slot(10, 0, 10, 30)));
        assert!(!busy.conflicts_with(&slot(11, 30, 12, 0)));
    }

    #[test]
    fn long_early_interval_still_conflicts() {
        // Sorted by start, a long interval can cover candidates far after later starts.
        let busy: BusySet = [slot(8, 0, 17, 0), slot(9, 0, 9, 15)].into_iter().collect();
        assert!(busy.conflicts_with(&slot(15, 0, 15, 30)));
    }
}
