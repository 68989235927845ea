use chrono::{DateTime, Days, NaiveDate, Utc};
use chrono_tz::Tz;
use dayblock_core::TimeBlock;
use dayblock_core::time::start_of_day;
use std::fmt::Write;

pub struct CalendarEvent {
    pub uid: String,
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
    pub summary: String,
    pub description: String,
}

/// `[week_start, week_start + 7 days)` in `tz`, as UTC instants.
pub fn week_range(week_start: NaiveDate, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let end = week_start
        .checked_add_days(Days::new(7))
        .unwrap_or(NaiveDate::MAX);
    (
        start_of_day(tz, week_start).with_timezone(&Utc),
        start_of_day(tz, end).with_timezone(&Utc),
    )
}

pub fn blocks_to_events(blocks: &[TimeBlock], prefix: &str) -> Vec<CalendarEvent> {
    blocks
        .iter()
        .map(|b| CalendarEvent {
            uid: b.id.clone(),
            start_utc: b.start_time,
            end_utc: b.end_time,
            summary: format!("{}{}", prefix, b.title),
            description: format!(
                "Type: {}\nReference: {}\n",
                b.block_type,
                b.reference_id.as_deref().unwrap_or("-")
            ),
        })
        .collect()
}

/// Emit a minimal ICS calendar containing VEVENT blocks.
///
/// DTSTART/DTEND are UTC; UIDs are the stored block ids.
pub fn events_to_ics(events: &[CalendarEvent]) -> String {
    let mut s = String::new();
    s.push_str("BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//dayblock//EN\r\n");

    for e in events {
        let dtstart = e.start_utc.format("%Y%m%dT%H%M%SZ");
        let dtend = e.end_utc.format("%Y%m%dT%H%M%SZ");

        s.push_str("BEGIN:VEVENT\r\n");
        let _ = write!(s, "UID:{}@dayblock\r\n", e.uid);
        let _ = write!(s, "DTSTART:{}\r\n", dtstart);
        let _ = write!(s, "DTEND:{}\r\n", dtend);
        let _ = write!(s, "SUMMARY:{}\r\n", escape_ics(&e.summary));
        let _ = write!(s, "DESCRIPTION:{}\r\n", escape_ics(&e.description));
        s.push_str("END:VEVENT\r\n");
    }

    s.push_str("END:VCALENDAR\r\n");
    s
}

fn escape_ics(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace(',', "\\,")
        .replace(';', "\\;")
}

/// Plain-text week view, one section per local day that has blocks.
pub fn render_week(blocks: &[TimeBlock], tz: Tz) -> String {
    let mut out = String::new();
    let mut current: Option<NaiveDate> = None;

    for b in blocks {
        let start = b.start_time.with_timezone(&tz);
        let end = b.end_time.with_timezone(&tz);
        let day = start.date_naive();
        if current != Some(day) {
            if current.is_some() {
                out.push('\n');
            }
            let _ = writeln!(out, "{}", day.format("%a %Y-%m-%d"));
            current = Some(day);
        }
        let _ = writeln!(
            out,
            "  {}-{}  [{}] {}",
            start.format("%H:%M"),
            end.format("%H:%M"),
            b.block_type,
            b.title
        );
    }

    if out.is_empty() {
        out.push_str("(no blocks this week)\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use dayblock_core::BlockType;

    fn block(id: &str, title: &str, d: u32, h: u32, len_h: u32, kind: BlockType) -> TimeBlock {
        TimeBlock {
            id: id.to_string(),
            title: title.to_string(),
            start_time: Utc.with_ymd_and_hms(2026, 3, d, h, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2026, 3, d, h + len_h, 0, 0).unwrap(),
            block_type: kind,
            reference_id: Some(format!("ref-{id}")),
            color: "#3B82F6".to_string(),
        }
    }

    #[test]
    fn escapes_special_characters() {
        assert_eq!(escape_ics("a,b;c\\d\ne"), "a\\,b\\;c\\\\d\\ne");
    }

    #[test]
    fn ics_carries_block_ids_and_prefix() {
        let blocks = vec![block("b1", "Review, notes", 2, 9, 1, BlockType::Task)];
        let ics = events_to_ics(&blocks_to_events(&blocks, "[db] "));
        assert!(ics.starts_with("BEGIN:VCALENDAR\r\n"));
        assert!(ics.contains("UID:b1@dayblock\r\n"));
        assert!(ics.contains("DTSTART:20260302T090000Z\r\n"));
        assert!(ics.contains("DTEND:20260302T100000Z\r\n"));
        assert!(ics.contains("SUMMARY:[db] Review\\, notes\r\n"));
        assert!(ics.ends_with("END:VCALENDAR\r\n"));
    }

    #[test]
    fn week_view_groups_by_local_day() {
        let blocks = vec![
            block("b1", "Standup", 2, 9, 1, BlockType::Habit),
            block("b2", "Write report", 2, 10, 2, BlockType::Task),
            block("b3", "Deploy", 3, 14, 1, BlockType::Task),
        ];
        let view = render_week(&blocks, Tz::UTC);
        assert_eq!(
            view,
            "Mon 2026-03-02\n  09:00-10:00  [habit] Standup\n  10:00-12:00  [task] Write report\n\nTue 2026-03-03\n  14:00-15:00  [task] Deploy\n"
        );
    }

    #[test]
    fn week_range_covers_seven_local_days() {
        let tz: Tz = "America/Chicago".parse().unwrap();
        let (start, end) = week_range(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(), tz);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 3, 1, 6, 0, 0).unwrap());
        // Midnight on 2026-03-08 is still CST; the switch happens at 02:00.
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 3, 8, 6, 0, 0).unwrap());
    }

    #[test]
    fn empty_week_says_so() {
        assert_eq!(render_week(&[], Tz::UTC), "(no blocks this week)\n");
    }
}
