//! Time utilities: intervals, the quarter-hour grid, timezone-aware day math.

use std::fmt;
use std::sync::LazyLock;

use anyhow::Result;
use chrono::{
    DateTime, Datelike, Days, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike,
    Utc,
};
use chrono_tz::Tz;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

/// Placement grid, in minutes.
pub const SLOT_STEP_MINUTES: i64 = 15;

/// Forward search window, in calendar days from the current day.
pub const HORIZON_DAYS: u64 = 14;

static HHMM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([01]?\d|2[0-3]):([0-5]\d)$").expect("static HH:MM regex"));

static HEX_COLOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("static color regex"));

/// Half-open interval `[start, end)` in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeSlot {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Open-interval overlap: touching endpoints do not conflict.
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.start < other.end && self.end > other.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} .. {}", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

/// Round up to the next 15-minute boundary of the local wall clock.
///
/// Sub-minute remainders count as past the boundary, so the result is never
/// earlier than the input.
pub fn ceil_to_quarter_hour<Z: TimeZone>(dt: DateTime<Z>) -> DateTime<Z> {
    let step_secs = SLOT_STEP_MINUTES * 60;
    let t = dt.time();
    let nanos = i64::from(t.nanosecond());
    let rem = i64::from(t.num_seconds_from_midnight()) % step_secs;
    if rem == 0 && nanos == 0 {
        return dt;
    }
    dt - Duration::nanoseconds(nanos) + Duration::seconds(step_secs - rem)
}

/// Resolve a wall-clock time on `date` in `tz`.
///
/// Ambiguous times (DST fall-back) take the earlier instant; nonexistent
/// times (DST spring-forward) move forward to the first valid quarter hour.
pub fn local_instant(tz: Tz, date: NaiveDate, time: NaiveTime) -> DateTime<Tz> {
    let mut naive = date.and_time(time);
    for _ in 0..=8 {
        if let Some(dt) = tz.from_local_datetime(&naive).earliest() {
            return dt;
        }
        naive += Duration::minutes(SLOT_STEP_MINUTES);
    }
    tz.from_utc_datetime(&date.and_time(time))
}

pub fn start_of_day(tz: Tz, date: NaiveDate) -> DateTime<Tz> {
    local_instant(tz, date, NaiveTime::MIN)
}

/// `[today, today + 14 days)` where "today" is the local date of `now` in `tz`.
pub fn horizon(now: DateTime<Utc>, tz: Tz) -> TimeSlot {
    let today = now.with_timezone(&tz).date_naive();
    let last = today
        .checked_add_days(Days::new(HORIZON_DAYS))
        .unwrap_or(NaiveDate::MAX);
    TimeSlot::new(
        start_of_day(tz, today).with_timezone(&Utc),
        start_of_day(tz, last).with_timezone(&Utc),
    )
}

/// 0 = Sunday .. 6 = Saturday.
pub fn weekday_number(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// The Sunday on or before `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date.checked_sub_days(Days::new(u64::from(weekday_number(date))))
        .unwrap_or(date)
}

pub fn parse_hhmm(raw: &str) -> Result<NaiveTime, SettingsError> {
    let invalid = || SettingsError::InvalidTime(raw.to_string());
    let caps = HHMM_RE.captures(raw.trim()).ok_or_else(invalid)?;
    let hour: u32 = caps[1].parse().map_err(|_| invalid())?;
    let minute: u32 = caps[2].parse().map_err(|_| invalid())?;
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(invalid)
}

pub fn format_hhmm(t: NaiveTime) -> String {
    t.format("%H:%M").to_string()
}

pub fn is_hex_color(s: &str) -> bool {
    HEX_COLOR_RE.is_match(s)
}

/// Parse a deadline like "2026-02-20 23:59" in `tz`, returning UTC.
///
/// A bare date ("2026-02-20") means the end of that day.
pub fn parse_local_to_utc(local: &str, tz: Tz) -> Result<DateTime<Utc>> {
    let local = local.trim();
    let ndt = match NaiveDateTime::parse_from_str(local, "%Y-%m-%d %H:%M") {
        Ok(ndt) => ndt,
        Err(_) => {
            let date = parse_local_date(local)?;
            date.and_hms_opt(23, 59, 0)
                .ok_or_else(|| anyhow::anyhow!("invalid local datetime '{local}'"))?
        }
    };

    let local_dt = tz
        .from_local_datetime(&ndt)
        .single()
        .ok_or_else(|| anyhow::anyhow!("ambiguous or invalid local time (DST?): {local} {tz}"))?;

    Ok(local_dt.with_timezone(&Utc))
}

pub fn parse_local_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| anyhow::anyhow!("invalid date '{raw}' (expected YYYY-MM-DD): {e}"))
}

/// serde adapter for "HH:MM" times of day.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_hhmm(*t))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_hhmm(&raw).map_err(D::Error::custom)
    }
}

/// serde adapter for optional "HH:MM" times of day.
pub mod hhmm_opt {
    use chrono::NaiveTime;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &Option<NaiveTime>, s: S) -> Result<S::Ok, S::Error> {
        match t {
            Some(t) => s.serialize_some(&super::format_hhmm(*t)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveTime>, D::Error> {
        match Option::<String>::deserialize(d)? {
            Some(raw) => super::parse_hhmm(&raw).map(Some).map_err(D::Error::custom),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chicago_deadline() {
        // Feb is CST (UTC-6)
        let tz: Tz = "America/Chicago".parse().unwrap();
        let utc = parse_local_to_utc("2026-02-20 23:59", tz).unwrap();
        assert_eq!(utc.to_rfc3339(), "2026-02-21T05:59:00+00:00");
    }

    #[test]
    fn bare_date_deadline_is_end_of_day() {
        let utc = parse_local_to_utc("2026-03-02", Tz::UTC).unwrap();
        assert_eq!(utc, Utc.with_ymd_and_hms(2026, 3, 2, 23, 59, 0).unwrap());
    }

    #[test]
    fn ceil_rounds_up_to_quarter() {
        let dt = Utc.with_ymd_and_hms(2026, 3, 2, 10, 7, 0).unwrap();
        assert_eq!(
            ceil_to_quarter_hour(dt),
            Utc.with_ymd_and_hms(2026, 3, 2, 10, 15, 0).unwrap()
        );

        let aligned = Utc.with_ymd_and_hms(2026, 3, 2, 10, 30, 0).unwrap();
        assert_eq!(ceil_to_quarter_hour(aligned), aligned);
    }

    #[test]
    fn ceil_never_goes_backwards_on_seconds() {
        let dt = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 20).unwrap();
        assert_eq!(
            ceil_to_quarter_hour(dt),
            Utc.with_ymd_and_hms(2026, 3, 2, 10, 15, 0).unwrap()
        );
    }

    #[test]
    fn ceil_crosses_midnight() {
        let dt = Utc.with_ymd_and_hms(2026, 3, 2, 23, 50, 0).unwrap();
        assert_eq!(
            ceil_to_quarter_hour(dt),
            Utc.with_ymd_and_hms(2026, 3, 3, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn overlap_is_open_interval() {
        let at = |h, m| Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap();
        let a = TimeSlot::new(at(9, 0), at(10, 0));
        assert!(!a.overlaps(&TimeSlot::new(at(10, 0), at(10, 30))));
        assert!(!a.overlaps(&TimeSlot::new(at(8, 0), at(9, 0))));
        assert!(a.overlaps(&TimeSlot::new(at(9, 45), at(10, 15))));
        assert!(a.overlaps(&TimeSlot::new(at(8, 0), at(11, 0))));
    }

    #[test]
    fn horizon_spans_fourteen_local_days() {
        let tz: Tz = "America/New_York".parse().unwrap();
        // 02:00 UTC on Mar 3 is still Mar 2 in New York.
        let now = Utc.with_ymd_and_hms(2026, 3, 3, 2, 0, 0).unwrap();
        let h = horizon(now, tz);
        assert_eq!(h.start, Utc.with_ymd_and_hms(2026, 3, 2, 5, 0, 0).unwrap());
        // DST starts Mar 8, so the end is at 04:00 UTC.
        assert_eq!(h.end, Utc.with_ymd_and_hms(2026, 3, 16, 4, 0, 0).unwrap());
    }

    #[test]
    fn nonexistent_local_time_moves_forward() {
        let tz: Tz = "America/New_York".parse().unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 3, 8).unwrap();
        let t = NaiveTime::from_hms_opt(2, 30, 0).unwrap();
        let dt = local_instant(tz, date, t);
        assert_eq!(dt.with_timezone(&Utc), Utc.with_ymd_and_hms(2026, 3, 8, 7, 0, 0).unwrap());
    }

    #[test]
    fn weekday_numbers_start_on_sunday() {
        let monday = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        assert_eq!(weekday_number(monday), 1);
        assert_eq!(week_start(monday), NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
    }

    #[test]
    fn parses_hhmm() {
        assert_eq!(parse_hhmm("09:00").unwrap(), NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(parse_hhmm("7:30").unwrap(), NaiveTime::from_hms_opt(7, 30, 0).unwrap());
        assert!(parse_hhmm("24:00").is_err());
        assert!(parse_hhmm("9am").is_err());
    }

    #[test]
    fn validates_colors() {
        assert!(is_hex_color("#3B82F6"));
        assert!(!is_hex_color("3B82F6"));
        assert!(!is_hex_color("#3B82F"));
    }
}
