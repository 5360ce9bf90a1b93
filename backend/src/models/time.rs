use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inclusive `[00:00:00.000, 23:59:59.999]` window of one calendar day in facility-local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWindow {
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    /// `None` when either bound falls outside the representable range.
    pub fn for_date(date: NaiveDate, offset: FixedOffset) -> Option<Self> {
        let start = local_to_utc(date, NaiveTime::MIN, offset)?;
        let end = start
            .checked_add_signed(Duration::days(1))?
            .checked_sub_signed(Duration::milliseconds(1))?;
        Some(Self { date, start, end })
    }

    /// Window of the local day containing `now`.
    pub fn containing(now: DateTime<Utc>, offset: FixedOffset) -> Option<Self> {
        Self::for_date(now.with_timezone(&offset).date_naive(), offset)
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }

    pub fn date_string(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }
}

fn local_to_utc(date: NaiveDate, time: NaiveTime, offset: FixedOffset) -> Option<DateTime<Utc>> {
    date.and_time(time)
        .checked_sub_signed(Duration::seconds(i64::from(offset.local_minus_utc())))
        .map(|local| local.and_utc())
}

/// Parse a `YYYY-MM-DD` query value.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

/// Hour of day (0-23) of `instant` in facility-local time.
pub fn local_hour(instant: DateTime<Utc>, offset: FixedOffset) -> u32 {
    instant.with_timezone(&offset).hour()
}

/// Build a fixed offset from minutes east of UTC, rejecting values beyond +/-24h.
pub fn offset_from_minutes(minutes: i32) -> Option<FixedOffset> {
    minutes.checked_mul(60).and_then(FixedOffset::east_opt)
}

/// Offset of the host's local timezone at process start.
pub fn system_offset() -> FixedOffset {
    *chrono::Local::now().offset()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn hanoi() -> FixedOffset {
        offset_from_minutes(7 * 60).unwrap()
    }

    #[test]
    fn test_window_bounds_in_utc() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let window = DayWindow::for_date(date, hanoi()).unwrap();
        assert_eq!(window.start, Utc.with_ymd_and_hms(2024, 4, 30, 17, 0, 0).unwrap());
        assert_eq!(
            window.end,
            Utc.with_ymd_and_hms(2024, 5, 1, 16, 59, 59).unwrap() + Duration::milliseconds(999)
        );
    }

    #[test]
    fn test_window_is_boundary_inclusive() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let window = DayWindow::for_date(date, hanoi()).unwrap();
        assert!(window.contains(window.start));
        assert!(window.contains(window.end));
        assert!(!window.contains(window.end + Duration::milliseconds(1)));
        assert!(!window.contains(window.start - Duration::milliseconds(1)));
    }

    #[test]
    fn test_containing_uses_local_date() {
        // 18:30 UTC is already the next day at +07:00
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 18, 30, 0).unwrap();
        let window = DayWindow::containing(now, hanoi()).unwrap();
        assert_eq!(window.date, NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
        assert_eq!(window.date_string(), "2024-05-02");
    }

    #[test]
    fn test_window_at_calendar_limits_is_none() {
        let last = parse_date("+262142-12-31").unwrap();
        assert!(DayWindow::for_date(last, offset_from_minutes(0).unwrap()).is_none());

        let first = NaiveDate::MIN;
        assert!(DayWindow::for_date(first, hanoi()).is_none());
        assert!(DayWindow::for_date(first, offset_from_minutes(-60).unwrap()).is_some());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2024-05-01"), NaiveDate::from_ymd_opt(2024, 5, 1));
        assert_eq!(parse_date("01/05/2024"), None);
        assert_eq!(parse_date("2024-13-01"), None);
    }

    #[test]
    fn test_local_hour() {
        let instant = Utc.with_ymd_and_hms(2024, 5, 1, 1, 15, 0).unwrap();
        assert_eq!(local_hour(instant, hanoi()), 8);
        assert_eq!(local_hour(instant, offset_from_minutes(0).unwrap()), 1);
    }

    #[test]
    fn test_offset_from_minutes_rejects_out_of_range() {
        assert!(offset_from_minutes(24 * 60).is_none());
        assert!(offset_from_minutes(-330).is_some());
    }
}
