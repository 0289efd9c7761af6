use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Which calendar week to report on. Weeks run Monday to Sunday.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Week {
    #[default]
    Current,
    Last,
}

/// Inclusive time range a report covers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl ReportWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, String> {
        if start > end {
            return Err(format!("start {} is after end {}", start, end));
        }
        Ok(Self { start, end })
    }

    /// Whole days `from` 00:00:00 through `to` 23:59:59.
    pub fn from_dates(from: NaiveDate, to: NaiveDate) -> Result<Self, String> {
        Self::new(from.and_time(NaiveTime::MIN), end_of_day(to))
    }

    pub fn for_week(week: Week, today: NaiveDate) -> Self {
        let monday = today - Duration::days(today.weekday().num_days_from_monday() as i64);
        let monday = monday.and_time(NaiveTime::MIN);
        match week {
            Week::Current => Self {
                start: monday,
                end: monday + Duration::days(7) - Duration::seconds(1),
            },
            Week::Last => Self {
                start: monday - Duration::days(7),
                end: monday - Duration::seconds(1),
            },
        }
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.start <= at && at <= self.end
    }
}

fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN) + Duration::days(1) - Duration::seconds(1)
}

/// Parse the timestamp shapes the backend emits.
///
/// Offsets are dropped and the wall-clock time is kept as written, so
/// `2026-02-06T10:30:00+03:00` becomes `2026-02-06 10:30:00`.
pub fn parse_backend_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%d.%m.%Y %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    for fmt in ["%Y-%m-%d", "%d.%m.%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(d.and_time(NaiveTime::MIN));
        }
    }
    None
}

/// Timestamp shape accepted by task-list filters.
pub fn format_filter_datetime(dt: NaiveDateTime) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S").to_string()
}

pub fn format_day(dt: NaiveDateTime) -> String {
    dt.format("%Y-%m-%d").to_string()
}

pub fn format_date_range(window: &ReportWindow) -> String {
    format!(
        "{} — {}",
        window.start.format("%d.%m.%Y"),
        window.end.format("%d.%m.%Y")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn current_week_runs_monday_to_sunday() {
        // Thursday
        let w = ReportWindow::for_week(Week::Current, date(2026, 2, 5));
        assert_eq!(w.start, date(2026, 2, 2).and_hms_opt(0, 0, 0).unwrap());
        assert_eq!(w.end, date(2026, 2, 8).and_hms_opt(23, 59, 59).unwrap());
    }

    #[test]
    fn last_week_ends_one_second_before_this_monday() {
        let w = ReportWindow::for_week(Week::Last, date(2026, 2, 2));
        assert_eq!(w.start, date(2026, 1, 26).and_hms_opt(0, 0, 0).unwrap());
        assert_eq!(w.end, date(2026, 2, 1).and_hms_opt(23, 59, 59).unwrap());
    }

    #[test]
    fn explicit_window_is_inclusive_of_the_last_day() {
        let w = ReportWindow::from_dates(date(2026, 2, 2), date(2026, 2, 8)).unwrap();
        assert!(w.contains(date(2026, 2, 8).and_hms_opt(23, 0, 0).unwrap()));
        assert!(!w.contains(date(2026, 2, 9).and_hms_opt(0, 0, 0).unwrap()));
    }

    #[test]
    fn reversed_window_is_rejected() {
        assert!(ReportWindow::from_dates(date(2026, 2, 8), date(2026, 2, 2)).is_err());
    }

    #[test]
    fn parses_backend_timestamp_shapes() {
        let expected = date(2026, 2, 6).and_hms_opt(10, 30, 0).unwrap();
        assert_eq!(parse_backend_datetime("2026-02-06T10:30:00+03:00"), Some(expected));
        assert_eq!(parse_backend_datetime("2026-02-06T10:30:00Z"), Some(expected));
        assert_eq!(parse_backend_datetime("2026-02-06 10:30:00"), Some(expected));
        assert_eq!(parse_backend_datetime("06.02.2026 10:30:00"), Some(expected));
        assert_eq!(
            parse_backend_datetime("2026-02-06"),
            Some(date(2026, 2, 6).and_hms_opt(0, 0, 0).unwrap())
        );
        assert_eq!(parse_backend_datetime(""), None);
        assert_eq!(parse_backend_datetime("next tuesday"), None);
    }

    #[test]
    fn formats_range_for_headers() {
        let w = ReportWindow::for_week(Week::Current, date(2026, 2, 5));
        assert_eq!(format_date_range(&w), "02.02.2026 — 08.02.2026");
        assert_eq!(format_filter_datetime(w.end), "2026-02-08T23:59:59");
    }
}
