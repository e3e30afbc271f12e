//! Date parsing, natural-language resolution and ordering.
//!
//! Task dates are either bare dates (`2025-01-08`) or date-times, optionally
//! carrying a UTC offset. Date-times with an offset are converted to local
//! time before their calendar day is taken, so ordering is time-zone aware.
//! A bare date sorts before any date-time on the same day.

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use regex_lite::Regex;
use std::sync::LazyLock;

static IN_DAYS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^in[\s-]+(\d+)[\s-]+days?$").ok());
static DAYS_AGO: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(\d+)[\s-]+days?[\s-]+ago$").ok());

const NAIVE_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

const OFFSET_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M%:z", "%Y-%m-%dT%H:%M%z"];

/// A parsed task date: calendar day plus optional local time of day.
///
/// Field order gives the derived ordering: day first, then `None` (bare
/// date) before any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskDate {
    pub day: NaiveDate,
    pub time: Option<NaiveTime>,
}

impl TaskDate {
    pub fn on(day: NaiveDate) -> Self {
        Self { day, time: None }
    }

    /// Calendar key (`YYYY-MM-DD`) used by date indexes.
    pub fn key(&self) -> String {
        format_day(self.day)
    }
}

/// Format a day as `YYYY-MM-DD`.
pub fn format_day(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// Today's date on the local clock.
pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// Parse a stored date or date-time string.
pub fn parse_task_date(raw: &str) -> Option<TaskDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(day) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(TaskDate::on(day));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(from_local(dt.with_timezone(&Local).naive_local()));
    }

    for format in OFFSET_DATETIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, format) {
            return Some(from_local(dt.with_timezone(&Local).naive_local()));
        }
    }

    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
        .map(from_local)
}

fn from_local(dt: NaiveDateTime) -> TaskDate {
    TaskDate {
        day: dt.date(),
        time: Some(dt.time()),
    }
}

/// Resolve a condition value that may be natural language ("today",
/// "in 3 days") or an explicit date.
pub fn resolve_date_value(raw: &str, today: NaiveDate) -> Option<TaskDate> {
    let normalized = raw.trim().to_lowercase();

    let offset_days = match normalized.as_str() {
        "today" => Some(0),
        "tomorrow" => Some(1),
        "yesterday" => Some(-1),
        "next week" | "next-week" => Some(7),
        "last week" | "last-week" => Some(-7),
        other => relative_days(other),
    };

    match offset_days {
        Some(days) => Duration::try_days(days)
            .and_then(|offset| today.checked_add_signed(offset))
            .map(TaskDate::on),
        None => parse_task_date(raw),
    }
}

fn relative_days(s: &str) -> Option<i64> {
    if let Some(caps) = IN_DAYS.as_ref().and_then(|re| re.captures(s)) {
        return caps.get(1)?.as_str().parse::<i64>().ok();
    }
    if let Some(caps) = DAYS_AGO.as_ref().and_then(|re| re.captures(s)) {
        return caps.get(1)?.as_str().parse::<i64>().ok().map(|n| -n);
    }
    None
}

/// Calendar key for a stored date string, if it parses.
pub fn date_key(raw: &str) -> Option<String> {
    parse_task_date(raw).map(|d| d.key())
}
