//! Occurrence evaluation for recurring tasks.
//!
//! The engine never interprets recurrence rules itself; it asks an
//! [`OccurrenceEvaluator`] whether a record has an occurrence on a date.
//! [`SimpleRecurrence`] is a small RRULE subset good enough for the CLI.

use crate::query::dates::parse_task_date;
use crate::types::TaskRecord;
use chrono::{Datelike, NaiveDate, Weekday};

/// Decides whether a recurring record is active on a given date.
pub trait OccurrenceEvaluator: Send + Sync {
    fn is_active_on(&self, record: &TaskRecord, date: NaiveDate) -> bool;
}

impl<F> OccurrenceEvaluator for F
where
    F: Fn(&TaskRecord, NaiveDate) -> bool + Send + Sync,
{
    fn is_active_on(&self, record: &TaskRecord, date: NaiveDate) -> bool {
        self(record, date)
    }
}

/// Evaluator for hosts without recurrence support.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRecurrence;

impl OccurrenceEvaluator for NoRecurrence {
    fn is_active_on(&self, _record: &TaskRecord, _date: NaiveDate) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Rule {
    freq: Frequency,
    interval: u32,
    by_day: Vec<Weekday>,
    by_month_day: Vec<u32>,
    until: Option<NaiveDate>,
}

impl Rule {
    fn parse(raw: &str) -> Option<Self> {
        let body = raw.trim();
        let body = body.strip_prefix("RRULE:").unwrap_or(body);

        let mut freq = None;
        let mut interval = 1;
        let mut by_day = Vec::new();
        let mut by_month_day = Vec::new();
        let mut until = None;

        for part in body.split(';').filter(|p| !p.is_empty()) {
            let (key, value) = part.split_once('=')?;
            match key.trim().to_ascii_uppercase().as_str() {
                "FREQ" => {
                    freq = Some(match value.trim().to_ascii_uppercase().as_str() {
                        "DAILY" => Frequency::Daily,
                        "WEEKLY" => Frequency::Weekly,
                        "MONTHLY" => Frequency::Monthly,
                        "YEARLY" => Frequency::Yearly,
                        _ => return None,
                    })
                }
                "INTERVAL" => interval = value.trim().parse::<u32>().ok().filter(|n| *n > 0)?,
                "BYDAY" => {
                    by_day = value
                        .split(',')
                        .map(parse_weekday)
                        .collect::<Option<Vec<_>>>()?
                }
                "BYMONTHDAY" => {
                    by_month_day = value
                        .split(',')
                        .map(|d| d.trim().parse::<u32>().ok())
                        .collect::<Option<Vec<_>>>()?
                }
                "UNTIL" => {
                    let digits: String = value.chars().take(8).collect();
                    until = NaiveDate::parse_from_str(&digits, "%Y%m%d").ok();
                }
                _ => {}
            }
        }

        Some(Self {
            freq: freq?,
            interval,
            by_day,
            by_month_day,
            until,
        })
    }

    fn is_active_on(&self, anchor: NaiveDate, date: NaiveDate) -> bool {
        if date < anchor || self.until.is_some_and(|until| date > until) {
            return false;
        }
        let interval = i64::from(self.interval);

        match self.freq {
            Frequency::Daily => (date - anchor).num_days() % interval == 0,
            Frequency::Weekly => {
                let week_start = |d: NaiveDate| d - chrono::Duration::days(i64::from(d.weekday().num_days_from_monday()));
                let weeks = (week_start(date) - week_start(anchor)).num_days() / 7;
                let on_day = if self.by_day.is_empty() {
                    date.weekday() == anchor.weekday()
                } else {
                    self.by_day.contains(&date.weekday())
                };
                on_day && weeks % interval == 0
            }
            Frequency::Monthly => {
                let months = i64::from(date.year() - anchor.year()) * 12
                    + i64::from(date.month()) - i64::from(anchor.month());
                let on_day = if self.by_month_day.is_empty() {
                    date.day() == anchor.day()
                } else {
                    self.by_month_day.contains(&date.day())
                };
                on_day && months % interval == 0
            }
            Frequency::Yearly => {
                let years = i64::from(date.year() - anchor.year());
                date.month() == anchor.month()
                    && date.day() == anchor.day()
                    && years % interval == 0
            }
        }
    }
}

fn parse_weekday(s: &str) -> Option<Weekday> {
    match s.trim().to_ascii_uppercase().as_str() {
        "MO" => Some(Weekday::Mon),
        "TU" => Some(Weekday::Tue),
        "WE" => Some(Weekday::Wed),
        "TH" => Some(Weekday::Thu),
        "FR" => Some(Weekday::Fri),
        "SA" => Some(Weekday::Sat),
        "SU" => Some(Weekday::Sun),
        _ => None,
    }
}

/// RRULE subset: `FREQ` (daily/weekly/monthly/yearly), `INTERVAL`, `BYDAY`,
/// `BYMONTHDAY` and `UNTIL`.
///
/// Occurrences are anchored at the scheduled date, else the due date, else
/// the creation date. Unparseable rules are never active.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleRecurrence;

impl SimpleRecurrence {
    fn anchor(record: &TaskRecord) -> Option<NaiveDate> {
        [&record.scheduled, &record.due, &record.date_created]
            .into_iter()
            .flatten()
            .find_map(|raw| parse_task_date(raw))
            .map(|d| d.day)
    }
}

impl OccurrenceEvaluator for SimpleRecurrence {
    fn is_active_on(&self, record: &TaskRecord, date: NaiveDate) -> bool {
        let Some(rule) = record.recurrence.as_deref().and_then(Rule::parse) else {
            return false;
        };
        match Self::anchor(record) {
            Some(anchor) => rule.is_active_on(anchor, date),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn recurring(rule: &str, anchor: &str) -> TaskRecord {
        let mut task = TaskRecord::new("r.md", "Recurring");
        task.recurrence = Some(rule.to_string());
        task.scheduled = Some(anchor.to_string());
        task
    }

    #[test]
    fn test_daily_with_interval() {
        let task = recurring("FREQ=DAILY;INTERVAL=2", "2025-03-01");
        assert!(SimpleRecurrence.is_active_on(&task, day("2025-03-01")));
        assert!(!SimpleRecurrence.is_active_on(&task, day("2025-03-02")));
        assert!(SimpleRecurrence.is_active_on(&task, day("2025-03-03")));
        assert!(!SimpleRecurrence.is_active_on(&task, day("2025-02-27")));
    }

    #[test]
    fn test_weekly_by_day() {
        // 2025-03-10 is a Monday
        let task = recurring("RRULE:FREQ=WEEKLY;BYDAY=MO,WE", "2025-03-03");
        assert!(SimpleRecurrence.is_active_on(&task, day("2025-03-10")));
        assert!(SimpleRecurrence.is_active_on(&task, day("2025-03-12")));
        assert!(!SimpleRecurrence.is_active_on(&task, day("2025-03-11")));
    }

    #[test]
    fn test_monthly_and_until() {
        let task = recurring("FREQ=MONTHLY;BYMONTHDAY=15;UNTIL=20250501", "2025-01-15");
        assert!(SimpleRecurrence.is_active_on(&task, day("2025-03-15")));
        assert!(!SimpleRecurrence.is_active_on(&task, day("2025-03-16")));
        assert!(!SimpleRecurrence.is_active_on(&task, day("2025-06-15")));
    }

    #[test]
    fn test_yearly() {
        let task = recurring("FREQ=YEARLY", "2024-07-04");
        assert!(SimpleRecurrence.is_active_on(&task, day("2025-07-04")));
        assert!(!SimpleRecurrence.is_active_on(&task, day("2025-07-05")));
    }

    #[test]
    fn test_invalid_rule_or_missing_anchor_is_inactive() {
        let task = recurring("FREQ=HOURLY", "2025-03-01");
        assert!(!SimpleRecurrence.is_active_on(&task, day("2025-03-01")));

        let mut task = TaskRecord::new("x.md", "No anchor");
        task.recurrence = Some("FREQ=DAILY".to_string());
        assert!(!SimpleRecurrence.is_active_on(&task, day("2025-03-01")));
    }

    #[test]
    fn test_closure_evaluator() {
        let eval = |_: &TaskRecord, d: NaiveDate| d == day("2025-03-10");
        let task = TaskRecord::new("x.md", "X");
        assert!(eval.is_active_on(&task, day("2025-03-10")));
        assert!(!NoRecurrence.is_active_on(&task, day("2025-03-10")));
    }
}
