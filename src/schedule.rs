//! Due Date Mapping
//!
//! Tasks keep a date and an optional time locally, while the remote row
//! stores a single `due_date` timestamp. Both directions live here so the
//! mapping can be tested on its own.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

/// When a task is due: a calendar date plus an optional wall-clock time.
///
/// A time of exactly midnight is the same instant as "no time" once it is
/// stored remotely, so it is normalized to `None` on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Schedule {
    date: NaiveDate,
    time: Option<NaiveTime>,
}

impl Schedule {
    /// Seconds are dropped and midnight becomes `None`, so an explicit
    /// `00:00` input does not round-trip literally: `time_string` gives `""`.
    pub fn new(date: NaiveDate, time: Option<NaiveTime>) -> Self {
        let time = time
            .map(|t| t.with_second(0).and_then(|t| t.with_nanosecond(0)).unwrap_or(t))
            .filter(|t| *t != NaiveTime::MIN);
        Self { date, time }
    }

    /// Build from form input: `YYYY-MM-DD` and `HH:MM` (empty time = none).
    ///
    /// `"00:00"` is accepted and reads back as no time, see [`Schedule::new`].
    pub fn parse(date: &str, time: &str) -> Option<Self> {
        let date = NaiveDate::parse_from_str(date.trim(), DATE_FORMAT).ok()?;
        let time = match time.trim() {
            "" => None,
            t => Some(NaiveTime::parse_from_str(t, TIME_FORMAT).ok()?),
        };
        Some(Self::new(date, time))
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn time(&self) -> Option<NaiveTime> {
        self.time
    }

    /// Date as `YYYY-MM-DD`
    pub fn date_string(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }

    /// Time as `HH:MM`, or empty when unset
    pub fn time_string(&self) -> String {
        self.time
            .map(|t| t.format(TIME_FORMAT).to_string())
            .unwrap_or_default()
    }

    /// Combine into the remote `due_date` value (`YYYY-MM-DDTHH:MM:00`)
    pub fn to_due_date(&self) -> String {
        let time = self.time.unwrap_or(NaiveTime::MIN);
        format!("{}T{}:00", self.date_string(), time.format(TIME_FORMAT))
    }

    /// Split a remote `due_date` back into date and time.
    ///
    /// Accepts a full timestamp with or without seconds, fraction and
    /// offset, or a bare date. The wall-clock fields are taken as written;
    /// no offset is applied.
    pub fn from_due_date(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            let local = dt.naive_local();
            return Some(Self::new(local.date(), Some(local.time())));
        }
        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
                return Some(Self::new(dt.date(), Some(dt.time())));
            }
        }
        // Offsets without a colon (`+0000`) or other trailing noise: fall back to the leading fields
        let date = NaiveDate::parse_from_str(raw.get(..10)?, DATE_FORMAT).ok()?;
        let time = raw
            .get(11..16)
            .and_then(|t| NaiveTime::parse_from_str(t, TIME_FORMAT).ok());
        Some(Self::new(date, time))
    }
}

/// Combine optional form fields into a remote `due_date`.
///
/// Missing time means midnight; missing or invalid date means no due date.
pub fn combine(date: &str, time: &str) -> Option<String> {
    Schedule::parse(date, time).map(|s| s.to_due_date())
}

/// Split a remote `due_date` into form fields (`""` when absent).
pub fn split(due_date: Option<&str>) -> (String, String) {
    match due_date.and_then(Schedule::from_due_date) {
        Some(s) => (s.date_string(), s.time_string()),
        None => (String::new(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_with_time() {
        for (d, t) in [("2026-01-08", "14:30"), ("2024-02-29", "23:59"), ("1999-12-31", "00:01")] {
            let due = combine(d, t).unwrap();
            assert_eq!(split(Some(&due)), (d.to_string(), t.to_string()));
        }
    }

    #[test]
    fn test_missing_time_is_midnight() {
        let due = combine("2026-01-08", "").unwrap();
        assert_eq!(due, "2026-01-08T00:00:00");
        assert_eq!(split(Some(&due)), ("2026-01-08".to_string(), String::new()));
    }

    #[test]
    fn test_explicit_midnight_normalizes_to_no_time() {
        let s = Schedule::parse("2026-01-08", "00:00").unwrap();
        assert_eq!(s.time(), None);
        assert_eq!(s, Schedule::parse("2026-01-08", "").unwrap());
        assert_eq!(s.time_string(), "");
        assert_eq!(split(Some(&combine("2026-01-08", "00:00").unwrap())), ("2026-01-08".to_string(), String::new()));
    }

    #[test]
    fn test_split_ignores_offset() {
        assert_eq!(
            split(Some("2026-01-08T14:30:00+05:00")),
            ("2026-01-08".to_string(), "14:30".to_string())
        );
        assert_eq!(
            split(Some("2026-01-08T14:30:00.123456+00:00")),
            ("2026-01-08".to_string(), "14:30".to_string())
        );
        assert_eq!(
            split(Some("2026-01-08T09:05:00+0000")),
            ("2026-01-08".to_string(), "09:05".to_string())
        );
    }

    #[test]
    fn test_bare_date_and_empty() {
        assert_eq!(split(Some("2026-01-08")), ("2026-01-08".to_string(), String::new()));
        assert_eq!(split(None), (String::new(), String::new()));
        assert_eq!(split(Some("")), (String::new(), String::new()));
        assert_eq!(combine("", "10:00"), None);
        assert_eq!(combine("not-a-date", ""), None);
    }

    #[test]
    fn test_invalid_time_rejected() {
        assert!(Schedule::parse("2026-01-08", "25:00").is_none());
    }
}
