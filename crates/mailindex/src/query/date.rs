//! `date:` value parsing
//!
//! A value is `A..B`, `A..`, `..B` or a single `A`. Each side names a span
//! of local time: `today`, `yesterday`, `thisweek`, `lastweek`,
//! `thismonth`, `lastmonth`, a month name (its most recent occurrence),
//! `YYYY-MM-DD`, `YYYY-MM`, `YYYY`, `MM/DD/YYYY`, `MM/DD` or `@<seconds>`.
//! A range runs from the start of its first span to the end of its last.

use chrono::{Datelike, Days, Local, Months, NaiveDate, TimeZone};

use crate::error::{Error, Result};

/// Inclusive range of Unix timestamps
pub type DateRange = (i64, i64);

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

fn date_error(value: &str) -> Error {
    Error::backend(format!("Unable to parse date: {:?}", value))
}

/// Start of a local day as a Unix timestamp
fn local_midnight(day: NaiveDate) -> Result<i64> {
    let naive = day
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| date_error(&day.to_string()))?;
    let local = Local.from_local_datetime(&naive);
    local
        .earliest()
        .or_else(|| local.latest())
        // Midnight skipped by a DST jump: the day starts an hour later
        .or_else(|| {
            Local
                .from_local_datetime(&(naive + chrono::Duration::hours(1)))
                .earliest()
        })
        .map(|dt| dt.timestamp())
        .ok_or_else(|| date_error(&day.to_string()))
}

/// Half-open span of days `[start, end)`
type DaySpan = (NaiveDate, NaiveDate);

fn month_span(year: i32, month: u32) -> Option<DaySpan> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let end = start.checked_add_months(Months::new(1))?;
    Some((start, end))
}

fn day_span(day: NaiveDate) -> Option<DaySpan> {
    Some((day, day.checked_add_days(Days::new(1))?))
}

fn week_start(day: NaiveDate) -> NaiveDate {
    day - chrono::Duration::days(day.weekday().num_days_from_monday() as i64)
}

fn month_number(name: &str) -> Option<u32> {
    if name.len() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .position(|m| m.starts_with(name))
        .map(|idx| idx as u32 + 1)
}

fn parse_span(value: &str, today: NaiveDate) -> Option<DaySpan> {
    let lower = value.to_ascii_lowercase();
    match lower.as_str() {
        "today" => return day_span(today),
        "yesterday" => return day_span(today.pred_opt()?),
        "thisweek" => {
            let start = week_start(today);
            return Some((start, start + chrono::Duration::days(7)));
        }
        "lastweek" => {
            let end = week_start(today);
            return Some((end - chrono::Duration::days(7), end));
        }
        "thismonth" => return month_span(today.year(), today.month()),
        "lastmonth" => {
            let last = today.with_day(1)?.checked_sub_months(Months::new(1))?;
            return month_span(last.year(), last.month());
        }
        _ => {}
    }

    if let Some(month) = month_number(&lower) {
        let year = if month <= today.month() {
            today.year()
        } else {
            today.year() - 1
        };
        return month_span(year, month);
    }

    if lower.contains('/') {
        let parts: Vec<&str> = lower.split('/').collect();
        let (month, day, year) = match parts.as_slice() {
            [m, d] => (m.parse().ok()?, d.parse().ok()?, today.year()),
            [m, d, y] => (m.parse().ok()?, d.parse().ok()?, y.parse().ok()?),
            _ => return None,
        };
        return day_span(NaiveDate::from_ymd_opt(year, month, day)?);
    }

    let parts: Vec<&str> = lower.split('-').collect();
    match parts.as_slice() {
        [y] if y.len() == 4 => {
            let year: i32 = y.parse().ok()?;
            let start = NaiveDate::from_ymd_opt(year, 1, 1)?;
            Some((start, NaiveDate::from_ymd_opt(year + 1, 1, 1)?))
        }
        [y, m] if y.len() == 4 => month_span(y.parse().ok()?, m.parse().ok()?),
        [y, m, d] if y.len() == 4 => day_span(NaiveDate::from_ymd_opt(
            y.parse().ok()?,
            m.parse().ok()?,
            d.parse().ok()?,
        )?),
        _ => None,
    }
}

/// Resolve one side of a range to `(first second, last second)`
fn parse_point(value: &str, today: NaiveDate) -> Result<DateRange> {
    if let Some(seconds) = value.strip_prefix('@') {
        let ts: i64 = seconds.parse().map_err(|_| date_error(value))?;
        return Ok((ts, ts));
    }
    let (start, end) = parse_span(value, today).ok_or_else(|| date_error(value))?;
    Ok((local_midnight(start)?, local_midnight(end)? - 1))
}

/// Parse a `date:` value relative to `today`.
pub fn parse_range(value: &str, today: NaiveDate) -> Result<DateRange> {
    match value.split_once("..") {
        Some((from, to)) => {
            if from.is_empty() && to.is_empty() {
                return Err(date_error(value));
            }
            let start = if from.is_empty() {
                i64::MIN
            } else {
                parse_point(from, today)?.0
            };
            let end = if to.is_empty() {
                i64::MAX
            } else {
                parse_point(to, today)?.1
            };
            Ok((start, end))
        }
        None => parse_point(value, today),
    }
}

/// Parse a `date:` value relative to the current local date.
pub fn parse_range_now(value: &str) -> Result<DateRange> {
    parse_range(value, Local::now().date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Status;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn midnight(y: i32, m: u32, d: u32) -> i64 {
        local_midnight(day(y, m, d)).unwrap()
    }

    // Wednesday
    fn today() -> NaiveDate {
        day(2024, 3, 13)
    }

    #[test]
    fn test_single_day() {
        assert_eq!(
            parse_range("2024-02-29", today()).unwrap(),
            (midnight(2024, 2, 29), midnight(2024, 3, 1) - 1)
        );
        assert_eq!(
            parse_range("02/29/2024", today()).unwrap(),
            parse_range("2024-02-29", today()).unwrap()
        );
        assert_eq!(
            parse_range("3/1", today()).unwrap(),
            parse_range("2024-03-01", today()).unwrap()
        );
    }

    #[test]
    fn test_month_and_year() {
        assert_eq!(
            parse_range("2023-12", today()).unwrap(),
            (midnight(2023, 12, 1), midnight(2024, 1, 1) - 1)
        );
        assert_eq!(
            parse_range("2023", today()).unwrap(),
            (midnight(2023, 1, 1), midnight(2024, 1, 1) - 1)
        );
    }

    #[test]
    fn test_relative_names() {
        assert_eq!(parse_range("today", today()).unwrap().0, midnight(2024, 3, 13));
        assert_eq!(parse_range("yesterday", today()).unwrap().0, midnight(2024, 3, 12));
        assert_eq!(
            parse_range("thisweek", today()).unwrap(),
            (midnight(2024, 3, 11), midnight(2024, 3, 18) - 1)
        );
        assert_eq!(
            parse_range("lastweek", today()).unwrap(),
            (midnight(2024, 3, 4), midnight(2024, 3, 11) - 1)
        );
        assert_eq!(
            parse_range("lastmonth", today()).unwrap(),
            (midnight(2024, 2, 1), midnight(2024, 3, 1) - 1)
        );
    }

    #[test]
    fn test_month_names_pick_most_recent() {
        assert_eq!(parse_range("feb", today()).unwrap().0, midnight(2024, 2, 1));
        assert_eq!(parse_range("March", today()).unwrap().0, midnight(2024, 3, 1));
        assert_eq!(parse_range("december", today()).unwrap().0, midnight(2023, 12, 1));
    }

    #[test]
    fn test_ranges() {
        assert_eq!(
            parse_range("2024-01-01..2024-01-31", today()).unwrap(),
            (midnight(2024, 1, 1), midnight(2024, 2, 1) - 1)
        );
        assert_eq!(
            parse_range("2024..", today()).unwrap(),
            (midnight(2024, 1, 1), i64::MAX)
        );
        assert_eq!(
            parse_range("..2023", today()).unwrap(),
            (i64::MIN, midnight(2024, 1, 1) - 1)
        );
        assert_eq!(parse_range("@100..@200", today()).unwrap(), (100, 200));
    }

    #[test]
    fn test_bad_dates() {
        for bad in ["..", "soon", "2024-13", "13/45", "ma", "2024-02-30"] {
            let err = parse_range(bad, today()).unwrap_err();
            assert_eq!(err.status(), Status::XapianException, "{}", bad);
        }
    }
}
