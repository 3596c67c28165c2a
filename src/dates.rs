use chrono::{
    DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone,
};

use crate::error::{AnalyticsError, Result};

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Monday = 0 … Sunday = 6.
pub fn day_index(date: NaiveDate) -> usize {
    let native = date.weekday().num_days_from_sunday() as usize;
    (native + 6) % 7
}

pub fn start_of_week(date: NaiveDate) -> NaiveDate {
    date - Duration::days(day_index(date) as i64)
}

pub fn end_of_week(date: NaiveDate) -> NaiveDateTime {
    let last_day = start_of_week(date) + Duration::days(6);
    last_day.and_time(end_of_day_time())
}

/// The plan dot chart and the stability trend both run Sunday through Saturday.
pub fn sunday_start_of_week(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_sunday() as i64)
}

pub fn week_days(start: NaiveDate) -> [NaiveDate; 7] {
    std::array::from_fn(|offset| start + Duration::days(offset as i64))
}

/// Serializes `[start 00:00:00.000, end 23:59:59.999]` in `tz` as RFC 3339.
pub fn to_iso_range<Tz>(start: NaiveDate, end: NaiveDate, tz: &Tz) -> Result<(String, String)>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let start_local = localize(start.and_time(chrono::NaiveTime::MIN), tz)?;
    let end_local = localize(end.and_time(end_of_day_time()), tz)?;
    Ok((
        start_local.to_rfc3339_opts(SecondsFormat::Millis, false),
        end_local.to_rfc3339_opts(SecondsFormat::Millis, false),
    ))
}

/// Parses a timestamp into wall-clock time in `tz`.
///
/// Offset-bearing RFC 3339 values are converted into `tz`; naive values and
/// bare dates are taken as already local.
pub fn parse_timestamp_in<Tz: TimeZone>(value: &str, tz: &Tz) -> Result<NaiveDateTime> {
    let trimmed = value.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(tz).naive_local());
    }

    for format in TIMESTAMP_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(parsed);
        }
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map(|date| date.and_time(chrono::NaiveTime::MIN))
        .map_err(|_| AnalyticsError::InvalidDate(value.to_string()))
}

pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    parse_timestamp_in(value, &Local)
}

pub fn parse_date(value: &str) -> Result<NaiveDate> {
    parse_timestamp(value).map(|timestamp| timestamp.date())
}

pub fn parse_date_in<Tz: TimeZone>(value: &str, tz: &Tz) -> Result<NaiveDate> {
    parse_timestamp_in(value, tz).map(|timestamp| timestamp.date())
}

/// The calendar date in the value's own offset, so a range bound serialized
/// for one zone is read back as that zone's day wherever this runs.
pub fn date_as_written(value: &str) -> Result<NaiveDate> {
    match DateTime::parse_from_rfc3339(value.trim()) {
        Ok(parsed) => Ok(parsed.date_naive()),
        Err(_) => parse_date(value),
    }
}

fn end_of_day_time() -> chrono::NaiveTime {
    chrono::NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(chrono::NaiveTime::MIN)
}

fn localize<Tz: TimeZone>(naive: NaiveDateTime, tz: &Tz) -> Result<DateTime<Tz>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| AnalyticsError::InvalidDate(naive.to_string()))
}

/// An inclusive calendar range, Monday through Sunday by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl WeekRange {
    pub fn containing(date: NaiveDate) -> Self {
        let start = start_of_week(date);
        Self {
            start,
            end: start + Duration::days(6),
        }
    }

    pub fn current(today: NaiveDate) -> Self {
        Self::containing(today)
    }

    /// An explicit range; a reversed pair is swapped rather than rejected.
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        if end < start {
            Self { start: end, end: start }
        } else {
            Self { start, end }
        }
    }

    pub fn iso<Tz>(&self, tz: &Tz) -> Result<(String, String)>
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        to_iso_range(self.start, self.end, tz)
    }
}
