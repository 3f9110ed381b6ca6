//! Shared encode/decode helpers for SQLite ↔ domain type conversions.
//!
//! Dates, timestamps and enum codes are all stored as `TEXT`. These helpers
//! fix the on-disk formats in one place and turn malformed cells into
//! [`StoreError::Decode`] instead of panicking.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::str::FromStr;

use super::value::Value;
use crate::error::{StoreError, StoreResult};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const TIME_FORMAT: &str = "%H:%M:%S";

// ── Encoding ───────────────────────────────────────────────────────────

pub fn date_value(date: NaiveDate) -> Value {
    Value::Text(date.format(DATE_FORMAT).to_string())
}

pub fn opt_date_value(date: Option<NaiveDate>) -> Value {
    date.map_or(Value::Null, date_value)
}

pub fn timestamp_value(at: NaiveDateTime) -> Value {
    Value::Text(at.format(TIMESTAMP_FORMAT).to_string())
}

pub fn opt_timestamp_value(at: Option<NaiveDateTime>) -> Value {
    at.map_or(Value::Null, timestamp_value)
}

pub fn time_value(time: NaiveTime) -> Value {
    Value::Text(time.format(TIME_FORMAT).to_string())
}

/// Current local wall-clock time, truncated to whole seconds.
pub fn now() -> NaiveDateTime {
    let now = chrono::Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

// ── Parsing ────────────────────────────────────────────────────────────

/// Parse a stored date. Timestamps are accepted and truncated to their day.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, DATE_FORMAT).ok()
}

/// Parse a stored timestamp, with or without fractional seconds or a `T`
/// separator. A bare date is read as midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| parse_date(raw).and_then(|d| d.and_hms_opt(0, 0, 0)))
}

pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

// ── Row access ─────────────────────────────────────────────────────────

fn decode_error(column: &str, message: impl Into<String>) -> StoreError {
    StoreError::Decode {
        column: column.to_string(),
        message: message.into(),
    }
}

fn get_opt_text(row: &SqliteRow, column: &str) -> StoreResult<Option<String>> {
    Ok(row.try_get::<Option<String>, _>(column)?)
}

fn parsed<T>(
    row: &SqliteRow,
    column: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> StoreResult<Option<T>> {
    match get_opt_text(row, column)? {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => parse(&raw)
            .map(Some)
            .ok_or_else(|| decode_error(column, format!("cannot parse {raw:?}"))),
    }
}

fn required<T>(column: &str, value: Option<T>) -> StoreResult<T> {
    value.ok_or_else(|| decode_error(column, "unexpected NULL"))
}

pub fn get_date(row: &SqliteRow, column: &str) -> StoreResult<NaiveDate> {
    required(column, parsed(row, column, parse_date)?)
}

pub fn get_opt_date(row: &SqliteRow, column: &str) -> StoreResult<Option<NaiveDate>> {
    parsed(row, column, parse_date)
}

pub fn get_opt_timestamp(row: &SqliteRow, column: &str) -> StoreResult<Option<NaiveDateTime>> {
    parsed(row, column, parse_timestamp)
}

pub fn get_time(row: &SqliteRow, column: &str) -> StoreResult<NaiveTime> {
    required(column, parsed(row, column, parse_time)?)
}

/// Decode a stored enum code.
pub fn get_code<T: FromStr>(row: &SqliteRow, column: &str) -> StoreResult<T>
where
    T::Err: std::fmt::Display,
{
    required(column, get_opt_code(row, column)?)
}

pub fn get_opt_code<T: FromStr>(row: &SqliteRow, column: &str) -> StoreResult<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match get_opt_text(row, column)? {
        None => Ok(None),
        Some(raw) if raw.is_empty() => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| decode_error(column, e.to_string())),
    }
}

/// Read a display column that only joined queries select.
///
/// Returns `None` when the column is absent from the result set.
pub fn get_joined<T>(row: &SqliteRow, column: &str) -> StoreResult<Option<T>>
where
    T: for<'r> sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    match row.try_get::<Option<T>, _>(column) {
        Ok(value) => Ok(value),
        Err(sqlx::Error::ColumnNotFound(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Joined counterpart of [`get_opt_code`].
pub fn get_joined_code<T: FromStr>(row: &SqliteRow, column: &str) -> StoreResult<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match get_opt_code(row, column) {
        Err(StoreError::Database(sqlx::Error::ColumnNotFound(_))) => Ok(None),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_accept_timestamp_text() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(parse_date("2024-03-09"), Some(d));
        assert_eq!(parse_date("2024-03-09 14:22:01"), Some(d));
        assert_eq!(parse_date("09/03/2024"), None);
    }

    #[test]
    fn timestamps_accept_common_layouts() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 22, 1)
            .unwrap();
        assert_eq!(parse_timestamp("2024-03-09 14:22:01"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-09T14:22:01"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-03-09"),
            NaiveDate::from_ymd_opt(2024, 3, 9).unwrap().and_hms_opt(0, 0, 0)
        );
    }

    #[test]
    fn times_accept_optional_seconds() {
        let t = NaiveTime::from_hms_opt(19, 30, 0).unwrap();
        assert_eq!(parse_time("19:30"), Some(t));
        assert_eq!(parse_time("19:30:00"), Some(t));
        assert_eq!(time_value(t), Value::Text("19:30:00".into()));
        let with_seconds = NaiveTime::from_hms_opt(9, 30, 15).unwrap();
        assert_eq!(time_value(with_seconds), Value::Text("09:30:15".into()));
    }

    #[test]
    fn encoded_values_parse_back() {
        let at = now();
        let Value::Text(text) = timestamp_value(at) else {
            panic!("expected text");
        };
        assert_eq!(parse_timestamp(&text), Some(at));
        assert_eq!(opt_date_value(None), Value::Null);
    }
}
