//! Column type inference and timestamp parsing.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

use super::types::ColumnType;
use crate::input::DataTable;

// Cheap pre-filter so free text never reaches the chrono parsers.
static DATE_LIKE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,4}[-/]\d{1,2}[-/]\d{1,4}").unwrap());

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// Parse a cell as a timestamp. Date-only values land on midnight and
/// offset-qualified values are normalized to UTC.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if !DATE_LIKE.is_match(trimmed) {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Detect the type of a single non-null value.
fn detect_value_type(value: &str) -> ColumnType {
    let trimmed = value.trim();

    if trimmed.eq_ignore_ascii_case("true") || trimmed.eq_ignore_ascii_case("false") {
        return ColumnType::Boolean;
    }

    if trimmed.parse::<i64>().is_ok() {
        return ColumnType::Integer;
    }

    if trimmed.parse::<f64>().is_ok() {
        return ColumnType::Float;
    }

    if NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").is_ok() {
        return ColumnType::Date;
    }

    if parse_timestamp(trimmed).is_some() && (trimmed.contains(':') || trimmed.contains('T')) {
        return ColumnType::DateTime;
    }

    ColumnType::String
}

/// Infer a column's type from all of its non-null values.
///
/// A single value outside the candidate type demotes the column to string,
/// except that integers widen to float and dates widen to datetime. A column
/// with no non-null values is string.
pub fn infer_column_type<'a>(values: impl IntoIterator<Item = &'a str>) -> ColumnType {
    let mut current: Option<ColumnType> = None;

    for value in values {
        if DataTable::is_null_value(value) {
            continue;
        }

        let detected = detect_value_type(value);
        current = Some(match current {
            None => detected,
            Some(prev) if prev == detected => prev,
            Some(prev) if prev.is_numeric() && detected.is_numeric() => ColumnType::Float,
            Some(ColumnType::Date | ColumnType::DateTime)
                if matches!(detected, ColumnType::Date | ColumnType::DateTime) =>
            {
                ColumnType::DateTime
            }
            Some(_) => return ColumnType::String,
        });
    }

    current.unwrap_or(ColumnType::String)
}
