//! Lenient date coercion.
//!
//! Transaction dates arrive as free text (`2015-03-01 00:00:00`, `2015-03`,
//! `3/1/2015`, ...). Anything that cannot be read as a date becomes a missing
//! value instead of an error.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;

/// ISO-like prefix: year, month and optional day, any trailing time ignored.
static ISO_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d{4})[-/.](\d{1,2})(?:[-/.](\d{1,2}))?").expect("valid date regex")
});

/// Fallback formats, tried in order after the ISO prefix.
const FALLBACK_DATE_FORMATS: [&str; 4] = ["%m/%d/%Y", "%d/%m/%Y", "%Y%m%d", "%d %b %Y"];
const FALLBACK_DATETIME_FORMATS: [&str; 2] = ["%m/%d/%Y %H:%M:%S", "%m/%d/%Y %H:%M"];

/// Days between 0001-01-01 (CE day 1) and 1970-01-01.
const UNIX_EPOCH_FROM_CE: i32 = 719_163;

/// Parse a single date string, returning `None` when it is not a date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(caps) = ISO_PREFIX.captures(trimmed) {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps.get(3).map_or(Some(1), |d| d.as_str().parse().ok())?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    FALLBACK_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .map(|dt| dt.date())
        .or_else(|| {
            FALLBACK_DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        })
}

/// Convert a date to days since the Unix epoch (polars' `Date` physical type).
pub fn to_epoch_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_FROM_CE
}

/// Convert days since the Unix epoch back to a date.
pub fn from_epoch_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_FROM_CE)
}

/// Read any column as optional dates.
///
/// Date and datetime columns are converted directly; everything else is
/// rendered as text and parsed leniently.
pub fn column_dates(series: &Series) -> PolarsResult<Vec<Option<NaiveDate>>> {
    match series.dtype() {
        DataType::Date | DataType::Datetime(_, _) => {
            let days = series.cast(&DataType::Date)?.cast(&DataType::Int32)?;
            Ok(days
                .i32()?
                .into_iter()
                .map(|d| d.and_then(from_epoch_days))
                .collect())
        }
        _ => {
            let text = series.cast(&DataType::String)?;
            Ok(text
                .str()?
                .into_iter()
                .map(|v| v.and_then(parse_date))
                .collect())
        }
    }
}

/// Coerce a column into a polars `Date` series with the same name.
///
/// Unparseable values become null.
pub fn coerce_to_date(series: &Series) -> PolarsResult<Series> {
    let days: Vec<Option<i32>> = column_dates(series)?
        .into_iter()
        .map(|d| d.map(to_epoch_days))
        .collect();
    Series::new(series.name().clone(), days).cast(&DataType::Date)
}

/// Calendar year of every row, `None` where the date is missing.
pub fn years(series: &Series) -> PolarsResult<Vec<Option<i32>>> {
    Ok(column_dates(series)?
        .into_iter()
        .map(|d| d.map(|date| date.year()))
        .collect())
}

/// `YYYY-MM` period label of every row, `None` where the date is missing.
pub fn month_periods(series: &Series) -> PolarsResult<Vec<Option<String>>> {
    Ok(column_dates(series)?
        .into_iter()
        .map(|d| d.map(|date| format!("{:04}-{:02}", date.year(), date.month())))
        .collect())
}
