//! Conversion of the portal's day/hour/value text into typed values.

use crate::query::payload::PORTAL_DATE_FORMAT;
use crate::series::error::SeriesError;
use chrono::{Days, NaiveDate, NaiveDateTime};

/// Format of the joined `day_hour` string.
pub const PORTAL_TIMESTAMP_FORMAT: &str = "%d/%m/%Y_%H:%M";

/// Turns a portal day (`dd/mm/yyyy`) and hour (`HH:MM`) into a timestamp.
///
/// The portal reports hours 01:00 to 24:00, where hour 24 of day D is hour 0 of
/// day D+1. That case is rewritten to `00` before parsing and shifted by one
/// calendar day afterwards; every other hour is parsed as is.
///
/// # Examples
///
/// ```
/// use qualar::normalize;
/// use chrono::NaiveDate;
///
/// let midnight = normalize("31/12/2020", "24:00").unwrap();
/// assert_eq!(midnight, NaiveDate::from_ymd_opt(2021, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap());
/// ```
///
/// # Errors
///
/// Returns [`SeriesError::InvalidTimestamp`] if the text does not match
/// `dd/mm/yyyy_HH:MM`.
pub fn normalize(day: &str, hour: &str) -> Result<NaiveDateTime, SeriesError> {
    let invalid = |source| SeriesError::InvalidTimestamp {
        day: day.to_string(),
        hour: hour.to_string(),
        source,
    };

    match hour.strip_prefix("24") {
        Some(minutes) => {
            let stamp = format!("{}_00{}", day, minutes);
            let parsed =
                NaiveDateTime::parse_from_str(&stamp, PORTAL_TIMESTAMP_FORMAT).map_err(invalid)?;
            parsed
                .checked_add_days(Days::new(1))
                .ok_or_else(|| SeriesError::DateOverflow(day.to_string()))
        }
        None => {
            let stamp = format!("{}_{}", day, hour);
            NaiveDateTime::parse_from_str(&stamp, PORTAL_TIMESTAMP_FORMAT).map_err(invalid)
        }
    }
}

/// Parses a value cell, accepting a comma as decimal separator.
///
/// # Errors
///
/// Returns [`SeriesError::MalformedValue`]; an unparsable value means the table
/// layout is not what the scraper expects, so it is never turned into a null.
pub fn parse_value(text: &str) -> Result<f64, SeriesError> {
    text.trim()
        .replace(',', ".")
        .parse::<f64>()
        .map_err(|source| SeriesError::MalformedValue {
            value: text.to_string(),
            source,
        })
}

/// Parses a `dd/mm/yyyy` date as typed in the portal's query form.
pub fn parse_portal_date(text: &str) -> Result<NaiveDate, SeriesError> {
    NaiveDate::parse_from_str(text.trim(), PORTAL_DATE_FORMAT)
        .map_err(|e| SeriesError::InvalidDate(text.to_string(), e))
}
