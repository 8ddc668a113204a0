//! Aligns scraped measurements onto a complete hourly grid.
//!
//! The portal only returns hours it has data for. Reconciliation builds the full
//! expected index for the requested dates and left-joins the measurements onto
//! it, so missing hours become explicit nulls. Series for different parameters
//! over the same dates therefore always have the same length and can be zipped
//! column by column.

use crate::series::error::SeriesError;
use crate::types::measurement::Measurement;
use chrono::{Days, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use polars::prelude::*;

pub const DATE_COLUMN: &str = "date";
pub const DAY_COLUMN: &str = "day";
pub const HOUR_COLUMN: &str = "hour";
pub const STATION_NAME_COLUMN: &str = "station_name";
pub const PARAMETER_NAME_COLUMN: &str = "parameter_name";
pub const UNIT_COLUMN: &str = "unit";
pub const VALUE_COLUMN: &str = "value";

/// Every hour from `start` 00:00 through `end + 1 day` 00:00, both ends included.
///
/// The closing slot is where the portal's `24:00` reading of `end` lands, so a
/// range of `n` days has `n * 24 + 1` slots. An `end` before `start` gives an
/// empty index.
pub fn hourly_index(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDateTime> {
    let first = start.and_time(NaiveTime::MIN);
    let last = match end.checked_add_days(Days::new(1)) {
        Some(next) => next.and_time(NaiveTime::MIN),
        None => end.and_time(NaiveTime::MIN) + Duration::hours(23),
    };
    if last < first {
        return Vec::new();
    }

    let mut index = Vec::with_capacity((last - first).num_hours() as usize + 1);
    let mut current = first;
    while current <= last {
        index.push(current);
        current += Duration::hours(1);
    }
    index
}

/// A gap-filled hourly series for one date range.
///
/// `frame` has the columns `date, day, hour, station_name, parameter_name, unit,
/// value` with one row per slot of [`hourly_index`]; hours without a measurement
/// are null in every column but `date`.
#[derive(Debug, Clone)]
pub struct ReconciledSeries {
    pub frame: DataFrame,
    index: Vec<NaiveDateTime>,
}

impl ReconciledSeries {
    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    /// The value column, aligned with [`ReconciledSeries::index`].
    pub fn values(&self) -> Result<Vec<Option<f64>>, SeriesError> {
        Ok(self.frame.column(VALUE_COLUMN)?.f64()?.into_iter().collect())
    }

    /// Number of slots holding a measurement.
    pub fn present(&self) -> Result<usize, SeriesError> {
        let nulls = self.frame.column(VALUE_COLUMN)?.null_count();
        Ok(self.frame.height() - nulls)
    }
}

/// Builds the measurement table, one row per measurement, in input order.
pub fn measurements_frame(measurements: &[Measurement]) -> Result<DataFrame, SeriesError> {
    let frame = df!(
        DATE_COLUMN => measurements.iter().map(|m| m.timestamp).collect::<Vec<_>>(),
        DAY_COLUMN => measurements.iter().map(|m| m.day.as_str()).collect::<Vec<_>>(),
        HOUR_COLUMN => measurements.iter().map(|m| m.hour.as_str()).collect::<Vec<_>>(),
        STATION_NAME_COLUMN => measurements.iter().map(|m| m.station_name.as_str()).collect::<Vec<_>>(),
        PARAMETER_NAME_COLUMN => measurements.iter().map(|m| m.parameter_name.as_str()).collect::<Vec<_>>(),
        UNIT_COLUMN => measurements.iter().map(|m| m.unit.as_str()).collect::<Vec<_>>(),
        VALUE_COLUMN => measurements.iter().map(|m| m.value).collect::<Vec<_>>()
    )?;
    Ok(frame)
}

/// The measurement table sorted by timestamp, without gap filling.
pub fn observed_frame(measurements: &[Measurement]) -> Result<DataFrame, SeriesError> {
    let frame = measurements_frame(measurements)?
        .lazy()
        .sort_by_exprs(
            [col(DATE_COLUMN)],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .collect()?;
    Ok(frame)
}

/// Reconciles `measurements` onto the hourly index of `start..=end`.
///
/// Measurements whose timestamp is not a slot of the index are left out. With no
/// measurements at all the result is still the full index, all values null.
pub fn reconcile(
    start: NaiveDate,
    end: NaiveDate,
    measurements: &[Measurement],
) -> Result<ReconciledSeries, SeriesError> {
    reconcile_frame(start, end, measurements_frame(measurements)?)
}

/// Left-joins any frame with a `date` column onto the hourly index of `start..=end`.
///
/// Only the first row of each `date` is kept, so the result has exactly one row
/// per slot. Applying it to the frame of a series it produced, over the same
/// dates, returns an equal frame.
pub fn reconcile_frame(
    start: NaiveDate,
    end: NaiveDate,
    observed: DataFrame,
) -> Result<ReconciledSeries, SeriesError> {
    let index = hourly_index(start, end);
    let index_frame = df!(DATE_COLUMN => index.clone())?;
    let observed = observed
        .lazy()
        .unique_stable(Some(vec![DATE_COLUMN.into()]), UniqueKeepStrategy::First);

    let frame = index_frame
        .lazy()
        .left_join(observed, col(DATE_COLUMN), col(DATE_COLUMN))
        .sort_by_exprs(
            [col(DATE_COLUMN)],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .collect()?;

    Ok(ReconciledSeries { frame, index })
}
