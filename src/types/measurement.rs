use crate::series::error::SeriesError;
use crate::series::normalize::{normalize, parse_value};
use crate::types::raw_row::RawRow;
use chrono::NaiveDateTime;

/// A typed reading built from exactly one [`RawRow`].
///
/// `timestamp` is timezone-naive and already normalised, so a `24:00` row is
/// stored as `00:00` of the next day. `day` and `hour` keep the portal's labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub timestamp: NaiveDateTime,
    pub day: String,
    pub hour: String,
    pub station_name: String,
    pub parameter_name: String,
    pub unit: String,
    pub value: f64,
}

impl TryFrom<RawRow> for Measurement {
    type Error = SeriesError;

    fn try_from(row: RawRow) -> Result<Self, Self::Error> {
        let timestamp = normalize(&row.day, &row.hour)?;
        let value = parse_value(&row.value)?;
        Ok(Measurement {
            timestamp,
            day: row.day,
            hour: row.hour,
            station_name: row.station_name,
            parameter_name: row.parameter_name,
            unit: row.unit,
            value,
        })
    }
}

/// Converts every row, failing on the first malformed timestamp or value.
pub fn measurements_from_rows(rows: Vec<RawRow>) -> Result<Vec<Measurement>, SeriesError> {
    rows.into_iter().map(Measurement::try_from).collect()
}
