//! Expands station and parameter selections into one [`QueryKey`] per pair.

use crate::query::payload::{DataKind, Network, QueryPayload};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One id or a list of ids (stations or parameters).
///
/// # Examples
///
/// ```
/// use qualar::Ids;
///
/// assert_eq!(Ids::from(63).as_slice(), &[63]);
/// assert_eq!(Ids::from(vec![63, 17]).as_slice(), &[63, 17]);
/// assert_eq!(Ids::from([25, 28, 24, 23]).len(), 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ids(Vec<u32>);

impl Ids {
    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<u32> for Ids {
    fn from(id: u32) -> Self {
        Ids(vec![id])
    }
}

impl From<Vec<u32>> for Ids {
    fn from(ids: Vec<u32>) -> Self {
        Ids(ids)
    }
}

impl From<&[u32]> for Ids {
    fn from(ids: &[u32]) -> Self {
        Ids(ids.to_vec())
    }
}

impl<const N: usize> From<[u32; N]> for Ids {
    fn from(ids: [u32; N]) -> Self {
        Ids(ids.to_vec())
    }
}

/// Identifies one scrape request: a station, a parameter and an inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryKey {
    pub station_id: u32,
    pub parameter_id: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl QueryKey {
    pub fn new(station_id: u32, parameter_id: u32, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            station_id,
            parameter_id,
            start_date,
            end_date,
        }
    }

    /// The point-data form payload for this key.
    pub fn payload(&self) -> QueryPayload {
        QueryPayload {
            network: Network::Automatic,
            start_date: self.start_date,
            end_date: self.end_date,
            data_kind: DataKind::Point,
            station_id: self.station_id,
            parameter_id: self.parameter_id,
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "station {} parameter {} ({} to {})",
            self.station_id, self.parameter_id, self.start_date, self.end_date
        )
    }
}

/// Builds the Cartesian product of `stations` and `parameters`.
///
/// Keys are ordered station-major: every parameter of the first station, then
/// every parameter of the second, and so on. Callers assembling wide tables rely
/// on this order. Duplicate ids are kept, producing duplicate keys.
pub fn build_queries(
    stations: impl Into<Ids>,
    parameters: impl Into<Ids>,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Vec<QueryKey> {
    let stations = stations.into();
    let parameters = parameters.into();

    let mut keys = Vec::with_capacity(stations.len() * parameters.len());
    for &station_id in stations.as_slice() {
        for &parameter_id in parameters.as_slice() {
            keys.push(QueryKey::new(station_id, parameter_id, start_date, end_date));
        }
    }
    keys
}
