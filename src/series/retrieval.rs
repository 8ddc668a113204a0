use crate::error::QualarError;
use crate::query::builder::QueryKey;
use crate::scrape::table_scraper::scrape;
use crate::series::error::SeriesError;
use crate::series::reconcile::{observed_frame, reconcile};
use crate::session::Session;
use crate::types::measurement::measurements_from_rows;
use log::warn;
use polars::prelude::*;

pub const STATION_ID_COLUMN: &str = "station_id";
pub const PARAMETER_ID_COLUMN: &str = "parameter_id";

/// The table retrieved for one [`QueryKey`].
#[derive(Debug, Clone)]
pub struct RetrievedSeries {
    pub key: QueryKey,
    pub frame: DataFrame,
}

/// Everything one retrieval produced, in station-major key order.
#[derive(Debug, Clone, Default)]
pub struct Retrieval {
    pub series: Vec<RetrievedSeries>,
}

impl Retrieval {
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RetrievedSeries> {
        self.series.iter()
    }

    /// First series retrieved for a station and parameter.
    pub fn get(&self, station_id: u32, parameter_id: u32) -> Option<&RetrievedSeries> {
        self.series
            .iter()
            .find(|s| s.key.station_id == station_id && s.key.parameter_id == parameter_id)
    }

    /// Stacks every series into one frame, tagging rows with `station_id` and
    /// `parameter_id`.
    pub fn to_frame(&self) -> Result<DataFrame, SeriesError> {
        if self.series.is_empty() {
            return Ok(DataFrame::empty());
        }

        let frames: Vec<LazyFrame> = self
            .series
            .iter()
            .map(|s| {
                s.frame.clone().lazy().with_columns([
                    lit(s.key.station_id)
                        .cast(DataType::UInt32)
                        .alias(STATION_ID_COLUMN),
                    lit(s.key.parameter_id)
                        .cast(DataType::UInt32)
                        .alias(PARAMETER_ID_COLUMN),
                ])
            })
            .collect();

        Ok(concat(frames, UnionArgs::default())?.collect()?)
    }
}

impl IntoIterator for Retrieval {
    type Item = RetrievedSeries;
    type IntoIter = std::vec::IntoIter<RetrievedSeries>;

    fn into_iter(self) -> Self::IntoIter {
        self.series.into_iter()
    }
}

/// Scrapes every key through one session, in order.
///
/// With `all_dates` each table is reconciled onto the key's full hourly index,
/// otherwise it holds only the hours the portal returned.
pub(crate) async fn retrieve_keys(
    session: &Session,
    keys: &[QueryKey],
    all_dates: bool,
) -> Result<Retrieval, QualarError> {
    let mut series = Vec::with_capacity(keys.len());

    for key in keys {
        let rows = scrape(session, key).await?.into_rows();
        let measurements = measurements_from_rows(rows).inspect_err(|e| {
            warn!("Unusable table for {}: {}", key, e);
        })?;

        let frame = if all_dates {
            reconcile(key.start_date, key.end_date, &measurements)?.frame
        } else {
            observed_frame(&measurements)?
        };
        series.push(RetrievedSeries { key: *key, frame });
    }

    Ok(Retrieval { series })
}
