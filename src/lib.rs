mod batch;
mod error;
mod qualar;
mod query;
mod scrape;
mod series;
mod session;
mod types;
mod utils;

#[cfg(test)]
mod test_support;

pub use error::QualarError;
pub use qualar::*;

pub use query::builder::{build_queries, Ids, QueryKey};
pub use query::payload::{DataKind, Network, QueryPayload, PORTAL_DATE_FORMAT};

pub use session::credentials::{Credentials, LOGIN_ENV, PASSWORD_ENV};
pub use session::error::PortalError;
pub use session::Session;

pub use scrape::table_scraper::{parse_table, scrape, ScrapeOutcome};

pub use types::measurement::{measurements_from_rows, Measurement};
pub use types::raw_row::RawRow;

pub use series::error::SeriesError;
pub use series::normalize::{normalize, parse_portal_date, parse_value, PORTAL_TIMESTAMP_FORMAT};
pub use series::reconcile::{
    hourly_index, measurements_frame, observed_frame, reconcile, reconcile_frame,
    ReconciledSeries, DATE_COLUMN, DAY_COLUMN, HOUR_COLUMN, PARAMETER_NAME_COLUMN,
    STATION_NAME_COLUMN, UNIT_COLUMN, VALUE_COLUMN,
};
pub use series::retrieval::{Retrieval, RetrievedSeries, PARAMETER_ID_COLUMN, STATION_ID_COLUMN};

pub use batch::error::BatchError;
pub use batch::manifest::BatchManifest;
pub use batch::orchestrator::{run, BatchOptions, SessionFactory, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY};
pub use batch::report::{BatchFiles, DATA_HEADER, FAILURE_HEADER, SUCCESS_HEADER};
