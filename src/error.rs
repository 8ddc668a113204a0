use crate::batch::error::BatchError;
use crate::series::error::SeriesError;
use crate::session::error::PortalError;
use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QualarError {
    #[error(transparent)]
    Portal(#[from] PortalError),

    #[error(transparent)]
    Series(#[from] SeriesError),

    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error("Environment variable {0} is not set or empty")]
    MissingCredential(&'static str),

    #[error("End date {end} is before start date {start}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Failed to create save directory '{0}'")]
    SaveDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to determine save directory")]
    SaveDirResolution(#[source] std::io::Error),
}
