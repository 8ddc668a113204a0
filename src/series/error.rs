use polars::error::PolarsError;
use std::num::ParseFloatError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SeriesError {
    #[error("Malformed value '{value}'")]
    MalformedValue {
        value: String,
        #[source]
        source: ParseFloatError,
    },

    #[error("Invalid portal timestamp '{day} {hour}'")]
    InvalidTimestamp {
        day: String,
        hour: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Invalid portal date '{0}'")]
    InvalidDate(String, #[source] chrono::ParseError),

    #[error("Hour 24 of {0} is past the last representable date")]
    DateOverflow(String),

    #[error("Failed processing DataFrame: {0}")]
    DataFrameProcessing(#[from] PolarsError),
}
