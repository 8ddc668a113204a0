use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Failed to access batch file '{0}'")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to read or write CSV records in '{0}'")]
    Csv(PathBuf, #[source] csv::Error),

    #[error("A batch needs at least one attempt per key")]
    ZeroAttempts,
}
