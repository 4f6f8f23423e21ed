// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

use crate::process::Year;

/// Everything that can abort a pipeline run.
#[derive(Debug, Error)]
pub enum Error {
    /// Non-2xx status, connection error or timeout. `status` is `None` when
    /// no response was received.
    #[error("transport failure{}: {message}", status_suffix(.status))]
    TransportFailure {
        status: Option<u16>,
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Two observations target the same cell with different values.
    #[error("conflicting values for ({year}, {quarter}): {first} vs {second}")]
    DuplicateCell {
        year: Year,
        quarter: String,
        first: f64,
        second: f64,
    },

    /// Invalid or unreadable configuration (missing file, bad YAML, bad header value).
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A table file on disk could not be read back.
    #[error("invalid table file {path:?}: {message}")]
    InvalidTable { path: PathBuf, message: String },

    #[error("writing report: {0}")]
    Report(#[source] std::io::Error),

    #[error("rendering chart: {0}")]
    Render(#[from] std::fmt::Error),

    /// Values too large for the chart's value axis.
    #[error("chart axis out of range: {0}")]
    AxisRange(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status {s})")).unwrap_or_default()
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::TransportFailure {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
