//! Error taxonomy for the analytics pipeline

use std::path::PathBuf;

use chrono::NaiveDate;
use polars::prelude::PolarsError;
use thiserror::Error;

/// Common result type used throughout the library
pub type Result<T> = std::result::Result<T, AnalyticsError>;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// An input file is absent from the data directory
    #[error("input file not found: {0}")]
    FileNotFound(PathBuf),

    /// An input file exists but could not be read or parsed
    #[error("failed to load {path}: {source}")]
    DataLoad {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },

    /// A table lacks one of its documented join-key columns
    #[error("{table} is missing required column '{column}'")]
    MissingColumn { table: String, column: String },

    /// RFM computation received zero rows, e.g. an empty date window
    #[error("no order rows in the selected range")]
    EmptyInput,

    /// The customer population is too small or too homogeneous to cut
    /// into the requested number of quantile bins
    #[error("{metric} has too few distinct values for {bins}-bin quantile scoring")]
    QuantileDegenerate { metric: &'static str, bins: usize },

    /// A date argument did not parse
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    /// The requested date window is reversed
    #[error("start date {start} is after end date {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    /// An internal frame operation failed
    #[error(transparent)]
    Frame(#[from] PolarsError),

    /// Chart rendering failed
    #[error("chart rendering failed: {0}")]
    Chart(String),
}
