//! Command-line interface definitions and argument parsing

use chrono::NaiveDate;
use clap::Parser;

use crate::error::AnalyticsError;

/// E-commerce order analytics: demographics, category revenue, and RFM
/// customer segmentation
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory containing the six Olist CSV files
    #[arg(short, long, default_value = "data")]
    pub data_dir: String,

    /// Start of the purchase-date window, YYYY-MM-DD (inclusive).
    /// Defaults to the earliest purchase in the data.
    #[arg(short, long)]
    pub start_date: Option<String>,

    /// End of the purchase-date window, YYYY-MM-DD (inclusive).
    /// Defaults to the latest purchase in the data.
    #[arg(short, long)]
    pub end_date: Option<String>,

    /// Base output path for the chart PNGs
    #[arg(short, long, default_value = "dashboard.png")]
    pub output: String,

    /// How many rows to show in each ranking
    #[arg(short, long, default_value = "10")]
    pub top: usize,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Parse the optional date-window arguments
    ///
    /// Each bound must be a valid YYYY-MM-DD date, and when both are
    /// given the start must not be after the end.
    pub fn parse_date_window(&self) -> crate::Result<(Option<NaiveDate>, Option<NaiveDate>)> {
        let start = self
            .start_date
            .as_deref()
            .map(parse_date)
            .transpose()?;
        let end = self.end_date.as_deref().map(parse_date).transpose()?;

        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(AnalyticsError::InvalidRange { start, end });
            }
        }
        Ok((start, end))
    }
}

fn parse_date(value: &str) -> crate::Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| AnalyticsError::InvalidDate(value.to_string()))
}
