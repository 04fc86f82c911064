//! OrderScope: analytics over the Olist e-commerce order dataset
//!
//! This library joins the relational order tables into one denormalized
//! analytic table and derives three views from it: customer geographic
//! demographics, product-category revenue, and RFM (Recency, Frequency,
//! Monetary) customer segmentation.

pub mod cli;
pub mod data;
pub mod error;
pub mod report;
pub mod rfm;
pub mod viz;

// Re-export public items for easier access
pub use cli::Args;
pub use data::{filter_by_date_range, prepare_analytic_table, purchase_date_bounds};
pub use error::{AnalyticsError, Result};
pub use report::{customers_by_state, revenue_by_category, CategoryRevenue, StateCount};
pub use rfm::{best_customers, compute_rfm, RfmRecord};
pub use viz::{generate_dashboard_report, print_best_customers};
