//! Aggregation views over the analytic table: customer demographics
//! and product-category revenue

use polars::prelude::*;

/// Unique-customer count for one state
#[derive(Debug, Clone, PartialEq)]
pub struct StateCount {
    pub state: String,
    pub customers: u32,
}

/// Summed payment value for one product category
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRevenue {
    pub category: String,
    pub revenue: f64,
}

/// Distinct customers per state, most populous first
pub fn customers_by_state(df: &DataFrame) -> crate::Result<Vec<StateCount>> {
    let grouped = df
        .clone()
        .lazy()
        .group_by_stable([col("customer_state")])
        .agg([col("customer_id").n_unique().alias("customers")])
        .sort(
            ["customers"],
            SortMultipleOptions::default()
                .with_order_descending(true)
                .with_maintain_order(true),
        )
        .collect()?;

    let states = grouped.column("customer_state")?.str()?;
    let counts = grouped.column("customers")?.cast(&DataType::UInt32)?;
    let counts = counts.u32()?;

    Ok(states
        .into_iter()
        .zip(counts)
        .map(|(state, customers)| StateCount {
            state: state.unwrap_or_default().to_string(),
            customers: customers.unwrap_or(0),
        })
        .collect())
}

/// Revenue per translated category name, highest earners first
///
/// Revenue here is the summed payment value over the category's
/// analytic rows, so the payment fan-out of multi-item and
/// multi-installment orders is counted the same way the segmentation
/// view counts it.
pub fn revenue_by_category(df: &DataFrame) -> crate::Result<Vec<CategoryRevenue>> {
    let grouped = df
        .clone()
        .lazy()
        .group_by_stable([col("product_category_name_english")])
        .agg([col("payment_value").sum().alias("revenue")])
        .sort(
            ["revenue"],
            SortMultipleOptions::default()
                .with_order_descending(true)
                .with_maintain_order(true),
        )
        .collect()?;

    let categories = grouped.column("product_category_name_english")?.str()?;
    let revenues = grouped.column("revenue")?.f64()?;

    Ok(categories
        .into_iter()
        .zip(revenues)
        .map(|(category, revenue)| CategoryRevenue {
            category: category.unwrap_or_default().to_string(),
            revenue: revenue.unwrap_or(0.0),
        })
        .collect())
}
