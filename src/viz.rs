//! Chart rendering and console tables for the dashboard views

use plotters::prelude::*;

use crate::error::AnalyticsError;
use crate::report::{CategoryRevenue, StateCount};
use crate::rfm::RfmRecord;

const STATE_BAR: RGBColor = RGBColor(135, 206, 235);
const TOP_CATEGORY_BAR: RGBColor = RGBColor(60, 179, 113);
const BOTTOM_CATEGORY_BAR: RGBColor = RGBColor(250, 128, 114);

/// Vertical bar chart of the leading states by unique customers
pub fn create_state_chart(
    states: &[StateCount],
    output_path: &str,
    top: usize,
) -> crate::Result<()> {
    let shown: Vec<&StateCount> = states.iter().take(top).collect();
    if shown.is_empty() {
        return Ok(());
    }

    draw_state_chart(&shown, output_path).map_err(|e| AnalyticsError::Chart(e.to_string()))?;
    println!("State chart saved to: {}", output_path);
    Ok(())
}

fn draw_state_chart(
    shown: &[&StateCount],
    output_path: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let n = shown.len();
    let max_count = shown.iter().map(|s| s.customers).max().unwrap_or(1) as f64;
    let labels: Vec<String> = shown.iter().map(|s| s.state.clone()).collect();

    let root = BitMapBackend::new(output_path, (900, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Top States by Unique Customers", ("sans-serif", 28))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5f64..n as f64 - 0.5, 0f64..max_count * 1.1)?;

    chart
        .configure_mesh()
        .x_desc("State")
        .y_desc("Unique customers")
        .x_labels(n)
        .x_label_formatter(&|x| {
            let i = x.round();
            if (x - i).abs() < 0.3 && i >= 0.0 && (i as usize) < labels.len() {
                labels[i as usize].clone()
            } else {
                String::new()
            }
        })
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for (i, state) in shown.iter().enumerate() {
        chart.draw_series(std::iter::once(Rectangle::new(
            [
                (i as f64 - 0.35, 0.0),
                (i as f64 + 0.35, state.customers as f64),
            ],
            STATE_BAR.filled(),
        )))?;
    }

    root.present()?;
    Ok(())
}

/// Horizontal bar chart of category revenue, largest bar on top
pub fn create_category_chart(
    categories: &[CategoryRevenue],
    output_path: &str,
    title: &str,
    color: &RGBColor,
) -> crate::Result<()> {
    if categories.is_empty() {
        return Ok(());
    }

    draw_category_chart(categories, output_path, title, color)
        .map_err(|e| AnalyticsError::Chart(e.to_string()))?;
    println!("Category chart saved to: {}", output_path);
    Ok(())
}

fn draw_category_chart(
    categories: &[CategoryRevenue],
    output_path: &str,
    title: &str,
    color: &RGBColor,
) -> Result<(), Box<dyn std::error::Error>> {
    let n = categories.len();
    let max_revenue = categories
        .iter()
        .map(|c| c.revenue)
        .fold(f64::NEG_INFINITY, f64::max)
        .max(1.0);
    let labels: Vec<String> = categories.iter().map(|c| c.category.clone()).collect();

    let root = BitMapBackend::new(output_path, (900, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(180)
        .build_cartesian_2d(0f64..max_revenue * 1.15, -0.5f64..n as f64 - 0.5)?;

    chart
        .configure_mesh()
        .x_desc("Total revenue (R$)")
        .y_labels(n)
        .y_label_formatter(&|y| {
            let i = y.round();
            if (y - i).abs() < 0.3 && i >= 0.0 && (i as usize) < n {
                // Row 0 is the bottom of the chart; the first (largest)
                // category is drawn at the top row
                labels[n - 1 - i as usize].clone()
            } else {
                String::new()
            }
        })
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for (i, category) in categories.iter().enumerate() {
        let row = (n - 1 - i) as f64;
        chart.draw_series(std::iter::once(Rectangle::new(
            [(0.0, row - 0.35), (category.revenue, row + 0.35)],
            color.filled(),
        )))?;
    }

    root.present()?;
    Ok(())
}

/// Console table of the 555 segment, biggest spenders first
pub fn print_best_customers(best: &[RfmRecord]) {
    println!("\n=== Best Customers (RFM score 555) ===");
    if best.is_empty() {
        println!("No customers in the 555 segment for this range");
        return;
    }

    println!("  Customer                         | Recency | Frequency | Monetary | RFM");
    println!("  ---------------------------------|---------|-----------|----------|----");
    for record in best {
        println!(
            "  {:32} | {:7} | {:9} | {:8.2} | {}",
            record.customer_id,
            record.recency,
            record.frequency,
            record.monetary,
            record.rfm_score
        );
    }
}

/// Render the full set of dashboard charts next to `base_output_path`
pub fn generate_dashboard_report(
    states: &[StateCount],
    categories: &[CategoryRevenue],
    base_output_path: &str,
    top: usize,
) -> crate::Result<()> {
    create_state_chart(states, base_output_path, top)?;

    let top_categories: Vec<CategoryRevenue> = categories.iter().take(top).cloned().collect();
    create_category_chart(
        &top_categories,
        &base_output_path.replace(".png", "_top_categories.png"),
        "Highest-Revenue Product Categories",
        &TOP_CATEGORY_BAR,
    )?;

    let bottom_categories: Vec<CategoryRevenue> = categories
        .iter()
        .rev()
        .take(top)
        .rev()
        .cloned()
        .collect();
    create_category_chart(
        &bottom_categories,
        &base_output_path.replace(".png", "_bottom_categories.png"),
        "Lowest-Revenue Product Categories",
        &BOTTOM_CATEGORY_BAR,
    )?;

    Ok(())
}
