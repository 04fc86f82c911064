//! RFM customer segmentation over the analytic table
//!
//! Per customer: Recency in days from a snapshot date fixed one day
//! after the latest purchase in the input, Frequency as distinct order
//! count, Monetary as summed payment value. Each metric is scored 1-5
//! by cutting the population into five equal-population quantile bins.

use std::cmp::Ordering;

use polars::prelude::*;

use crate::error::AnalyticsError;

const MICROS_PER_DAY: i64 = 86_400_000_000;
const SCORE_BINS: usize = 5;

/// One scored customer
#[derive(Debug, Clone, PartialEq)]
pub struct RfmRecord {
    pub customer_id: String,
    /// Days between the snapshot date and the customer's latest order
    pub recency: i64,
    /// Distinct orders placed by the customer
    pub frequency: u32,
    /// Summed payment value over the customer's analytic rows
    pub monetary: f64,
    pub r_score: u8,
    pub f_score: u8,
    pub m_score: u8,
    /// The three digit scores concatenated, e.g. "555"
    pub rfm_score: String,
}

/// Score every customer present in the (already date-filtered) table
///
/// Produces exactly one record per distinct customer_id. Quantile cut
/// points are recomputed from the given rows on every call, so scores
/// are relative to the current population.
///
/// Scoring directions: lowest Recency earns 5, lowest Frequency and
/// Monetary earn 1. Recency is binned on its raw day counts; Frequency
/// and Monetary are ranked with a stable first-wins tie-break before
/// binning, with ties resolved in customer-id order.
pub fn compute_rfm(df: &DataFrame) -> crate::Result<Vec<RfmRecord>> {
    if df.height() == 0 {
        return Err(AnalyticsError::EmptyInput);
    }

    let snapshot = df
        .column("order_purchase_timestamp")?
        .datetime()?
        .max()
        .ok_or(AnalyticsError::EmptyInput)?
        + MICROS_PER_DAY;

    let grouped = df
        .clone()
        .lazy()
        .group_by([col("customer_id")])
        .agg([
            col("order_purchase_timestamp").max().alias("last_purchase"),
            col("order_id").n_unique().alias("frequency"),
            col("payment_value").sum().alias("monetary"),
        ])
        .sort(["customer_id"], SortMultipleOptions::default())
        .collect()?;

    let customer_ids: Vec<String> = grouped
        .column("customer_id")?
        .str()?
        .into_iter()
        .map(|v| v.unwrap_or_default().to_string())
        .collect();

    let last_purchase: Vec<i64> = grouped
        .column("last_purchase")?
        .datetime()?
        .into_iter()
        .map(|v| v.unwrap_or(snapshot))
        .collect();

    let frequency: Vec<u32> = {
        let cast = grouped.column("frequency")?.cast(&DataType::UInt32)?;
        cast.u32()?.into_iter().map(|v| v.unwrap_or(0)).collect()
    };

    let monetary: Vec<f64> = grouped
        .column("monetary")?
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(0.0))
        .collect();

    let recency: Vec<i64> = last_purchase
        .iter()
        .map(|&t| (snapshot - t) / MICROS_PER_DAY)
        .collect();

    // Recency is cut on its raw values; a bin index of 0 (the most
    // recent fifth of customers) maps to the top score
    let recency_values: Vec<f64> = recency.iter().map(|&d| d as f64).collect();
    let r_edges = quantile_edges(&recency_values, SCORE_BINS, "Recency")?;
    let r_scores: Vec<u8> = recency_values
        .iter()
        .map(|&v| (SCORE_BINS - bin_index(v, &r_edges)) as u8)
        .collect();

    let f_scores = rank_scores(
        &frequency.iter().map(|&f| f as f64).collect::<Vec<f64>>(),
        "Frequency",
    )?;
    let m_scores = rank_scores(&monetary, "Monetary")?;

    let records = customer_ids
        .into_iter()
        .enumerate()
        .map(|(i, customer_id)| RfmRecord {
            customer_id,
            recency: recency[i],
            frequency: frequency[i],
            monetary: monetary[i],
            r_score: r_scores[i],
            f_score: f_scores[i],
            m_score: m_scores[i],
            rfm_score: format!("{}{}{}", r_scores[i], f_scores[i], m_scores[i]),
        })
        .collect();

    Ok(records)
}

/// The customers the segmentation view highlights: every metric in the
/// top bucket, biggest spenders first
pub fn best_customers(records: &[RfmRecord], limit: usize) -> Vec<RfmRecord> {
    let mut best: Vec<RfmRecord> = records
        .iter()
        .filter(|r| r.rfm_score == "555")
        .cloned()
        .collect();
    best.sort_by(|a, b| {
        b.monetary
            .partial_cmp(&a.monetary)
            .unwrap_or(Ordering::Equal)
    });
    best.truncate(limit);
    best
}

/// Score a metric by ranking it first-wins and binning the ranks
fn rank_scores(values: &[f64], metric: &'static str) -> crate::Result<Vec<u8>> {
    let ranks: Vec<f64> = rank_first(values).into_iter().map(|r| r as f64).collect();
    let edges = quantile_edges(&ranks, SCORE_BINS, metric)?;
    Ok(ranks
        .iter()
        .map(|&r| (bin_index(r, &edges) + 1) as u8)
        .collect())
}

/// 1-based ranks; equal values keep their input order (stable sort)
fn rank_first(values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal));
    let mut ranks = vec![0; values.len()];
    for (rank, &idx) in order.iter().enumerate() {
        ranks[idx] = rank + 1;
    }
    ranks
}

/// Linearly interpolated quantile cut points at 0, 1/bins, ..., 1
///
/// The edges must be strictly increasing for the bins to be
/// well-defined; a population too small or too skewed for that is
/// reported as degenerate rather than scored.
fn quantile_edges(values: &[f64], bins: usize, metric: &'static str) -> crate::Result<Vec<f64>> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let n = sorted.len();

    let edges: Vec<f64> = (0..=bins)
        .map(|j| {
            let pos = (n - 1) as f64 * j as f64 / bins as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
        })
        .collect();

    if edges.windows(2).any(|w| w[0] >= w[1]) {
        return Err(AnalyticsError::QuantileDegenerate { metric, bins });
    }
    Ok(edges)
}

/// Bucket index for a value; the lowest bucket is open at the bottom so
/// the minimum value always lands in it
fn bin_index(value: f64, edges: &[f64]) -> usize {
    for k in 0..edges.len() - 1 {
        if value <= edges[k + 1] {
            return k;
        }
    }
    edges.len() - 2
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Rows of (customer_id, order_id, purchase timestamp, payment_value)
    fn analytic_frame(rows: &[(&str, &str, &str, f64)]) -> DataFrame {
        let df = df!(
            "customer_id" => rows.iter().map(|r| r.0).collect::<Vec<_>>(),
            "order_id" => rows.iter().map(|r| r.1).collect::<Vec<_>>(),
            "order_purchase_timestamp" => rows.iter().map(|r| r.2).collect::<Vec<_>>(),
            "payment_value" => rows.iter().map(|r| r.3).collect::<Vec<_>>(),
        )
        .unwrap();

        df.lazy()
            .with_columns([col("order_purchase_timestamp").str().to_datetime(
                Some(TimeUnit::Microseconds),
                None,
                StrptimeOptions {
                    format: Some("%Y-%m-%d %H:%M:%S".into()),
                    ..Default::default()
                },
                lit("raise"),
            )])
            .collect()
            .unwrap()
    }

    fn five_customer_frame() -> DataFrame {
        analytic_frame(&[
            ("c1", "o1", "2018-03-01 12:00:00", 10.0),
            ("c2", "o2", "2018-03-02 12:00:00", 20.0),
            ("c3", "o3", "2018-03-03 12:00:00", 30.0),
            ("c3", "o4", "2018-03-03 13:00:00", 15.0),
            ("c4", "o5", "2018-03-04 12:00:00", 40.0),
            ("c5", "o6", "2018-03-05 12:00:00", 50.0),
        ])
    }

    #[test]
    fn test_one_record_per_customer() {
        let records = compute_rfm(&five_customer_frame()).unwrap();
        assert_eq!(records.len(), 5);

        let mut ids: Vec<&str> = records.iter().map(|r| r.customer_id.as_str()).collect();
        ids.dedup();
        assert_eq!(ids, vec!["c1", "c2", "c3", "c4", "c5"]);
    }

    #[test]
    fn test_recency_frequency_monetary_values() {
        let records = compute_rfm(&five_customer_frame()).unwrap();

        // Snapshot is one day after c5's order, so c5 is exactly one day out
        let c5 = records.iter().find(|r| r.customer_id == "c5").unwrap();
        assert_eq!(c5.recency, 1);
        assert_eq!(c5.frequency, 1);

        let c3 = records.iter().find(|r| r.customer_id == "c3").unwrap();
        assert_eq!(c3.recency, 2);
        assert_eq!(c3.frequency, 2);
        assert!((c3.monetary - 45.0).abs() < 1e-9);

        for r in &records {
            assert!(r.recency >= 0);
        }
    }

    #[test]
    fn test_score_ranges_and_directions() {
        let records = compute_rfm(&five_customer_frame()).unwrap();

        for r in &records {
            assert!((1..=5).contains(&r.r_score));
            assert!((1..=5).contains(&r.f_score));
            assert!((1..=5).contains(&r.m_score));
            assert_eq!(r.rfm_score.len(), 3);
            assert!(r.rfm_score.chars().all(|c| c.is_ascii_digit()));
        }

        // Most recent customer scores highest R, oldest lowest
        let c5 = records.iter().find(|r| r.customer_id == "c5").unwrap();
        let c1 = records.iter().find(|r| r.customer_id == "c1").unwrap();
        assert_eq!(c5.r_score, 5);
        assert_eq!(c1.r_score, 1);

        // Biggest spender scores highest M
        let top_m = records.iter().max_by_key(|r| r.m_score).unwrap();
        assert_eq!(top_m.customer_id, "c5");
    }

    #[test]
    fn test_monetary_ordering_among_three_customers() {
        // Distinct recencies, equal frequency, monetary {100, 50, 200}
        let df = analytic_frame(&[
            ("c1", "o1", "2018-03-03 12:00:00", 100.0),
            ("c2", "o2", "2018-03-04 12:00:00", 50.0),
            ("c3", "o3", "2018-03-05 12:00:00", 200.0),
        ]);
        let records = compute_rfm(&df).unwrap();

        let m_of = |id: &str| records.iter().find(|r| r.customer_id == id).unwrap().m_score;
        assert!(m_of("c3") > m_of("c1"));
        assert!(m_of("c1") > m_of("c2"));

        // c3 is also the most recent and, ties broken in id order, the
        // top frequency rank, so it alone forms the 555 segment
        let best = best_customers(&records, 10);
        assert_eq!(best.len(), 1);
        assert_eq!(best[0].customer_id, "c3");
    }

    #[test]
    fn test_equal_frequency_ties_break_in_customer_order() {
        let records = compute_rfm(&five_customer_frame()).unwrap();

        // c1, c2, c4, c5 all have one order; their F ranks follow id
        // order, with c3's two orders ranked last
        let f_of = |id: &str| records.iter().find(|r| r.customer_id == id).unwrap().f_score;
        assert!(f_of("c1") <= f_of("c2"));
        assert!(f_of("c2") <= f_of("c4"));
        assert_eq!(f_of("c3"), 5);
    }

    #[test]
    fn test_empty_input() {
        let df = five_customer_frame();
        let empty = df.clear();
        assert!(matches!(
            compute_rfm(&empty),
            Err(AnalyticsError::EmptyInput)
        ));
    }

    #[test]
    fn test_degenerate_recency_population() {
        // Every customer bought on the same day: one distinct recency
        let df = analytic_frame(&[
            ("c1", "o1", "2018-03-05 12:00:00", 10.0),
            ("c2", "o2", "2018-03-05 12:00:00", 20.0),
            ("c3", "o3", "2018-03-05 12:00:00", 30.0),
            ("c4", "o4", "2018-03-05 12:00:00", 40.0),
            ("c5", "o5", "2018-03-05 12:00:00", 50.0),
        ]);
        assert!(matches!(
            compute_rfm(&df),
            Err(AnalyticsError::QuantileDegenerate {
                metric: "Recency",
                ..
            })
        ));
    }

    #[test]
    fn test_single_customer_is_degenerate() {
        let df = analytic_frame(&[("c1", "o1", "2018-03-05 12:00:00", 10.0)]);
        assert!(matches!(
            compute_rfm(&df),
            Err(AnalyticsError::QuantileDegenerate { .. })
        ));
    }

    #[test]
    fn test_best_customers_sorted_by_monetary() {
        let mk = |id: &str, monetary: f64, score: &str| RfmRecord {
            customer_id: id.to_string(),
            recency: 1,
            frequency: 3,
            monetary,
            r_score: 5,
            f_score: 5,
            m_score: 5,
            rfm_score: score.to_string(),
        };
        let records = vec![
            mk("a", 120.0, "555"),
            mk("b", 80.0, "545"),
            mk("c", 300.0, "555"),
            mk("d", 90.0, "555"),
        ];

        let best = best_customers(&records, 2);
        assert_eq!(best.len(), 2);
        assert_eq!(best[0].customer_id, "c");
        assert_eq!(best[1].customer_id, "a");
    }

    #[test]
    fn test_rank_first_is_stable() {
        assert_eq!(rank_first(&[2.0, 1.0, 2.0, 1.0]), vec![3, 1, 4, 2]);
    }

    #[test]
    fn test_quantile_edges_even_spread() {
        let edges = quantile_edges(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 5, "test").unwrap();
        assert_eq!(edges, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(bin_index(1.0, &edges), 0);
        assert_eq!(bin_index(6.0, &edges), 4);
    }
}
