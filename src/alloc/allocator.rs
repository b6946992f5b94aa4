//! Proportional budget allocation.
//!
//! ```text
//! sum[c]    = Σ metric over records of channel c
//! weight[c] = sum[c] / Σ sum          (equal split when Σ sum == 0)
//! amount[c] = weight[c] * budget
//! ```
//!
//! Channels appear in the order they first occur in the dataset, so results are
//! stable across runs regardless of hashing.

use std::collections::HashMap;

use tracing::debug;

use crate::alloc::validate::{metric_values, require_columns};
use crate::alloc::AllocError;
use crate::domain::{
    AllocationResult, ChannelAllocation, ChannelWeight, Column, Dataset, Metric, WeightBasis, WeightMap,
};

/// Per-channel sum of one metric, in first-appearance order.
pub fn channel_sums(dataset: &Dataset, metric: Metric) -> Result<Vec<(String, f64)>, AllocError> {
    let (tallies, _) = tally(dataset, metric, false)?;
    Ok(tallies.into_iter().map(|t| (t.channel, t.sum)).collect())
}

/// Normalized channel weights for `metric`.
pub fn channel_weights(dataset: &Dataset, metric: Metric) -> Result<WeightMap, AllocError> {
    let (mut tallies, scale) = tally(dataset, metric, true)?;

    // Rows that cancel out (refunds) leave rounding residue, not a real sign.
    for t in &mut tallies {
        if t.sum.abs() <= t.magnitude * f64::EPSILON * t.rows as f64 {
            t.sum = 0.0;
        }
    }

    if let Some(t) = tallies.iter().find(|t| t.sum < 0.0) {
        return Err(AllocError::NegativeMetric {
            channel: t.channel.clone(),
            metric,
            sum: t.sum * scale,
        });
    }

    let total: f64 = tallies.iter().map(|t| t.sum).sum();
    if total == 0.0 {
        debug!(%metric, channels = tallies.len(), "metric sums to zero; falling back to equal weights");
        let channels = tallies.into_iter().map(|t| t.channel).collect();
        return Ok(equal_weights(channels, WeightBasis::EqualFallback(metric)));
    }

    let entries = tallies
        .into_iter()
        .map(|t| ChannelWeight {
            channel: t.channel,
            weight: t.sum / total,
        })
        .collect();

    Ok(WeightMap {
        basis: WeightBasis::Metric(metric),
        entries,
    })
}

struct ChannelTally {
    channel: String,
    sum: f64,
    /// Σ |value|, the yardstick for rounding error in `sum`.
    magnitude: f64,
    rows: usize,
}

/// Group and sum values per channel.
///
/// With `guard_overflow`, values are divided by the largest magnitude whenever
/// the raw sums could exceed `f64::MAX`; the returned scale undoes that.
fn tally(dataset: &Dataset, metric: Metric, guard_overflow: bool) -> Result<(Vec<ChannelTally>, f64), AllocError> {
    if dataset.is_empty() {
        return Err(AllocError::EmptyDataset);
    }
    require_columns(dataset, &[Column::Channel, Column::Metric(metric)])?;
    let values = metric_values(dataset, metric)?;

    let largest = values.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    let scale = if guard_overflow && largest > f64::MAX / values.len() as f64 {
        debug!(%metric, largest, "rescaling metric values to avoid overflow");
        largest
    } else {
        1.0
    };

    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut tallies: Vec<ChannelTally> = Vec::new();
    for (r, v) in dataset.records().iter().zip(values) {
        let v = v / scale;
        let i = *index.entry(r.channel.as_str()).or_insert_with(|| {
            tallies.push(ChannelTally {
                channel: r.channel.clone(),
                sum: 0.0,
                magnitude: 0.0,
                rows: 0,
            });
            tallies.len() - 1
        });
        let t = &mut tallies[i];
        t.sum += v;
        t.magnitude += v.abs();
        t.rows += 1;
    }
    Ok((tallies, scale))
}

/// Distribute `total_budget` across channels in proportion to `metric`.
pub fn allocate(dataset: &Dataset, metric: Metric, total_budget: f64) -> Result<AllocationResult, AllocError> {
    check_budget(total_budget)?;
    let weights = channel_weights(dataset, metric)?;
    let result = apply_weights(&weights, total_budget)?;
    debug!(
        %metric,
        total_budget,
        channels = result.len(),
        basis = ?weights.basis,
        "allocated budget"
    );
    Ok(result)
}

/// Split `total_budget` evenly across the distinct channels.
pub fn equal_split(dataset: &Dataset, total_budget: f64) -> Result<AllocationResult, AllocError> {
    check_budget(total_budget)?;
    let weights = equal_channel_weights(dataset)?;
    apply_weights(&weights, total_budget)
}

/// Even weights over the distinct channels of `dataset`.
pub fn equal_channel_weights(dataset: &Dataset) -> Result<WeightMap, AllocError> {
    if dataset.is_empty() {
        return Err(AllocError::EmptyDataset);
    }
    require_columns(dataset, &[Column::Channel])?;
    Ok(equal_weights(dataset.channels(), WeightBasis::Equal))
}

/// Turn a weight map into amounts for `total_budget`.
pub fn apply_weights(weights: &WeightMap, total_budget: f64) -> Result<AllocationResult, AllocError> {
    check_budget(total_budget)?;
    if weights.is_empty() {
        return Err(AllocError::EmptyDataset);
    }
    // Even splits divide the budget directly so `budget / n` is exact.
    let even_share = match weights.basis {
        WeightBasis::Metric(_) => None,
        WeightBasis::EqualFallback(_) | WeightBasis::Equal => Some(total_budget / weights.len() as f64),
    };
    let entries = weights
        .iter()
        .map(|w| ChannelAllocation {
            channel: w.channel.clone(),
            amount: even_share.unwrap_or(w.weight * total_budget),
        })
        .collect();
    Ok(AllocationResult {
        total_budget,
        entries,
    })
}

pub(crate) fn check_budget(total_budget: f64) -> Result<(), AllocError> {
    if total_budget.is_finite() && total_budget > 0.0 {
        Ok(())
    } else {
        Err(AllocError::InvalidBudget { budget: total_budget })
    }
}

fn equal_weights(channels: Vec<String>, basis: WeightBasis) -> WeightMap {
    let n = channels.len() as f64;
    let entries = channels
        .into_iter()
        .map(|channel| ChannelWeight {
            channel,
            weight: 1.0 / n,
        })
        .collect();
    WeightMap { basis, entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PerformanceRecord;

    fn conversions(rows: &[(&str, f64)]) -> Dataset {
        Dataset::from_records(
            &[Metric::Conversions],
            rows.iter()
                .map(|(c, v)| PerformanceRecord::new(*c).with(Metric::Conversions, *v))
                .collect(),
        )
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn proportional_example() {
        let ds = conversions(&[("Search", 300.0), ("Social", 100.0), ("Display", 100.0)]);
        let out = allocate(&ds, Metric::Conversions, 5000.0).unwrap();

        assert_eq!(out.channels(), vec!["Search", "Social", "Display"]);
        assert_close(out.get("Search").unwrap(), 3000.0);
        assert_close(out.get("Social").unwrap(), 1000.0);
        assert_close(out.get("Display").unwrap(), 1000.0);
        assert_close(out.allocated(), 5000.0);
    }

    #[test]
    fn sums_across_rows_of_the_same_channel() {
        let ds = conversions(&[("Search", 100.0), ("Social", 50.0), ("Search", 150.0)]);
        let sums = channel_sums(&ds, Metric::Conversions).unwrap();
        assert_eq!(
            sums,
            vec![("Search".to_string(), 250.0), ("Social".to_string(), 50.0)]
        );

        let out = allocate(&ds, Metric::Conversions, 3000.0).unwrap();
        assert_close(out.get("Search").unwrap(), 2500.0);
        assert_close(out.get("Social").unwrap(), 500.0);
    }

    #[test]
    fn all_zero_metric_falls_back_to_exact_equal_split() {
        let ds = conversions(&[("Search", 0.0), ("Social", 0.0), ("Display", 0.0), ("Search", 0.0)]);
        let weights = channel_weights(&ds, Metric::Conversions).unwrap();
        assert_eq!(weights.basis, WeightBasis::EqualFallback(Metric::Conversions));

        let out = allocate(&ds, Metric::Conversions, 9000.0).unwrap();
        assert_eq!(out.len(), 3);
        for e in out.iter() {
            assert_eq!(e.amount, 3000.0);
        }
    }

    #[test]
    fn zero_channel_gets_nothing_when_others_are_positive() {
        let ds = conversions(&[("Search", 10.0), ("Email", 0.0)]);
        let out = allocate(&ds, Metric::Conversions, 100.0).unwrap();
        assert_eq!(out.get("Email"), Some(0.0));
        assert_close(out.get("Search").unwrap(), 100.0);
    }

    #[test]
    fn negative_sum_names_the_channel() {
        let ds = conversions(&[("Search", 10.0), ("Social", -5.0), ("Social", 1.0)]);
        let err = allocate(&ds, Metric::Conversions, 100.0).unwrap_err();
        assert_eq!(
            err,
            AllocError::NegativeMetric {
                channel: "Social".to_string(),
                metric: Metric::Conversions,
                sum: -4.0,
            }
        );
    }

    #[test]
    fn negative_row_is_fine_when_channel_sum_is_not() {
        let ds = conversions(&[("Search", -5.0), ("Search", 15.0)]);
        let out = allocate(&ds, Metric::Conversions, 10.0).unwrap();
        assert_close(out.get("Search").unwrap(), 10.0);
    }

    #[test]
    fn rows_that_cancel_out_count_as_zero() {
        let ds = conversions(&[("Search", 0.3), ("Search", -0.1), ("Search", -0.2), ("Social", 1.0)]);
        let out = allocate(&ds, Metric::Conversions, 100.0).unwrap();
        assert_eq!(out.get("Search"), Some(0.0));
        assert_eq!(out.get("Social"), Some(100.0));

        let only_refunds = conversions(&[("Search", 0.3), ("Search", -0.1), ("Search", -0.2)]);
        let weights = channel_weights(&only_refunds, Metric::Conversions).unwrap();
        assert_eq!(weights.basis, WeightBasis::EqualFallback(Metric::Conversions));
    }

    #[test]
    fn huge_values_do_not_overflow_the_split() {
        let ds = conversions(&[("Search", 1e308), ("Social", 1e308)]);
        let out = allocate(&ds, Metric::Conversions, 5000.0).unwrap();
        assert_close(out.get("Search").unwrap(), 2500.0);
        assert_close(out.get("Social").unwrap(), 2500.0);

        let ds = conversions(&[("Search", 1e308), ("Search", 1e308), ("Social", 1.0)]);
        let out = allocate(&ds, Metric::Conversions, 5000.0).unwrap();
        assert_close(out.get("Search").unwrap(), 5000.0);
        assert!(out.iter().all(|e| e.amount.is_finite() && e.amount >= 0.0));
        assert_close(out.allocated(), 5000.0);
    }

    #[test]
    fn overflowing_negative_sum_is_still_reported() {
        let ds = conversions(&[("Search", 1.0), ("Social", -1e308), ("Social", -1e308)]);
        let err = allocate(&ds, Metric::Conversions, 100.0).unwrap_err();
        assert!(matches!(err, AllocError::NegativeMetric { ref channel, .. } if channel == "Social"));
    }

    #[test]
    fn empty_dataset_is_rejected() {
        let ds = conversions(&[]);
        assert_eq!(
            allocate(&ds, Metric::Conversions, 100.0).unwrap_err(),
            AllocError::EmptyDataset
        );
    }

    #[test]
    fn non_positive_budget_is_rejected() {
        let ds = conversions(&[("Search", 1.0)]);
        for budget in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                allocate(&ds, Metric::Conversions, budget),
                Err(AllocError::InvalidBudget { .. })
            ));
        }
    }

    #[test]
    fn missing_metric_column_is_named() {
        let ds = Dataset::from_records(
            &[Metric::Spend],
            vec![PerformanceRecord::new("Search").with(Metric::Spend, 1.0)],
        );
        assert_eq!(
            allocate(&ds, Metric::Conversions, 100.0).unwrap_err(),
            AllocError::MissingColumn {
                columns: vec![Column::Metric(Metric::Conversions)]
            }
        );
    }

    #[test]
    fn equal_split_ignores_performance() {
        let ds = conversions(&[("Search", 300.0), ("Social", 100.0)]);
        let out = equal_split(&ds, 1000.0).unwrap();
        assert_eq!(out.get("Search"), Some(500.0));
        assert_eq!(out.get("Social"), Some(500.0));
    }

    #[test]
    fn weights_sum_to_one() {
        let ds = conversions(&[("A", 1.0), ("B", 2.0), ("C", 7.0)]);
        let w = channel_weights(&ds, Metric::Conversions).unwrap();
        assert_close(w.total(), 1.0);
        assert_close(w.get("C").unwrap(), 0.7);
    }
}
