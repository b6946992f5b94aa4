//! Reporting utilities: channel aggregates, contribution shares, and formatted
//! terminal output.

use std::collections::HashMap;

use crate::alloc::{channel_weights, AllocError};
use crate::domain::{Dataset, Metric, WeightMap};

pub mod format;

pub use format::*;

/// Aggregated performance of one channel.
///
/// Totals skip unpopulated cells. CTR is a rate, so it is averaged rather than
/// summed.
#[derive(Debug, Clone)]
pub struct ChannelSummary {
    pub channel: String,
    pub rows: usize,
    totals: HashMap<Metric, f64>,
    ctr_mean: Option<f64>,
}

impl ChannelSummary {
    pub fn total(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Ctr => self.ctr(),
            _ => self.totals.get(&metric).copied(),
        }
    }

    /// Click-through rate in percent: from clicks/impressions when both are
    /// known, else the mean of the `ctr` column.
    pub fn ctr(&self) -> Option<f64> {
        match (self.totals.get(&Metric::Clicks), self.totals.get(&Metric::Impressions)) {
            (Some(&clicks), Some(&impressions)) if impressions > 0.0 => Some(clicks / impressions * 100.0),
            _ => self.ctr_mean,
        }
    }

    /// Cost per conversion.
    pub fn cpa(&self) -> Option<f64> {
        ratio(self.totals.get(&Metric::Spend), self.totals.get(&Metric::Conversions))
    }

    /// Return on ad spend (sales / spend).
    pub fn roas(&self) -> Option<f64> {
        ratio(self.totals.get(&Metric::Sales), self.totals.get(&Metric::Spend))
    }
}

fn ratio(num: Option<&f64>, den: Option<&f64>) -> Option<f64> {
    match (num, den) {
        (Some(&n), Some(&d)) if d > 0.0 => Some(n / d),
        _ => None,
    }
}

/// Aggregate every metric column per channel, channels in first-appearance order.
pub fn summarize_channels(dataset: &Dataset) -> Vec<ChannelSummary> {
    let metrics = dataset.metrics();
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut out: Vec<ChannelSummary> = Vec::new();
    let mut ctr_acc: Vec<(f64, usize)> = Vec::new();

    for r in dataset.records() {
        let i = *index.entry(r.channel.as_str()).or_insert_with(|| {
            out.push(ChannelSummary {
                channel: r.channel.clone(),
                rows: 0,
                totals: HashMap::new(),
                ctr_mean: None,
            });
            ctr_acc.push((0.0, 0));
            out.len() - 1
        });

        let s = &mut out[i];
        s.rows += 1;
        for &m in &metrics {
            let Some(v) = r.get(m) else { continue };
            if m == Metric::Ctr {
                ctr_acc[i].0 += v;
                ctr_acc[i].1 += 1;
            } else {
                *s.totals.entry(m).or_insert(0.0) += v;
            }
        }
    }

    for (s, (sum, n)) in out.iter_mut().zip(ctr_acc) {
        if n > 0 {
            s.ctr_mean = Some(sum / n as f64);
        }
    }
    out
}

/// Each channel's share of a metric, one column per metric.
#[derive(Debug, Clone)]
pub struct ContributionTable {
    pub channels: Vec<String>,
    pub columns: Vec<(Metric, Result<WeightMap, AllocError>)>,
}

/// Compute per-channel contribution shares for each metric.
///
/// A metric that cannot be apportioned (missing values, negative sums) keeps
/// its error so the report can say why instead of dropping the column.
pub fn contribution_table(dataset: &Dataset, metrics: &[Metric]) -> ContributionTable {
    ContributionTable {
        channels: dataset.channels(),
        columns: metrics.iter().map(|&m| (m, channel_weights(dataset, m))).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PerformanceRecord;

    fn dataset() -> Dataset {
        Dataset::from_records(
            &[Metric::Spend, Metric::Impressions, Metric::Clicks, Metric::Conversions, Metric::Sales],
            vec![
                PerformanceRecord::new("Search")
                    .with(Metric::Spend, 100.0)
                    .with(Metric::Impressions, 1000.0)
                    .with(Metric::Clicks, 30.0)
                    .with(Metric::Conversions, 5.0)
                    .with(Metric::Sales, 400.0),
                PerformanceRecord::new("Search")
                    .with(Metric::Spend, 100.0)
                    .with(Metric::Impressions, 1000.0)
                    .with(Metric::Clicks, 10.0)
                    .with(Metric::Conversions, 5.0)
                    .with(Metric::Sales, 200.0),
                PerformanceRecord::new("Social")
                    .with(Metric::Spend, 50.0)
                    .with(Metric::Impressions, 0.0)
                    .with(Metric::Clicks, 0.0)
                    .with(Metric::Conversions, 0.0),
            ],
        )
    }

    #[test]
    fn summaries_aggregate_and_derive_ratios() {
        let s = summarize_channels(&dataset());
        assert_eq!(s.len(), 2);
        assert_eq!(s[0].channel, "Search");
        assert_eq!(s[0].rows, 2);
        assert_eq!(s[0].total(Metric::Spend), Some(200.0));
        assert_eq!(s[0].ctr(), Some(2.0));
        assert_eq!(s[0].cpa(), Some(20.0));
        assert_eq!(s[0].roas(), Some(3.0));

        assert_eq!(s[1].ctr(), None);
        assert_eq!(s[1].cpa(), None);
        assert_eq!(s[1].total(Metric::Sales), None);
    }

    #[test]
    fn ctr_column_is_averaged_when_clicks_are_absent() {
        let ds = Dataset::from_records(
            &[Metric::Ctr],
            vec![
                PerformanceRecord::new("Search").with(Metric::Ctr, 2.0),
                PerformanceRecord::new("Search").with(Metric::Ctr, 4.0),
            ],
        );
        assert_eq!(summarize_channels(&ds)[0].ctr(), Some(3.0));
    }

    #[test]
    fn contributions_keep_per_metric_errors() {
        let table = contribution_table(&dataset(), &[Metric::Spend, Metric::Sales]);
        assert_eq!(table.channels, vec!["Search", "Social"]);

        let spend = table.columns[0].1.as_ref().unwrap();
        assert!((spend.get("Search").unwrap() - 0.8).abs() < 1e-12);

        // Social has no sales value.
        assert!(matches!(table.columns[1].1, Err(AllocError::MissingValue { .. })));
    }
}
