//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - built once by ingest (CSV) or the demo generator
//! - passed by reference into the allocation core
//! - exported to CSV/JSON or rendered by the CLI and TUI

use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// A numeric performance column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum Metric {
    Spend,
    Impressions,
    Clicks,
    Conversions,
    FormFills,
    Ctr,
    Sales,
}

impl Metric {
    pub const ALL: [Metric; 7] = [
        Metric::Spend,
        Metric::Impressions,
        Metric::Clicks,
        Metric::Conversions,
        Metric::FormFills,
        Metric::Ctr,
        Metric::Sales,
    ];

    /// Column identifier used in headers, exports, and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Spend => "spend",
            Metric::Impressions => "impressions",
            Metric::Clicks => "clicks",
            Metric::Conversions => "conversions",
            Metric::FormFills => "form_fills",
            Metric::Ctr => "ctr",
            Metric::Sales => "sales",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Metric::Spend => "Spend",
            Metric::Impressions => "Impressions",
            Metric::Clicks => "Clicks",
            Metric::Conversions => "Conversions",
            Metric::FormFills => "Form fills",
            Metric::Ctr => "CTR%",
            Metric::Sales => "Sales",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any column a dataset can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Channel,
    Date,
    Metric(Metric),
}

impl Column {
    pub fn as_str(self) -> &'static str {
        match self {
            Column::Channel => "channel",
            Column::Date => "date",
            Column::Metric(m) => m.as_str(),
        }
    }
}

impl From<Metric> for Column {
    fn from(value: Metric) -> Self {
        Column::Metric(value)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observed row: a channel on a (possibly unknown) date.
///
/// Numeric fields are `None` when the source did not populate them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub channel: String,
    pub date: Option<NaiveDate>,
    pub spend: Option<f64>,
    pub impressions: Option<f64>,
    pub clicks: Option<f64>,
    pub conversions: Option<f64>,
    pub form_fills: Option<f64>,
    pub ctr: Option<f64>,
    pub sales: Option<f64>,
}

impl PerformanceRecord {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            ..Self::default()
        }
    }

    /// Builder-style setter, handy for tests and the demo generator.
    pub fn with(mut self, metric: Metric, value: f64) -> Self {
        self.set(metric, Some(value));
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Spend => self.spend,
            Metric::Impressions => self.impressions,
            Metric::Clicks => self.clicks,
            Metric::Conversions => self.conversions,
            Metric::FormFills => self.form_fills,
            Metric::Ctr => self.ctr,
            Metric::Sales => self.sales,
        }
    }

    pub fn set(&mut self, metric: Metric, value: Option<f64>) {
        let slot = match metric {
            Metric::Spend => &mut self.spend,
            Metric::Impressions => &mut self.impressions,
            Metric::Clicks => &mut self.clicks,
            Metric::Conversions => &mut self.conversions,
            Metric::FormFills => &mut self.form_fills,
            Metric::Ctr => &mut self.ctr,
            Metric::Sales => &mut self.sales,
        };
        *slot = value;
    }
}

/// Ordered, read-only table of performance records.
///
/// `columns` lists what the source provided; it is fixed for all records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    columns: Vec<Column>,
    records: Vec<PerformanceRecord>,
}

impl Dataset {
    pub fn new(columns: Vec<Column>, records: Vec<PerformanceRecord>) -> Self {
        let mut deduped: Vec<Column> = Vec::with_capacity(columns.len());
        for c in columns {
            if !deduped.contains(&c) {
                deduped.push(c);
            }
        }
        Self {
            columns: deduped,
            records,
        }
    }

    /// Build a dataset whose columns are `channel` plus the given metrics.
    pub fn from_records(metrics: &[Metric], records: Vec<PerformanceRecord>) -> Self {
        let mut columns = vec![Column::Channel];
        columns.extend(metrics.iter().copied().map(Column::Metric));
        Self::new(columns, records)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn records(&self) -> &[PerformanceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, column: Column) -> bool {
        self.columns.contains(&column)
    }

    /// Metric columns present in the source, in column order.
    pub fn metrics(&self) -> Vec<Metric> {
        self.columns
            .iter()
            .filter_map(|c| match c {
                Column::Metric(m) => Some(*m),
                _ => None,
            })
            .collect()
    }

    /// Distinct channels in order of first appearance.
    pub fn channels(&self) -> Vec<String> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut out = Vec::new();
        for r in &self.records {
            if seen.insert(r.channel.as_str()) {
                out.push(r.channel.clone());
            }
        }
        out
    }

    /// Copy of this dataset with records replaced (columns preserved).
    pub fn with_records(&self, records: Vec<PerformanceRecord>) -> Self {
        Self {
            columns: self.columns.clone(),
            records,
        }
    }

    /// Copy of this dataset with an extra column declared.
    pub fn with_column(mut self, column: Column) -> Self {
        if !self.columns.contains(&column) {
            self.columns.push(column);
        }
        self
    }
}

/// What a weight map was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "metric")]
pub enum WeightBasis {
    /// Proportional to the per-channel sum of a metric.
    Metric(Metric),
    /// The metric summed to zero for every channel, so channels split evenly.
    EqualFallback(Metric),
    /// Even split requested explicitly.
    Equal,
}

impl WeightBasis {
    pub fn describe(self) -> String {
        match self {
            WeightBasis::Metric(m) => format!("proportional to {}", m.display_name()),
            WeightBasis::EqualFallback(m) => {
                format!("equal split ({} is zero for every channel)", m.display_name())
            }
            WeightBasis::Equal => "equal split".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelWeight {
    pub channel: String,
    pub weight: f64,
}

/// Channel → non-negative weight; weights sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightMap {
    pub basis: WeightBasis,
    pub entries: Vec<ChannelWeight>,
}

impl WeightMap {
    pub fn get(&self, channel: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.channel == channel)
            .map(|e| e.weight)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChannelWeight> {
        self.entries.iter()
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|e| e.weight).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelAllocation {
    pub channel: String,
    pub amount: f64,
}

/// Channel → allocated amount; amounts sum to `total_budget`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationResult {
    pub total_budget: f64,
    pub entries: Vec<ChannelAllocation>,
}

impl AllocationResult {
    pub fn get(&self, channel: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.channel == channel)
            .map(|e| e.amount)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChannelAllocation> {
        self.entries.iter()
    }

    pub fn channels(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.channel.as_str()).collect()
    }

    pub fn allocated(&self) -> f64 {
        self.entries.iter().map(|e| e.amount).sum()
    }

    /// Share of the total budget assigned to `channel` (0..=1).
    pub fn share(&self, channel: &str) -> Option<f64> {
        let amount = self.get(channel)?;
        if self.total_budget > 0.0 {
            Some(amount / self.total_budget)
        } else {
            None
        }
    }
}

/// Scale a metric by `1 + percent / 100`, for one channel or for all of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Uplift {
    pub channel: Option<String>,
    pub metric: Metric,
    pub percent: f64,
}

/// Where the dataset comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    Csv(std::path::PathBuf),
    Demo { seed: u64, days: usize },
}

impl DataSource {
    pub fn label(&self) -> String {
        match self {
            DataSource::Csv(path) => path.display().to_string(),
            DataSource::Demo { seed, days } => format!("demo (seed={seed}, days={days})"),
        }
    }
}

/// Fully-resolved run settings (flags > env > defaults).
#[derive(Debug, Clone)]
pub struct AllocConfig {
    pub metric: Metric,
    pub total_budget: f64,
    pub equal_split: bool,
    pub channels: Vec<String>,
    pub overrides: Vec<(String, f64)>,
    pub uplifts: Vec<Uplift>,
    pub plot: bool,
    pub plot_width: usize,
    pub export_csv: Option<std::path::PathBuf>,
    pub export_json: Option<std::path::PathBuf>,
}

impl Default for AllocConfig {
    fn default() -> Self {
        Self {
            metric: Metric::Conversions,
            total_budget: 10_000.0,
            equal_split: false,
            channels: Vec::new(),
            overrides: Vec::new(),
            uplifts: Vec::new(),
            plot: true,
            plot_width: 50,
            export_csv: None,
            export_json: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channels_keep_first_appearance_order() {
        let ds = Dataset::from_records(
            &[Metric::Spend],
            vec![
                PerformanceRecord::new("Social").with(Metric::Spend, 1.0),
                PerformanceRecord::new("Search").with(Metric::Spend, 2.0),
                PerformanceRecord::new("Social").with(Metric::Spend, 3.0),
                PerformanceRecord::new("Display").with(Metric::Spend, 4.0),
            ],
        );
        assert_eq!(ds.channels(), vec!["Social", "Search", "Display"]);
    }

    #[test]
    fn duplicate_columns_are_collapsed() {
        let ds = Dataset::new(
            vec![Column::Channel, Column::Metric(Metric::Sales), Column::Channel],
            Vec::new(),
        );
        assert_eq!(ds.columns(), &[Column::Channel, Column::Metric(Metric::Sales)]);
        assert_eq!(ds.metrics(), vec![Metric::Sales]);
    }

    #[test]
    fn record_get_set_roundtrip_per_metric() {
        let mut r = PerformanceRecord::new("Email");
        r.set(Metric::FormFills, Some(7.0));
        assert_eq!(r.get(Metric::FormFills), Some(7.0));
        assert_eq!(r.get(Metric::Sales), None);
    }
}
