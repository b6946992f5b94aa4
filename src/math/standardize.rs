//! Z-score standardization.
//!
//! ```text
//! z_i = (x_i - mean) / s        s = sample standard deviation (ddof = 1)
//! ```
//!
//! A column with zero (or undefined) spread cannot be standardized; rather than
//! returning NaN/∞ we fail with `AllocError::DegenerateColumn`.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::alloc::{metric_values, require_columns, AllocError};
use crate::domain::{Column, Dataset, Metric};

/// Location/scale of one column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZScore {
    pub mean: f64,
    pub std: f64,
}

impl ZScore {
    pub fn fit(values: &[f64]) -> Result<Self, AllocError> {
        Self::fit_named("values", values)
    }

    /// Same as `fit`, naming the column in the error.
    pub fn fit_named(column: &str, values: &[f64]) -> Result<Self, AllocError> {
        if values.is_empty() {
            return Err(AllocError::EmptyDataset);
        }
        let degenerate = || AllocError::DegenerateColumn {
            column: column.to_string(),
        };
        if values.len() < 2 || values.iter().all(|v| *v == values[0]) {
            return Err(degenerate());
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
        let std = (ss / (n - 1.0)).sqrt();

        // A spread below float resolution of the mean is rounding noise.
        if !mean.is_finite() || !std.is_finite() || std <= f64::EPSILON * mean.abs() * n {
            return Err(degenerate());
        }
        Ok(Self { mean, std })
    }

    pub fn apply(&self, value: f64) -> f64 {
        (value - self.mean) / self.std
    }

    pub fn invert(&self, z: f64) -> f64 {
        z * self.std + self.mean
    }
}

/// Standardize a single column.
pub fn standardize(values: &[f64]) -> Result<Vec<f64>, AllocError> {
    let z = ZScore::fit(values)?;
    Ok(values.iter().map(|&v| z.apply(v)).collect())
}

/// Several standardized columns over the same records.
#[derive(Debug, Clone)]
pub struct StandardizedTable {
    pub metrics: Vec<Metric>,
    pub params: Vec<ZScore>,
    /// Channel of each row.
    pub channels: Vec<String>,
    /// `rows × metrics` z-scores.
    pub values: DMatrix<f64>,
}

impl StandardizedTable {
    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn column(&self, metric: Metric) -> Option<Vec<f64>> {
        let j = self.metrics.iter().position(|&m| m == metric)?;
        Some(self.values.column(j).iter().copied().collect())
    }

    /// Undo the standardization for one column.
    pub fn restore(&self, metric: Metric) -> Option<Vec<f64>> {
        let j = self.metrics.iter().position(|&m| m == metric)?;
        let z = self.params[j];
        Some(self.values.column(j).iter().map(|&v| z.invert(v)).collect())
    }
}

/// Standardize the given metric columns of `dataset`.
pub fn standardize_columns(dataset: &Dataset, metrics: &[Metric]) -> Result<StandardizedTable, AllocError> {
    if dataset.is_empty() {
        return Err(AllocError::EmptyDataset);
    }
    let required: Vec<Column> = metrics.iter().copied().map(Column::Metric).collect();
    require_columns(dataset, &required)?;

    let mut raw = Vec::with_capacity(metrics.len());
    let mut params = Vec::with_capacity(metrics.len());
    for &m in metrics {
        let values = metric_values(dataset, m)?;
        params.push(ZScore::fit_named(m.as_str(), &values)?);
        raw.push(values);
    }

    let values = DMatrix::from_fn(dataset.len(), metrics.len(), |i, j| params[j].apply(raw[j][i]));
    let channels = dataset.records().iter().map(|r| r.channel.clone()).collect();

    Ok(StandardizedTable {
        metrics: metrics.to_vec(),
        params,
        channels,
        values,
    })
}
