//! Schema and value checks run before any computation.

use crate::alloc::AllocError;
use crate::domain::{Column, Dataset, Metric};

/// Confirm that `dataset` declares every column in `required`.
///
/// The error names every missing column, in request order, not just the first.
pub fn require_columns(dataset: &Dataset, required: &[Column]) -> Result<(), AllocError> {
    let mut missing: Vec<Column> = Vec::new();
    for &c in required {
        if !dataset.has_column(c) && !missing.contains(&c) {
            missing.push(c);
        }
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AllocError::MissingColumn { columns: missing })
    }
}

/// Extract one metric column, requiring a finite value on every record.
pub fn metric_values(dataset: &Dataset, metric: Metric) -> Result<Vec<f64>, AllocError> {
    let column = Column::Metric(metric);
    require_columns(dataset, &[column])?;

    let mut out = Vec::with_capacity(dataset.len());
    for (row, r) in dataset.records().iter().enumerate() {
        let Some(v) = r.get(metric) else {
            return Err(AllocError::MissingValue {
                column,
                row,
                channel: r.channel.clone(),
            });
        };
        if !v.is_finite() {
            return Err(AllocError::InvalidValue {
                column,
                row,
                channel: r.channel.clone(),
                value: v,
            });
        }
        out.push(v);
    }
    Ok(out)
}
