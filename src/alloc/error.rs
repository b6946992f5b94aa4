//! Typed failures of the allocation core.
//!
//! Every variant is a local, recoverable validation failure. Callers decide how
//! to message it (the CLI maps them to exit codes, the TUI to a status line).

use thiserror::Error;

use crate::domain::{Column, Metric};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AllocError {
    #[error("Missing required column(s): {}", join_columns(.columns))]
    MissingColumn { columns: Vec<Column> },

    #[error("Column `{column}` has zero or undefined standard deviation; cannot standardize")]
    DegenerateColumn { column: String },

    #[error("Dataset has no records")]
    EmptyDataset,

    #[error("Invalid total budget {budget}: must be finite and > 0")]
    InvalidBudget { budget: f64 },

    #[error("Channel `{channel}` has negative summed {metric} ({sum}); proportional allocation is undefined")]
    NegativeMetric { channel: String, metric: Metric, sum: f64 },

    #[error("Overrides total {requested:.2}, which exceeds the total budget {total:.2}")]
    Overallocation { requested: f64, total: f64 },

    #[error("Overrides total {allocated:.2} but cover every channel; {total:.2} must be allocated")]
    Underallocation { allocated: f64, total: f64 },

    #[error("Record {row} (channel `{channel}`) has no `{column}` value")]
    MissingValue { column: Column, row: usize, channel: String },

    #[error("Record {row} (channel `{channel}`) has non-finite `{column}` value {value}")]
    InvalidValue {
        column: Column,
        row: usize,
        channel: String,
        value: f64,
    },

    #[error("Unknown channel `{channel}`")]
    UnknownChannel { channel: String },

    #[error("Channel `{channel}` is overridden more than once")]
    DuplicateOverride { channel: String },

    #[error("Invalid override for `{channel}`: {amount} (must be finite and >= 0)")]
    InvalidOverride { channel: String, amount: f64 },

    #[error("Invalid uplift {percent}% for {metric}: must be finite and > -100")]
    InvalidUplift { metric: Metric, percent: f64 },
}

fn join_columns(columns: &[Column]) -> String {
    columns
        .iter()
        .map(|c| format!("`{c}`"))
        .collect::<Vec<_>>()
        .join(", ")
}
