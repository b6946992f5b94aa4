//! Export allocation results to CSV and JSON.
//!
//! The CSV is meant for spreadsheets; the JSON plan carries the full context of
//! the run (metric, budget, weights, overrides) for downstream scripts.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::Local;
use serde::Serialize;

use crate::app::pipeline::AllocationRun;
use crate::domain::{AllocationResult, WeightBasis, WeightMap};
use crate::error::AppError;

/// JSON representation of an allocation run.
#[derive(Debug, Clone, Serialize)]
pub struct AllocationPlan<'a> {
    pub tool: &'static str,
    pub generated_at: String,
    pub source: &'a str,
    pub basis: WeightBasis,
    pub total_budget: f64,
    pub weights: &'a WeightMap,
    pub recommended: &'a AllocationResult,
    pub overrides: Vec<PlanOverride<'a>>,
    pub adjusted: Option<&'a AllocationResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanOverride<'a> {
    pub channel: &'a str,
    pub amount: f64,
}

/// Write one row per channel: `channel,weight,amount,overridden`.
pub fn write_allocation_csv(path: &Path, run: &AllocationRun) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::new(4, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_allocation_rows(&mut file, run)
}

fn write_allocation_rows<W: Write>(out: W, run: &AllocationRun) -> Result<(), AppError> {
    let row_err = |e: csv::Error| AppError::new(4, format!("Failed to write export CSV row: {e}"));
    let mut writer = csv::Writer::from_writer(out);
    writer
        .write_record(["channel", "weight", "amount", "overridden"])
        .map_err(row_err)?;

    for e in run.final_result().iter() {
        let weight = run.weights.get(&e.channel).unwrap_or(0.0);
        let overridden = run.overrides.contains_key(&e.channel);
        writer
            .write_record([
                e.channel.clone(),
                format!("{weight:.10}"),
                format!("{:.2}", e.amount),
                overridden.to_string(),
            ])
            .map_err(row_err)?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(4, format!("Failed to flush export CSV: {e}")))
}

/// Write the allocation plan as pretty JSON.
pub fn write_allocation_json(path: &Path, run: &AllocationRun) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(4, format!("Failed to create plan JSON '{}': {e}", path.display())))?;

    serde_json::to_writer_pretty(file, &plan(run))
        .map_err(|e| AppError::new(4, format!("Failed to write plan JSON: {e}")))?;
    Ok(())
}

fn plan(run: &AllocationRun) -> AllocationPlan<'_> {
    AllocationPlan {
        tool: "mmb",
        generated_at: Local::now().to_rfc3339(),
        source: &run.source,
        basis: run.weights.basis,
        total_budget: run.recommended.total_budget,
        weights: &run.weights,
        recommended: &run.recommended,
        overrides: run
            .overrides
            .iter()
            .map(|(channel, &amount)| PlanOverride { channel, amount })
            .collect(),
        adjusted: run.adjusted.as_ref(),
    }
}
