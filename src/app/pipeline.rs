//! Shared allocation pipeline used by both CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the workflow:
//! load -> channel filter -> uplifts -> weights -> allocation -> overrides
//!
//! The CLI and the TUI can then focus on presentation (printing vs widgets).

use std::collections::BTreeMap;

use tracing::info;

use crate::alloc::{
    apply_overrides, apply_uplift, apply_weights, channel_weights, equal_channel_weights, filter_channels,
    resolve_channel, AllocError,
};
use crate::data::sample::{generate_sample, SampleConfig};
use crate::domain::{AllocConfig, AllocationResult, DataSource, Dataset, WeightMap};
use crate::error::AppError;
use crate::io::ingest::{load_dataset, RowError};

/// A dataset ready for analysis, plus how it was obtained.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub dataset: Dataset,
    pub source: String,
    pub rows_read: usize,
    pub row_errors: Vec<RowError>,
    pub ctr_derived: bool,
}

/// All computed outputs of a single allocation.
#[derive(Debug, Clone)]
pub struct AllocationRun {
    pub source: String,
    /// Dataset after channel filtering and uplifts.
    pub dataset: Dataset,
    pub weights: WeightMap,
    pub recommended: AllocationResult,
    /// Overrides keyed by canonical channel name.
    pub overrides: BTreeMap<String, f64>,
    pub adjusted: Option<AllocationResult>,
}

impl AllocationRun {
    /// The allocation to act on: adjusted if overrides were given.
    pub fn final_result(&self) -> &AllocationResult {
        self.adjusted.as_ref().unwrap_or(&self.recommended)
    }
}

/// Load a dataset from a CSV file or the demo generator.
pub fn load_data(source: &DataSource) -> Result<LoadedData, AppError> {
    match source {
        DataSource::Csv(path) => {
            let ingested = load_dataset(path)?;
            Ok(LoadedData {
                dataset: ingested.dataset,
                source: source.label(),
                rows_read: ingested.rows_read,
                row_errors: ingested.row_errors,
                ctr_derived: ingested.ctr_derived,
            })
        }
        DataSource::Demo { seed, days } => {
            let config = SampleConfig {
                seed: *seed,
                days: *days,
                ..SampleConfig::default()
            };
            let dataset = generate_sample(&config)?;
            Ok(LoadedData {
                rows_read: dataset.len(),
                dataset,
                source: source.label(),
                row_errors: Vec::new(),
                ctr_derived: false,
            })
        }
    }
}

/// Run the allocation workflow for one set of what-if parameters.
pub fn run_allocation(dataset: &Dataset, source: &str, config: &AllocConfig) -> Result<AllocationRun, AllocError> {
    let filtered = filter_channels(dataset, &config.channels)?;
    let scenario = apply_uplift(&filtered, &config.uplifts)?;

    let weights = if config.equal_split {
        equal_channel_weights(&scenario)?
    } else {
        channel_weights(&scenario, config.metric)?
    };
    let recommended = apply_weights(&weights, config.total_budget)?;

    let channels = scenario.channels();
    let mut overrides = BTreeMap::new();
    for (name, amount) in &config.overrides {
        let channel = resolve_channel(&channels, name)?;
        if overrides.contains_key(&channel) {
            return Err(AllocError::DuplicateOverride { channel });
        }
        overrides.insert(channel, *amount);
    }

    let adjusted = if overrides.is_empty() {
        None
    } else {
        Some(apply_overrides(&recommended, &overrides, config.total_budget)?)
    };

    info!(
        source,
        metric = %config.metric,
        budget = config.total_budget,
        channels = weights.len(),
        overrides = overrides.len(),
        "allocation run complete"
    );

    Ok(AllocationRun {
        source: source.to_string(),
        dataset: scenario,
        weights,
        recommended,
        overrides,
        adjusted,
    })
}
