//! What-if overrides on top of a computed allocation.
//!
//! Overridden channels receive exactly the requested amount. The rest of the
//! budget is spread over the remaining channels in proportion to what they held
//! before, so the total stays equal to the original budget.

use std::collections::BTreeMap;

use tracing::debug;

use crate::alloc::allocator::check_budget;
use crate::alloc::AllocError;
use crate::domain::{AllocationResult, ChannelAllocation};

/// Relative slack when comparing override totals with the budget.
const BUDGET_TOLERANCE: f64 = 1e-9;

/// Apply per-channel overrides and rescale everyone else to fill the remainder.
pub fn apply_overrides(
    result: &AllocationResult,
    overrides: &BTreeMap<String, f64>,
    total_budget: f64,
) -> Result<AllocationResult, AllocError> {
    check_budget(total_budget)?;

    for (channel, &amount) in overrides {
        if result.get(channel).is_none() {
            return Err(AllocError::UnknownChannel {
                channel: channel.clone(),
            });
        }
        if !amount.is_finite() || amount < 0.0 {
            return Err(AllocError::InvalidOverride {
                channel: channel.clone(),
                amount,
            });
        }
    }

    let requested: f64 = overrides.values().sum();
    let slack = total_budget * BUDGET_TOLERANCE;
    if requested > total_budget + slack {
        return Err(AllocError::Overallocation {
            requested,
            total: total_budget,
        });
    }
    let remainder = (total_budget - requested).max(0.0);

    let free: Vec<&ChannelAllocation> = result
        .iter()
        .filter(|e| !overrides.contains_key(&e.channel))
        .collect();

    if free.is_empty() && remainder > slack {
        return Err(AllocError::Underallocation {
            allocated: requested,
            total: total_budget,
        });
    }

    let base: f64 = free.iter().map(|e| e.amount).sum();
    let n_free = free.len() as f64;

    let entries = result
        .iter()
        .map(|e| {
            let amount = match overrides.get(&e.channel) {
                Some(&fixed) => fixed,
                None if base > 0.0 => e.amount / base * remainder,
                None => remainder / n_free,
            };
            ChannelAllocation {
                channel: e.channel.clone(),
                amount,
            }
        })
        .collect();

    debug!(
        overrides = overrides.len(),
        requested,
        remainder,
        "applied allocation overrides"
    );

    Ok(AllocationResult {
        total_budget,
        entries,
    })
}
