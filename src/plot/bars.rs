//! ASCII/Unicode bar chart for terminal output.
//!
//! This is intentionally "dumb" (fixed width, one row per channel), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Bars are scaled to the largest amount; `█` fills whole cells and the final
//! cell uses a partial block for the fractional remainder.

use crate::domain::AllocationResult;

const PARTIALS: [char; 8] = [' ', '▏', '▎', '▍', '▌', '▋', '▊', '▉'];

/// Render one horizontal bar per channel.
pub fn render_allocation_bars(result: &AllocationResult, width: usize) -> String {
    let width = width.max(10);
    let label_width = result
        .iter()
        .map(|e| e.channel.chars().count())
        .max()
        .unwrap_or(0)
        .min(16);

    let max = result.iter().map(|e| e.amount).fold(0.0, f64::max);

    let mut out = String::new();
    out.push_str(&format!("Allocation (total {:.2}):\n", result.total_budget));
    for e in result.iter() {
        let label: String = e.channel.chars().take(label_width).collect();
        let bar = bar(e.amount, max, width);
        let share = result.share(&e.channel).unwrap_or(0.0) * 100.0;
        out.push_str(&format!(
            "{label:<label_width$} │{bar:<width$}│ {:>10.2} ({share:>5.1}%)\n",
            e.amount
        ));
    }
    out
}

fn bar(value: f64, max: f64, width: usize) -> String {
    if !(value.is_finite() && max.is_finite()) || max <= 0.0 || value <= 0.0 {
        return String::new();
    }

    let eighths = ((value / max) * (width * 8) as f64).round() as usize;
    let eighths = eighths.min(width * 8);
    let full = eighths / 8;
    let rem = eighths % 8;

    let mut s = "█".repeat(full);
    if rem > 0 {
        s.push(PARTIALS[rem]);
    }
    s
}
