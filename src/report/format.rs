//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the allocation code stays free of presentation concerns
//! - output changes are localized

use crate::app::pipeline::{AllocationRun, LoadedData};
use crate::domain::{Column, Metric};
use crate::io::ingest::RowError;
use crate::math::StandardizedTable;
use crate::report::{ChannelSummary, ContributionTable};

/// Dataset header: source, size, channels, columns, skipped rows.
pub fn format_data_summary(data: &LoadedData) -> String {
    let ds = &data.dataset;
    let mut out = String::new();

    out.push_str("=== mmb - media mix budget allocator ===\n");
    out.push_str(&format!("Source: {}\n", data.source));
    out.push_str(&format!(
        "Rows: used={} read={} | channels={}\n",
        ds.len(),
        data.rows_read,
        ds.channels().len()
    ));
    let columns: Vec<&str> = ds.columns().iter().map(|c| c.as_str()).collect();
    out.push_str(&format!("Columns: {}\n", columns.join(", ")));
    if data.ctr_derived {
        out.push_str("Note: ctr derived from clicks / impressions\n");
    }
    if !data.row_errors.is_empty() {
        out.push_str(&format_row_errors(&data.row_errors, 5));
    }
    out
}

pub fn format_row_errors(errors: &[RowError], limit: usize) -> String {
    let mut out = format!("Skipped rows: {}\n", errors.len());
    for e in errors.iter().take(limit) {
        let channel = e.channel.as_deref().unwrap_or("-");
        out.push_str(&format!("  line {:>5} [{channel}] {}\n", e.line, e.message));
    }
    if errors.len() > limit {
        out.push_str(&format!("  ... and {} more\n", errors.len() - limit));
    }
    out
}

/// Per-channel totals plus CTR / CPA / ROAS.
pub fn format_channel_summary(summaries: &[ChannelSummary], metrics: &[Metric]) -> String {
    let totals: Vec<Metric> = metrics.iter().copied().filter(|&m| m != Metric::Ctr).collect();

    let mut out = String::new();
    out.push_str("Channel performance:\n");

    let mut header = format!("{:<14} {:>6}", "channel", "rows");
    for m in &totals {
        header.push_str(&format!(" {:>13}", m.display_name()));
    }
    header.push_str(&format!(" {:>7} {:>9} {:>6}", "CTR%", "CPA", "ROAS"));
    out.push_str(&header);
    out.push('\n');
    out.push_str(&"-".repeat(header.chars().count()));
    out.push('\n');

    for s in summaries {
        let mut line = format!("{:<14} {:>6}", truncate(&s.channel, 14), s.rows);
        for &m in &totals {
            line.push_str(&format!(" {:>13}", opt(s.total(m), 2)));
        }
        line.push_str(&format!(
            " {:>7} {:>9} {:>6}",
            opt(s.ctr(), 2),
            opt(s.cpa(), 2),
            opt(s.roas(), 2)
        ));
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/// Share (%) of each metric contributed by each channel.
pub fn format_contributions(table: &ContributionTable) -> String {
    let mut out = String::new();
    out.push_str("Channel contributions (%):\n");

    let mut header = format!("{:<14}", "channel");
    for (m, _) in &table.columns {
        header.push_str(&format!(" {:>12}", m.display_name()));
    }
    out.push_str(&header);
    out.push('\n');
    out.push_str(&"-".repeat(header.chars().count()));
    out.push('\n');

    for channel in &table.channels {
        let mut line = format!("{:<14}", truncate(channel, 14));
        for (_, weights) in &table.columns {
            let cell = match weights {
                Ok(w) => opt(w.get(channel).map(|v| v * 100.0), 1),
                Err(_) => "n/a".to_string(),
            };
            line.push_str(&format!(" {cell:>12}"));
        }
        out.push_str(&line);
        out.push('\n');
    }

    for (m, weights) in &table.columns {
        if let Err(e) = weights {
            out.push_str(&format!("  ({} n/a) {e}\n", m.display_name()));
        }
    }
    out
}

/// Recommended vs final allocation per channel.
pub fn format_allocation(run: &AllocationRun) -> String {
    let mut out = String::new();
    let total = run.recommended.total_budget;

    out.push_str(&format!("Budget: {total:.2} | basis: {}\n", run.weights.basis.describe()));
    if !run.overrides.is_empty() {
        let list: Vec<String> = run
            .overrides
            .iter()
            .map(|(c, a)| format!("{c}={a:.2}"))
            .collect();
        out.push_str(&format!("Overrides: {}\n", list.join(", ")));
    }
    out.push('\n');

    let header = format!(
        "{:<14} {:>8} {:>14} {:>14} {:>7}",
        "channel", "weight", "recommended", "final", "share"
    );
    out.push_str(&header);
    out.push('\n');
    out.push_str(&"-".repeat(header.chars().count()));
    out.push('\n');

    let fin = run.final_result();
    for e in run.recommended.iter() {
        let weight = run.weights.get(&e.channel).unwrap_or(0.0);
        let final_amount = fin.get(&e.channel).unwrap_or(0.0);
        let marker = if run.overrides.contains_key(&e.channel) { "*" } else { " " };
        out.push_str(&format!(
            "{:<14} {:>8.4} {:>14.2} {:>13.2}{marker} {:>6.1}%\n",
            truncate(&e.channel, 14),
            weight,
            e.amount,
            final_amount,
            fin.share(&e.channel).unwrap_or(0.0) * 100.0,
        ));
    }
    out.push_str(&format!(
        "{:<14} {:>8.4} {:>14.2} {:>14.2}\n",
        "total",
        run.weights.total(),
        run.recommended.allocated(),
        fin.allocated()
    ));
    out
}

/// Standardized values (first `head` rows) plus mean / std per column.
pub fn format_standardized(table: &StandardizedTable, head: usize) -> String {
    let mut out = String::new();
    out.push_str("Standardized data (z-scores, sample std):\n");

    let mut header = format!("{:>5} {:<14}", "row", Column::Channel.as_str());
    for m in &table.metrics {
        header.push_str(&format!(" {:>12}", m.display_name()));
    }
    out.push_str(&header);
    out.push('\n');
    out.push_str(&"-".repeat(header.chars().count()));
    out.push('\n');

    let n = table.n_rows().min(head);
    for i in 0..n {
        let mut line = format!("{:>5} {:<14}", i, truncate(&table.channels[i], 14));
        for j in 0..table.metrics.len() {
            line.push_str(&format!(" {:>12.4}", table.values[(i, j)]));
        }
        out.push_str(&line);
        out.push('\n');
    }
    if table.n_rows() > n {
        out.push_str(&format!("... {} more rows\n", table.n_rows() - n));
    }

    out.push_str(&format!("{:>5} {:<14}", "", "mean"));
    for z in &table.params {
        out.push_str(&format!(" {:>12.4}", z.mean));
    }
    out.push('\n');
    out.push_str(&format!("{:>5} {:<14}", "", "std"));
    for z in &table.params {
        out.push_str(&format!(" {:>12.4}", z.std));
    }
    out.push('\n');
    out
}

fn opt(v: Option<f64>, decimals: usize) -> String {
    match v {
        Some(v) => format!("{v:.decimals$}"),
        None => "-".to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut t: String = s.chars().take(max.saturating_sub(1)).collect();
        t.push('…');
        t
    }
}
