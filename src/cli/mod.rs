//! Command-line parsing for the media-mix budget allocator.
//!
//! This module keeps **argument parsing** separate from allocation code.
//! Values resolve as: flag > environment (`MMB_*`, `.env` supported) > default.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{Metric, Uplift};

pub mod picker;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "mmb", version, about = "Media-mix budget allocator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Recommend a budget split across channels, optionally with what-if overrides.
    Allocate(AllocateArgs),
    /// Per-channel performance totals and contribution shares.
    Summary(SummaryArgs),
    /// Z-score selected metric columns.
    Standardize(StandardizeArgs),
    /// Launch the interactive what-if TUI.
    Tui(TuiArgs),
}

/// Where to read data from (shared by all commands).
#[derive(Debug, Args, Clone)]
pub struct DataArgs {
    /// CSV file with per-channel performance rows.
    #[arg(short = 'f', long, env = "MMB_DATA", value_name = "CSV", conflicts_with = "demo")]
    pub file: Option<PathBuf>,

    /// Use the built-in synthetic dataset instead of a CSV.
    #[arg(long)]
    pub demo: bool,

    /// Random seed for the demo dataset.
    #[arg(long, env = "MMB_SEED", default_value_t = 42)]
    pub seed: u64,

    /// Number of days in the demo dataset.
    #[arg(long, default_value_t = 30)]
    pub days: usize,

    /// Only keep these channels (repeatable, case-insensitive).
    #[arg(short = 'c', long = "channel", value_name = "NAME")]
    pub channels: Vec<String>,
}

/// Metric + budget (shared by `allocate` and `tui`).
#[derive(Debug, Args, Clone)]
pub struct BudgetArgs {
    /// Metric that drives the proportional split.
    #[arg(short = 'm', long, value_enum, env = "MMB_METRIC", default_value_t = Metric::Conversions)]
    pub metric: Metric,

    /// Total budget to distribute.
    #[arg(short = 'b', long, env = "MMB_BUDGET", default_value_t = 10_000.0)]
    pub budget: f64,

    /// Ignore performance and split the budget evenly.
    #[arg(long)]
    pub equal: bool,
}

#[derive(Debug, Args, Clone)]
pub struct AllocateArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub budget: BudgetArgs,

    /// Pin a channel to an amount, e.g. `Search=4000` (repeatable).
    #[arg(long = "override", value_name = "CHANNEL=AMOUNT", value_parser = parse_override)]
    pub overrides: Vec<(String, f64)>,

    /// Scale a metric before allocating: `conversions=10` or `Search:conversions=10` (percent, repeatable).
    #[arg(long = "uplift", value_name = "[CHANNEL:]METRIC=PCT", value_parser = parse_uplift)]
    pub uplifts: Vec<Uplift>,

    /// Disable the terminal bar chart.
    #[arg(long)]
    pub no_plot: bool,

    /// Bar chart width (columns).
    #[arg(long, default_value_t = 50)]
    pub width: usize,

    /// Export the allocation to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Export the allocation plan to JSON.
    #[arg(long = "export-json", value_name = "JSON")]
    pub export_json: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub data: DataArgs,
}

#[derive(Debug, Args, Clone)]
pub struct StandardizeArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Columns to standardize.
    #[arg(
        long,
        value_enum,
        value_delimiter = ',',
        default_values_t = [Metric::Ctr, Metric::Conversions, Metric::FormFills, Metric::Sales]
    )]
    pub columns: Vec<Metric>,

    /// Number of rows to print.
    #[arg(long, default_value_t = 5)]
    pub head: usize,
}

#[derive(Debug, Args, Clone)]
pub struct TuiArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub budget: BudgetArgs,
}

/// Parse `CHANNEL=AMOUNT`.
pub fn parse_override(s: &str) -> Result<(String, f64), String> {
    let (channel, amount) = s
        .rsplit_once('=')
        .ok_or_else(|| format!("expected CHANNEL=AMOUNT, got '{s}'"))?;
    let channel = channel.trim();
    if channel.is_empty() {
        return Err(format!("missing channel name in '{s}'"));
    }
    let amount: f64 = amount
        .trim()
        .parse()
        .map_err(|_| format!("invalid amount in '{s}'"))?;
    Ok((channel.to_string(), amount))
}

/// Parse `[CHANNEL:]METRIC=PCT`.
pub fn parse_uplift(s: &str) -> Result<Uplift, String> {
    let (target, percent) = s
        .rsplit_once('=')
        .ok_or_else(|| format!("expected [CHANNEL:]METRIC=PCT, got '{s}'"))?;
    let percent: f64 = percent
        .trim()
        .trim_end_matches('%')
        .parse()
        .map_err(|_| format!("invalid percent in '{s}'"))?;

    let (channel, metric) = match target.rsplit_once(':') {
        Some((c, m)) if !c.trim().is_empty() => (Some(c.trim().to_string()), m),
        Some((_, m)) => (None, m),
        None => (None, target),
    };
    let metric = <Metric as clap::ValueEnum>::from_str(metric.trim(), true)
        .map_err(|_| format!("unknown metric '{}'", metric.trim()))?;

    Ok(Uplift {
        channel,
        metric,
        percent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_parsing() {
        assert_eq!(parse_override("Search=4000").unwrap(), ("Search".to_string(), 4000.0));
        assert_eq!(
            parse_override("Paid Social = 12.5").unwrap(),
            ("Paid Social".to_string(), 12.5)
        );
        assert!(parse_override("Search").is_err());
        assert!(parse_override("=5").is_err());
        assert!(parse_override("Search=lots").is_err());
    }

    #[test]
    fn uplift_parsing() {
        let global = parse_uplift("conversions=10").unwrap();
        assert_eq!(global.channel, None);
        assert_eq!(global.metric, Metric::Conversions);
        assert_eq!(global.percent, 10.0);

        let scoped = parse_uplift("Search:form_fills=-5%").unwrap();
        assert_eq!(scoped.channel.as_deref(), Some("Search"));
        assert_eq!(scoped.metric, Metric::FormFills);
        assert_eq!(scoped.percent, -5.0);

        assert!(parse_uplift("Search:bogus=5").is_err());
        assert!(parse_uplift("ctr").is_err());
    }

    #[test]
    fn allocate_flags_parse() {
        let cli = Cli::try_parse_from([
            "mmb",
            "allocate",
            "--demo",
            "--metric",
            "form_fills",
            "--budget",
            "5000",
            "--override",
            "Search=1000",
            "--uplift",
            "Social:clicks=20",
            "-c",
            "Search",
            "-c",
            "Social",
        ])
        .unwrap();

        let Command::Allocate(args) = cli.command else {
            panic!("expected allocate");
        };
        assert!(args.data.demo);
        assert_eq!(args.data.channels, vec!["Search", "Social"]);
        assert_eq!(args.budget.metric, Metric::FormFills);
        assert_eq!(args.budget.budget, 5000.0);
        assert_eq!(args.overrides, vec![("Search".to_string(), 1000.0)]);
        assert_eq!(args.uplifts[0].metric, Metric::Clicks);
    }

    #[test]
    fn file_and_demo_conflict() {
        assert!(Cli::try_parse_from(["mmb", "summary", "--demo", "-f", "x.csv"]).is_err());
    }

    #[test]
    fn standardize_columns_default_and_delimited() {
        let cli = Cli::try_parse_from(["mmb", "standardize", "--demo"]).unwrap();
        let Command::Standardize(args) = cli.command else {
            panic!("expected standardize");
        };
        assert_eq!(
            args.columns,
            vec![Metric::Ctr, Metric::Conversions, Metric::FormFills, Metric::Sales]
        );

        let cli = Cli::try_parse_from(["mmb", "standardize", "--demo", "--columns", "spend,sales"]).unwrap();
        let Command::Standardize(args) = cli.command else {
            panic!("expected standardize");
        };
        assert_eq!(args.columns, vec![Metric::Spend, Metric::Sales]);
    }
}
