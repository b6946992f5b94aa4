//! Top-level application orchestration.
//!
//! `src/main.rs` is tiny; this module is the "real main" that:
//! - loads `.env` and sets up logging
//! - parses CLI arguments
//! - loads a dataset (CSV, demo, or interactive pick)
//! - runs the allocation pipeline
//! - prints reports/plots
//! - writes optional exports

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::cli::picker::{prompt_for_source, validate_csv_path, Pick};
use crate::cli::{AllocateArgs, BudgetArgs, Command, DataArgs, StandardizeArgs, SummaryArgs, TuiArgs};
use crate::domain::{AllocConfig, DataSource};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `mmb` binary.
pub fn run() -> Result<(), AppError> {
    // `.env` only fills variables that are not already set.
    dotenvy::dotenv().ok();
    init_tracing();

    // `mmb` and `mmb -f data.csv` behave like `mmb tui ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Allocate(args) => handle_allocate(args),
        Command::Summary(args) => handle_summary(args),
        Command::Standardize(args) => handle_standardize(args),
        Command::Tui(args) => handle_tui(args),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // A second init (tests, embedding) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn handle_allocate(args: AllocateArgs) -> Result<(), AppError> {
    let data = pipeline::load_data(&resolve_source(&args.data)?)?;
    let config = alloc_config_from_args(&args);
    let run = pipeline::run_allocation(&data.dataset, &data.source, &config)?;

    println!("{}", crate::report::format_data_summary(&data));
    println!("{}", crate::report::format_allocation(&run));

    if config.plot {
        println!(
            "{}",
            crate::plot::render_allocation_bars(run.final_result(), config.plot_width)
        );
    }

    if let Some(path) = &config.export_csv {
        crate::io::export::write_allocation_csv(path, &run)?;
        println!("Wrote {}", path.display());
    }
    if let Some(path) = &config.export_json {
        crate::io::export::write_allocation_json(path, &run)?;
        println!("Wrote {}", path.display());
    }

    Ok(())
}

fn handle_summary(args: SummaryArgs) -> Result<(), AppError> {
    let data = pipeline::load_data(&resolve_source(&args.data)?)?;
    let dataset = crate::alloc::filter_channels(&data.dataset, &args.data.channels)?;
    let metrics = dataset.metrics();

    println!("{}", crate::report::format_data_summary(&data));
    println!(
        "{}",
        crate::report::format_channel_summary(&crate::report::summarize_channels(&dataset), &metrics)
    );
    println!(
        "{}",
        crate::report::format_contributions(&crate::report::contribution_table(&dataset, &metrics))
    );
    Ok(())
}

fn handle_standardize(args: StandardizeArgs) -> Result<(), AppError> {
    let data = pipeline::load_data(&resolve_source(&args.data)?)?;
    let dataset = crate::alloc::filter_channels(&data.dataset, &args.data.channels)?;
    let table = crate::math::standardize_columns(&dataset, &args.columns)?;

    println!("{}", crate::report::format_data_summary(&data));
    println!("{}", crate::report::format_standardized(&table, args.head));
    Ok(())
}

fn handle_tui(args: TuiArgs) -> Result<(), AppError> {
    let data = pipeline::load_data(&resolve_source(&args.data)?)?;
    let config = AllocConfig {
        channels: args.data.channels.clone(),
        ..budget_config(&args.budget)
    };
    crate::tui::run(data, config)
}

/// Pick the data source: `--file`, `--demo`, or an interactive prompt.
fn resolve_source(args: &DataArgs) -> Result<DataSource, AppError> {
    if args.demo {
        return Ok(DataSource::Demo {
            seed: args.seed,
            days: args.days,
        });
    }
    if let Some(path) = &args.file {
        return Ok(DataSource::Csv(validate_csv_path(path)?));
    }
    match prompt_for_source()? {
        Pick::Csv(path) => Ok(DataSource::Csv(path)),
        Pick::Demo => Ok(DataSource::Demo {
            seed: args.seed,
            days: args.days,
        }),
    }
}

fn budget_config(args: &BudgetArgs) -> AllocConfig {
    AllocConfig {
        metric: args.metric,
        total_budget: args.budget,
        equal_split: args.equal,
        ..AllocConfig::default()
    }
}

pub fn alloc_config_from_args(args: &AllocateArgs) -> AllocConfig {
    let config = AllocConfig {
        channels: args.data.channels.clone(),
        overrides: args.overrides.clone(),
        uplifts: args.uplifts.clone(),
        plot: !args.no_plot,
        plot_width: args.width,
        export_csv: args.export.clone(),
        export_json: args.export_json.clone(),
        ..budget_config(&args.budget)
    };
    debug!(?config, "resolved allocation config");
    config
}

/// Rewrite argv so `mmb` defaults to `mmb tui`.
///
/// Rules:
/// - `mmb`                      -> `mmb tui`
/// - `mmb -f data.csv ...`      -> `mmb tui -f data.csv ...`
/// - `mmb --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
    }
    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_defaults_to_tui() {
        assert_eq!(rewrite_args(argv(&["mmb"])), argv(&["mmb", "tui"]));
        assert_eq!(
            rewrite_args(argv(&["mmb", "--demo"])),
            argv(&["mmb", "tui", "--demo"])
        );
    }

    #[test]
    fn subcommands_and_help_are_untouched() {
        assert_eq!(rewrite_args(argv(&["mmb", "--help"])), argv(&["mmb", "--help"]));
        assert_eq!(
            rewrite_args(argv(&["mmb", "allocate", "--demo"])),
            argv(&["mmb", "allocate", "--demo"])
        );
    }

    #[test]
    fn allocate_args_become_config() {
        let cli = crate::cli::Cli::parse_from(["mmb", "allocate", "--demo", "--no-plot", "--equal", "-b", "750"]);
        let Command::Allocate(args) = cli.command else {
            panic!("expected allocate");
        };
        let config = alloc_config_from_args(&args);
        assert!(!config.plot);
        assert!(config.equal_split);
        assert_eq!(config.total_budget, 750.0);
    }

    #[test]
    fn demo_flag_skips_the_picker() {
        let args = DataArgs {
            file: None,
            demo: true,
            seed: 9,
            days: 4,
            channels: Vec::new(),
        };
        assert_eq!(
            resolve_source(&args).unwrap(),
            DataSource::Demo { seed: 9, days: 4 }
        );
    }
}
