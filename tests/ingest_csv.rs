use std::fs;

use mix_budget::app::pipeline::{load_data, run_allocation};
use mix_budget::domain::{AllocConfig, DataSource, Metric};
use mix_budget::error::AppError;
use mix_budget::io::export::{write_allocation_csv, write_allocation_json};

const DASHBOARD: &str = "\
Date,Channel,Spend,Impressions,Clicks,Conversions,FormFills,CTR%,Sales
2024-03-01,Search,\"$1,200\",40000,1200,300,40,3.0,9000
2024-03-01,Social,800,90000,900,100,25,1.0,2500
2024-03-01,Display,500,120000,360,100,10,0.3,1500
2024-03-02,Search,1100,38000,1100,n/a,35,2.9,8800
";

fn write_csv(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dashboard.csv");
    fs::write(&path, contents).unwrap();
    (dir, path)
}

#[test]
fn dashboard_export_loads_and_allocates() {
    let (_dir, path) = write_csv(DASHBOARD);
    let data = load_data(&DataSource::Csv(path)).unwrap();

    assert_eq!(data.rows_read, 4);
    assert_eq!(data.row_errors.len(), 1);
    assert_eq!(data.dataset.channels(), vec!["Search", "Social", "Display"]);

    let config = AllocConfig {
        total_budget: 5000.0,
        ..AllocConfig::default()
    };
    let run = run_allocation(&data.dataset, &data.source, &config).unwrap();
    let result = run.final_result();
    assert_eq!(result.get("Search"), Some(3000.0));
    assert_eq!(result.get("Social"), Some(1000.0));
    assert_eq!(result.get("Display"), Some(1000.0));
}

#[test]
fn override_run_exports_csv_and_json() {
    let (dir, path) = write_csv(DASHBOARD);
    let data = load_data(&DataSource::Csv(path)).unwrap();

    let config = AllocConfig {
        total_budget: 5000.0,
        overrides: vec![("search".to_string(), 4000.0)],
        ..AllocConfig::default()
    };
    let run = run_allocation(&data.dataset, &data.source, &config).unwrap();
    assert_eq!(run.final_result().get("Social"), Some(500.0));
    assert_eq!(run.final_result().get("Display"), Some(500.0));

    let csv_path = dir.path().join("plan.csv");
    let json_path = dir.path().join("plan.json");
    write_allocation_csv(&csv_path, &run).unwrap();
    write_allocation_json(&json_path, &run).unwrap();

    let csv = fs::read_to_string(&csv_path).unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("channel,weight,amount,overridden"));
    assert_eq!(lines.next(), Some("Search,0.6000000000,4000.00,true"));
    assert_eq!(lines.next(), Some("Social,0.2000000000,500.00,false"));

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(json["tool"], "mmb");
    assert_eq!(json["total_budget"], 5000.0);
    assert_eq!(json["basis"]["kind"], "metric");
    assert_eq!(json["basis"]["metric"], "conversions");
    assert_eq!(json["overrides"][0]["channel"], "Search");
}

#[test]
fn missing_metric_column_is_an_input_error() {
    let (_dir, path) = write_csv("channel,spend\nSearch,10\nSocial,20\n");
    let data = load_data(&DataSource::Csv(path)).unwrap();

    let err = run_allocation(&data.dataset, &data.source, &AllocConfig::default()).unwrap_err();
    let app: AppError = err.into();
    assert_eq!(app.exit_code(), 2);
    assert!(app.message().contains("`conversions`"));

    let by_spend = AllocConfig {
        metric: Metric::Spend,
        total_budget: 300.0,
        ..AllocConfig::default()
    };
    let run = run_allocation(&data.dataset, &data.source, &by_spend).unwrap();
    assert!((run.final_result().get("Social").unwrap() - 200.0).abs() < 1e-9);
}

#[test]
fn demo_source_is_deterministic() {
    let source = DataSource::Demo { seed: 7, days: 10 };
    let a = load_data(&source).unwrap();
    let b = load_data(&source).unwrap();
    assert_eq!(a.dataset.records(), b.dataset.records());
    assert_eq!(a.rows_read, a.dataset.len());
}
