//! CSV ingest and normalization.
//!
//! Turns a media-performance export (one row per channel and day, typically)
//! into a `Dataset`.
//!
//! Design goals:
//! - **Tolerant headers**: `CTR%`, `FormFills`, `Form Fills`, `form_fills` all resolve
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Deterministic behavior**: record order follows the file
//! - **Separation of concerns**: no allocation logic here

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use csv::StringRecord;
use tracing::{info, warn};

use crate::domain::{Column, Dataset, Metric, PerformanceRecord};
use crate::error::AppError;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub channel: Option<String>,
    pub message: String,
}

/// Ingest output: dataset + row errors + counts.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub dataset: Dataset,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
    /// `ctr` was computed from clicks / impressions rather than read.
    pub ctr_derived: bool,
    pub source: PathBuf,
}

/// Load a CSV file into a `Dataset`.
pub fn load_dataset(path: &Path) -> Result<IngestedData, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    let mut ingested = read_dataset(file)?;
    ingested.source = path.to_path_buf();
    info!(
        path = %path.display(),
        rows_read = ingested.rows_read,
        rows_used = ingested.rows_used,
        row_errors = ingested.row_errors.len(),
        "loaded dataset"
    );
    Ok(ingested)
}

/// Parse CSV from any reader (used by `load_dataset` and tests).
pub fn read_dataset<R: Read>(reader: R) -> Result<IngestedData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();

    let header_map = build_header_map(&headers);
    if !header_map.contains_key(&Column::Channel) {
        return Err(AppError::new(
            2,
            "Missing required column: `channel` (also accepted: `medium`, `source`).",
        ));
    }

    let mut columns: Vec<Column> = Vec::new();
    columns.push(Column::Channel);
    if header_map.contains_key(&Column::Date) {
        columns.push(Column::Date);
    }
    for m in Metric::ALL {
        if header_map.contains_key(&Column::Metric(m)) {
            columns.push(Column::Metric(m));
        }
    }

    let mut records = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: records() starts after the header, and lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    channel: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, &header_map) {
            Ok(row) => records.push(row),
            Err((channel, message)) => row_errors.push(RowError {
                line,
                channel,
                message,
            }),
        }
    }

    for e in &row_errors {
        warn!(line = e.line, channel = ?e.channel, "skipped row: {}", e.message);
    }

    let rows_used = records.len();
    if rows_used == 0 {
        return Err(AppError::new(3, "No valid rows remain after parsing."));
    }

    let mut dataset = Dataset::new(columns, records);
    let ctr_derived = !dataset.has_column(Column::Metric(Metric::Ctr))
        && dataset.has_column(Column::Metric(Metric::Clicks))
        && dataset.has_column(Column::Metric(Metric::Impressions));
    if ctr_derived {
        dataset = derive_ctr(dataset);
    }

    Ok(IngestedData {
        dataset,
        row_errors,
        rows_read,
        rows_used,
        ctr_derived,
        source: PathBuf::new(),
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<Column, usize> {
    let mut map = HashMap::new();
    for (idx, name) in headers.iter().enumerate() {
        if let Some(column) = resolve_header(name) {
            // First occurrence wins.
            map.entry(column).or_insert(idx);
        }
    }
    map
}

fn normalize_header_name(name: &str) -> String {
    // Excel likes to prefix the first header with a UTF-8 BOM; without stripping
    // it, `channel` would go unrecognized.
    name.trim()
        .trim_start_matches('\u{feff}')
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

fn resolve_header(name: &str) -> Option<Column> {
    let column = match normalize_header_name(name).as_str() {
        "channel" | "medium" | "source" => Column::Channel,
        "date" | "day" => Column::Date,
        "spend" | "cost" => Column::Metric(Metric::Spend),
        "impressions" => Column::Metric(Metric::Impressions),
        "clicks" => Column::Metric(Metric::Clicks),
        "conversions" => Column::Metric(Metric::Conversions),
        "formfills" => Column::Metric(Metric::FormFills),
        "ctr" => Column::Metric(Metric::Ctr),
        "sales" | "revenue" => Column::Metric(Metric::Sales),
        _ => return None,
    };
    Some(column)
}

fn parse_row(
    record: &StringRecord,
    header_map: &HashMap<Column, usize>,
) -> Result<PerformanceRecord, (Option<String>, String)> {
    let channel = get_cell(record, header_map, Column::Channel)
        .ok_or_else(|| (None, "Missing required value: `channel`".to_string()))?
        .to_string();

    let mut row = PerformanceRecord::new(channel.clone());

    if let Some(s) = get_cell(record, header_map, Column::Date) {
        row.date = Some(parse_date(s).map_err(|e| (Some(channel.clone()), e))?);
    }

    for m in Metric::ALL {
        let Some(s) = get_cell(record, header_map, Column::Metric(m)) else {
            continue;
        };
        let v = parse_number(s).ok_or_else(|| {
            (
                Some(channel.clone()),
                format!("Invalid `{}` value '{s}'.", m.as_str()),
            )
        })?;
        row.set(m, Some(v));
    }

    Ok(row)
}

/// Fill `ctr` (%) from clicks / impressions on every record that has both.
fn derive_ctr(dataset: Dataset) -> Dataset {
    let records = dataset
        .records()
        .iter()
        .cloned()
        .map(|mut r| {
            if let (Some(clicks), Some(impressions)) = (r.clicks, r.impressions) {
                r.ctr = Some(if impressions > 0.0 {
                    clicks / impressions * 100.0
                } else {
                    0.0
                });
            }
            r
        })
        .collect();
    dataset
        .with_records(records)
        .with_column(Column::Metric(Metric::Ctr))
}

fn get_cell<'a>(record: &'a StringRecord, header_map: &HashMap<Column, usize>, column: Column) -> Option<&'a str> {
    let idx = header_map.get(&column)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    const FMTS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    Err(format!(
        "Invalid date '{s}'. Expected one of: YYYY-MM-DD, DD/MM/YYYY, DD-MM-YYYY, YYYY/MM/DD."
    ))
}

/// Parse a numeric cell, tolerating `$`, `%`, and thousands separators.
fn parse_number(s: &str) -> Option<f64> {
    let cleaned: String = s
        .chars()
        .filter(|c| !matches!(c, '$' | '%' | ',' | ' '))
        .collect();
    let v = cleaned.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_resolve_common_spellings() {
        assert_eq!(resolve_header("CTR%"), Some(Column::Metric(Metric::Ctr)));
        assert_eq!(resolve_header("FormFills"), Some(Column::Metric(Metric::FormFills)));
        assert_eq!(resolve_header(" Form Fills "), Some(Column::Metric(Metric::FormFills)));
        assert_eq!(resolve_header("\u{feff}Channel"), Some(Column::Channel));
        assert_eq!(resolve_header("Revenue"), Some(Column::Metric(Metric::Sales)));
        assert_eq!(resolve_header("campaign_id"), None);
    }

    #[test]
    fn numbers_tolerate_currency_and_separators() {
        assert_eq!(parse_number("$1,250.50"), Some(1250.5));
        assert_eq!(parse_number("3.5%"), Some(3.5));
        assert_eq!(parse_number("n/a"), None);
        assert_eq!(parse_number("inf"), None);
    }

    #[test]
    fn reads_rows_and_reports_bad_ones() {
        let csv = "Date,Channel,Spend,Conversions,FormFills,CTR%,Sales\n\
                   2024-01-01,Search,100,30,5,2.5,900\n\
                   2024-01-01,Social,80,oops,2,1.1,300\n\
                   2024-01-02,,10,1,1,1.0,10\n\
                   02/01/2024,Display,50,10,1,0.4,200\n";
        let out = read_dataset(csv.as_bytes()).unwrap();

        assert_eq!(out.rows_read, 4);
        assert_eq!(out.rows_used, 2);
        assert_eq!(out.row_errors.len(), 2);
        assert_eq!(out.row_errors[0].line, 3);
        assert_eq!(out.row_errors[0].channel.as_deref(), Some("Social"));
        assert_eq!(out.row_errors[1].line, 4);

        let ds = &out.dataset;
        assert_eq!(ds.channels(), vec!["Search", "Display"]);
        assert!(ds.has_column(Column::Date));
        assert!(ds.has_column(Column::Metric(Metric::FormFills)));
        assert!(!ds.has_column(Column::Metric(Metric::Clicks)));
        assert_eq!(
            ds.records()[1].date,
            NaiveDate::from_ymd_opt(2024, 1, 2)
        );
        assert!(!out.ctr_derived);
    }

    #[test]
    fn derives_ctr_from_clicks_and_impressions() {
        let csv = "channel,impressions,clicks\nSearch,1000,25\nEmail,0,0\n";
        let out = read_dataset(csv.as_bytes()).unwrap();
        assert!(out.ctr_derived);
        assert!(out.dataset.has_column(Column::Metric(Metric::Ctr)));
        assert_eq!(out.dataset.records()[0].ctr, Some(2.5));
        assert_eq!(out.dataset.records()[1].ctr, Some(0.0));
    }

    #[test]
    fn channel_column_is_required() {
        let err = read_dataset("spend,sales\n1,2\n".as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn no_usable_rows_is_exit_code_three() {
        let err = read_dataset("channel,spend\nSearch,abc\n".as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
