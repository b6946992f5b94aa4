//! Interactive data-source picker.
//!
//! Kept separate from clap parsing:
//! - clap handles structured flags/subcommands
//! - the picker covers "run `mmb` without `-f` and choose a CSV"
//!
//! The picker lists `*.csv` files under the current working directory and also
//! offers the built-in demo dataset.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use crate::error::AppError;

/// Directory recursion depth when looking for CSV files.
const DEFAULT_SEARCH_DEPTH: usize = 4;

/// What the user picked.
#[derive(Debug, Clone, PartialEq)]
pub enum Pick {
    Csv(PathBuf),
    Demo,
}

/// Prompt on stdin/stdout for a data source.
///
/// Accepts a number from the list, an explicit path, `d` for the demo dataset,
/// or `q` to cancel.
pub fn prompt_for_source() -> Result<Pick, AppError> {
    let files = discover_csv_files(Path::new("."));
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();
    prompt_with(&files, &mut input, &mut output)
}

fn prompt_with<R: BufRead, W: Write>(files: &[PathBuf], input: &mut R, out: &mut W) -> Result<Pick, AppError> {
    let write_err = |e: io::Error| AppError::new(2, format!("Failed to write prompt: {e}"));

    if files.is_empty() {
        writeln!(out, "No .csv files found under the current directory.").map_err(write_err)?;
    } else {
        writeln!(out, "Found {} CSV file(s):", files.len()).map_err(write_err)?;
        for (idx, path) in files.iter().enumerate() {
            writeln!(out, "{:>3}) {}", idx + 1, pretty_path(path)).map_err(write_err)?;
        }
    }

    loop {
        if files.is_empty() {
            write!(out, "Type a CSV path, d for demo data, or q to quit: ").map_err(write_err)?;
        } else {
            write!(
                out,
                "Select a file (1-{}), type a path, d for demo data, or q to quit: ",
                files.len()
            )
            .map_err(write_err)?;
        }
        out.flush().map_err(write_err)?;

        let mut line = String::new();
        let bytes = input
            .read_line(&mut line)
            .map_err(|e| AppError::new(2, format!("Failed to read input: {e}")))?;
        if bytes == 0 {
            return Err(AppError::new(
                2,
                "No input received. Provide a CSV with `mmb <command> -f <file.csv>` or use --demo.",
            ));
        }

        let choice = line.trim();
        if choice.eq_ignore_ascii_case("q") {
            return Err(AppError::new(2, "Canceled."));
        }
        if choice.eq_ignore_ascii_case("d") {
            return Ok(Pick::Demo);
        }

        if let Ok(n) = choice.parse::<usize>() {
            if (1..=files.len()).contains(&n) {
                return validate_csv_path(&files[n - 1]).map(Pick::Csv);
            }
            writeln!(out, "Invalid choice: {n}.").map_err(write_err)?;
            continue;
        }

        match validate_csv_path(Path::new(choice)) {
            Ok(path) => return Ok(Pick::Csv(path)),
            Err(err) => writeln!(out, "{err}").map_err(write_err)?,
        }
    }
}

/// Validate that `path` points to an existing `.csv` file.
pub fn validate_csv_path(path: &Path) -> Result<PathBuf, AppError> {
    if !path.exists() {
        return Err(AppError::new(2, format!("CSV file not found: {}", path.display())));
    }
    if path.is_dir() {
        return Err(AppError::new(
            2,
            format!("Expected a file, got a directory: {}", path.display()),
        ));
    }
    if !has_csv_extension(path) {
        return Err(AppError::new(
            2,
            format!("Expected a .csv file (got: {}). Use -f to pass a CSV path.", path.display()),
        ));
    }
    Ok(path.to_path_buf())
}

/// Find `*.csv` files under `root` (deterministic order).
pub fn discover_csv_files(root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    walk(root, 0, DEFAULT_SEARCH_DEPTH, &mut out);
    out.sort_by_key(|p| pretty_path(p));
    out
}

fn walk(dir: &Path, depth: usize, max_depth: usize, out: &mut Vec<PathBuf>) {
    if depth > max_depth {
        return;
    }
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            if !should_skip_dir(&path) {
                walk(&path, depth + 1, max_depth, out);
            }
        } else if file_type.is_file() && has_csv_extension(&path) {
            out.push(path);
        }
    }
}

fn has_csv_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

fn should_skip_dir(path: &Path) -> bool {
    let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
    matches!(name, ".git" | "target" | "node_modules")
}

fn pretty_path(path: &Path) -> String {
    let stripped = path.strip_prefix("./").unwrap_or(path);
    stripped.display().to_string()
}
