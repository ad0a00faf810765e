//! Loaders for survey CSV extracts and previously processed tables.
//!
//! This module provides:
//! - Raw extract loading with encoding fallback (UTF-8 first, then Latin-1)
//! - Post-load inspection of the institution key column
//! - Typed loading of processed tables written by this pipeline

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use log::{error, info, warn};
use polars::prelude::PolarsError;
use thiserror::Error;

use super::table::{Table, Value, KEY_COLUMN};

/// Errors that can occur during file loading.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("required input file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV parsing error in '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("empty file: {0}")]
    EmptyFile(PathBuf),

    #[error("failed to build table from '{path}': {source}")]
    Frame {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Text encoding a file was decoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Latin1,
}

impl Encoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf-8",
            Encoding::Latin1 => "latin-1",
        }
    }
}

/// Decodes file contents, trying UTF-8 first and falling back to Latin-1.
///
/// Latin-1 maps every byte to a code point, so the fallback always succeeds.
/// A UTF-8 byte order mark is stripped.
pub fn decode_bytes(bytes: Vec<u8>) -> (String, Encoding) {
    match String::from_utf8(bytes) {
        Ok(mut text) => {
            if text.starts_with('\u{feff}') {
                text.replace_range(..'\u{feff}'.len_utf8(), "");
            }
            (text, Encoding::Utf8)
        }
        Err(err) => {
            let text: String = err.into_bytes().iter().map(|&b| b as char).collect();
            (text, Encoding::Latin1)
        }
    }
}

/// Load a raw survey extract.
///
/// Every non-empty cell is kept as text; empty cells become missing. Column
/// names are trimmed. Rows with a different field count are padded or
/// truncated to the header width.
///
/// # Errors
///
/// Returns [`LoaderError::NotFound`] if the file does not exist, and an
/// error if the file cannot be read, has no header, or is malformed CSV.
pub fn load_raw_csv(path: &Path) -> Result<Table> {
    let (text, encoding) = read_decoded(path)?;
    let table = parse_csv(path, &text, raw_cell)?;
    info!(
        "Loaded {} with {} encoding: {} rows",
        path.file_name().unwrap_or_default().to_string_lossy(),
        encoding.as_str(),
        table.num_rows()
    );
    Ok(table)
}

/// Load a table previously written by this pipeline.
///
/// Cells are typed on the way in: empty cells are missing, `true`/`false`
/// are booleans, anything that parses as a finite number is numeric, and
/// everything else is text.
pub fn load_processed_csv(path: &Path) -> Result<Table> {
    let (text, _) = read_decoded(path)?;
    parse_csv(path, &text, typed_cell)
}

/// Log key-column anomalies in a freshly loaded raw table.
///
/// Flags keys outside `[key_min, key_max]`, repeated keys, and more distinct
/// keys than `max_entities`. Never fails.
pub fn inspect_raw(table: &Table, name: &str, key_min: i64, key_max: i64, max_entities: usize) {
    if !table.has_key_column() {
        warn!("{}: No {} column found", name, KEY_COLUMN);
        return;
    }

    let keys = table.keys();
    let out_of_range = keys
        .iter()
        .flatten()
        .filter(|k| !(key_min..=key_max).contains(*k))
        .count();
    if out_of_range > 0 {
        warn!(
            "{}: Found {} {} values outside 6-digit range",
            name, out_of_range, KEY_COLUMN
        );
    }

    let duplicates = table.duplicate_key_count();
    if duplicates > 0 {
        warn!(
            "{}: Found {} duplicate {} values in raw data",
            name, duplicates, KEY_COLUMN
        );
    }

    let unique = table.distinct_key_count();
    if unique > max_entities {
        error!(
            "{}: Too many unique {} values ({}) - expected max {}",
            name, KEY_COLUMN, unique, max_entities
        );
    }
}

fn read_decoded(path: &Path) -> Result<(String, Encoding)> {
    if !path.exists() {
        return Err(LoaderError::NotFound(path.to_path_buf()));
    }
    let bytes = fs::read(path).map_err(|e| LoaderError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    if bytes.is_empty() {
        return Err(LoaderError::EmptyFile(path.to_path_buf()));
    }
    Ok(decode_bytes(bytes))
}

fn parse_csv(path: &Path, text: &str, cell: fn(&str) -> Value) -> Result<Table> {
    let csv_err = |e: csv::Error| LoaderError::Csv {
        path: path.to_path_buf(),
        source: e,
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(LoaderError::EmptyFile(path.to_path_buf()));
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(csv_err)?;
        rows.push(record.iter().map(cell).collect());
    }

    Table::from_rows(unique_headers(headers, path), rows).map_err(|e| LoaderError::Frame {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Renames repeated or blank header names to `{name}.{n}`.
fn unique_headers(headers: Vec<String>, path: &Path) -> Vec<String> {
    let mut seen = HashSet::new();
    headers
        .into_iter()
        .enumerate()
        .map(|(idx, header)| {
            let base = if header.is_empty() {
                format!("column_{}", idx)
            } else {
                header
            };
            let mut name = base.clone();
            let mut n = 1;
            while !seen.insert(name.clone()) {
                name = format!("{}.{}", base, n);
                n += 1;
            }
            if name != base {
                warn!("{}: repeated column {} renamed to {}", path.display(), base, name);
            }
            name
        })
        .collect()
}

fn raw_cell(field: &str) -> Value {
    if field.trim().is_empty() {
        Value::Missing
    } else {
        Value::Text(field.to_string())
    }
}

fn typed_cell(field: &str) -> Value {
    let field = field.trim();
    match field {
        "" => Value::Missing,
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => match field.parse::<f64>() {
            Ok(v) if v.is_finite() => Value::Number(v),
            _ => Value::Text(field.to_string()),
        },
    }
}
