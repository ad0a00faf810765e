//! Data writers for processed tables and plain-text reports.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use thiserror::Error;

use super::table::Table;

/// Errors that can occur during write operations.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Failed to create parent directories.
    #[error("failed to create parent directories for '{path}': {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create or open file for writing.
    #[error("failed to create file '{path}': {source}")]
    CreateFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write data to file.
    #[error("failed to write to file '{path}': {source}")]
    WriteFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV writing error.
    #[error("CSV write error for '{path}': {source}")]
    CsvError {
        path: String,
        #[source]
        source: csv::Error,
    },
}

/// Result type for write operations.
pub type Result<T> = std::result::Result<T, WriteError>;

/// Creates parent directories for a file path if they don't exist.
fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| WriteError::CreateDirectory {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
    }
    Ok(())
}

/// Creates a buffered writer for the given path.
fn create_buffered_writer(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).map_err(|e| WriteError::CreateFile {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(BufWriter::new(file))
}

/// Write a table to CSV with a header row.
///
/// Missing cells are written as empty fields, integral numbers without a
/// decimal point, and booleans as `true`/`false`.
///
/// # Errors
///
/// Returns an error if parent directories or the file cannot be created,
/// or if a record cannot be written.
pub fn write_table_csv(path: &Path, table: &Table) -> Result<()> {
    ensure_parent_dirs(path)?;
    let path_str = path.display().to_string();
    let csv_err = |e: csv::Error| WriteError::CsvError {
        path: path_str.clone(),
        source: e,
    };

    let mut writer = csv::Writer::from_writer(create_buffered_writer(path)?);

    writer.write_record(table.columns()).map_err(csv_err)?;
    for index in 0..table.num_rows() {
        writer
            .write_record(table.row(index).iter().map(|v| v.to_field()))
            .map_err(csv_err)?;
    }

    writer.flush().map_err(|e| WriteError::WriteFile {
        path: path_str.clone(),
        source: e,
    })?;

    Ok(())
}

/// Write a plain-text report.
pub fn write_text_report(path: &Path, content: &str) -> Result<()> {
    ensure_parent_dirs(path)?;
    let mut writer = create_buffered_writer(path)?;
    let path_str = path.display().to_string();

    writer
        .write_all(content.as_bytes())
        .and_then(|_| writer.flush())
        .map_err(|e| WriteError::WriteFile {
            path: path_str,
            source: e,
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::table::{Value, KEY_COLUMN};
    use tempfile::tempdir;

    #[test]
    fn test_write_table_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("admissions_processed.csv");

        let table = Table::from_rows(
            vec![KEY_COLUMN.to_string(), "acceptance_rate".into(), "selectivity_category".into()],
            vec![
                vec![Value::Number(100654.0), Value::Number(68.62), Value::Text("Moderately competitive (51-75%)".into())],
                vec![Value::Number(100663.0), Value::Missing, Value::Text("Unknown".into())],
            ],
        )
        .unwrap();

        write_table_csv(&path, &table).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "UNITID,acceptance_rate,selectivity_category");
        assert_eq!(lines[1], "100654,68.62,Moderately competitive (51-75%)");
        assert_eq!(lines[2], "100663,,Unknown");
    }

    #[test]
    fn test_write_text_report() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.txt");

        write_text_report(&path, "HEADER\n======\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "HEADER\n======\n");
    }
}
