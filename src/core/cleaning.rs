//! Field cleaning for raw survey cells.
//!
//! IPEDS marks unavailable data with a handful of sentinel glyphs instead of
//! leaving the cell empty. Cleaning turns those into [`Value::Missing`] and
//! coerces what is left to numbers or trimmed text. Both cleaners take the
//! input by reference and return a new table.

use log::warn;
use polars::prelude::PolarsResult;

use super::table::{Table, Value};

/// Tokens the survey uses for "not applicable", "not available" and
/// "not reported".
pub const NULL_CODES: [&str; 7] = [".", "..", "{", "†", "‡", "§", "¶"];

/// Text placeholders that carry no information.
const EMPTY_TEXT: [&str; 3] = ["", "nan", "None"];

/// Share of missing cells above which a cleaned column is reported.
const SPARSE_COLUMN_RATIO: f64 = 0.8;

/// Returns true if the raw token is one of the survey null codes.
#[inline]
pub fn is_null_code(token: &str) -> bool {
    NULL_CODES.contains(&token.trim())
}

/// Coerces one cell to a number.
///
/// Null codes and values that do not parse become `Missing`.
pub fn coerce_numeric(value: &Value) -> Value {
    match value {
        Value::Number(v) => Value::from_f64(Some(*v)),
        Value::Bool(b) => Value::Number(if *b { 1.0 } else { 0.0 }),
        Value::Text(s) => {
            let s = s.trim();
            if is_null_code(s) {
                return Value::Missing;
            }
            Value::from_f64(s.parse::<f64>().ok())
        }
        Value::Missing => Value::Missing,
    }
}

/// Normalises one text cell: trimmed, with empty placeholders and null
/// codes mapped to `Missing`.
pub fn coerce_text(value: &Value) -> Value {
    match value {
        Value::Text(s) => {
            let s = s.trim();
            if EMPTY_TEXT.contains(&s) || is_null_code(s) {
                Value::Missing
            } else {
                Value::Text(s.to_string())
            }
        }
        Value::Number(v) => Value::Text(super::table::format_number(*v)),
        Value::Bool(b) => Value::Text(b.to_string()),
        Value::Missing => Value::Missing,
    }
}

/// Cleans the named columns as numbers. Absent columns are skipped.
pub fn clean_numeric_columns<S: AsRef<str>>(table: &Table, columns: &[S]) -> PolarsResult<Table> {
    let mut cleaned = table.clone();
    for column in columns {
        let column = column.as_ref();
        if !cleaned.has_column(column) {
            continue;
        }
        cleaned.map_column(column, coerce_numeric)?;
        report_sparse_column(&cleaned, column);
    }
    Ok(cleaned)
}

/// Cleans the named columns as text. Absent columns are skipped.
pub fn clean_text_columns<S: AsRef<str>>(table: &Table, columns: &[S]) -> PolarsResult<Table> {
    let mut cleaned = table.clone();
    for column in columns {
        cleaned.map_column(column.as_ref(), coerce_text)?;
    }
    Ok(cleaned)
}

fn report_sparse_column(table: &Table, column: &str) {
    let total = table.num_rows();
    if total == 0 {
        return;
    }
    let missing = table.frame().column(column).map_or(0, |s| s.null_count());
    let ratio = missing as f64 / total as f64;
    if ratio > SPARSE_COLUMN_RATIO {
        warn!(
            "Column {}: {}/{} ({:.1}%) values are null after cleaning",
            column,
            missing,
            total,
            ratio * 100.0
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::table::KEY_COLUMN;

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    #[test]
    fn test_null_codes_become_missing() {
        for code in NULL_CODES {
            assert_eq!(coerce_numeric(&text(code)), Value::Missing, "code {code:?}");
        }
    }

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(coerce_numeric(&text(" 1234 ")), Value::Number(1234.0));
        assert_eq!(coerce_numeric(&text("12.5")), Value::Number(12.5));
        assert_eq!(coerce_numeric(&text("1,250")), Value::Missing);
        assert_eq!(coerce_numeric(&text("n/a")), Value::Missing);
        assert_eq!(coerce_numeric(&text("")), Value::Missing);
    }

    #[test]
    fn test_text_coercion() {
        assert_eq!(coerce_text(&text("  Boston ")), text("Boston"));
        assert_eq!(coerce_text(&text("nan")), Value::Missing);
        assert_eq!(coerce_text(&text("None")), Value::Missing);
        assert_eq!(coerce_text(&text("   ")), Value::Missing);
    }

    #[test]
    fn test_clean_numeric_columns_does_not_mutate_input() {
        let raw = Table::from_rows(
            vec![KEY_COLUMN.to_string(), "APPLCN".to_string()],
            vec![vec![text("100001"), text(".")], vec![text("100002"), text("500")]],
        )
        .unwrap();

        let cleaned = clean_numeric_columns(&raw, &["APPLCN", "NOT_THERE"]).unwrap();

        assert_eq!(raw.get(0, "APPLCN"), Some(text(".")));
        assert_eq!(cleaned.get(0, "APPLCN"), Some(Value::Missing));
        assert_eq!(cleaned.get(1, "APPLCN"), Some(Value::Number(500.0)));
        // untouched column keeps its raw text
        assert_eq!(cleaned.get(0, KEY_COLUMN), Some(text("100001")));
    }
}
