//! In-memory table model for survey extracts.
//!
//! A [`Table`] wraps a polars [`DataFrame`] and exposes it through the
//! [`Value`] cell view the extractors work with. Every IPEDS table is keyed
//! by the institution identifier in the [`KEY_COLUMN`] column; the key
//! helpers here normalise that identifier so that `"100654"`, `100654` and
//! `100654.0` all compare equal.

use std::collections::HashSet;
use std::fmt;

use polars::prelude::*;

/// Name of the institution identifier column in every survey file.
pub const KEY_COLUMN: &str = "UNITID";

/// A single cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Not reported, not applicable, or failed coercion.
    #[default]
    Missing,
    Number(f64),
    Text(String),
    Bool(bool),
}

impl Value {
    /// Builds a numeric cell, mapping `None` and non-finite values to `Missing`.
    pub fn from_f64(value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() => Value::Number(v),
            _ => Value::Missing,
        }
    }

    /// Builds a text cell, mapping `None` to `Missing`.
    pub fn from_text<S: Into<String>>(value: Option<S>) -> Self {
        value.map_or(Value::Missing, |s| Value::Text(s.into()))
    }

    fn from_any(value: AnyValue<'_>) -> Self {
        match value {
            AnyValue::Null => Value::Missing,
            AnyValue::Boolean(b) => Value::Bool(b),
            AnyValue::String(s) => Value::Text(s.to_string()),
            AnyValue::StringOwned(s) => Value::Text(s.to_string()),
            other => Value::from_f64(other.extract::<f64>()),
        }
    }

    #[inline]
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Numeric view of the cell. Booleans read as 1/0.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Interprets the cell as an institution key.
    ///
    /// Integral numbers and text that parses to an integral number are keys;
    /// anything else is not.
    pub fn as_key(&self) -> Option<i64> {
        match self {
            Value::Number(v) => integral(*v),
            Value::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(integral))
            }
            _ => None,
        }
    }

    /// Renders the cell for CSV output. Missing renders as an empty field.
    pub fn to_field(&self) -> String {
        match self {
            Value::Missing => String::new(),
            Value::Number(v) => format_number(*v),
            Value::Text(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => f.write_str("NA"),
            other => f.write_str(&other.to_field()),
        }
    }
}

fn integral(v: f64) -> Option<i64> {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 9.0e15 {
        Some(v as i64)
    } else {
        None
    }
}

/// Formats a number without a trailing `.0` for integral values.
pub fn format_number(v: f64) -> String {
    match integral(v) {
        Some(i) => i.to_string(),
        None => v.to_string(),
    }
}

/// Builds a typed series from cells.
///
/// Any text makes a string column, booleans alone make a boolean column,
/// everything else is `Float64`. Missing cells are nulls.
fn to_series(name: &str, values: &[Value]) -> Series {
    let has_text = values.iter().any(|v| matches!(v, Value::Text(_)));
    let has_number = values.iter().any(|v| matches!(v, Value::Number(_)));
    let has_bool = values.iter().any(|v| matches!(v, Value::Bool(_)));

    if has_text {
        let cells: Vec<Option<String>> = values
            .iter()
            .map(|v| (!v.is_missing()).then(|| v.to_field()))
            .collect();
        Series::new(name, cells)
    } else if has_bool && !has_number {
        let cells: Vec<Option<bool>> = values.iter().map(Value::as_bool).collect();
        Series::new(name, cells)
    } else {
        let cells: Vec<Option<f64>> = values
            .iter()
            .map(|v| v.as_f64().filter(|x| x.is_finite()))
            .collect();
        Series::new(name, cells)
    }
}

/// Keyed table backed by a polars data frame.
#[derive(Debug, Clone, Default)]
pub struct Table {
    frame: DataFrame,
}

impl From<DataFrame> for Table {
    fn from(frame: DataFrame) -> Self {
        Self { frame }
    }
}

impl Table {
    /// Creates a table from column names and rows.
    ///
    /// Rows shorter than the header are padded with `Missing`; longer rows
    /// are truncated. Fails on duplicate column names.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> PolarsResult<Self> {
        let mut cells: Vec<Vec<Value>> = vec![Vec::with_capacity(rows.len()); columns.len()];
        for row in rows {
            let mut row = row.into_iter();
            for column in cells.iter_mut() {
                column.push(row.next().unwrap_or_default());
            }
        }
        let series: Vec<Series> = columns
            .iter()
            .zip(&cells)
            .map(|(name, values)| to_series(name, values))
            .collect();
        Ok(DataFrame::new(series)?.into())
    }

    /// A table with only a key column and no rows.
    pub fn empty_keyed() -> Self {
        DataFrame::new(vec![Series::new_empty(KEY_COLUMN, &DataType::Int64)])
            .map(Self::from)
            .unwrap_or_default()
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    #[inline]
    pub fn num_rows(&self) -> usize {
        self.frame.height()
    }

    #[inline]
    pub fn num_columns(&self) -> usize {
        self.frame.width()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    pub fn columns(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .into_iter()
            .map(|c| c.to_string())
            .collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.frame.get_column_index(name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn has_key_column(&self) -> bool {
        self.has_column(KEY_COLUMN)
    }

    /// Cell lookup by row index and column name.
    pub fn get(&self, row: usize, column: &str) -> Option<Value> {
        let series = self.frame.column(column).ok()?;
        if row >= series.len() {
            return None;
        }
        series.get(row).ok().map(Value::from_any)
    }

    /// All cells of one row, in column order.
    pub fn row(&self, index: usize) -> Vec<Value> {
        self.frame
            .get_columns()
            .iter()
            .map(|s| s.get(index).map(Value::from_any).unwrap_or_default())
            .collect()
    }

    /// Iterates over the cells of one column.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = Value> + '_> {
        let series = self.frame.column(name).ok()?;
        Some((0..series.len()).map(move |i| series.get(i).map(Value::from_any).unwrap_or_default()))
    }

    /// Adds a column, or replaces it if a column with that name exists.
    ///
    /// `values` must have one entry per row.
    pub fn set_column(&mut self, name: &str, values: Vec<Value>) -> PolarsResult<()> {
        self.frame.with_column(to_series(name, &values))?;
        Ok(())
    }

    /// Applies `f` to every cell of a column. No-op for absent columns.
    pub fn map_column<F>(&mut self, name: &str, mut f: F) -> PolarsResult<()>
    where
        F: FnMut(&Value) -> Value,
    {
        let values: Vec<Value> = match self.column(name) {
            Some(cells) => cells.map(|v| f(&v)).collect(),
            None => return Ok(()),
        };
        self.set_column(name, values)
    }

    /// Projects the table onto the requested columns, in request order.
    ///
    /// Returns the projection and the requested names that were absent.
    pub fn select<S: AsRef<str>>(&self, wanted: &[S]) -> PolarsResult<(Table, Vec<String>)> {
        let mut names = Vec::with_capacity(wanted.len());
        let mut absent = Vec::new();
        let mut seen = HashSet::new();

        for name in wanted {
            let name = name.as_ref();
            if !seen.insert(name.to_string()) {
                continue;
            }
            if self.has_column(name) {
                names.push(name.to_string());
            } else {
                absent.push(name.to_string());
            }
        }

        Ok((self.frame.select(names)?.into(), absent))
    }

    /// Keeps the rows whose mask entry is true. Returns the number removed.
    pub fn retain_mask(&mut self, keep: &[bool]) -> PolarsResult<usize> {
        let before = self.num_rows();
        let mask = BooleanChunked::from_slice("keep", keep);
        self.frame = self.frame.filter(&mask)?;
        Ok(before - self.num_rows())
    }

    /// Keeps rows with a value in at least one of `columns`.
    ///
    /// Absent columns count as all-missing. Returns the number removed.
    pub fn retain_any_present(&mut self, columns: &[&str]) -> PolarsResult<usize> {
        let before = self.num_rows();
        let mut keep = BooleanChunked::full("keep", false, before);
        for name in columns {
            if let Ok(series) = self.frame.column(name) {
                keep = &keep | &series.is_not_null();
            }
        }
        self.frame = self.frame.filter(&keep)?;
        Ok(before - self.num_rows())
    }

    /// Key of a row, if the table is keyed and the cell holds a valid key.
    pub fn key_at(&self, row: usize) -> Option<i64> {
        self.get(row, KEY_COLUMN)?.as_key()
    }

    /// Keys of all rows in order. Empty if the table has no key column.
    pub fn keys(&self) -> Vec<Option<i64>> {
        match self.column(KEY_COLUMN) {
            Some(cells) => cells.map(|v| v.as_key()).collect(),
            None => Vec::new(),
        }
    }

    /// Set of distinct valid keys.
    pub fn key_set(&self) -> HashSet<i64> {
        self.keys().into_iter().flatten().collect()
    }

    /// Number of distinct valid keys. Rows without a key are not counted.
    pub fn distinct_key_count(&self) -> usize {
        self.key_set().len()
    }

    /// Number of rows whose valid key already appeared on an earlier row.
    ///
    /// Rows without a valid key are never duplicates of each other.
    pub fn duplicate_key_count(&self) -> usize {
        let mut seen: HashSet<i64> = HashSet::new();
        self.keys()
            .into_iter()
            .flatten()
            .filter(|k| !seen.insert(*k))
            .count()
    }

    /// Removes rows with a repeated valid key, keeping the first occurrence.
    ///
    /// Keys are normalised first. Rows without a valid key are kept and
    /// moved after the keyed rows; they are left for the key-range filter.
    /// Returns the number of rows removed. Tables without a key column are
    /// left untouched.
    pub fn dedup_by_key(&mut self) -> PolarsResult<usize> {
        if !self.has_key_column() {
            return Ok(0);
        }
        self.normalize_keys()?;
        let before = self.num_rows();

        let subset = [KEY_COLUMN.to_string()];
        let present = self.frame.column(KEY_COLUMN)?.is_not_null();
        let keyless = self.frame.filter(&!&present)?;
        let mut kept = self
            .frame
            .filter(&present)?
            .unique_stable(Some(&subset[..]), UniqueKeepStrategy::First, None)?;
        if keyless.height() > 0 {
            kept.vstack_mut(&keyless)?;
        }

        self.frame = kept;
        Ok(before - self.num_rows())
    }

    /// Drops rows whose key is missing or outside `[min, max]`.
    ///
    /// Returns the number of rows removed.
    pub fn retain_keys_in_range(&mut self, min: i64, max: i64) -> PolarsResult<usize> {
        if !self.has_key_column() {
            return Ok(0);
        }
        let keep: Vec<bool> = self
            .keys()
            .into_iter()
            .map(|k| k.is_some_and(|k| (min..=max).contains(&k)))
            .collect();
        self.retain_mask(&keep)
    }

    /// Replaces the key column with its normalised `Int64` form.
    ///
    /// Cells that are not valid keys become null.
    pub fn normalize_keys(&mut self) -> PolarsResult<()> {
        if !self.has_key_column() {
            return Ok(());
        }
        let keys = Series::new(KEY_COLUMN, self.keys());
        self.frame.with_column(keys)?;
        Ok(())
    }

    /// Left join on the key column.
    ///
    /// Every row of `self` is kept, in order. A right table that repeats a
    /// key multiplies left rows; callers that need one row per key must
    /// deduplicate `right` first.
    ///
    /// Right columns whose names collide with left columns are renamed to
    /// `{name}_{suffix}`.
    pub fn left_join(&self, right: &Table, suffix: &str) -> PolarsResult<Table> {
        let (left, right) = (self.keyed_frame()?, right.keyed_frame()?);
        let args = JoinArgs::new(JoinType::Left).with_suffix(Some(format!("_{}", suffix)));
        Ok(left.join(&right, [KEY_COLUMN], [KEY_COLUMN], args)?.into())
    }

    /// Full outer join on the key column, sorted by key.
    ///
    /// The key columns of both sides are coalesced; keyless rows sort last.
    pub fn outer_join(&self, right: &Table, suffix: &str) -> PolarsResult<Table> {
        let (left, right) = (self.keyed_frame()?, right.keyed_frame()?);
        let args = JoinArgs::new(JoinType::Full)
            .with_coalesce(JoinCoalesce::CoalesceColumns)
            .with_suffix(Some(format!("_{}", suffix)));
        let joined = left.join(&right, [KEY_COLUMN], [KEY_COLUMN], args)?;
        let sorted = joined.sort([KEY_COLUMN], SortMultipleOptions::default().with_nulls_last(true))?;
        Ok(sorted.into())
    }

    /// Count of missing cells per column, in column order.
    pub fn missing_counts(&self) -> Vec<(String, usize)> {
        self.frame
            .get_columns()
            .iter()
            .map(|s| (s.name().to_string(), s.null_count()))
            .collect()
    }

    fn keyed_frame(&self) -> PolarsResult<DataFrame> {
        let mut keyed = self.clone();
        keyed.normalize_keys()?;
        Ok(keyed.frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(v: f64) -> Value {
        Value::Number(v)
    }

    fn keyed(rows: &[(f64, f64)], value_col: &str) -> Table {
        Table::from_rows(
            vec![KEY_COLUMN.to_string(), value_col.to_string()],
            rows.iter().map(|&(k, v)| vec![num(k), num(v)]).collect(),
        )
        .unwrap()
    }

    fn keys_only(cells: Vec<Value>) -> Table {
        Table::from_rows(vec![KEY_COLUMN.to_string()], cells.into_iter().map(|c| vec![c]).collect()).unwrap()
    }

    #[test]
    fn test_key_normalisation() {
        assert_eq!(Value::Text("100654".into()).as_key(), Some(100654));
        assert_eq!(Value::Text(" 100654.0 ".into()).as_key(), Some(100654));
        assert_eq!(num(100654.0).as_key(), Some(100654));
        assert_eq!(num(100654.5).as_key(), None);
        assert_eq!(Value::Text("abc".into()).as_key(), None);
        assert_eq!(Value::Missing.as_key(), None);
    }

    #[test]
    fn test_field_rendering() {
        assert_eq!(num(42.0).to_field(), "42");
        assert_eq!(num(12.5).to_field(), "12.5");
        assert_eq!(Value::Missing.to_field(), "");
        assert_eq!(Value::Bool(true).to_field(), "true");
    }

    #[test]
    fn test_cells_read_back_typed() {
        let table = Table::from_rows(
            vec!["n".to_string(), "t".to_string(), "b".to_string()],
            vec![
                vec![num(1.5), Value::Text("x".into()), Value::Bool(true)],
                vec![Value::Missing],
            ],
        )
        .unwrap();

        assert_eq!(table.get(0, "n"), Some(num(1.5)));
        assert_eq!(table.get(0, "t"), Some(Value::Text("x".into())));
        assert_eq!(table.get(0, "b"), Some(Value::Bool(true)));
        assert_eq!(table.get(1, "t"), Some(Value::Missing));
        assert_eq!(table.get(2, "n"), None);
        assert_eq!(table.get(0, "absent"), None);
        assert_eq!(table.row(1), vec![Value::Missing, Value::Missing, Value::Missing]);
    }

    #[test]
    fn test_duplicate_column_names_are_rejected() {
        let result = Table::from_rows(vec!["a".to_string(), "a".to_string()], vec![]);
        assert!(result.is_err());
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let mut table = keyed(&[(100001.0, 1.0), (100002.0, 2.0), (100001.0, 3.0)], "v");
        assert_eq!(table.duplicate_key_count(), 1);

        let removed = table.dedup_by_key().unwrap();

        assert_eq!(removed, 1);
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.get(0, "v"), Some(num(1.0)));
        assert_eq!(table.duplicate_key_count(), 0);
    }

    #[test]
    fn test_dedup_matches_text_and_numeric_keys() {
        let mut table = keys_only(vec![Value::Text("100001".into()), num(100001.0)]);
        assert_eq!(table.distinct_key_count(), 1);
        assert_eq!(table.dedup_by_key().unwrap(), 1);
    }

    #[test]
    fn test_keyless_rows_are_not_duplicates() {
        let mut table = keys_only(vec![
            num(100001.0),
            Value::Text("x".into()),
            Value::Text("y".into()),
        ]);
        assert_eq!(table.duplicate_key_count(), 0);

        assert_eq!(table.dedup_by_key().unwrap(), 0);
        assert_eq!(table.num_rows(), 3);
        assert_eq!(table.key_at(0), Some(100001));
        assert_eq!(table.get(1, KEY_COLUMN), Some(Value::Missing));
    }

    #[test]
    fn test_left_join_keeps_all_left_rows() {
        let left = keyed(&[(100001.0, 1.0), (100002.0, 2.0), (100003.0, 3.0)], "a");
        let right = keyed(&[(100002.0, 20.0), (999999.0, 99.0)], "b");

        let joined = left.left_join(&right, "right").unwrap();

        assert_eq!(joined.num_rows(), 3);
        assert_eq!(joined.columns(), &["UNITID", "a", "b"]);
        assert_eq!(joined.get(0, "b"), Some(Value::Missing));
        assert_eq!(joined.get(1, "b"), Some(num(20.0)));
        assert!(!joined.key_set().contains(&999999));
    }

    #[test]
    fn test_left_join_multiplies_on_duplicate_right_keys() {
        let left = keyed(&[(100001.0, 1.0)], "a");
        let right = keyed(&[(100001.0, 10.0), (100001.0, 11.0)], "b");

        let joined = left.left_join(&right, "right").unwrap();

        assert_eq!(joined.num_rows(), 2);
        assert_eq!(joined.distinct_key_count(), 1);
    }

    #[test]
    fn test_left_join_renames_colliding_columns() {
        let left = keyed(&[(100001.0, 1.0)], "v");
        let right = keyed(&[(100001.0, 2.0)], "v");

        let joined = left.left_join(&right, "finance").unwrap();

        assert_eq!(joined.columns(), &["UNITID", "v", "v_finance"]);
    }

    #[test]
    fn test_outer_join_keeps_unmatched_right_rows() {
        let left = keyed(&[(100001.0, 1.0)], "a");
        let right = keyed(&[(100002.0, 20.0), (100001.0, 10.0)], "b");

        let joined = left.outer_join(&right, "right").unwrap();

        assert_eq!(joined.num_rows(), 2);
        assert_eq!(joined.columns(), &["UNITID", "a", "b"]);
        assert_eq!(joined.key_at(0), Some(100001));
        assert_eq!(joined.key_at(1), Some(100002));
        assert_eq!(joined.get(1, "a"), Some(Value::Missing));
        assert_eq!(joined.get(1, "b"), Some(num(20.0)));
    }

    #[test]
    fn test_select_reports_absent_columns() {
        let table = keyed(&[(100001.0, 1.0)], "a");
        let (projected, absent) = table.select(&["UNITID", "a", "zzz", "a"]).unwrap();

        assert_eq!(projected.columns(), &["UNITID", "a"]);
        assert_eq!(absent, vec!["zzz".to_string()]);
    }

    #[test]
    fn test_retain_keys_in_range() {
        let mut table = keys_only(vec![num(100001.0), num(42.0), Value::Missing]);
        assert_eq!(table.retain_keys_in_range(100_000, 999_999).unwrap(), 2);
        assert_eq!(table.num_rows(), 1);
    }

    #[test]
    fn test_retain_any_present() {
        let mut table = Table::from_rows(
            vec![KEY_COLUMN.to_string(), "a".to_string(), "b".to_string()],
            vec![
                vec![num(100001.0), num(1.0), Value::Missing],
                vec![num(100002.0), Value::Missing, Value::Missing],
                vec![num(100003.0), Value::Missing, num(2.0)],
            ],
        )
        .unwrap();

        assert_eq!(table.retain_any_present(&["a", "b", "absent"]).unwrap(), 1);
        assert_eq!(table.key_set(), HashSet::from([100001, 100003]));
    }

    #[test]
    fn test_map_and_set_column() {
        let mut table = keyed(&[(100001.0, 1.0), (100002.0, 2.0)], "a");
        table
            .map_column("a", |v| Value::from_f64(v.as_f64().map(|x| x * 10.0)))
            .unwrap();
        table
            .set_column("flag", vec![Value::Bool(true), Value::Bool(false)])
            .unwrap();

        assert_eq!(table.get(1, "a"), Some(num(20.0)));
        assert_eq!(table.get(1, "flag"), Some(Value::Bool(false)));
        assert_eq!(table.num_columns(), 3);
    }

    #[test]
    fn test_missing_counts() {
        let table = Table::from_rows(
            vec![KEY_COLUMN.to_string(), "a".to_string()],
            vec![vec![num(1.0), Value::Missing], vec![num(2.0), Value::Missing]],
        )
        .unwrap();
        let counts = table.missing_counts();
        assert_eq!(counts[0], ("UNITID".to_string(), 0));
        assert_eq!(counts[1], ("a".to_string(), 2));
    }
}
