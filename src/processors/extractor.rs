//! Data-driven per-domain extraction.
//!
//! Each domain is described by a [`DomainSpec`]: the raw files it reads, the
//! columns it keeps from each, and the derived fields it computes. A single
//! [`Extractor`] runs any spec through the same steps:
//!
//! 1. Select the declared columns from each source (absent columns are logged)
//! 2. Deduplicate the source by institution key, keeping the first row
//! 3. Clean text and numeric columns
//! 4. Compute source-level derived fields
//! 5. Outer-join the sources on the key
//! 6. Compute domain-level derived fields
//! 7. Drop rows with no informative data, unless the domain keeps its universe

use std::path::Path;

use log::{debug, error, info, warn};
use polars::prelude::{PolarsError, PolarsResult};
use regex::Regex;
use thiserror::Error;

use crate::config::ValidationConfig;
use crate::core::cleaning::{clean_numeric_columns, clean_text_columns};
use crate::core::loaders::{inspect_raw, load_raw_csv, LoaderError};
use crate::core::table::{Table, Value, KEY_COLUMN};

use super::domain::Domain;

/// Errors raised while extracting one domain.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Load(#[from] LoaderError),

    #[error("{domain}: no source file could be processed")]
    NoSources { domain: Domain },

    #[error("{file}: no UNITID column")]
    MissingKey { file: String },

    #[error("invalid column pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error(transparent)]
    Frame(#[from] PolarsError),
}

/// Result type for extraction.
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Which raw columns a source keeps.
#[derive(Debug, Clone)]
pub enum ColumnSelection {
    /// A fixed list, in output order.
    Fixed(Vec<&'static str>),
    /// Every column whose name matches the pattern, in file order.
    Matching(&'static str),
}

/// Whether a derived field needs all of its inputs or just one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requires {
    All,
    Any,
}

/// Per-row computation for a derived field.
///
/// Receives one slot per declared input; a slot is `None` when that input
/// column is absent from the table.
pub type Compute = fn(&[Option<&Value>]) -> Value;

/// A column computed from other columns of the same row.
#[derive(Debug, Clone)]
pub struct DerivedField {
    pub name: &'static str,
    pub inputs: &'static [&'static str],
    pub requires: Requires,
    pub compute: Compute,
}

impl DerivedField {
    pub const fn all(name: &'static str, inputs: &'static [&'static str], compute: Compute) -> Self {
        Self {
            name,
            inputs,
            requires: Requires::All,
            compute,
        }
    }

    pub const fn any(name: &'static str, inputs: &'static [&'static str], compute: Compute) -> Self {
        Self {
            name,
            inputs,
            requires: Requires::Any,
            compute,
        }
    }

    /// True if the table carries the inputs this field needs.
    pub fn is_available(&self, table: &Table) -> bool {
        match self.requires {
            Requires::All => self.inputs.iter().all(|c| table.has_column(c)),
            Requires::Any => self.inputs.iter().any(|c| table.has_column(c)),
        }
    }

    /// Adds the field to `table`. Returns false and leaves the table
    /// untouched when the inputs are not available.
    pub fn apply(&self, table: &mut Table) -> PolarsResult<bool> {
        if !self.is_available(table) {
            return Ok(false);
        }
        let inputs: Vec<Option<Vec<Value>>> = self
            .inputs
            .iter()
            .map(|c| table.column(c).map(|cells| cells.collect()))
            .collect();
        let values: Vec<Value> = (0..table.num_rows())
            .map(|row| {
                let args: Vec<Option<&Value>> = inputs
                    .iter()
                    .map(|cells| cells.as_ref().map(|cells| &cells[row]))
                    .collect();
                (self.compute)(&args)
            })
            .collect();
        table.set_column(self.name, values)?;
        Ok(true)
    }
}

/// Numeric view of input slot `i`.
pub fn input_f64(args: &[Option<&Value>], i: usize) -> Option<f64> {
    args.get(i).copied().flatten().and_then(Value::as_f64)
}

/// Text view of input slot `i`.
pub fn input_str<'a>(args: &[Option<&'a Value>], i: usize) -> Option<&'a str> {
    args.get(i).copied().flatten().and_then(Value::as_str)
}

/// Numeric view of every input slot.
pub fn inputs_f64(args: &[Option<&Value>]) -> Vec<Option<f64>> {
    (0..args.len()).map(|i| input_f64(args, i)).collect()
}

/// One raw file feeding a domain.
#[derive(Debug, Clone)]
pub struct SourceSpec {
    pub file: String,
    pub description: &'static str,
    pub columns: ColumnSelection,
    /// Columns cleaned as text; everything else except the key is numeric.
    pub text_columns: Vec<&'static str>,
    pub derived: Vec<DerivedField>,
    /// A missing or unreadable optional source is skipped with a warning.
    pub optional: bool,
}

impl SourceSpec {
    pub fn new(file: impl Into<String>, description: &'static str, columns: ColumnSelection) -> Self {
        Self {
            file: file.into(),
            description,
            columns,
            text_columns: Vec::new(),
            derived: Vec::new(),
            optional: false,
        }
    }

    pub fn with_text_columns(mut self, columns: Vec<&'static str>) -> Self {
        self.text_columns = columns;
        self
    }

    pub fn with_derived(mut self, derived: Vec<DerivedField>) -> Self {
        self.derived = derived;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Short name used as the join suffix for colliding columns.
    fn tag(&self) -> &str {
        self.file.strip_suffix(".csv").unwrap_or(&self.file)
    }
}

/// Full extraction recipe for one domain.
#[derive(Debug, Clone)]
pub struct DomainSpec {
    pub domain: Domain,
    pub sources: Vec<SourceSpec>,
    pub derived: Vec<DerivedField>,
    /// A row survives extraction only if one of these is present.
    pub informative_columns: Vec<&'static str>,
    /// Keep every row regardless of informative columns.
    pub retain_empty_rows: bool,
}

/// Runs a [`DomainSpec`].
#[derive(Debug, Clone)]
pub struct Extractor {
    spec: DomainSpec,
}

impl Extractor {
    pub fn new(spec: DomainSpec) -> Self {
        Self { spec }
    }

    pub fn domain(&self) -> Domain {
        self.spec.domain
    }

    pub fn spec(&self) -> &DomainSpec {
        &self.spec
    }

    /// Load every source from `raw_dir` and extract the domain table.
    ///
    /// # Errors
    ///
    /// Fails if a required source cannot be loaded, or if no source at all
    /// could be processed.
    pub fn load_and_extract(&self, raw_dir: &Path, validation: &ValidationConfig) -> Result<Table> {
        info!("Starting {} processing...", self.spec.domain);

        let mut raws = Vec::with_capacity(self.spec.sources.len());
        for source in &self.spec.sources {
            let path = raw_dir.join(&source.file);
            match load_raw_csv(&path) {
                Ok(table) => {
                    info!("Processing {}: {} rows", source.description, table.num_rows());
                    inspect_raw(
                        &table,
                        &source.file,
                        validation.key_min,
                        validation.key_max,
                        validation.max_entities,
                    );
                    raws.push(Some(table));
                }
                Err(e) if source.optional => {
                    warn!("Could not process {}: {}", source.file, e);
                    raws.push(None);
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.extract(&raws)
    }

    /// Extract the domain table from already loaded raw tables.
    ///
    /// `raws` is aligned with the domain's sources; `None` marks a source that
    /// is unavailable. The result has at most one row per key.
    pub fn extract(&self, raws: &[Option<Table>]) -> Result<Table> {
        let domain = self.spec.domain;
        let mut merged: Option<Table> = None;

        for (source, raw) in self.spec.sources.iter().zip(raws) {
            let Some(raw) = raw else {
                continue;
            };
            let table = match self.extract_source(source, raw) {
                Ok(table) => table,
                Err(e) if source.optional => {
                    warn!("Could not process {}: {}", source.file, e);
                    continue;
                }
                Err(e) => return Err(e),
            };

            merged = Some(match merged {
                None => table,
                Some(acc) => merge_source(acc, &table, source.tag())?,
            });
        }

        let mut table = merged.ok_or(ExtractError::NoSources { domain })?;

        for field in &self.spec.derived {
            if !field.apply(&mut table)? {
                warn!(
                    "{}: skipping derived field {} (inputs {:?} not available)",
                    domain, field.name, field.inputs
                );
            }
        }

        if !self.spec.retain_empty_rows {
            drop_uninformative_rows(&mut table, &self.spec.informative_columns, domain)?;
        }

        let removed = table.dedup_by_key()?;
        if removed > 0 {
            error!("{}: removed {} duplicate keys from final table", domain, removed);
        }

        info!(
            "{}: extracted {} rows, {} columns",
            domain,
            table.num_rows(),
            table.num_columns()
        );
        Ok(table)
    }

    fn extract_source(&self, source: &SourceSpec, raw: &Table) -> Result<Table> {
        if !raw.has_key_column() {
            return Err(ExtractError::MissingKey {
                file: source.file.clone(),
            });
        }

        let wanted = selected_columns(&source.columns, raw)?;
        let (mut table, absent) = raw.select(&wanted)?;
        if !absent.is_empty() {
            warn!(
                "{}: {} expected columns not present: {}",
                source.file,
                absent.len(),
                absent.join(", ")
            );
        }

        let removed = table.dedup_by_key()?;
        if removed > 0 {
            warn!("{}: removed {} duplicate {} rows", source.file, removed, KEY_COLUMN);
        }

        let numeric: Vec<String> = table
            .columns()
            .iter()
            .filter(|c| c.as_str() != KEY_COLUMN && !source.text_columns.contains(&c.as_str()))
            .cloned()
            .collect();
        let mut table = clean_numeric_columns(&clean_text_columns(&table, &source.text_columns)?, &numeric)?;
        table.normalize_keys()?;

        for field in &source.derived {
            if !field.apply(&mut table)? {
                warn!("{}: skipping derived field {}", source.file, field.name);
            }
        }

        debug!(
            "{}: {} rows, {} columns after cleaning",
            source.file,
            table.num_rows(),
            table.num_columns()
        );
        Ok(table)
    }
}

/// Resolves a column selection against a raw table. The key always comes
/// first.
fn selected_columns(selection: &ColumnSelection, raw: &Table) -> Result<Vec<String>> {
    let mut wanted = vec![KEY_COLUMN.to_string()];
    match selection {
        ColumnSelection::Fixed(columns) => {
            wanted.extend(columns.iter().filter(|c| **c != KEY_COLUMN).map(|c| c.to_string()));
        }
        ColumnSelection::Matching(pattern) => {
            let re = Regex::new(pattern).map_err(|e| ExtractError::Pattern {
                pattern: pattern.to_string(),
                source: e,
            })?;
            wanted.extend(
                raw.columns()
                    .iter()
                    .filter(|c| c.as_str() != KEY_COLUMN && re.is_match(c))
                    .cloned(),
            );
        }
    }
    Ok(wanted)
}

fn merge_source(acc: Table, incoming: &Table, tag: &str) -> PolarsResult<Table> {
    let before = acc.num_rows();
    let mut merged = acc.outer_join(incoming, tag)?;
    let duplicates = merged.duplicate_key_count();
    if duplicates > 0 {
        error!(
            "Merge with {} created {} duplicate keys ({} -> {} rows)",
            tag,
            duplicates,
            before,
            merged.num_rows()
        );
        merged.dedup_by_key()?;
    }
    info!("Merged {}: {} rows", tag, merged.num_rows());
    Ok(merged)
}

fn drop_uninformative_rows(table: &mut Table, informative: &[&str], domain: Domain) -> PolarsResult<()> {
    if !informative.iter().any(|c| table.has_column(c)) {
        warn!(
            "{}: none of the informative columns {:?} are present, no rows kept",
            domain, informative
        );
    }
    let dropped = table.retain_any_present(informative)?;
    if dropped > 0 {
        info!("{}: dropped {} rows without informative data", domain, dropped);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_row(cells: &[&str]) -> Vec<Value> {
        cells
            .iter()
            .map(|c| if c.is_empty() { Value::Missing } else { Value::Text(c.to_string()) })
            .collect()
    }

    fn raw(columns: &[&str], rows: &[&[&str]]) -> Table {
        Table::from_rows(
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter().map(|r| text_row(r)).collect(),
        )
        .unwrap()
    }

    fn double(args: &[Option<&Value>]) -> Value {
        Value::from_f64(input_f64(args, 0).map(|v| v * 2.0))
    }

    fn count_present(args: &[Option<&Value>]) -> Value {
        Value::Number(inputs_f64(args).iter().flatten().count() as f64)
    }

    fn spec(sources: Vec<SourceSpec>, derived: Vec<DerivedField>) -> DomainSpec {
        DomainSpec {
            domain: Domain::Admissions,
            sources,
            derived,
            informative_columns: vec!["A"],
            retain_empty_rows: false,
        }
    }

    #[test]
    fn test_extract_selects_cleans_and_dedups() {
        let source = SourceSpec::new("a.csv", "test", ColumnSelection::Fixed(vec!["A", "NAME", "GONE"]))
            .with_text_columns(vec!["NAME"]);
        let extractor = Extractor::new(spec(vec![source], vec![]));
        let table = raw(
            &["UNITID", "A", "NAME", "IGNORED"],
            &[&["100001", "5", " First ", "x"], &["100001", "6", "Dup", "y"], &["100002", ".", "nan", "z"], &["100003", "7", "", ""]],
        );

        let out = extractor.extract(&[Some(table)]).unwrap();

        assert_eq!(out.columns(), &["UNITID", "A", "NAME"]);
        // 100002 has no informative data
        assert_eq!(out.num_rows(), 2);
        assert_eq!(out.get(0, "A"), Some(Value::Number(5.0)));
        assert_eq!(out.get(0, "NAME"), Some(Value::Text("First".into())));
        assert_eq!(out.get(0, "UNITID"), Some(Value::Number(100001.0)));
    }

    #[test]
    fn test_retain_empty_rows_keeps_universe() {
        let source = SourceSpec::new("a.csv", "test", ColumnSelection::Fixed(vec!["A"]));
        let mut domain_spec = spec(vec![source], vec![]);
        domain_spec.retain_empty_rows = true;
        let extractor = Extractor::new(domain_spec);
        let table = raw(&["UNITID", "A"], &[&["100001", ""], &["100002", "."]]);

        let out = extractor.extract(&[Some(table)]).unwrap();
        assert_eq!(out.num_rows(), 2);
    }

    #[test]
    fn test_derived_field_omitted_when_inputs_absent() {
        let source = SourceSpec::new("a.csv", "test", ColumnSelection::Fixed(vec!["A"]));
        let extractor = Extractor::new(spec(
            vec![source],
            vec![
                DerivedField::all("a_doubled", &["A"], double),
                DerivedField::all("b_doubled", &["B"], double),
                DerivedField::any("present", &["A", "B"], count_present),
            ],
        ));
        let table = raw(&["UNITID", "A"], &[&["100001", "2"], &["100002", ""]]);

        let out = extractor.extract(&[Some(table)]).unwrap();

        assert!(out.has_column("a_doubled"));
        assert!(!out.has_column("b_doubled"));
        assert_eq!(out.get(0, "a_doubled"), Some(Value::Number(4.0)));
        assert_eq!(out.get(0, "present"), Some(Value::Number(1.0)));
    }

    #[test]
    fn test_sources_are_outer_joined() {
        let first = SourceSpec::new("a.csv", "first", ColumnSelection::Fixed(vec!["A"]));
        let second = SourceSpec::new("b.csv", "second", ColumnSelection::Matching("^AGE")).optional();
        let mut domain_spec = spec(vec![first, second], vec![]);
        domain_spec.informative_columns = vec!["A", "AGE1"];
        let extractor = Extractor::new(domain_spec);

        let a = raw(&["UNITID", "A"], &[&["100001", "1"], &["100002", "2"]]);
        let b = raw(
            &["UNITID", "AGE1", "AGE2", "OTHER"],
            &[&["100002", "10", "11", "x"], &["100002", "12", "13", "y"], &["100003", "20", "", "z"]],
        );

        let out = extractor.extract(&[Some(a), Some(b)]).unwrap();

        assert_eq!(out.columns(), &["UNITID", "A", "AGE1", "AGE2"]);
        assert_eq!(out.num_rows(), 3);
        assert_eq!(out.duplicate_key_count(), 0);
        assert_eq!(out.get(1, "AGE1"), Some(Value::Number(10.0)));
        assert_eq!(out.key_at(2), Some(100003));
    }

    #[test]
    fn test_missing_optional_source_is_skipped() {
        let first = SourceSpec::new("a.csv", "first", ColumnSelection::Fixed(vec!["A"])).optional();
        let second = SourceSpec::new("b.csv", "second", ColumnSelection::Fixed(vec!["A"])).optional();
        let extractor = Extractor::new(spec(vec![first, second], vec![]));
        let b = raw(&["UNITID", "A"], &[&["100001", "1"]]);

        let out = extractor.extract(&[None, Some(b)]).unwrap();
        assert_eq!(out.num_rows(), 1);

        let err = extractor.extract(&[None, None]).unwrap_err();
        assert!(matches!(err, ExtractError::NoSources { .. }));
    }

    #[test]
    fn test_required_source_without_key_fails() {
        let source = SourceSpec::new("a.csv", "test", ColumnSelection::Fixed(vec!["A"]));
        let extractor = Extractor::new(spec(vec![source], vec![]));
        let table = raw(&["ID", "A"], &[&["100001", "1"]]);

        let err = extractor.extract(&[Some(table)]).unwrap_err();
        assert!(matches!(err, ExtractError::MissingKey { .. }));
    }

    #[test]
    fn test_load_and_extract_missing_required_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = SourceSpec::new("absent.csv", "test", ColumnSelection::Fixed(vec!["A"]));
        let extractor = Extractor::new(spec(vec![source], vec![]));

        let err = extractor
            .load_and_extract(dir.path(), &ValidationConfig::default())
            .unwrap_err();
        assert!(matches!(err, ExtractError::Load(LoaderError::NotFound(_))));
    }
}
