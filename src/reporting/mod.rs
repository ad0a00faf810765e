//! Plain-text reports and post-run analysis.
//!
//! Everything here renders to a `String`; writing the result to disk is the
//! caller's job. Reports are meant for people and are not parsed back.

use std::collections::HashMap;
use std::fmt::Write;
use std::path::Path;

use log::{info, warn};
use polars::prelude::{ChunkQuantile, ChunkVar, DataType, NamedFrom, Series};

use crate::config::PipelineConfig;
use crate::core::loaders::load_processed_csv;
use crate::core::table::{format_number, Table, KEY_COLUMN};
use crate::processors::domain::Domain;
use crate::processors::unify::UnifyReport;
use crate::processors::validation::ValidationReport;

/// File name of the unified dataset.
pub const UNIFIED_FILE: &str = "unified_ipeds_dataset.csv";
/// File name of the run summary.
pub const SUMMARY_FILE: &str = "processing_summary_report.txt";
/// File name of the audit report.
pub const AUDIT_FILE: &str = "data_validation_report.txt";

/// Expected row range of the unified dataset.
const UNIFIED_EXPECTED_ROWS: (usize, usize) = (6000, 7000);

fn heading(out: &mut String, title: &str, underline: char) {
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "{}", underline.to_string().repeat(title.chars().count()));
}

fn pct(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn pass_fail(ok: bool) -> &'static str {
    if ok {
        "PASS"
    } else {
        "FAIL"
    }
}

/// Render a per-table validation report.
pub fn validation_report_text(report: &ValidationReport) -> String {
    let mut out = String::new();
    heading(&mut out, "DATA PROCESSING VALIDATION REPORT", '=');
    let _ = writeln!(out, "Dataset: {}\n", report.dataset);

    heading(&mut out, "BASIC STATISTICS", '-');
    let _ = writeln!(out, "total_records: {}", report.total_rows);
    let _ = writeln!(out, "total_columns: {}", report.total_columns);
    let _ = writeln!(out, "unique_unitids: {}", report.unique_keys);
    let _ = writeln!(out, "duplicate_unitids: {}", report.duplicate_keys);
    match &report.key_stats {
        Some(stats) => {
            if let Some((min, max)) = stats.range {
                let _ = writeln!(out, "unitid_min: {}", min);
                let _ = writeln!(out, "unitid_max: {}", max);
            }
            let _ = writeln!(out, "unitid_null_count: {}", stats.null_count);
            let _ = writeln!(out, "unitid_out_of_range: {}", stats.out_of_range);
        }
        None => {
            let _ = writeln!(out, "No {} column", KEY_COLUMN);
        }
    }
    out.push('\n');

    heading(&mut out, "DATA QUALITY ASSESSMENT", '-');
    let flags = [
        ("has_duplicate_unitids", report.flags.has_duplicate_keys),
        ("too_many_institutions", report.flags.too_many_entities),
        ("too_few_institutions", report.flags.too_few_entities),
        ("has_invalid_unitids", report.flags.has_invalid_keys),
    ];
    for (name, raised) in flags {
        let _ = writeln!(out, "{}: {}", name, pass_fail(!raised));
    }
    let _ = writeln!(out, "\nOverall Quality Score: {}/100\n", report.quality_score);

    heading(&mut out, "MISSING DATA ANALYSIS", '-');
    let mut any_missing = false;
    for (column, missing) in &report.missing_by_column {
        if *missing > 0 {
            any_missing = true;
            let _ = writeln!(
                out,
                "{}: {} ({:.1}%)",
                column,
                missing,
                pct(*missing, report.total_rows)
            );
        }
    }
    if !any_missing {
        let _ = writeln!(out, "No missing values");
    }
    out
}

/// Label counts, most frequent first, ties broken by label. Missing cells are
/// not counted.
pub fn value_counts(table: &Table, column: &str) -> Vec<(String, usize)> {
    let Some(values) = table.column(column) else {
        return Vec::new();
    };
    let mut counts: HashMap<String, usize> = HashMap::new();
    for value in values.filter(|v| !v.is_missing()) {
        *counts.entry(value.to_field()).or_default() += 1;
    }
    let mut counts: Vec<(String, usize)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

/// Render the end-of-run summary.
///
/// `domains` lists the per-domain tables that were produced this run, in
/// processing order.
pub fn summary_report_text(
    unified: &Table,
    report: &UnifyReport,
    domains: &[(Domain, &Table)],
    top_missing: usize,
) -> String {
    let mut out = String::new();
    let rows = unified.num_rows();
    let unique = unified.distinct_key_count();
    let duplicates = unified.duplicate_key_count();

    heading(&mut out, "IPEDS DATA PROCESSING SUMMARY REPORT", '=');
    out.push('\n');

    heading(&mut out, "OVERALL STATISTICS", '-');
    let _ = writeln!(out, "Total institutions processed: {}", rows);
    let _ = writeln!(out, "Unique UNITIDs: {}", unique);
    let _ = writeln!(out, "Total columns in unified dataset: {}", unified.num_columns());
    let mean_completeness = unified
        .frame()
        .column("data_completeness")
        .ok()
        .and_then(|s| s.mean())
        .unwrap_or(0.0);
    let _ = writeln!(out, "Data quality score: {:.2}\n", mean_completeness);

    heading(&mut out, "DATASET BREAKDOWN", '-');
    for (domain, table) in domains {
        let _ = writeln!(
            out,
            "{}: {} records ({} unique institutions)",
            domain.title(),
            table.num_rows(),
            table.distinct_key_count()
        );
    }
    for step in &report.merges {
        let _ = writeln!(
            out,
            "Merged {}: {} matched, {} not in directory, {} duplicates removed, {} columns added",
            step.domain, step.matched_keys, step.orphan_keys, step.duplicates_removed, step.columns_added
        );
    }
    for domain in &report.skipped {
        let _ = writeln!(out, "Not merged: {} (no data)", domain);
    }
    out.push('\n');

    let control = value_counts(unified, "control_type");
    if !control.is_empty() {
        heading(&mut out, "INSTITUTION TYPES", '-');
        for (label, count) in control {
            let _ = writeln!(out, "{}: {}", label, count);
        }
        out.push('\n');
    }

    let quality = value_counts(unified, "data_quality_category");
    if !quality.is_empty() {
        heading(&mut out, "DATA QUALITY ASSESSMENT", '-');
        for (label, count) in quality {
            let _ = writeln!(out, "{}: {}", label, count);
        }
        out.push('\n');
    }

    heading(&mut out, &format!("MISSING DATA ANALYSIS (Top {})", top_missing), '-');
    let mut missing = unified.missing_counts();
    missing.sort_by(|a, b| b.1.cmp(&a.1));
    for (column, count) in missing.into_iter().take(top_missing) {
        let _ = writeln!(out, "{}: {} ({:.1}%)", column, count, pct(count, rows));
    }
    out.push('\n');

    heading(&mut out, "DATA INTEGRITY VALIDATION", '-');
    let _ = writeln!(out, "Duplicate UNITIDs: {}", duplicates);
    let _ = writeln!(out, "Unique institutions: {}", unique);
    let _ = writeln!(out, "Total rows: {}", rows);
    let _ = writeln!(out, "Data integrity status: {}", pass_fail(duplicates == 0));
    if report.base_duplicates_removed > 0 {
        let _ = writeln!(
            out,
            "Directory duplicates removed: {}",
            report.base_duplicates_removed
        );
    }
    if let Some(fix) = report.fix_up {
        let _ = writeln!(
            out,
            "Final fixes: {} duplicate rows, {} invalid keys removed",
            fix.duplicates_removed, fix.invalid_keys_removed
        );
    }
    out.push('\n');

    heading(&mut out, "PROCESSING VALIDATION SUMMARY", '-');
    let banner = if report.validation.passed() {
        "VALIDATION PASSED".to_string()
    } else {
        format!("VALIDATION FAILED: {}", report.validation.flags.raised().join(", "))
    };
    let _ = writeln!(out, "{}", banner);
    let _ = writeln!(out, "Quality score: {}/100", report.validation.quality_score);
    let _ = writeln!(
        out,
        "{}",
        if duplicates == 0 {
            "No duplicate UNITIDs in final dataset"
        } else {
            "Duplicate UNITIDs detected"
        }
    );
    out.push('\n');

    heading(&mut out, "FILES CREATED", '-');
    let _ = writeln!(out, "{} - unified dataset", UNIFIED_FILE);
    let _ = writeln!(out, "{} - this report", SUMMARY_FILE);
    for (domain, _) in domains {
        let _ = writeln!(out, "{}", domain.output_file());
        let _ = writeln!(out, "{}", domain.validation_report_file());
    }
    out
}

/// Median, mean and sample standard deviation of a column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnStats {
    pub count: usize,
    pub median: f64,
    pub mean: f64,
    /// `None` with fewer than two values.
    pub std: Option<f64>,
}

impl ColumnStats {
    /// Statistics over the present numeric values, `None` if there are none.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        Self::from_series(&Series::new("values", values))
    }

    pub fn for_column(table: &Table, column: &str) -> Option<Self> {
        Self::from_series(table.frame().column(column).ok()?)
    }

    fn from_series(series: &Series) -> Option<Self> {
        let numeric = series.cast(&DataType::Float64).ok()?;
        let count = numeric.len() - numeric.null_count();
        if count == 0 {
            return None;
        }
        let values = numeric.f64().ok()?;
        Some(Self {
            count,
            median: values.median()?,
            mean: numeric.mean()?,
            std: if count > 1 { values.std(1) } else { None },
        })
    }
}

/// Headline figures for a unified dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct QuickAnalysis {
    pub total_institutions: usize,
    pub unique_institutions: usize,
    pub has_duplicates: bool,
    /// 100 when every row is a distinct institution, 0 otherwise.
    pub integrity_score: u32,
    pub by_control_type: Vec<(String, usize)>,
    pub acceptance_rate: Option<ColumnStats>,
    pub tuition_in_state: Option<ColumnStats>,
}

pub fn quick_analysis(unified: &Table) -> QuickAnalysis {
    let total = unified.num_rows();
    let unique = unified.distinct_key_count();
    QuickAnalysis {
        total_institutions: total,
        unique_institutions: unique,
        has_duplicates: unified.duplicate_key_count() > 0,
        integrity_score: if total > 0 && total == unique { 100 } else { 0 },
        by_control_type: value_counts(unified, "control_type"),
        acceptance_rate: ColumnStats::for_column(unified, "acceptance_rate"),
        tuition_in_state: ColumnStats::for_column(unified, "tuition_in_state"),
    }
}

/// Label/value pairs for display.
pub fn quick_analysis_items(analysis: &QuickAnalysis) -> Vec<(String, String)> {
    let mut items = vec![
        ("Total institutions".to_string(), analysis.total_institutions.to_string()),
        ("Unique institutions".to_string(), analysis.unique_institutions.to_string()),
        ("Has duplicates".to_string(), analysis.has_duplicates.to_string()),
        ("Integrity score".to_string(), format!("{}/100", analysis.integrity_score)),
    ];
    for (label, count) in &analysis.by_control_type {
        items.push((label.clone(), count.to_string()));
    }
    let stats = [
        ("Acceptance rate", analysis.acceptance_rate),
        ("In-state tuition", analysis.tuition_in_state),
    ];
    for (name, stats) in stats {
        if let Some(s) = stats {
            let std = s.std.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}", v));
            items.push((
                name.to_string(),
                format!("median {} mean {:.2} std {}", format_number(s.median), s.mean, std),
            ));
        }
    }
    items
}

/// Audit status of one dataset file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditStatus {
    Missing,
    Error(String),
    Good,
    Warnings,
    Critical,
}

impl AuditStatus {
    pub fn as_str(&self) -> &str {
        match self {
            AuditStatus::Missing => "MISSING",
            AuditStatus::Error(_) => "ERROR",
            AuditStatus::Good => "GOOD",
            AuditStatus::Warnings => "WARNINGS",
            AuditStatus::Critical => "CRITICAL_ISSUES",
        }
    }

    fn from_findings(issues: &[String], warnings: &[String]) -> Self {
        if !issues.is_empty() {
            AuditStatus::Critical
        } else if !warnings.is_empty() {
            AuditStatus::Warnings
        } else {
            AuditStatus::Good
        }
    }
}

/// Audit of one processed file.
#[derive(Debug, Clone)]
pub struct DatasetAudit {
    pub name: String,
    pub file: String,
    pub status: AuditStatus,
    pub rows: usize,
    pub columns: usize,
    pub duplicate_keys: usize,
    pub columns_over_50pct_missing: usize,
    pub columns_over_80pct_missing: usize,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
}

impl DatasetAudit {
    fn unavailable(name: &str, file: &str, status: AuditStatus) -> Self {
        Self {
            name: name.to_string(),
            file: file.to_string(),
            status,
            rows: 0,
            columns: 0,
            duplicate_keys: 0,
            columns_over_50pct_missing: 0,
            columns_over_80pct_missing: 0,
            issues: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// Result of auditing an output directory.
#[derive(Debug, Clone)]
pub struct AuditReport {
    pub datasets: Vec<DatasetAudit>,
    pub cross_issues: Vec<String>,
}

impl AuditReport {
    pub fn critical_count(&self) -> usize {
        let datasets = self
            .datasets
            .iter()
            .filter(|d| d.status == AuditStatus::Critical)
            .count();
        datasets + usize::from(!self.cross_issues.is_empty())
    }

    pub fn warning_count(&self) -> usize {
        self.datasets
            .iter()
            .filter(|d| d.status == AuditStatus::Warnings)
            .count()
    }
}

/// Audit the processed outputs in `processed_dir`.
///
/// Checks each processed table and the unified dataset for duplicate keys,
/// row counts outside the expected range, keys outside the valid range and
/// sparse columns, then checks every annotating domain against the directory
/// output. Never fails; unreadable files are reported as such.
pub fn audit(processed_dir: &Path, config: &PipelineConfig) -> AuditReport {
    info!("Starting validation of processed data in {}", processed_dir.display());

    let mut files: Vec<(String, String, (usize, usize))> = Domain::ALL
        .iter()
        .map(|d| (d.title().to_string(), d.output_file(), d.expected_rows()))
        .collect();
    files.push(("Unified Dataset".to_string(), UNIFIED_FILE.to_string(), UNIFIED_EXPECTED_ROWS));

    let mut datasets = Vec::with_capacity(files.len());
    let mut loaded: HashMap<String, Table> = HashMap::new();

    for (name, file, expected) in files {
        let path = processed_dir.join(&file);
        if !path.exists() {
            warn!("Missing file: {}", file);
            datasets.push(DatasetAudit::unavailable(&name, &file, AuditStatus::Missing));
            continue;
        }
        match load_processed_csv(&path) {
            Ok(table) => {
                datasets.push(audit_table(&name, &file, &table, expected, config));
                loaded.insert(file, table);
            }
            Err(e) => {
                warn!("Error reading {}: {}", file, e);
                datasets.push(DatasetAudit::unavailable(&name, &file, AuditStatus::Error(e.to_string())));
            }
        }
    }

    let cross_issues = cross_validate(&loaded);
    AuditReport {
        datasets,
        cross_issues,
    }
}

fn audit_table(
    name: &str,
    file: &str,
    table: &Table,
    (expected_min, expected_max): (usize, usize),
    config: &PipelineConfig,
) -> DatasetAudit {
    let mut issues = Vec::new();
    let mut warnings = Vec::new();
    let rows = table.num_rows();

    let duplicate_keys = table.duplicate_key_count();
    if !table.has_key_column() {
        issues.push(format!("Missing {} column", KEY_COLUMN));
    } else {
        if duplicate_keys > 0 {
            issues.push(format!("Found {} duplicate {} values", duplicate_keys, KEY_COLUMN));
        }
        let out_of_range = table
            .keys()
            .into_iter()
            .flatten()
            .filter(|k| !(config.validation.key_min..=config.validation.key_max).contains(k))
            .count();
        if out_of_range > 0 {
            warnings.push(format!("{} {} values outside the 6-digit range", out_of_range, KEY_COLUMN));
        }
        let keyless = table.frame().column(KEY_COLUMN).map_or(0, |s| s.null_count());
        if keyless > 0 {
            warnings.push(format!("{} rows without a {} value", keyless, KEY_COLUMN));
        }
    }

    if rows < expected_min {
        warnings.push(format!("Row count ({}) below expected minimum ({})", rows, expected_min));
    } else if rows > expected_max {
        issues.push(format!(
            "Row count ({}) exceeds expected maximum ({}); possible data duplication",
            rows, expected_max
        ));
    }

    let missing = table.missing_counts();
    let over = |threshold: f64| {
        missing
            .iter()
            .filter(|(_, count)| rows > 0 && pct(*count, rows) > threshold)
            .count()
    };
    let columns_over_50pct_missing = over(50.0);
    let columns_over_80pct_missing = over(80.0);
    if columns_over_80pct_missing > 5 {
        warnings.push(format!("{} columns have >80% missing data", columns_over_80pct_missing));
    }

    DatasetAudit {
        name: name.to_string(),
        file: file.to_string(),
        status: AuditStatus::from_findings(&issues, &warnings),
        rows,
        columns: table.num_columns(),
        duplicate_keys,
        columns_over_50pct_missing,
        columns_over_80pct_missing,
        issues,
        warnings,
    }
}

fn cross_validate(loaded: &HashMap<String, Table>) -> Vec<String> {
    let Some(directory) = loaded.get(&Domain::Directory.output_file()) else {
        return vec!["Institutional directory missing; cannot perform cross-validation".to_string()];
    };
    let universe = directory.key_set();
    info!("Reference dataset has {} unique institutions", universe.len());

    let mut issues = Vec::new();
    for domain in Domain::MERGE_ORDER {
        let file = domain.output_file();
        let Some(table) = loaded.get(&file) else {
            continue;
        };
        let orphans = table.key_set().difference(&universe).count();
        if orphans > 0 {
            issues.push(format!(
                "{}: {} {} values not in institutional directory",
                file, orphans, KEY_COLUMN
            ));
        }
        let rows = table.num_rows();
        let duplicate_rate = pct(table.duplicate_key_count(), rows);
        if duplicate_rate > 50.0 {
            issues.push(format!(
                "{}: {:.1}% of rows are duplicate {} values; data multiplication detected",
                file, duplicate_rate, KEY_COLUMN
            ));
        }
    }
    issues
}

/// Render an [`AuditReport`].
pub fn audit_report_text(report: &AuditReport) -> String {
    let mut out = String::new();
    heading(&mut out, "IPEDS DATA VALIDATION REPORT", '=');
    out.push('\n');

    heading(&mut out, "OVERALL STATUS", '-');
    let critical = report.critical_count();
    let warnings = report.warning_count();
    if critical > 0 {
        let _ = writeln!(out, "CRITICAL: {} datasets have critical issues", critical);
    } else if warnings > 0 {
        let _ = writeln!(out, "WARNING: {} datasets have warnings", warnings);
    } else {
        let _ = writeln!(out, "GOOD: All datasets passed validation");
    }
    out.push('\n');

    for dataset in &report.datasets {
        heading(&mut out, &dataset.name.to_uppercase(), '-');
        let _ = writeln!(out, "File: {}", dataset.file);
        let _ = writeln!(out, "Status: {}", dataset.status.as_str());
        match &dataset.status {
            AuditStatus::Missing => {
                let _ = writeln!(out, "File not found");
            }
            AuditStatus::Error(message) => {
                let _ = writeln!(out, "Error: {}", message);
            }
            _ => {
                let _ = writeln!(out, "Rows: {}", dataset.rows);
                let _ = writeln!(out, "Columns: {}", dataset.columns);
                let _ = writeln!(out, "Duplicate {}s: {}", KEY_COLUMN, dataset.duplicate_keys);
                let _ = writeln!(
                    out,
                    "Columns over 50% missing: {}",
                    dataset.columns_over_50pct_missing
                );
                let _ = writeln!(
                    out,
                    "Columns over 80% missing: {}",
                    dataset.columns_over_80pct_missing
                );
            }
        }
        if !dataset.issues.is_empty() {
            let _ = writeln!(out, "ISSUES:");
            for issue in &dataset.issues {
                let _ = writeln!(out, "  - {}", issue);
            }
        }
        if !dataset.warnings.is_empty() {
            let _ = writeln!(out, "WARNINGS:");
            for warning in &dataset.warnings {
                let _ = writeln!(out, "  - {}", warning);
            }
        }
        out.push('\n');
    }

    heading(&mut out, "CROSS-DATASET ANALYSIS", '-');
    if report.cross_issues.is_empty() {
        let _ = writeln!(out, "Status: GOOD");
    } else {
        let _ = writeln!(out, "Status: CRITICAL_ISSUES");
        for issue in &report.cross_issues {
            let _ = writeln!(out, "  - {}", issue);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationConfig;
    use crate::core::table::Value;
    use crate::core::writers::write_table_csv;
    use crate::processors::validation::validate;

    fn n(v: f64) -> Value {
        Value::Number(v)
    }

    fn t(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    fn unified() -> Table {
        Table::from_rows(
            vec![
                KEY_COLUMN.to_string(),
                "control_type".into(),
                "acceptance_rate".into(),
                "tuition_in_state".into(),
            ],
            vec![
                vec![n(100001.0), t("Public"), n(40.0), n(9000.0)],
                vec![n(100002.0), t("Private nonprofit"), n(60.0), Value::Missing],
                vec![n(100003.0), t("Public"), Value::Missing, n(11000.0)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_value_counts_orders_by_frequency() {
        let counts = value_counts(&unified(), "control_type");
        assert_eq!(
            counts,
            vec![("Public".to_string(), 2), ("Private nonprofit".to_string(), 1)]
        );
        assert!(value_counts(&unified(), "absent").is_empty());
    }

    #[test]
    fn test_column_stats() {
        let stats = ColumnStats::from_values(&[1.0, 3.0, 2.0, 10.0]).unwrap();
        assert_eq!(stats.median, 2.5);
        assert_eq!(stats.mean, 4.0);
        assert!((stats.std.unwrap() - 4.082_482_904_638_63).abs() < 1e-9);

        let single = ColumnStats::from_values(&[7.0]).unwrap();
        assert_eq!(single.std, None);
        assert!(ColumnStats::from_values(&[]).is_none());
    }

    #[test]
    fn test_column_stats_skip_missing_cells() {
        let stats = ColumnStats::for_column(&unified(), "tuition_in_state").unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.median, 10000.0);
        assert!(ColumnStats::for_column(&unified(), "absent").is_none());
    }

    #[test]
    fn test_quick_analysis() {
        let analysis = quick_analysis(&unified());

        assert_eq!(analysis.total_institutions, 3);
        assert_eq!(analysis.integrity_score, 100);
        assert!(!analysis.has_duplicates);
        assert_eq!(analysis.acceptance_rate.unwrap().median, 50.0);
        assert_eq!(analysis.tuition_in_state.unwrap().mean, 10000.0);
        assert!(quick_analysis_items(&analysis)
            .iter()
            .any(|(k, v)| k == "Integrity score" && v == "100/100"));
    }

    #[test]
    fn test_validation_report_text() {
        let report = validate(&unified(), "admissions", &ValidationConfig::default());
        let text = validation_report_text(&report);

        assert!(text.contains("total_records: 3"));
        assert!(text.contains("too_few_institutions: FAIL"));
        assert!(text.contains("has_duplicate_unitids: PASS"));
        assert!(text.contains("Overall Quality Score: 75/100"));
        assert!(text.contains("acceptance_rate: 1 (33.3%)"));
    }

    #[test]
    fn test_audit_flags_orphans_and_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let directory = Table::from_rows(
            vec![KEY_COLUMN.to_string(), "INSTNM".into()],
            vec![vec![n(100001.0), t("A")], vec![n(100002.0), t("B")]],
        )
        .unwrap();
        let admissions = Table::from_rows(
            vec![KEY_COLUMN.to_string(), "acceptance_rate".into()],
            vec![vec![n(100001.0), n(50.0)], vec![n(100009.0), n(20.0)], vec![n(100009.0), n(21.0)]],
        )
        .unwrap();
        write_table_csv(&dir.path().join(Domain::Directory.output_file()), &directory).unwrap();
        write_table_csv(&dir.path().join(Domain::Admissions.output_file()), &admissions).unwrap();

        let report = audit(dir.path(), &PipelineConfig::default());

        let adm = report.datasets.iter().find(|d| d.name == "Admissions").unwrap();
        assert_eq!(adm.status, AuditStatus::Critical);
        assert_eq!(adm.duplicate_keys, 1);
        let fin = report.datasets.iter().find(|d| d.name == "Finance").unwrap();
        assert_eq!(fin.status, AuditStatus::Missing);
        assert_eq!(report.cross_issues.len(), 1);
        assert!(report.cross_issues[0].contains("1 UNITID values not in institutional directory"));

        let text = audit_report_text(&report);
        assert!(text.contains("CRITICAL"));
        assert!(text.contains("FINANCE"));
    }
}
