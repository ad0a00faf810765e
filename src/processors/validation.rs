//! Dataset validation and fix-up.
//!
//! Validation is advisory: it never fails, it only describes the table. The
//! fix-up step is the one corrective action the pipeline takes on its own,
//! dropping repeated keys and rows whose key is missing or out of range.

use std::collections::HashSet;

use log::{info, warn};
use polars::prelude::PolarsResult;

use crate::config::ValidationConfig;
use crate::core::table::{Table, KEY_COLUMN};

/// Issue flags raised by [`validate`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QualityFlags {
    pub has_duplicate_keys: bool,
    pub too_many_entities: bool,
    pub too_few_entities: bool,
    pub has_invalid_keys: bool,
}

impl QualityFlags {
    /// Number of raised flags.
    pub fn count(&self) -> usize {
        self.raised().len()
    }

    pub fn any(&self) -> bool {
        self.count() > 0
    }

    /// Names of the raised flags, in a fixed order.
    pub fn raised(&self) -> Vec<&'static str> {
        [
            (self.has_duplicate_keys, "has_duplicate_keys"),
            (self.too_many_entities, "too_many_entities"),
            (self.too_few_entities, "too_few_entities"),
            (self.has_invalid_keys, "has_invalid_keys"),
        ]
        .into_iter()
        .filter_map(|(raised, name)| raised.then_some(name))
        .collect()
    }
}

/// Key column statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyStats {
    /// Smallest and largest valid key; `None` when no row has a key.
    pub range: Option<(i64, i64)>,
    /// Rows whose key cell is missing or not an integer.
    pub null_count: usize,
    /// Rows whose key lies outside the configured range.
    pub out_of_range: usize,
}

/// Outcome of validating one table.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub dataset: String,
    pub total_rows: usize,
    pub total_columns: usize,
    pub unique_keys: usize,
    pub duplicate_keys: usize,
    pub missing_by_column: Vec<(String, usize)>,
    /// `None` when the table has no key column.
    pub key_stats: Option<KeyStats>,
    pub flags: QualityFlags,
    pub quality_score: u32,
}

impl ValidationReport {
    /// A table passes when no issue flag is raised.
    pub fn passed(&self) -> bool {
        !self.flags.any()
    }

    /// Columns sorted by missing count, most missing first.
    pub fn most_missing(&self, limit: usize) -> Vec<(String, usize)> {
        let mut sorted = self.missing_by_column.clone();
        sorted.sort_by(|a, b| b.1.cmp(&a.1));
        sorted.truncate(limit);
        sorted
    }
}

/// Rows removed by [`fix_up`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixUpSummary {
    pub duplicates_removed: usize,
    pub invalid_keys_removed: usize,
}

impl FixUpSummary {
    pub fn total(&self) -> usize {
        self.duplicates_removed + self.invalid_keys_removed
    }
}

/// Bounded quality score: 100 minus `penalty` per raised flag, floored at 0.
pub fn quality_score(flags: &QualityFlags, penalty: u32) -> u32 {
    100u32.saturating_sub(penalty.saturating_mul(flags.count() as u32))
}

/// Describe `table` against the configured thresholds.
pub fn validate(table: &Table, dataset: &str, config: &ValidationConfig) -> ValidationReport {
    let key_stats = table.has_key_column().then(|| key_stats(table, config));
    let unique_keys = table.distinct_key_count();
    let duplicate_keys = table.duplicate_key_count();

    let flags = QualityFlags {
        has_duplicate_keys: duplicate_keys > 0,
        too_many_entities: unique_keys > config.max_entities,
        too_few_entities: unique_keys < config.min_entities,
        has_invalid_keys: key_stats
            .as_ref()
            .is_some_and(|s| s.out_of_range > 0 || s.null_count > 0),
    };

    let report = ValidationReport {
        dataset: dataset.to_string(),
        total_rows: table.num_rows(),
        total_columns: table.num_columns(),
        unique_keys,
        duplicate_keys,
        missing_by_column: table.missing_counts(),
        key_stats,
        quality_score: quality_score(&flags, config.issue_penalty),
        flags,
    };

    if report.passed() {
        info!(
            "{}: validation passed ({} rows, {} unique keys)",
            dataset, report.total_rows, report.unique_keys
        );
    } else {
        warn!(
            "{}: validation issues {:?} (score {})",
            dataset,
            report.flags.raised(),
            report.quality_score
        );
    }
    report
}

fn key_stats(table: &Table, config: &ValidationConfig) -> KeyStats {
    let keys = table.keys();
    let valid: Vec<i64> = keys.iter().flatten().copied().collect();
    let range = valid
        .iter()
        .min()
        .copied()
        .zip(valid.iter().max().copied());
    let out_of_range = valid
        .iter()
        .filter(|k| !(config.key_min..=config.key_max).contains(*k))
        .count();

    KeyStats {
        range,
        null_count: keys.len() - valid.len(),
        out_of_range,
    }
}

/// Drop repeated keys (keeping the first row) and rows whose key is missing
/// or outside the valid range.
pub fn fix_up(table: &mut Table, dataset: &str, config: &ValidationConfig) -> PolarsResult<FixUpSummary> {
    let duplicates_removed = table.dedup_by_key()?;
    if duplicates_removed > 0 {
        info!("{}: removed {} duplicate rows", dataset, duplicates_removed);
    }

    let invalid_keys_removed = table.retain_keys_in_range(config.key_min, config.key_max)?;
    if invalid_keys_removed > 0 {
        info!(
            "{}: removed {} rows with invalid {}",
            dataset, invalid_keys_removed, KEY_COLUMN
        );
    }

    Ok(FixUpSummary {
        duplicates_removed,
        invalid_keys_removed,
    })
}

/// Validate, apply [`fix_up`] if validation fails, and re-validate once.
///
/// Returns the report for the table as it now stands and the fix-up
/// summary, if one ran.
pub fn validate_and_fix(
    table: &mut Table,
    dataset: &str,
    config: &ValidationConfig,
) -> PolarsResult<(ValidationReport, Option<FixUpSummary>)> {
    let report = validate(table, dataset, config);
    if report.passed() {
        return Ok((report, None));
    }

    let summary = fix_up(table, dataset, config)?;
    if summary.total() == 0 {
        return Ok((report, Some(summary)));
    }
    Ok((validate(table, dataset, config), Some(summary)))
}

/// Keys of `table` absent from `universe`.
pub fn orphan_keys(table: &Table, universe: &HashSet<i64>) -> Vec<i64> {
    let mut orphans: Vec<i64> = table.key_set().difference(universe).copied().collect();
    orphans.sort_unstable();
    orphans
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::table::Value;

    fn keyed(keys: &[Value]) -> Table {
        Table::from_rows(
            vec![KEY_COLUMN.to_string(), "X".to_string()],
            keys.iter().map(|k| vec![k.clone(), Value::Missing]).collect(),
        )
        .unwrap()
    }

    fn small_config() -> ValidationConfig {
        ValidationConfig {
            min_entities: 2,
            max_entities: 4,
            ..ValidationConfig::default()
        }
    }

    #[test]
    fn test_clean_table_scores_100() {
        let table = keyed(&[Value::Number(100001.0), Value::Number(100002.0)]);
        let report = validate(&table, "t", &small_config());

        assert!(report.passed());
        assert_eq!(report.quality_score, 100);
        assert_eq!(report.key_stats.as_ref().unwrap().range, Some((100001, 100002)));
        assert_eq!(report.missing_by_column, vec![("UNITID".to_string(), 0), ("X".to_string(), 2)]);
    }

    #[test]
    fn test_raised_flags_reduce_score() {
        let table = keyed(&[Value::Number(12.0), Value::Number(12.0)]);
        let report = validate(&table, "t", &small_config());

        assert!(report.flags.has_duplicate_keys);
        assert!(report.flags.has_invalid_keys);
        // one distinct key < min_entities
        assert!(report.flags.too_few_entities);
        assert_eq!(report.flags.count(), 3);
        assert_eq!(report.quality_score, 25);
    }

    #[test]
    fn test_quality_score_never_negative() {
        let flags = QualityFlags {
            has_duplicate_keys: true,
            too_many_entities: true,
            too_few_entities: true,
            has_invalid_keys: true,
        };
        assert_eq!(quality_score(&flags, 25), 0);
        assert_eq!(quality_score(&flags, 40), 0);

        let two = QualityFlags {
            has_duplicate_keys: true,
            has_invalid_keys: true,
            ..QualityFlags::default()
        };
        assert_eq!(quality_score(&two, 25), 50);
        assert_eq!(quality_score(&QualityFlags::default(), 25), 100);
    }

    #[test]
    fn test_fix_up_removes_duplicates_and_invalid_keys() {
        let mut table = keyed(&[
            Value::Number(100001.0),
            Value::Text("100001".into()),
            Value::Number(42.0),
            Value::Missing,
            Value::Number(100002.0),
        ]);
        let (report, summary) = validate_and_fix(&mut table, "t", &small_config()).unwrap();

        let summary = summary.unwrap();
        assert_eq!(summary.duplicates_removed, 1);
        // 42 and the keyless row
        assert_eq!(summary.invalid_keys_removed, 2);
        assert_eq!(table.num_rows(), 2);
        assert!(report.passed());
    }

    #[test]
    fn test_keyless_rows_are_invalid_not_duplicate() {
        let mut table = keyed(&[
            Value::Number(100001.0),
            Value::Text("x".into()),
            Value::Text("y".into()),
        ]);
        let report = validate(&table, "t", &ValidationConfig::default());

        assert!(!report.flags.has_duplicate_keys);
        assert!(report.flags.has_invalid_keys);
        assert_eq!(report.key_stats.as_ref().unwrap().null_count, 2);

        let summary = fix_up(&mut table, "t", &ValidationConfig::default()).unwrap();
        assert_eq!(summary.duplicates_removed, 0);
        assert_eq!(summary.invalid_keys_removed, 2);
        assert_eq!(table.num_rows(), 1);
    }

    #[test]
    fn test_table_without_key_column() {
        let table = Table::from_rows(vec!["X".into()], vec![vec![Value::Number(1.0)]]).unwrap();
        let report = validate(&table, "t", &small_config());

        assert!(report.key_stats.is_none());
        assert!(report.flags.too_few_entities);
        assert!(!report.flags.has_invalid_keys);
    }

    #[test]
    fn test_orphan_keys() {
        let table = keyed(&[Value::Number(100003.0), Value::Number(100001.0), Value::Number(100009.0)]);
        let universe: HashSet<i64> = [100001, 100002, 100003].into_iter().collect();
        assert_eq!(orphan_keys(&table, &universe), vec![100009]);
    }
}
