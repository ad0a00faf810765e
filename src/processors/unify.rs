//! Unification of the per-domain tables into one row per institution.
//!
//! The directory table defines which institutions exist. Admissions,
//! enrollment and finance only annotate it, and are joined in that fixed
//! order. Every join is a left join on a key that has just been made unique,
//! so it must leave the row count and the distinct key count unchanged. A
//! join that changes either is a correctness bug and stops the run.

use log::{error, info, warn};
use polars::prelude::{PolarsError, PolarsResult, Series};
use thiserror::Error;

use crate::config::{PipelineConfig, UnifyConfig};
use crate::core::table::{Table, Value, KEY_COLUMN};

use super::derived::{
    acceptance_competitiveness, act_competitiveness, competitiveness_score, completeness,
    cost_inverse, first_present, quality_tier, sat_competitiveness, value_score,
};
use super::domain::Domain;
use super::validation::{orphan_keys, validate_and_fix, FixUpSummary, ValidationReport};

/// Errors that stop unification.
#[derive(Debug, Error)]
pub enum UnifyError {
    #[error("no institutional directory data: the directory defines the institution universe")]
    MissingUniverse,

    #[error(
        "row count changed during {domain} merge ({before} -> {after} rows); data multiplication detected"
    )]
    CardinalityChanged {
        domain: Domain,
        before: usize,
        after: usize,
    },

    #[error("unique UNITID count changed during {domain} merge ({before} -> {after})")]
    KeyIntegrity {
        domain: Domain,
        before: usize,
        after: usize,
    },

    #[error(transparent)]
    Frame(#[from] PolarsError),
}

/// Result type for unification.
pub type Result<T> = std::result::Result<T, UnifyError>;

/// Columns the per-row completeness score is measured over, when present.
pub const IMPORTANT_FIELDS: &[&str] = &[
    "INSTNM",
    "location",
    "control_type",
    "acceptance_rate",
    "sat_total_75",
    "ACTCM75",
    "student_body_size",
    "total_in_state_tuition_fees",
    "room_and_board",
];

/// Candidate cost columns for the value score, tried in order per row.
const VALUE_COST_COLUMNS: &[&str] = &["total_cost_in_state", "total_in_state_tuition_fees"];

/// Record of one merge step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeStep {
    pub domain: Domain,
    pub incoming_rows: usize,
    pub duplicates_removed: usize,
    /// Incoming keys not present in the directory.
    pub orphan_keys: usize,
    /// Directory keys that received data from this domain.
    pub matched_keys: usize,
    pub columns_added: usize,
}

/// What happened during unification.
#[derive(Debug, Clone)]
pub struct UnifyReport {
    pub base_rows: usize,
    pub base_duplicates_removed: usize,
    pub merges: Vec<MergeStep>,
    /// Domains with no table to merge.
    pub skipped: Vec<Domain>,
    pub validation: ValidationReport,
    /// Corrective pass applied after a failed final validation.
    pub fix_up: Option<FixUpSummary>,
}

/// The per-domain tables handed to [`unify`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DomainTables<'a> {
    pub directory: Option<&'a Table>,
    pub admissions: Option<&'a Table>,
    pub enrollment: Option<&'a Table>,
    pub finance: Option<&'a Table>,
}

impl<'a> DomainTables<'a> {
    pub fn get(&self, domain: Domain) -> Option<&'a Table> {
        match domain {
            Domain::Directory => self.directory,
            Domain::Admissions => self.admissions,
            Domain::Enrollment => self.enrollment,
            Domain::Finance => self.finance,
        }
    }

    pub fn set(&mut self, domain: Domain, table: &'a Table) {
        match domain {
            Domain::Directory => self.directory = Some(table),
            Domain::Admissions => self.admissions = Some(table),
            Domain::Enrollment => self.enrollment = Some(table),
            Domain::Finance => self.finance = Some(table),
        }
    }
}

/// Merge the per-domain tables into the unified dataset.
///
/// # Errors
///
/// Returns [`UnifyError::MissingUniverse`] if there is no non-empty directory
/// table, and [`UnifyError::CardinalityChanged`] or
/// [`UnifyError::KeyIntegrity`] if a join changes the shape of the
/// accumulated table.
pub fn unify(tables: DomainTables<'_>, config: &PipelineConfig) -> Result<(Table, UnifyReport)> {
    let directory = tables
        .directory
        .filter(|t| !t.is_empty() && t.has_key_column())
        .ok_or(UnifyError::MissingUniverse)?;

    let mut unified = directory.clone();
    let base_duplicates_removed = unified.dedup_by_key()?;
    if base_duplicates_removed > 0 {
        error!(
            "Base dataset had {} duplicate {} rows; kept the first of each",
            base_duplicates_removed, KEY_COLUMN
        );
    }
    let keyless = unified.keys().iter().filter(|k| k.is_none()).count();
    if keyless > 0 {
        warn!(
            "Base dataset has {} rows without a valid {}; final validation will drop them",
            keyless, KEY_COLUMN
        );
    }
    let base_rows = unified.num_rows();
    let universe = unified.key_set();
    info!("Base dataset: {} institutions", base_rows);

    let mut merges = Vec::new();
    let mut skipped = Vec::new();

    for domain in Domain::MERGE_ORDER {
        let Some(incoming) = tables.get(domain).filter(|t| !t.is_empty()) else {
            warn!("No {} data to merge", domain);
            skipped.push(domain);
            continue;
        };
        let mut incoming = incoming.clone();
        let duplicates_removed = incoming.dedup_by_key()?;
        if duplicates_removed > 0 {
            warn!(
                "Removed {} duplicates from {} before merge",
                duplicates_removed, domain
            );
        }

        let orphans = orphan_keys(&incoming, &universe);
        if !orphans.is_empty() {
            warn!(
                "{}: {} {} values not in institutional directory",
                domain,
                orphans.len(),
                KEY_COLUMN
            );
        }
        let matched_keys = incoming.key_set().intersection(&universe).count();

        let columns_before = unified.num_columns();
        unified = checked_left_join(&unified, &incoming, domain)?;

        let step = MergeStep {
            domain,
            incoming_rows: incoming.num_rows(),
            duplicates_removed,
            orphan_keys: orphans.len(),
            matched_keys,
            columns_added: unified.num_columns() - columns_before,
        };
        info!(
            "Merged {}: {} records, {} matched; unified dataset has {} institutions",
            domain,
            step.incoming_rows,
            step.matched_keys,
            unified.num_rows()
        );
        merges.push(step);
    }

    add_cross_domain_fields(&mut unified, &config.unify)?;

    let (validation, fix_up) = validate_and_fix(&mut unified, "unified", &config.validation)?;
    if let Some(summary) = fix_up {
        if summary.total() > 0 {
            info!("Final fixes removed {} rows", summary.total());
        }
    }
    if validation.passed() {
        info!("Final validation passed");
    } else {
        error!("Final validation failed: {:?}", validation.flags.raised());
    }

    info!(
        "Unified dataset created: {} institutions, {} columns",
        unified.num_rows(),
        unified.num_columns()
    );

    let report = UnifyReport {
        base_rows,
        base_duplicates_removed,
        merges,
        skipped,
        validation,
        fix_up,
    };
    Ok((unified, report))
}

/// Left-join `incoming` onto `acc`, enforcing the cardinality invariant.
///
/// `incoming` is expected to be unique by key. If it is not, the join
/// multiplies rows and this returns an error instead of the joined table.
/// Colliding column names from `incoming` get the domain name as suffix.
pub fn checked_left_join(acc: &Table, incoming: &Table, domain: Domain) -> Result<Table> {
    let before_rows = acc.num_rows();
    let before_keys = acc.distinct_key_count();

    let mut joined = acc.left_join(incoming, domain.name())?;

    let after_rows = joined.num_rows();
    let after_keys = joined.distinct_key_count();

    if before_rows != after_rows {
        error!(
            "CRITICAL: row count changed during {} merge! {} -> {}",
            domain, before_rows, after_rows
        );
        return Err(UnifyError::CardinalityChanged {
            domain,
            before: before_rows,
            after: after_rows,
        });
    }
    if before_keys != after_keys {
        error!(
            "CRITICAL: unique {} count changed during {} merge! {} -> {}",
            KEY_COLUMN, domain, before_keys, after_keys
        );
        return Err(UnifyError::KeyIntegrity {
            domain,
            before: before_keys,
            after: after_keys,
        });
    }

    let duplicates = joined.dedup_by_key()?;
    if duplicates > 0 {
        error!(
            "{} duplicate {} values present after {} merge; removed",
            duplicates, KEY_COLUMN, domain
        );
    }

    Ok(joined)
}

/// Competitiveness, value and completeness fields that need columns from
/// more than one domain.
pub fn add_cross_domain_fields(table: &mut Table, config: &UnifyConfig) -> PolarsResult<()> {
    info!("Adding unified derived fields...");

    let acceptance = numeric_column(table, "acceptance_rate");
    let sat = numeric_column(table, "sat_total_75");
    let act = numeric_column(table, "ACTCM75");

    if acceptance.is_some() || sat.is_some() || act.is_some() {
        let n = table.num_rows();
        let scores: Vec<Option<f64>> = (0..n)
            .map(|i| {
                competitiveness_score(
                    acceptance_competitiveness(at(&acceptance, i)),
                    sat_competitiveness(at(&sat, i)),
                    act_competitiveness(at(&act, i)),
                )
            })
            .collect();

        let costs: Vec<Option<Vec<Option<f64>>>> = VALUE_COST_COLUMNS
            .iter()
            .map(|c| numeric_column(table, c))
            .collect();
        if costs.iter().any(Option::is_some) {
            let values = scores
                .iter()
                .enumerate()
                .map(|(i, score)| {
                    let cost = first_present(costs.iter().map(|c| at(c, i)));
                    Value::from_f64(value_score(*score, cost_inverse(cost, config.value_cost_ceiling)))
                })
                .collect();
            table.set_column("value_score", values)?;
        }

        table.set_column(
            "competitiveness_score",
            scores.into_iter().map(Value::from_f64).collect(),
        )?;
    } else {
        warn!("No admissions columns available; skipping competitiveness score");
    }

    add_completeness(table)
}

/// Per-row share of [`IMPORTANT_FIELDS`] that are present, and its tier.
pub fn add_completeness(table: &mut Table) -> PolarsResult<()> {
    let fields: Vec<&Series> = IMPORTANT_FIELDS
        .iter()
        .filter_map(|c| table.frame().column(c).ok())
        .collect();
    if fields.is_empty() {
        warn!("None of the important fields are present; completeness is 0");
    }

    let scores: Vec<f64> = (0..table.num_rows())
        .map(|row| {
            let present = fields
                .iter()
                .filter(|s| s.get(row).is_ok_and(|v| !v.is_null()))
                .count();
            completeness(present, fields.len())
        })
        .collect();

    let tiers = scores
        .iter()
        .map(|s| Value::Text(quality_tier(*s).to_string()))
        .collect();
    table.set_column(
        "data_completeness",
        scores.into_iter().map(Value::Number).collect(),
    )?;
    table.set_column("data_quality_category", tiers)
}

fn numeric_column(table: &Table, name: &str) -> Option<Vec<Option<f64>>> {
    table
        .column(name)
        .map(|values| values.map(|v| v.as_f64()).collect())
}

fn at(column: &Option<Vec<Option<f64>>>, row: usize) -> Option<f64> {
    column.as_ref().and_then(|c| c[row])
}
