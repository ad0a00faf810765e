//! End-to-end orchestration: extract, validate, persist, unify.

use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{error, info, warn};

use crate::config::{PipelineConfig, SourcesConfig};
use crate::core::loaders::load_processed_csv;
use crate::core::table::Table;
use crate::core::writers::{write_table_csv, write_text_report};
use crate::reporting::{
    audit, audit_report_text, quick_analysis, summary_report_text, validation_report_text, AuditReport,
    QuickAnalysis, AUDIT_FILE, SUMMARY_FILE, UNIFIED_FILE,
};

use super::domain::Domain;
use super::extractor::{DomainSpec, Extractor};
use super::unify::{unify, DomainTables, UnifyReport};
use super::validation::{validate_and_fix, FixUpSummary, ValidationReport};
use super::{admissions, directory, enrollment, finance};

/// Extraction configuration for a domain.
pub fn domain_spec(domain: Domain, sources: &SourcesConfig) -> DomainSpec {
    match domain {
        Domain::Directory => directory::spec(sources),
        Domain::Admissions => admissions::spec(sources),
        Domain::Enrollment => enrollment::spec(sources),
        Domain::Finance => finance::spec(sources),
    }
}

/// Result of processing one domain.
#[derive(Debug, Clone)]
pub struct DomainOutcome {
    pub domain: Domain,
    pub rows: usize,
    pub columns: usize,
    /// `None` when extraction failed and the domain contributed nothing.
    pub validation: Option<ValidationReport>,
    pub fix_up: Option<FixUpSummary>,
    /// Processed table path, if one was written.
    pub output: Option<PathBuf>,
    /// Extraction error, if the domain failed.
    pub failure: Option<String>,
}

/// Result of the unification step.
#[derive(Debug, Clone)]
pub struct UnifiedOutcome {
    pub rows: usize,
    pub columns: usize,
    pub output: PathBuf,
    pub summary: PathBuf,
    pub report: UnifyReport,
}

/// Result of a full run.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub domains: Vec<DomainOutcome>,
    /// `None` when the directory was not among the processed domains.
    pub unified: Option<UnifiedOutcome>,
}

impl PipelineOutcome {
    pub fn failed_domains(&self) -> Vec<Domain> {
        self.domains
            .iter()
            .filter(|d| d.failure.is_some())
            .map(|d| d.domain)
            .collect()
    }
}

/// Runs the selected domains and, when the directory is among them, unifies
/// the results.
///
/// Domains always run in their fixed order regardless of the order given. A
/// failing non-directory domain is logged and contributes an empty table.
///
/// # Errors
///
/// Fails if the directory cannot be extracted, if an output cannot be
/// written, or if unification detects an integrity violation.
pub fn run_pipeline(config: &PipelineConfig, selected: &[Domain]) -> Result<PipelineOutcome> {
    let raw_dir = &config.paths.raw_data;
    let out_dir = &config.paths.processed_data;
    info!("Raw data: {}", raw_dir.display());
    info!("Processed data: {}", out_dir.display());

    let mut outcomes = Vec::new();
    let mut tables: Vec<(Domain, Table)> = Vec::new();

    for domain in Domain::ALL.into_iter().filter(|d| selected.contains(d)) {
        info!("{}", "=".repeat(50));
        info!("Processing {}", domain);

        let extractor = Extractor::new(domain_spec(domain, &config.sources));
        let mut table = match extractor.load_and_extract(raw_dir, &config.validation) {
            Ok(table) => table,
            Err(e) if domain == Domain::Directory => {
                return Err(e).with_context(|| format!("failed to process {}", domain));
            }
            Err(e) => {
                error!("Error processing {}: {}", domain, e);
                outcomes.push(DomainOutcome {
                    domain,
                    rows: 0,
                    columns: 0,
                    validation: None,
                    fix_up: None,
                    output: None,
                    failure: Some(e.to_string()),
                });
                tables.push((domain, Table::empty_keyed()));
                continue;
            }
        };

        let (report, fix_up) = validate_and_fix(&mut table, domain.name(), &config.validation)
            .with_context(|| format!("failed to validate {}", domain))?;

        let output = out_dir.join(domain.output_file());
        write_table_csv(&output, &table)
            .with_context(|| format!("failed to write {} output", domain))?;
        write_text_report(&out_dir.join(domain.validation_report_file()), &validation_report_text(&report))
            .with_context(|| format!("failed to write {} validation report", domain))?;
        info!(
            "Saved {} rows x {} columns to {}",
            table.num_rows(),
            table.num_columns(),
            output.display()
        );

        outcomes.push(DomainOutcome {
            domain,
            rows: table.num_rows(),
            columns: table.num_columns(),
            validation: Some(report),
            fix_up,
            output: Some(output),
            failure: None,
        });
        tables.push((domain, table));
    }

    let unified = if selected.contains(&Domain::Directory) {
        Some(unify_and_save(config, &tables)?)
    } else {
        warn!("Institutional directory not processed; skipping unification");
        None
    };

    Ok(PipelineOutcome {
        domains: outcomes,
        unified,
    })
}

fn unify_and_save(config: &PipelineConfig, tables: &[(Domain, Table)]) -> Result<UnifiedOutcome> {
    info!("{}", "=".repeat(50));
    info!("Creating unified dataset");

    let mut inputs = DomainTables::default();
    for (domain, table) in tables {
        inputs.set(*domain, table);
    }

    let (unified, report) = unify(inputs, config).context("unification failed")?;

    let out_dir = &config.paths.processed_data;
    let output = out_dir.join(UNIFIED_FILE);
    write_table_csv(&output, &unified).context("failed to write unified dataset")?;

    let produced: Vec<(Domain, &Table)> = tables.iter().map(|(d, t)| (*d, t)).collect();
    let summary = out_dir.join(SUMMARY_FILE);
    let text = summary_report_text(&unified, &report, &produced, config.unify.report_top_missing);
    write_text_report(&summary, &text).context("failed to write summary report")?;

    info!(
        "Unified dataset: {} institutions, {} columns",
        unified.num_rows(),
        unified.num_columns()
    );
    Ok(UnifiedOutcome {
        rows: unified.num_rows(),
        columns: unified.num_columns(),
        output,
        summary,
        report,
    })
}

/// Quick analysis of the unified dataset already in the output directory.
pub fn run_quick_analysis(config: &PipelineConfig) -> Result<QuickAnalysis> {
    let path = config.paths.processed_data.join(UNIFIED_FILE);
    let unified = load_processed_csv(&path)
        .with_context(|| format!("failed to load unified dataset from {}", path.display()))?;
    Ok(quick_analysis(&unified))
}

/// Audit the processed outputs and write the audit report.
///
/// Returns the audit and the path of the written report.
pub fn run_audit(config: &PipelineConfig) -> Result<(AuditReport, PathBuf)> {
    let out_dir = &config.paths.processed_data;
    let report = audit(out_dir, config);
    let path = out_dir.join(AUDIT_FILE);
    write_text_report(&path, &audit_report_text(&report))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok((report, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    fn config_for(root: &Path) -> PipelineConfig {
        PipelineConfig::with_paths(root.join("raw"), root.join("out"))
    }

    fn seed_directory(raw: &Path) {
        fs::create_dir_all(raw).unwrap();
        write(
            raw,
            "hd2023.csv",
            "UNITID,INSTNM,CITY,STABBR,CONTROL\n100001,Alpha College,Austin,TX,1\n100002,Beta University,Boston,MA,2\n",
        );
    }

    #[test]
    fn test_domain_spec_matches_domain() {
        let sources = SourcesConfig::default();
        for domain in Domain::ALL {
            assert_eq!(domain_spec(domain, &sources).domain, domain);
        }
    }

    #[test]
    fn test_run_directory_only() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(dir.path());
        seed_directory(&config.paths.raw_data);

        let outcome = run_pipeline(&config, &[Domain::Directory]).unwrap();

        assert_eq!(outcome.domains.len(), 1);
        assert_eq!(outcome.domains[0].rows, 2);
        let unified = outcome.unified.unwrap();
        assert_eq!(unified.rows, 2);
        assert!(unified.output.exists());
        assert!(unified.summary.exists());
        assert!(config
            .paths
            .processed_data
            .join("institutional_directory_processed_validation.txt")
            .exists());
    }

    #[test]
    fn test_failed_domain_becomes_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(dir.path());
        seed_directory(&config.paths.raw_data);

        // no adm2023.csv in the raw directory
        let outcome = run_pipeline(&config, &[Domain::Admissions, Domain::Directory]).unwrap();

        assert_eq!(outcome.failed_domains(), vec![Domain::Admissions]);
        let unified = outcome.unified.unwrap();
        assert_eq!(unified.rows, 2);
        assert_eq!(unified.report.skipped, Domain::MERGE_ORDER.to_vec());
    }

    #[test]
    fn test_missing_directory_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(dir.path());
        fs::create_dir_all(&config.paths.raw_data).unwrap();

        assert!(run_pipeline(&config, &[Domain::Directory]).is_err());
    }

    #[test]
    fn test_without_directory_skips_unification() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(dir.path());
        fs::create_dir_all(&config.paths.raw_data).unwrap();
        write(
            &config.paths.raw_data,
            "adm2023.csv",
            "UNITID,APPLCN,ADMSSN,ENRLT\n100001,100,50,20\n",
        );

        let outcome = run_pipeline(&config, &[Domain::Admissions]).unwrap();

        assert!(outcome.unified.is_none());
        assert!(config.paths.processed_data.join("admissions_processed.csv").exists());
    }

    #[test]
    fn test_quick_analysis_and_audit_after_run() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(dir.path());
        seed_directory(&config.paths.raw_data);
        run_pipeline(&config, &[Domain::Directory]).unwrap();

        let analysis = run_quick_analysis(&config).unwrap();
        assert_eq!(analysis.total_institutions, 2);
        assert_eq!(analysis.integrity_score, 100);

        let (report, path) = run_audit(&config).unwrap();
        assert!(path.exists());
        assert!(report.cross_issues.is_empty());
    }
}
