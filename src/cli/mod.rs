//! Command-line interface for the IPEDS pipeline.

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::PathBuf;
use std::time::Instant;

use crate::processors::domain::{parse_domain_list, Domain};
use crate::processors::pipeline::{run_audit, run_pipeline, run_quick_analysis};
use crate::reporting::{quick_analysis_items, AuditStatus};
use crate::PipelineConfig;

#[derive(Parser, Debug)]
#[command(name = "ipeds-pipeline")]
#[command(about = "IPEDS survey data processing and unification pipeline", version)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Comma-separated processors to run (default: all)
    #[arg(long)]
    processors: Option<String>,

    /// Directory containing the raw IPEDS CSV files
    #[arg(long)]
    raw_data_path: Option<PathBuf>,

    /// Directory for processed output
    #[arg(long)]
    output_path: Option<PathBuf>,

    /// Skip processing and only analyse the existing unified dataset
    #[arg(long)]
    quick_only: bool,

    /// Audit the processed outputs after the run
    #[arg(long)]
    audit: bool,
}

/// Create a spinner for indeterminate operations
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Print a summary box
fn print_summary(title: &str, items: &[(String, String)]) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ {:<62} ║", title);
    println!("╠══════════════════════════════════════════════════════════════╣");
    for (key, value) in items {
        let display_value = if value.chars().count() > 39 {
            format!("{}...", value.chars().take(36).collect::<String>())
        } else {
            value.clone()
        };
        println!("║ {:<20}: {:<39} ║", key, display_value);
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

fn print_hints(config: &PipelineConfig) {
    eprintln!("Make sure that:");
    eprintln!(
        "  1. The raw IPEDS files are in {}",
        config.paths.raw_data.display()
    );
    eprintln!(
        "  2. The institutional directory file ({}) is present",
        config.sources.directory
    );
    eprintln!("  3. The files are readable CSV with a UNITID column");
    eprintln!("  4. Use --raw-data-path to point at another directory");
}

pub fn run() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity (must come first)
    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    // Load config
    let mut config = match &cli.config {
        Some(path) => match PipelineConfig::from_yaml(path) {
            Ok(cfg) => {
                info!("Loaded config from: {}", path.display());
                cfg
            }
            Err(e) => {
                warn!("Failed to load config from {}: {}, using defaults", path.display(), e);
                PipelineConfig::default()
            }
        },
        None => PipelineConfig::default(),
    };
    if let Some(raw) = cli.raw_data_path.clone() {
        config.paths.raw_data = raw;
    }
    if let Some(out) = cli.output_path.clone() {
        config.paths.processed_data = out;
    }

    if cli.quick_only {
        cmd_quick_analysis(&config);
    } else {
        let selected = match cli.processors.as_deref().map(parse_domain_list) {
            Some(Ok(domains)) => domains,
            Some(Err(e)) => {
                error!("{}", e);
                std::process::exit(2);
            }
            None => Domain::ALL.to_vec(),
        };
        cmd_process(&config, &selected);
    }

    if cli.audit {
        cmd_audit(&config);
    }
}

fn cmd_process(config: &PipelineConfig, selected: &[Domain]) {
    let start = Instant::now();

    let directory_file = config.paths.raw_data.join(&config.sources.directory);
    if !directory_file.exists() {
        error!("Required file not found: {}", directory_file.display());
        print_hints(config);
        std::process::exit(1);
    }

    let names: Vec<&str> = selected.iter().map(|d| d.name()).collect();
    println!("Processing IPEDS data...");
    println!("Raw data: {}", config.paths.raw_data.display());
    println!("Output: {}", config.paths.processed_data.display());
    println!("Processors: {}", names.join(", "));

    let spinner = create_spinner("Extracting and unifying survey data...");

    match run_pipeline(config, selected) {
        Ok(outcome) => {
            spinner.finish_and_clear();

            let mut items: Vec<(String, String)> = outcome
                .domains
                .iter()
                .map(|d| {
                    let value = match &d.failure {
                        Some(_) => "FAILED".to_string(),
                        None => format!("{} rows x {} cols", d.rows, d.columns),
                    };
                    (d.domain.title().to_string(), value)
                })
                .collect();
            if let Some(unified) = &outcome.unified {
                items.push(("Unified rows".to_string(), unified.rows.to_string()));
                items.push(("Unified columns".to_string(), unified.columns.to_string()));
                items.push((
                    "Quality score".to_string(),
                    format!("{}/100", unified.report.validation.quality_score),
                ));
                items.push(("Output".to_string(), unified.output.display().to_string()));
            }
            items.push(("Duration".to_string(), format!("{:.2?}", start.elapsed())));

            print_summary("IPEDS Processing Complete", &items);

            let failed = outcome.failed_domains();
            if !failed.is_empty() {
                let names: Vec<&str> = failed.iter().map(|d| d.name()).collect();
                warn!("Processors failed: {}", names.join(", "));
            }
        }
        Err(e) => {
            spinner.finish_and_clear();
            error!("Processing failed: {:#}", e);
            print_hints(config);
            std::process::exit(1);
        }
    }
}

fn cmd_quick_analysis(config: &PipelineConfig) {
    let spinner = create_spinner("Analysing unified dataset...");

    match run_quick_analysis(config) {
        Ok(analysis) => {
            spinner.finish_and_clear();
            print_summary("Quick Analysis", &quick_analysis_items(&analysis));
        }
        Err(e) => {
            spinner.finish_and_clear();
            error!("Quick analysis failed: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn cmd_audit(config: &PipelineConfig) {
    let spinner = create_spinner("Auditing processed data...");

    match run_audit(config) {
        Ok((report, path)) => {
            spinner.finish_and_clear();

            let mut items: Vec<(String, String)> = report
                .datasets
                .iter()
                .map(|d| (d.name.clone(), d.status.as_str().to_string()))
                .collect();
            let cross = if report.cross_issues.is_empty() {
                AuditStatus::Good
            } else {
                AuditStatus::Critical
            };
            items.push(("Cross-dataset".to_string(), cross.as_str().to_string()));
            items.push(("Report".to_string(), path.display().to_string()));

            print_summary("Data Validation Audit", &items);
        }
        Err(e) => {
            spinner.finish_and_clear();
            error!("Audit failed: {:#}", e);
            std::process::exit(1);
        }
    }
}
