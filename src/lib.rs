//! IPEDS survey extract processing pipeline.
//!
//! This crate provides tools for:
//! - Loading raw IPEDS CSV extracts and cleaning suppressed/sentinel values
//! - Extracting per-domain tables (directory, admissions, enrollment, finance)
//! - Validating tables and repairing duplicate or invalid institution keys
//! - Unifying all domains into one row per institution
//!
//! # Example
//!
//! ```no_run
//! use ipeds_pipeline::{processors::{run_pipeline, Domain}, PipelineConfig};
//!
//! let config = PipelineConfig::with_paths("raw_data", "processed_data");
//! let outcome = run_pipeline(&config, &Domain::ALL).unwrap();
//! println!("{:?}", outcome.unified.map(|u| u.rows));
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod processors;
pub mod reporting;

pub use config::PipelineConfig;
pub use core::table::{Table, Value};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
