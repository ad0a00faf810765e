//! Data processing modules.

pub mod admissions;
pub mod derived;
pub mod directory;
pub mod domain;
pub mod enrollment;
pub mod extractor;
pub mod finance;
pub mod pipeline;
pub mod unify;
pub mod validation;

// Re-export key types for convenience
pub use domain::{parse_domain_list, Domain};
pub use extractor::{ExtractError, Extractor};
pub use pipeline::{run_audit, run_pipeline, run_quick_analysis, PipelineOutcome};
pub use unify::{unify, DomainTables, UnifyError, UnifyReport};
pub use validation::{validate, validate_and_fix, ValidationReport};
