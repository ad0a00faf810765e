//! Configuration types for the IPEDS pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Input and output locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding the raw survey CSV files
    #[serde(default = "default_raw_data")]
    pub raw_data: PathBuf,

    /// Directory processed tables and reports are written to
    #[serde(default = "default_processed_data")]
    pub processed_data: PathBuf,
}

fn default_raw_data() -> PathBuf {
    PathBuf::from("raw_data")
}

fn default_processed_data() -> PathBuf {
    PathBuf::from("processed_data")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_data: default_raw_data(),
            processed_data: default_processed_data(),
        }
    }
}

/// Raw file names for each survey component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Institutional directory (HD)
    #[serde(default = "default_directory")]
    pub directory: String,

    /// Admissions and test scores (ADM)
    #[serde(default = "default_admissions")]
    pub admissions: String,

    /// Fall enrollment by race/ethnicity (EF part A)
    #[serde(default = "default_enrollment_race")]
    pub enrollment_race: String,

    /// Fall enrollment by age (EF part B)
    #[serde(default = "default_enrollment_age")]
    pub enrollment_age: String,

    /// Fall enrollment by residence (EF part C)
    #[serde(default = "default_enrollment_residence")]
    pub enrollment_residence: String,

    /// Core revenues (F part A)
    #[serde(default = "default_finance_revenues")]
    pub finance_revenues: String,

    /// Core expenses (F part 2)
    #[serde(default = "default_finance_expenses")]
    pub finance_expenses: String,

    /// Net assets (F part 3)
    #[serde(default = "default_finance_net_assets")]
    pub finance_net_assets: String,

    /// Institutional characteristics with tuition and charges (IC)
    #[serde(default = "default_tuition")]
    pub tuition: String,
}

fn default_directory() -> String {
    "hd2023.csv".to_string()
}

fn default_admissions() -> String {
    "adm2023.csv".to_string()
}

fn default_enrollment_race() -> String {
    "ef2023a.csv".to_string()
}

fn default_enrollment_age() -> String {
    "ef2023b.csv".to_string()
}

fn default_enrollment_residence() -> String {
    "ef2023c.csv".to_string()
}

fn default_finance_revenues() -> String {
    "f2223_f1a.csv".to_string()
}

fn default_finance_expenses() -> String {
    "f2223_f2.csv".to_string()
}

fn default_finance_net_assets() -> String {
    "f2223_f3.csv".to_string()
}

fn default_tuition() -> String {
    "ic2023.csv".to_string()
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            admissions: default_admissions(),
            enrollment_race: default_enrollment_race(),
            enrollment_age: default_enrollment_age(),
            enrollment_residence: default_enrollment_residence(),
            finance_revenues: default_finance_revenues(),
            finance_expenses: default_finance_expenses(),
            finance_net_assets: default_finance_net_assets(),
            tuition: default_tuition(),
        }
    }
}

/// Thresholds for dataset validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Fewer distinct institutions than this is flagged
    #[serde(default = "default_min_entities")]
    pub min_entities: usize,

    /// More distinct institutions than this is flagged
    #[serde(default = "default_max_entities")]
    pub max_entities: usize,

    /// Smallest valid institution key
    #[serde(default = "default_key_min")]
    pub key_min: i64,

    /// Largest valid institution key
    #[serde(default = "default_key_max")]
    pub key_max: i64,

    /// Points subtracted from the quality score per raised issue flag
    #[serde(default = "default_issue_penalty")]
    pub issue_penalty: u32,
}

fn default_min_entities() -> usize {
    1000
}

fn default_max_entities() -> usize {
    7000
}

fn default_key_min() -> i64 {
    100_000
}

fn default_key_max() -> i64 {
    999_999
}

fn default_issue_penalty() -> u32 {
    25
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_entities: default_min_entities(),
            max_entities: default_max_entities(),
            key_min: default_key_min(),
            key_max: default_key_max(),
            issue_penalty: default_issue_penalty(),
        }
    }
}

/// Parameters for cross-domain derived fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifyConfig {
    /// Annual cost at or above which the inverse cost term is zero
    #[serde(default = "default_value_cost_ceiling")]
    pub value_cost_ceiling: f64,

    /// Number of columns listed in the missing-data section of reports
    #[serde(default = "default_report_top_missing")]
    pub report_top_missing: usize,
}

fn default_value_cost_ceiling() -> f64 {
    60_000.0
}

fn default_report_top_missing() -> usize {
    10
}

impl Default for UnifyConfig {
    fn default() -> Self {
        Self {
            value_cost_ceiling: default_value_cost_ceiling(),
            report_top_missing: default_report_top_missing(),
        }
    }
}

/// Main pipeline configuration combining all sub-configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub sources: SourcesConfig,

    #[serde(default)]
    pub validation: ValidationConfig,

    #[serde(default)]
    pub unify: UnifyConfig,
}

impl PipelineConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Config with the given input and output directories and defaults
    /// elsewhere.
    pub fn with_paths<P: Into<PathBuf>, Q: Into<PathBuf>>(raw_data: P, processed_data: Q) -> Self {
        Self {
            paths: PathsConfig {
                raw_data: raw_data.into(),
                processed_data: processed_data.into(),
            },
            ..Self::default()
        }
    }
}
