//! Admissions and test score (ADM) extraction.

use crate::config::SourcesConfig;
use crate::core::table::Value;

use super::derived::{
    acceptance_rate, at_least, percentage, score_range, selectivity_category, strict_sum, yield_rate,
};
use super::domain::Domain;
use super::extractor::{input_f64, ColumnSelection, DerivedField, DomainSpec, SourceSpec};

const COLUMNS: [&str; 29] = [
    "APPLCN", "APPLCNM", "APPLCNW", "ADMSSN", "ADMSSNM", "ADMSSNW", "ENRLT", "ENRLTM", "ENRLTW",
    "ENRLFT", "ENRLPT", "SATNUM", "SATPCT", "ACTNUM", "ACTPCT", "SATVR25", "SATVR75", "SATMT25",
    "SATMT75", "SATWR25", "SATWR75", "ACTCM25", "ACTCM75", "ACTEN25", "ACTEN75", "ACTMT25",
    "ACTMT75", "ACTWR25", "ACTWR75",
];

/// Applicants, admitted and enrolled: a row needs one of these to count as
/// having admissions data.
pub const INFORMATIVE_COLUMNS: &[&str] = &["APPLCN", "ADMSSN", "ENRLT"];

const HIGH_SAT_TOTAL: f64 = 1400.0;
const HIGH_ACT_COMPOSITE: f64 = 32.0;

/// Submission rate (percent) below which an institution is likely test
/// optional.
const TEST_OPTIONAL_SUBMISSION_RATE: f64 = 25.0;

pub fn spec(sources: &SourcesConfig) -> DomainSpec {
    let source = SourceSpec::new(
        sources.admissions.clone(),
        "Admissions and test scores",
        ColumnSelection::Fixed(COLUMNS.to_vec()),
    );

    DomainSpec {
        domain: Domain::Admissions,
        sources: vec![source],
        derived: vec![
            DerivedField::all("acceptance_rate", &["ADMSSN", "APPLCN"], |a| {
                Value::from_f64(acceptance_rate(input_f64(a, 0), input_f64(a, 1)))
            }),
            DerivedField::all("yield_rate", &["ENRLT", "ADMSSN"], |a| {
                Value::from_f64(yield_rate(input_f64(a, 0), input_f64(a, 1)))
            }),
            DerivedField::all("selectivity_category", &["acceptance_rate"], |a| {
                Value::Text(selectivity_category(input_f64(a, 0)).to_string())
            }),
            DerivedField::all("sat_total_25", &["SATVR25", "SATMT25"], sum_pair),
            DerivedField::all("sat_total_75", &["SATVR75", "SATMT75"], sum_pair),
            DerivedField::all("sat_range", &["sat_total_25", "sat_total_75"], range),
            DerivedField::all("act_range", &["ACTCM25", "ACTCM75"], range),
            DerivedField::all("sat_submission_rate", &["SATNUM", "ENRLT"], share),
            DerivedField::all("act_submission_rate", &["ACTNUM", "ENRLT"], share),
            DerivedField::all("pct_male_applicants", &["APPLCNM", "APPLCN"], share),
            DerivedField::all("pct_female_applicants", &["APPLCNW", "APPLCN"], share),
            DerivedField::all("highly_competitive_sat", &["sat_total_75"], |a| {
                Value::Bool(at_least(input_f64(a, 0), HIGH_SAT_TOTAL))
            }),
            DerivedField::all("highly_competitive_act", &["ACTCM75"], |a| {
                Value::Bool(at_least(input_f64(a, 0), HIGH_ACT_COMPOSITE))
            }),
            DerivedField::any("has_admissions_data", INFORMATIVE_COLUMNS, |a| {
                Value::Bool((0..a.len()).any(|i| input_f64(a, i).is_some()))
            }),
            DerivedField::all("has_sat_scores", &["SATVR25", "SATMT25"], |a| {
                Value::Bool(input_f64(a, 0).is_some() && input_f64(a, 1).is_some())
            }),
            DerivedField::all("has_act_scores", &["ACTCM25"], |a| Value::Bool(input_f64(a, 0).is_some())),
            DerivedField::any(
                "likely_test_optional",
                &["sat_submission_rate", "act_submission_rate"],
                likely_test_optional,
            ),
        ],
        informative_columns: INFORMATIVE_COLUMNS.to_vec(),
        retain_empty_rows: false,
    }
}

fn sum_pair(args: &[Option<&Value>]) -> Value {
    Value::from_f64(strict_sum(input_f64(args, 0), input_f64(args, 1)))
}

fn range(args: &[Option<&Value>]) -> Value {
    Value::from_text(score_range(input_f64(args, 0), input_f64(args, 1)))
}

fn share(args: &[Option<&Value>]) -> Value {
    Value::from_f64(percentage(input_f64(args, 0), input_f64(args, 1)))
}

fn likely_test_optional(args: &[Option<&Value>]) -> Value {
    let low = (0..args.len()).any(|i| input_f64(args, i).is_some_and(|r| r < TEST_OPTIONAL_SUBMISSION_RATE));
    Value::Bool(low)
}
