//! Institutional directory (HD) extraction.
//!
//! The directory defines the institution universe, so every row is kept
//! regardless of how much of it is populated.

use crate::config::SourcesConfig;
use crate::core::codes::{carnegie_label, control_label, level_label, size_label};
use crate::core::table::Value;

use super::derived::{at_least, UNKNOWN};
use super::domain::Domain;
use super::extractor::{input_f64, input_str, ColumnSelection, DerivedField, DomainSpec, SourceSpec};

const COLUMNS: [&str; 36] = [
    "INSTNM", "IALIAS", "ADDR", "CITY", "STABBR", "ZIP", "FIPS", "CHFNM", "CHFTITLE", "GENTELE",
    "WEBADDR", "CONTROL", "ICLEVEL", "HLOFFER", "UGOFFER", "GROFFER", "HDEGOFR1", "DEGGRANT",
    "HBCU", "PBI", "ANNHI", "TRIBAL", "LANDGRNT", "INSTSIZE", "F1SYSTYP", "CCBASIC", "CCIPUG",
    "CCIPGRAD", "CCUGPROF", "CCENRPRF", "CCSIZSET", "CARNEGIE", "TENURESYSTEM", "MEDICAL",
    "HOSPITAL", "CYACTIVE",
];

const TEXT_COLUMNS: [&str; 10] = [
    "INSTNM", "IALIAS", "ADDR", "CITY", "STABBR", "ZIP", "CHFNM", "CHFTITLE", "GENTELE", "WEBADDR",
];

/// Minority-serving designations, each coded 1 when the institution holds it.
pub const MINORITY_SERVING_COLUMNS: &[&str] = &["HBCU", "PBI", "ANNHI", "TRIBAL"];

/// HLOFFER level from which an institution awards graduate degrees.
const GRADUATE_OFFER_LEVEL: f64 = 3.0;

pub fn spec(sources: &SourcesConfig) -> DomainSpec {
    let source = SourceSpec::new(
        sources.directory.clone(),
        "Institutional directory",
        ColumnSelection::Fixed(COLUMNS.to_vec()),
    )
    .with_text_columns(TEXT_COLUMNS.to_vec());

    DomainSpec {
        domain: Domain::Directory,
        sources: vec![source],
        derived: vec![
            DerivedField::all("control_type", &["CONTROL"], |a| decode(a, control_label)),
            DerivedField::all("institutional_level", &["ICLEVEL"], |a| decode(a, level_label)),
            DerivedField::all("carnegie_basic_desc", &["CCBASIC"], |a| decode(a, carnegie_label)),
            DerivedField::all("size_category", &["INSTSIZE"], |a| decode(a, size_label)),
            DerivedField::all("offers_graduate_degree", &["HLOFFER"], |a| {
                Value::Bool(at_least(input_f64(a, 0), GRADUATE_OFFER_LEVEL))
            }),
            DerivedField::any("minority_serving_institution", MINORITY_SERVING_COLUMNS, minority_serving),
            DerivedField::all("clean_website", &["WEBADDR"], |a| {
                Value::from_text(input_str(a, 0).map(strip_www))
            }),
            DerivedField::all("has_website", &["WEBADDR"], |a| Value::Bool(input_str(a, 0).is_some())),
            DerivedField::any("location", &["CITY", "STABBR"], location),
        ],
        informative_columns: Vec::new(),
        retain_empty_rows: true,
    }
}

fn decode(args: &[Option<&Value>], table: fn(i64) -> Option<&'static str>) -> Value {
    let label = input_f64(args, 0)
        .filter(|v| v.fract() == 0.0)
        .and_then(|v| table(v as i64))
        .unwrap_or(UNKNOWN);
    Value::Text(label.to_string())
}

/// True when any designation column is coded 1.
fn minority_serving(args: &[Option<&Value>]) -> Value {
    let flagged = (0..args.len()).any(|i| input_f64(args, i) == Some(1.0));
    Value::Bool(flagged)
}

fn strip_www(url: &str) -> String {
    url.strip_prefix("www.").unwrap_or(url).to_string()
}

/// `"City, ST"`, or whichever part is present.
fn location(args: &[Option<&Value>]) -> Value {
    match (input_str(args, 0), input_str(args, 1)) {
        (Some(city), Some(state)) => Value::Text(format!("{}, {}", city, state)),
        (Some(part), None) | (None, Some(part)) => Value::Text(part.to_string()),
        (None, None) => Value::Missing,
    }
}
