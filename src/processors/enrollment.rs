//! Fall enrollment (EF parts A, B and C) extraction.
//!
//! Part A carries grand totals by race/ethnicity, part B enrollment by age and
//! part C by residence. Parts B and C are wide files whose column set varies
//! by year, so they are selected by name prefix. Each part is optional.

use crate::config::SourcesConfig;
use crate::core::table::Value;

use super::derived::{diversity_index, enrollment_size_category, first_present};
use super::domain::Domain;
use super::extractor::{input_f64, inputs_f64, ColumnSelection, DerivedField, DomainSpec, SourceSpec};

/// Grand total enrollment.
pub const TOTAL_COLUMN: &str = "EFTOTLT";

/// Grand totals per race/ethnicity group.
pub const RACE_COLUMNS: &[&str] = &[
    "EFAIANT", "EFASIAT", "EFBKAAT", "EFHISPT", "EFNHPIT", "EFWHITT", "EF2MORT", "EFUNKNT", "EFNRALT",
];

pub fn spec(sources: &SourcesConfig) -> DomainSpec {
    let mut race_columns = vec![TOTAL_COLUMN];
    race_columns.extend_from_slice(RACE_COLUMNS);

    let race = SourceSpec::new(
        sources.enrollment_race.clone(),
        "Fall enrollment by race/ethnicity and gender",
        ColumnSelection::Fixed(race_columns.clone()),
    )
    .with_derived(vec![DerivedField::all("total_enrollment", &[TOTAL_COLUMN], |a| {
        Value::from_f64(input_f64(a, 0))
    })])
    .optional();

    let age = SourceSpec::new(
        sources.enrollment_age.clone(),
        "Fall enrollment by age and gender",
        ColumnSelection::Matching("^EFAGE"),
    )
    .optional();

    let residence = SourceSpec::new(
        sources.enrollment_residence.clone(),
        "Fall enrollment by residence and migration",
        ColumnSelection::Matching("^EFRES"),
    )
    .optional();

    DomainSpec {
        domain: Domain::Enrollment,
        sources: vec![race, age, residence],
        derived: vec![
            DerivedField::any("diversity_index", RACE_COLUMNS, |a| {
                Value::from_f64(diversity_index(&inputs_f64(a)))
            }),
            DerivedField::any("student_body_size", &["total_enrollment", TOTAL_COLUMN], |a| {
                Value::from_f64(first_present(inputs_f64(a)))
            }),
            DerivedField::all("enrollment_size_category", &["student_body_size"], |a| {
                Value::Text(enrollment_size_category(input_f64(a, 0)).to_string())
            }),
        ],
        informative_columns: race_columns,
        retain_empty_rows: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::table::Table;
    use crate::processors::derived::UNKNOWN;
    use crate::processors::extractor::Extractor;

    fn text_table(columns: &[&str], rows: &[&[&str]]) -> Table {
        Table::from_rows(
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|r| {
                    r.iter()
                        .map(|c| if c.is_empty() { Value::Missing } else { Value::Text(c.to_string()) })
                        .collect()
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_enrollment_totals_and_diversity() {
        let race = text_table(
            &["UNITID", "EFALEVEL", "EFTOTLT", "EFASIAT", "EFBKAAT", "EFHISPT", "EFWHITT"],
            &[
                &["100654", "1", "400", "100", "100", "100", "100"],
                // second level row for the same institution
                &["100654", "2", "300", "75", "75", "75", "75"],
                &["100663", "1", "25000", "0", "0", "0", "25000"],
            ],
        );
        let out = Extractor::new(spec(&SourcesConfig::default()))
            .extract(&[Some(race), None, None])
            .unwrap();

        assert_eq!(out.num_rows(), 2);
        assert!(!out.has_column("EFALEVEL"));
        assert_eq!(out.get(0, "total_enrollment"), Some(Value::Number(400.0)));
        assert_eq!(out.get(0, "diversity_index"), Some(Value::Number(0.75)));
        assert_eq!(out.get(1, "diversity_index"), Some(Value::Number(0.0)));
        assert_eq!(out.get(0, "enrollment_size_category"), Some(Value::Text("Very Small (<1,000)".into())));
        assert_eq!(out.get(1, "enrollment_size_category"), Some(Value::Text("Very Large (20,000+)".into())));
    }

    #[test]
    fn test_age_and_residence_are_merged_by_prefix() {
        let race = text_table(&["UNITID", "EFTOTLT"], &[&["100654", "5000"]]);
        let age = text_table(
            &["UNITID", "EFBAGE", "EFAGE01", "EFAGE02", "LSTUDY"],
            &[&["100654", "1", "10", "20", "1"], &["100690", "1", "3", "4", "1"]],
        );
        let residence = text_table(&["UNITID", "EFRES01", "LINE"], &[&["100654", "7", "1"]]);

        let out = Extractor::new(spec(&SourcesConfig::default()))
            .extract(&[Some(race), Some(age), Some(residence)])
            .unwrap();

        assert!(out.has_column("EFAGE01"));
        assert!(out.has_column("EFRES01"));
        assert!(!out.has_column("EFBAGE"));
        assert!(!out.has_column("LINE"));
        // 100690 only appears in the age part and has no totals
        assert_eq!(out.num_rows(), 1);
        assert_eq!(out.get(0, "EFRES01"), Some(Value::Number(7.0)));
        assert_eq!(out.get(0, "student_body_size"), Some(Value::Number(5000.0)));
    }

    #[test]
    fn test_zero_enrollment_is_unknown_size() {
        let race = text_table(&["UNITID", "EFTOTLT"], &[&["100654", "0"]]);
        let out = Extractor::new(spec(&SourcesConfig::default()))
            .extract(&[Some(race), None, None])
            .unwrap();

        assert_eq!(out.get(0, "enrollment_size_category"), Some(Value::Text(UNKNOWN.into())));
        assert!(!out.has_column("diversity_index"));
    }
}
