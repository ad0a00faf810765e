//! Finance (F parts 1A, 2 and 3) and tuition (IC) extraction.
//!
//! Finance keeps every institution that appears in any of its sources, even
//! when no value is reported.

use crate::config::SourcesConfig;
use crate::core::table::Value;

use super::derived::{
    at_least, at_most, coalesce_add, coalesce_sum, cost_category, expense_ratio, financially_stable,
    first_present, net_income,
};
use super::domain::Domain;
use super::extractor::{input_f64, inputs_f64, ColumnSelection, DerivedField, DomainSpec, SourceSpec};

pub const REVENUE_COLUMNS: &[&str] = &[
    "F1A01", "F1A02", "F1A03", "F1A04", "F1A05", "F1A06", "F1A07", "F1A08", "F1A09", "F1A10",
    "F1A11", "F1A12", "F1A13", "F1A14", "F1A15", "F1A16", "F1A17", "F1A18", "F1A19", "F1A20",
];

pub const EXPENSE_COLUMNS: &[&str] = &[
    "F2A01", "F2A02", "F2A03", "F2A04", "F2A05", "F2A06", "F2A07", "F2A08", "F2A09", "F2A10",
    "F2A11", "F2A12", "F2A13", "F2A14", "F2A15", "F2A16", "F2A17", "F2A18", "F2A19", "F2A20",
];

const NET_ASSET_COLUMNS: &[&str] = &["F3A01", "F3A02", "F3A03", "F3A04", "F3A05"];

const IN_STATE_TUITION: &[&str] = &["TUITION1", "TUITION2", "TUITION3"];
const OUT_STATE_TUITION: &[&str] = &["TUITION5", "TUITION6", "TUITION7"];
const REQUIRED_FEES: &[&str] = &["FEE1", "FEE2", "FEE3", "FEE4", "FEE5", "FEE6", "FEE7"];
const CREDIT_HOUR_CHARGES: &[&str] = &["HRCHG1", "HRCHG2", "HRCHG3", "HRCHG4", "HRCHG5"];
const ROOM_CHARGES: &[&str] = &["CHG1AT0", "CHG1AT1", "CHG1AT2", "CHG1AT3"];
const BOARD_CHARGES: &[&str] = &["CHG2AT0", "CHG2AT1", "CHG2AT2", "CHG2AT3"];
const ROOM_AND_BOARD: &[&str] = &["CHG3AT0", "CHG3AT1", "CHG3AT2", "CHG3AT3"];

const AFFORDABLE_IN_STATE: f64 = 15_000.0;
const EXPENSIVE_IN_STATE: f64 = 40_000.0;
const AFFORDABLE_OUT_STATE: f64 = 25_000.0;
const EXPENSIVE_OUT_STATE: f64 = 50_000.0;

pub fn spec(sources: &SourcesConfig) -> DomainSpec {
    let revenues = SourceSpec::new(
        sources.finance_revenues.clone(),
        "Core revenues",
        ColumnSelection::Fixed(REVENUE_COLUMNS.to_vec()),
    )
    .with_derived(vec![DerivedField::any("total_revenues", REVENUE_COLUMNS, sum_present)])
    .optional();

    let expenses = SourceSpec::new(
        sources.finance_expenses.clone(),
        "Core expenses",
        ColumnSelection::Fixed(EXPENSE_COLUMNS.to_vec()),
    )
    .with_derived(vec![DerivedField::any("total_expenses", EXPENSE_COLUMNS, sum_present)])
    .optional();

    let net_assets = SourceSpec::new(
        sources.finance_net_assets.clone(),
        "Net assets",
        ColumnSelection::Fixed(NET_ASSET_COLUMNS.to_vec()),
    )
    .optional();

    let tuition_columns: Vec<&'static str> = [
        IN_STATE_TUITION,
        OUT_STATE_TUITION,
        REQUIRED_FEES,
        CREDIT_HOUR_CHARGES,
        ROOM_CHARGES,
        BOARD_CHARGES,
        ROOM_AND_BOARD,
    ]
    .concat();

    let tuition = SourceSpec::new(
        sources.tuition.clone(),
        "Tuition and charges",
        ColumnSelection::Fixed(tuition_columns),
    )
    .with_derived(vec![
        DerivedField::any("tuition_in_state", IN_STATE_TUITION, first_of),
        DerivedField::any("tuition_out_state", OUT_STATE_TUITION, first_of),
        DerivedField::any("required_fees", REQUIRED_FEES, first_of),
        DerivedField::any("room_and_board", ROOM_AND_BOARD, first_of),
        DerivedField::all("total_in_state_tuition_fees", &["tuition_in_state", "required_fees"], add),
        DerivedField::all("total_out_state_tuition_fees", &["tuition_out_state", "required_fees"], add),
        DerivedField::all("total_cost_in_state", &["total_in_state_tuition_fees", "room_and_board"], add),
        DerivedField::all("total_cost_out_state", &["total_out_state_tuition_fees", "room_and_board"], add),
    ])
    .optional();

    DomainSpec {
        domain: Domain::Finance,
        sources: vec![revenues, expenses, net_assets, tuition],
        derived: vec![
            DerivedField::all("in_state_tuition_fees_category", &["total_in_state_tuition_fees"], category),
            DerivedField::all("out_state_tuition_fees_category", &["total_out_state_tuition_fees"], category),
            DerivedField::all("cost_in_state_category", &["total_cost_in_state"], category),
            DerivedField::all("cost_out_state_category", &["total_cost_out_state"], category),
            DerivedField::all("net_income", &["total_revenues", "total_expenses"], |a| {
                Value::from_f64(net_income(input_f64(a, 0), input_f64(a, 1)))
            }),
            DerivedField::all("expense_ratio", &["total_revenues", "total_expenses"], |a| {
                Value::from_f64(expense_ratio(input_f64(a, 0), input_f64(a, 1)))
            }),
            DerivedField::all("financially_stable", &["total_revenues", "total_expenses"], |a| {
                let (revenue, expense) = (input_f64(a, 0), input_f64(a, 1));
                Value::Bool(financially_stable(
                    net_income(revenue, expense),
                    expense_ratio(revenue, expense),
                ))
            }),
            DerivedField::all("affordable_in_state", &["total_in_state_tuition_fees"], |a| {
                Value::Bool(at_most(input_f64(a, 0), AFFORDABLE_IN_STATE))
            }),
            DerivedField::all("expensive_in_state", &["total_in_state_tuition_fees"], |a| {
                Value::Bool(at_least(input_f64(a, 0), EXPENSIVE_IN_STATE))
            }),
            DerivedField::all("affordable_out_state", &["total_out_state_tuition_fees"], |a| {
                Value::Bool(at_most(input_f64(a, 0), AFFORDABLE_OUT_STATE))
            }),
            DerivedField::all("expensive_out_state", &["total_out_state_tuition_fees"], |a| {
                Value::Bool(at_least(input_f64(a, 0), EXPENSIVE_OUT_STATE))
            }),
        ],
        informative_columns: Vec::new(),
        retain_empty_rows: true,
    }
}

fn sum_present(args: &[Option<&Value>]) -> Value {
    Value::from_f64(coalesce_sum(inputs_f64(args)))
}

fn first_of(args: &[Option<&Value>]) -> Value {
    Value::from_f64(first_present(inputs_f64(args)))
}

fn add(args: &[Option<&Value>]) -> Value {
    Value::from_f64(coalesce_add(input_f64(args, 0), input_f64(args, 1)))
}

fn category(args: &[Option<&Value>]) -> Value {
    Value::Text(cost_category(input_f64(args, 0)).to_string())
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

    fn extract(revenues: Option<Table>, expenses: Option<Table>, tuition: Option<Table>) -> Table {
        Extractor::new(spec(&SourcesConfig::default()))
            .extract(&[revenues, expenses, None, tuition])
            .unwrap()
    }

    #[test]
    fn test_financial_health() {
        let revenues = text_table(
            &["UNITID", "F1A01", "F1A02"],
            &[&["100654", "600", "400"], &["100663", "500", ""], &["100690", "", ""]],
        );
        let expenses = text_table(
            &["UNITID", "F2A01"],
            &[&["100654", "900"], &["100663", "600"], &["100690", "50"]],
        );

        let out = extract(Some(revenues), Some(expenses), None);

        assert_eq!(out.num_rows(), 3);
        assert_eq!(out.get(0, "total_revenues"), Some(Value::Number(1000.0)));
        assert_eq!(out.get(0, "net_income"), Some(Value::Number(100.0)));
        assert_eq!(out.get(0, "expense_ratio"), Some(Value::Number(0.9)));
        assert_eq!(out.get(0, "financially_stable"), Some(Value::Bool(true)));
        assert_eq!(out.get(1, "financially_stable"), Some(Value::Bool(false)));
        // nothing reported: revenue unknown, so not stable
        assert_eq!(out.get(2, "total_revenues"), Some(Value::Missing));
        assert_eq!(out.get(2, "expense_ratio"), Some(Value::Missing));
        assert_eq!(out.get(2, "financially_stable"), Some(Value::Bool(false)));
    }

    #[test]
    fn test_tuition_standardisation_and_costs() {
        let tuition = text_table(
            &["UNITID", "TUITION1", "TUITION2", "TUITION5", "FEE1", "FEE2", "CHG3AT0"],
            &[
                &["100654", "9000", "9500", "18000", "", "1200", "10000"],
                &["100663", ".", "8000", "", "", "", ""],
                &["100690", "", "", "", "", "", ""],
            ],
        );

        let out = extract(None, None, Some(tuition));

        assert_eq!(out.get(0, "tuition_in_state"), Some(Value::Number(9000.0)));
        assert_eq!(out.get(0, "required_fees"), Some(Value::Number(1200.0)));
        assert_eq!(out.get(0, "total_in_state_tuition_fees"), Some(Value::Number(10200.0)));
        assert_eq!(out.get(0, "total_cost_in_state"), Some(Value::Number(20200.0)));
        assert_eq!(out.get(0, "total_out_state_tuition_fees"), Some(Value::Number(19200.0)));
        assert_eq!(out.get(0, "in_state_tuition_fees_category"), Some(Value::Text("Low ($10K-$20K)".into())));
        assert_eq!(out.get(0, "affordable_in_state"), Some(Value::Bool(true)));
        assert_eq!(out.get(0, "affordable_out_state"), Some(Value::Bool(true)));

        // fees missing: coalesce-add keeps the tuition alone
        assert_eq!(out.get(1, "tuition_in_state"), Some(Value::Number(8000.0)));
        assert_eq!(out.get(1, "total_in_state_tuition_fees"), Some(Value::Number(8000.0)));

        assert_eq!(out.get(2, "total_in_state_tuition_fees"), Some(Value::Missing));
        assert_eq!(out.get(2, "cost_in_state_category"), Some(Value::Text(UNKNOWN.into())));
        assert_eq!(out.get(2, "affordable_in_state"), Some(Value::Bool(false)));
        assert!(!out.has_column("net_income"));
    }

    #[test]
    fn test_finance_sources_outer_join_keeps_all_keys() {
        let revenues = text_table(&["UNITID", "F1A01"], &[&["100654", "10"]]);
        let tuition = text_table(&["UNITID", "TUITION1"], &[&["100663", "5000"]]);

        let out = extract(Some(revenues), None, Some(tuition));

        assert_eq!(out.num_rows(), 2);
        assert_eq!(out.key_set().len(), 2);
        assert_eq!(out.get(1, "total_revenues"), Some(Value::Missing));
    }
}
