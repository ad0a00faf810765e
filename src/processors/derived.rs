//! Pure derived-field computations.
//!
//! Every function here takes already-cleaned operands as `Option<f64>` and
//! returns `None` when the result is undefined, so a missing operand never
//! raises. Categorical helpers return the label `"Unknown"` for missing input.

/// Label used by categorical fields when the input is missing.
pub const UNKNOWN: &str = "Unknown";

/// Rounds to `places` decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// `numerator / denominator`, undefined when either is missing or the
/// denominator is zero.
pub fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d != 0.0 => Some(n / d),
        _ => None,
    }
}

/// `100 * numerator / denominator` rounded to 2 decimals.
pub fn percentage(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    ratio(numerator, denominator).map(|r| round_to(r * 100.0, 2))
}

/// Share of applicants admitted, in percent.
pub fn acceptance_rate(admitted: Option<f64>, applicants: Option<f64>) -> Option<f64> {
    percentage(admitted, applicants)
}

/// Share of admitted students who enrolled, in percent.
pub fn yield_rate(enrolled: Option<f64>, admitted: Option<f64>) -> Option<f64> {
    percentage(enrolled, admitted)
}

/// Selectivity band for an acceptance rate.
pub fn selectivity_category(rate: Option<f64>) -> &'static str {
    match rate {
        None => UNKNOWN,
        Some(r) if r <= 10.0 => "Most competitive (<=10%)",
        Some(r) if r <= 25.0 => "Highly competitive (11-25%)",
        Some(r) if r <= 50.0 => "Competitive (26-50%)",
        Some(r) if r <= 75.0 => "Moderately competitive (51-75%)",
        Some(_) => "Less competitive (>75%)",
    }
}

/// Sum that is only defined when both operands are present.
pub fn strict_sum(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    Some(a? + b?)
}

/// Addition that ignores a missing operand.
///
/// Missing only when both operands are missing.
pub fn coalesce_add(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (None, None) => None,
        (a, b) => Some(a.unwrap_or(0.0) + b.unwrap_or(0.0)),
    }
}

/// Folds [`coalesce_add`] over any number of operands.
pub fn coalesce_sum<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    values.into_iter().fold(None, coalesce_add)
}

/// First present value.
pub fn first_present<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    values.into_iter().flatten().next()
}

/// Simpson diversity index `1 - Σ p_i²` over group counts, rounded to 3
/// decimals.
///
/// Shares are taken against the sum of the present counts. Undefined when
/// no count is present or the counts sum to zero.
pub fn diversity_index(counts: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = counts.iter().flatten().copied().collect();
    if present.is_empty() {
        return None;
    }
    let total: f64 = present.iter().sum();
    if total <= 0.0 {
        return None;
    }
    let concentration: f64 = present.iter().map(|c| (c / total).powi(2)).sum();
    Some(round_to(1.0 - concentration, 3))
}

/// Size band for a student headcount. Zero counts as unknown.
pub fn enrollment_size_category(size: Option<f64>) -> &'static str {
    match size {
        None => UNKNOWN,
        Some(s) if s == 0.0 => UNKNOWN,
        Some(s) if s < 1_000.0 => "Very Small (<1,000)",
        Some(s) if s < 3_000.0 => "Small (1,000-2,999)",
        Some(s) if s < 10_000.0 => "Medium (3,000-9,999)",
        Some(s) if s < 20_000.0 => "Large (10,000-19,999)",
        Some(_) => "Very Large (20,000+)",
    }
}

/// Price band for an annual cost in dollars.
pub fn cost_category(cost: Option<f64>) -> &'static str {
    match cost {
        None => UNKNOWN,
        Some(c) if c <= 10_000.0 => "Very Low (<=$10K)",
        Some(c) if c <= 20_000.0 => "Low ($10K-$20K)",
        Some(c) if c <= 35_000.0 => "Moderate ($20K-$35K)",
        Some(c) if c <= 50_000.0 => "High ($35K-$50K)",
        Some(_) => "Very High (>$50K)",
    }
}

/// `revenue - expense`, defined only when both are present.
pub fn net_income(revenue: Option<f64>, expense: Option<f64>) -> Option<f64> {
    Some(revenue? - expense?)
}

/// `expense / revenue` rounded to 3 decimals, defined only when both are
/// present and revenue is positive.
pub fn expense_ratio(revenue: Option<f64>, expense: Option<f64>) -> Option<f64> {
    match (revenue, expense) {
        (Some(r), Some(e)) if r > 0.0 => Some(round_to(e / r, 3)),
        _ => None,
    }
}

/// True iff net income is non-negative and the expense ratio is at most 1.
///
/// Missing inputs read as not stable.
pub fn financially_stable(net_income: Option<f64>, expense_ratio: Option<f64>) -> bool {
    matches!((net_income, expense_ratio), (Some(n), Some(r)) if n >= 0.0 && r <= 1.0)
}

/// True iff the value is present and at least `threshold`.
pub fn at_least(value: Option<f64>, threshold: f64) -> bool {
    value.is_some_and(|v| v >= threshold)
}

/// True iff the value is present and at most `threshold`.
pub fn at_most(value: Option<f64>, threshold: f64) -> bool {
    value.is_some_and(|v| v <= threshold)
}

/// `"low - high"` for a score range, undefined when both ends are missing.
pub fn score_range(low: Option<f64>, high: Option<f64>) -> Option<String> {
    let show = |v: Option<f64>| v.map_or_else(|| "nan".to_string(), crate::core::table::format_number);
    match (low, high) {
        (None, None) => None,
        _ => Some(format!("{} - {}", show(low), show(high))),
    }
}

/// Clips to `[0, 1]`.
pub fn unit_clip(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Competitiveness from acceptance rate: lower rates score higher.
pub fn acceptance_competitiveness(acceptance_rate: Option<f64>) -> Option<f64> {
    acceptance_rate.map(|r| unit_clip((100.0 - r) / 100.0))
}

/// Competitiveness from the 75th percentile combined SAT score.
pub fn sat_competitiveness(sat_total_75: Option<f64>) -> Option<f64> {
    sat_total_75.map(|s| unit_clip((s - 800.0) / 800.0))
}

/// Competitiveness from the 75th percentile ACT composite score.
pub fn act_competitiveness(act_composite_75: Option<f64>) -> Option<f64> {
    act_composite_75.map(|s| unit_clip((s - 15.0) / 21.0))
}

/// Mean of the present values, undefined if none are present.
pub fn mean_present(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().sum::<f64>() / present.len() as f64)
    }
}

/// Mean of up to three competitiveness sub-scores, rounded to 3 decimals.
pub fn competitiveness_score(
    acceptance: Option<f64>,
    sat: Option<f64>,
    act: Option<f64>,
) -> Option<f64> {
    mean_present(&[acceptance, sat, act]).map(|m| round_to(m, 3))
}

/// Inverse cost term in `[0, 1]`: free scores 1, `ceiling` or more scores 0.
pub fn cost_inverse(cost: Option<f64>, ceiling: f64) -> Option<f64> {
    if ceiling <= 0.0 {
        return None;
    }
    cost.map(|c| unit_clip(1.0 - c / ceiling))
}

/// Mean of competitiveness and the inverse cost term, rounded to 3 decimals.
///
/// Defined only when both terms are present.
pub fn value_score(competitiveness: Option<f64>, cost_inverse: Option<f64>) -> Option<f64> {
    Some(round_to((competitiveness? + cost_inverse?) / 2.0, 3))
}

/// Fraction of `present` out of `total`, rounded to 3 decimals. Zero when
/// there is nothing to measure.
pub fn completeness(present: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        round_to(present as f64 / total as f64, 3)
    }
}

/// Qualitative tier for a completeness fraction.
pub fn quality_tier(completeness: f64) -> &'static str {
    if completeness >= 0.9 {
        "Excellent (90%+)"
    } else if completeness >= 0.7 {
        "Good (70-89%)"
    } else if completeness >= 0.5 {
        "Fair (50-69%)"
    } else {
        "Poor (<50%)"
    }
}
