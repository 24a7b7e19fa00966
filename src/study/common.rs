//! Variables and criteria shared by every study

use chrono::NaiveDate;

use crate::algorithm::categorise::Categoriser;
use crate::algorithm::population::Variable;
use crate::filter::expr::{Expr, Operand, attr, flag, lit};
use crate::models::MeasureDefinition;

/// Extraction date shared by every study
pub const INDEX_DATE: NaiveDate = match NaiveDate::from_ymd_opt(2018, 3, 1) {
    Some(date) => date,
    None => panic!("invalid index date"),
};

/// Deprivation quintile attribute
pub const IMD: &str = "imd";

/// Migration status attribute
pub const MIGRATION_STATUS: &str = "migration_status";

/// Stratifiers every study reports on, in output order
pub const STRATIFIERS: [&str; 2] = [IMD, MIGRATION_STATUS];

/// Number of ranked areas in the Index of Multiple Deprivation
pub const IMD_MAX_RANK: i64 = 32844;

/// Upper bound of quintile `q`, written as the integer expression `32844*q/5`
fn quintile_boundary(q: i64) -> Operand {
    lit(IMD_MAX_RANK) * lit(q) / lit(5)
}

/// `NOT (msoa = '')`
#[must_use]
pub fn has_msoa() -> Variable {
    Variable::satisfying("has_msoa", attr("msoa").eq("").not())
}

/// IMD quintile 1-5 from the area rank; 0 when the address could not be ranked
#[must_use]
pub fn imd() -> Variable {
    let rank = || attr("index_of_multiple_deprivation");
    let mut categoriser = Categoriser::new(0).category(
        1,
        rank()
            .within(0, quintile_boundary(1))
            .and(flag("has_msoa")),
    );
    for q in 2..=4 {
        categoriser =
            categoriser.category(q, rank().within(quintile_boundary(q - 1), quintile_boundary(q)));
    }
    categoriser = categoriser.category(5, rank().between(quintile_boundary(4), IMD_MAX_RANK));
    Variable::categorised_as(IMD, categoriser)
}

/// Adults with follow-up, alive at the index date, known sex, ranked address
/// and a plausible household size
#[must_use]
pub fn base_population() -> Expr {
    Expr::all([
        flag("has_follow_up"),
        attr("age").between(18, 110),
        flag("died").not(),
        attr("sex").is_in(["M", "F"]),
        attr(IMD).not_eq(0),
        attr("household").between(1, 15),
    ])
}

/// `has_t1_diabetes OR has_t2_diabetes`
#[must_use]
pub fn diabetes_subgroup() -> Variable {
    Variable::satisfying(
        "diabetes_subgroup",
        Expr::any_flag(&["has_t1_diabetes", "has_t2_diabetes"]),
    )
}

/// A COPD code and older than 40
#[must_use]
pub fn has_copd() -> Variable {
    Variable::satisfying("has_copd", flag("has_copd_code").and(attr("age").gt(40)))
}

/// One rate measure per (numerator, denominator) pair and stratifier
///
/// Ids follow `<numerator>_<stratifier>_rate`; all measures for the first
/// stratifier come before those for the next.
#[must_use]
pub fn rate_measures(pairs: &[(&str, &str)], stratifiers: &[&str]) -> Vec<MeasureDefinition> {
    stratifiers
        .iter()
        .flat_map(|stratifier| {
            pairs.iter().map(move |(numerator, denominator)| {
                MeasureDefinition::new(
                    format!("{numerator}_{stratifier}_rate"),
                    *numerator,
                    *denominator,
                    &[*stratifier],
                )
            })
        })
        .collect()
}
