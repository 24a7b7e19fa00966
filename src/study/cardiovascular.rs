//! Cardiovascular and mental-health outcomes in the general adult population

use crate::algorithm::population::{StudyDefinition, Variable};
use crate::filter::expr::Expr;

use super::common::{
    INDEX_DATE, STRATIFIERS, base_population, diabetes_subgroup, has_copd, has_msoa, imd,
    rate_measures,
};

/// Admission flags whose disjunction makes up `mh_admission`
pub const MENTAL_HEALTH_ADMISSIONS: [&str; 6] = [
    "depression_admission",
    "anxiety_admission",
    "smi_admission",
    "self_harm_admission",
    "eating_dis_admission",
    "ocd_admission",
];

/// Outcomes counted over the whole population
pub const OUTCOMES: [&str; 10] = [
    "mi_admission",
    "stroke_admission",
    "heart_failure_admission",
    "vte_admission",
    "mh_admission",
    "mi_mortality",
    "stroke_mortality",
    "vte_mortality",
    "heart_failure_mortality",
    "mh_mortality",
];

#[must_use]
pub fn cardiovascular_mental_health() -> StudyDefinition {
    let pairs: Vec<(&str, &str)> = OUTCOMES.iter().map(|o| (*o, "population")).collect();
    StudyDefinition {
        name: "cardiovascular_mental_health".to_string(),
        index_date: INDEX_DATE,
        population: base_population(),
        variables: vec![
            has_msoa(),
            imd(),
            diabetes_subgroup(),
            has_copd(),
            Variable::satisfying("mh_admission", Expr::any_flag(&MENTAL_HEALTH_ADMISSIONS)),
        ],
        measures: rate_measures(&pairs, &STRATIFIERS),
        covariates: Vec::new(),
    }
}
