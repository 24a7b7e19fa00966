//! Baseline characteristics of the adult population, one year after the
//! other studies' index date. No measures; the cohort is tabulated by
//! its covariates instead.

use chrono::NaiveDate;

use crate::algorithm::population::StudyDefinition;

use super::common::{
    IMD, MIGRATION_STATUS, base_population, diabetes_subgroup, has_copd, has_msoa, imd,
};

/// Extraction date of the characteristics study
pub const STATIC_INDEX_DATE: NaiveDate = match NaiveDate::from_ymd_opt(2019, 3, 1) {
    Some(date) => date,
    None => panic!("invalid index date"),
};

/// Attributes tabulated over the cohort
pub const CHARACTERISTICS: [&str; 7] = [
    "sex",
    IMD,
    "urban_rural",
    MIGRATION_STATUS,
    "diabetes_subgroup",
    "has_asthma",
    "has_copd",
];

#[must_use]
pub fn static_characteristics() -> StudyDefinition {
    StudyDefinition {
        name: "static_characteristics".to_string(),
        index_date: STATIC_INDEX_DATE,
        population: base_population(),
        variables: vec![has_msoa(), imd(), diabetes_subgroup(), has_copd()],
        measures: Vec::new(),
        covariates: CHARACTERISTICS.iter().map(ToString::to_string).collect(),
    }
}
