//! Diabetes admissions and mortality among people with type 1 or type 2 diabetes

use crate::algorithm::population::StudyDefinition;
use crate::filter::expr::flag;

use super::common::{
    INDEX_DATE, STRATIFIERS, base_population, diabetes_subgroup, has_msoa, imd, rate_measures,
};

#[must_use]
pub fn diabetes() -> StudyDefinition {
    StudyDefinition {
        name: "diabetes".to_string(),
        index_date: INDEX_DATE,
        population: base_population().and(flag("diabetes_subgroup")),
        variables: vec![has_msoa(), imd(), diabetes_subgroup()],
        measures: rate_measures(
            &[
                ("dmt1_admission", "has_t1_diabetes"),
                ("dmt2_admission", "has_t2_diabetes"),
                ("dm_keto_admission", "population"),
                ("dmt1_mortality", "has_t1_diabetes"),
                ("dmt2_mortality", "has_t2_diabetes"),
                ("dm_keto_mortality", "population"),
            ],
            &STRATIFIERS,
        ),
        covariates: Vec::new(),
    }
}
