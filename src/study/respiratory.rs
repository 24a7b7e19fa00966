//! Asthma and COPD exacerbations among people with either condition

use crate::algorithm::population::{StudyDefinition, Variable};
use crate::filter::expr::{Expr, attr, flag};

use super::common::{
    INDEX_DATE, STRATIFIERS, base_population, has_copd, has_msoa, imd, rate_measures,
};

#[must_use]
pub fn respiratory() -> StudyDefinition {
    let copd_exacerbation = || Expr::any_flag(&["copd_exacerbation_hospital", "copd_hospital"]);
    StudyDefinition {
        name: "respiratory".to_string(),
        index_date: INDEX_DATE,
        population: base_population()
            .and(attr("stp").not_eq("missing"))
            .and(Expr::any_flag(&["has_asthma", "has_copd"])),
        variables: vec![
            has_msoa(),
            imd(),
            has_copd(),
            Variable::satisfying(
                "resp_copd_exac",
                copd_exacerbation().or(flag("lrti_hospital").and(flag("copd_any"))),
            ),
            Variable::satisfying("resp_copd_exac_nolrti", copd_exacerbation()),
            Variable::satisfying(
                "resp_copd_mortality",
                Expr::any_flag(&["resp_copd_exac_mortality", "resp_copd_diag_mortality"]),
            ),
        ],
        measures: rate_measures(
            &[
                ("resp_asthma_exac", "has_asthma"),
                ("resp_copd_exac", "has_copd"),
                ("resp_copd_exac_nolrti", "has_copd"),
                ("resp_asthma_mortality", "has_asthma"),
                ("resp_copd_mortality", "has_copd"),
            ],
            &STRATIFIERS,
        ),
        covariates: Vec::new(),
    }
}
