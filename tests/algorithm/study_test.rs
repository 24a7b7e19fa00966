use study_measures::algorithm::compute;
use study_measures::config::{AggregatorConfig, DEFAULT_POPULATION_ATTRIBUTE};
use study_measures::error::StudyError;
use study_measures::study::{self, BUILTIN_STUDIES};
use study_measures::{CohortStatistics, Value};

use crate::utils::{raw_attributes, synthetic_extract};

#[test]
fn test_builtin_studies_run_end_to_end() {
    for name in BUILTIN_STUDIES {
        let definition = study::builtin(name).unwrap();
        let records = synthetic_extract(&definition, 3000, 17);

        let run = definition
            .run(records, &AggregatorConfig::default())
            .unwrap();

        assert_eq!(run.study, name);
        assert_eq!(run.cohort_size + run.excluded, 3000);
        assert!(run.cohort_size > 0, "{name} selected nobody");

        for measure in &definition.measures {
            assert!(
                run.results.iter().any(|r| r.measure_id == measure.id),
                "{name}: no rows for {}",
                measure.id
            );
        }
        // the population criteria exclude unranked addresses
        for row in run.results.iter().filter(|r| r.group_by[0] == "imd") {
            let Value::Int(quintile) = row.group_key[0] else {
                panic!("{name}: non-integer quintile {}", row.group_key[0]);
            };
            assert!((1..=5).contains(&quintile));
        }

        let summary = CohortStatistics::generate_summary(&run);
        assert!(summary.contains(&format!("Cohort Members: {}", run.cohort_size)));
    }
}

/// Stage two over the selected cohort gives the same table as a full run
#[test]
fn test_run_equals_select_then_compute() {
    let definition = study::builtin("diabetes").unwrap();
    let records = synthetic_extract(&definition, 2000, 23);

    let cohort = definition
        .select_cohort(records.clone(), DEFAULT_POPULATION_ATTRIBUTE)
        .unwrap();
    assert!(
        cohort
            .members
            .iter()
            .all(|r| r.flag(DEFAULT_POPULATION_ATTRIBUTE) && r.flag("diabetes_subgroup"))
    );

    let staged = compute(&cohort.members, &definition.measures).unwrap();
    let run = definition
        .run(records, &AggregatorConfig::default())
        .unwrap();
    assert_eq!(staged, run.results);
}

/// Type 1 admissions are only counted among type 1 patients
#[test]
fn test_subgroup_denominator() {
    let definition = study::builtin("diabetes").unwrap();
    let records = synthetic_extract(&definition, 2000, 29);
    let cohort = definition
        .select_cohort(records, DEFAULT_POPULATION_ATTRIBUTE)
        .unwrap();
    let run = definition
        .run(cohort.members.clone(), &AggregatorConfig::default())
        .unwrap();

    let t1 = cohort
        .members
        .iter()
        .filter(|r| r.flag("has_t1_diabetes"))
        .count() as u64;
    let denominator: u64 = run
        .results
        .iter()
        .filter(|r| r.measure_id == "dmt1_admission_imd_rate")
        .map(|r| r.denominator)
        .sum();
    assert_eq!(denominator, t1);
}

#[test]
fn test_missing_raw_attribute_reported() {
    let definition = study::builtin("respiratory").unwrap();
    let attributes = raw_attributes(&definition);
    assert!(attributes.contains("has_copd_code"));
    assert!(!attributes.contains("has_copd"));

    let mut records = synthetic_extract(&definition, 10, 31);
    let mut stripped = study_measures::PatientRecord::new(999);
    for name in attributes.iter().filter(|name| *name != "msoa") {
        stripped.set(name.clone(), records[0].get(name).cloned().unwrap_or_default());
    }
    records.push(stripped);

    let err = definition
        .run(records, &AggregatorConfig::default())
        .unwrap_err();
    assert!(matches!(
        err,
        StudyError::MissingAttribute { patient_id: 999, ref attribute, .. } if attribute == "msoa"
    ));
}

/// A study without measures still reports the cohort by its covariates
#[test]
fn test_characteristics_study_tabulates_covariates() {
    let definition = study::builtin("static").unwrap();
    assert_eq!(definition.name, "static_characteristics");
    assert!(definition.measures.is_empty());

    let records = synthetic_extract(&definition, 2000, 37);
    assert!(records[0].has("urban_rural") && records[0].has("has_asthma"));

    let run = definition
        .run(records, &AggregatorConfig::default())
        .unwrap();
    assert!(run.results.is_empty());
    assert!(run.cohort_size > 0);
    assert_eq!(run.stats.strata.len(), definition.covariates.len());
    for (covariate, counts) in &run.stats.strata {
        assert_eq!(
            counts.values().sum::<usize>(),
            run.cohort_size,
            "{covariate} does not partition the cohort"
        );
    }
    // cohort criteria admit only known sex and ranked addresses
    assert!(!run.stats.strata["sex"].contains_key(&Value::from("U")));
    assert!(!run.stats.strata["imd"].contains_key(&Value::Int(0)));

    let summary = CohortStatistics::generate_summary(&run);
    assert!(summary.contains("Distribution by urban_rural:"));
}
