use study_measures::algorithm::{compute, compute_with_config};
use study_measures::config::AggregatorConfig;
use study_measures::error::StudyError;
use study_measures::{MeasureDefinition, PatientRecord, Value};

use crate::utils::{example_records, mi_by_imd, random_records};

fn random_definitions() -> Vec<MeasureDefinition> {
    vec![
        MeasureDefinition::new("outcome_imd_rate", "outcome", "population", &["imd"]),
        MeasureDefinition::new("outcome_imd_sex_rate", "outcome", "eligible", &["imd", "sex"]),
    ]
}

/// Two records in IMD 1 and one with a missing IMD
#[test]
fn test_example_table() {
    let results = compute(&example_records(), &[mi_by_imd()]).unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].group_value("imd"), Some(&Value::Int(1)));
    assert_eq!((results[0].numerator, results[0].denominator), (1, 2));
    assert_eq!(results[0].rate, Some(0.5));

    assert_eq!(results[1].group_value("imd"), Some(&Value::Null));
    assert_eq!((results[1].numerator, results[1].denominator), (1, 1));
    assert_eq!(results[1].rate, Some(1.0));
}

/// Group denominators add up to the eligible records, numerators to the
/// records that are both eligible and positive
#[test]
fn test_groups_partition_eligible_records() {
    let records = random_records(3000, 7);
    let definitions = random_definitions();
    let results = compute(&records, &definitions).unwrap();

    for definition in &definitions {
        let rows: Vec<_> = results
            .iter()
            .filter(|r| r.measure_id == definition.id)
            .collect();
        let eligible = records
            .iter()
            .filter(|r| r.flag(&definition.denominator))
            .count() as u64;
        let positive = records
            .iter()
            .filter(|r| r.flag(&definition.denominator) && r.flag(&definition.numerator))
            .count() as u64;

        assert_eq!(rows.iter().map(|r| r.denominator).sum::<u64>(), eligible);
        assert_eq!(rows.iter().map(|r| r.numerator).sum::<u64>(), positive);
        for row in rows {
            assert!(row.numerator <= row.denominator);
            assert_eq!(row.group_key.len(), definition.group_by.len());
            match row.rate {
                Some(rate) => {
                    assert!(row.denominator > 0);
                    assert!((0.0..=1.0).contains(&rate));
                }
                None => assert_eq!(row.denominator, 0),
            }
        }
    }
}

#[test]
fn test_results_sorted_by_group_key() {
    let results = compute(&random_records(500, 11), &random_definitions()).unwrap();
    assert!(
        results
            .windows(2)
            .all(|pair| pair[0].group_key <= pair[1].group_key)
    );
    // missing values sort after every known value
    let first_missing = results
        .iter()
        .position(|r| r.group_key[0].is_null())
        .unwrap();
    assert!(results[first_missing..].iter().all(|r| r.group_key[0].is_null()));
}

#[test]
fn test_parallel_matches_sequential() {
    let records = random_records(20_000, 42);
    let definitions = random_definitions();

    let sequential =
        compute_with_config(&records, &definitions, &AggregatorConfig::sequential()).unwrap();
    let parallel = compute_with_config(
        &records,
        &definitions,
        &AggregatorConfig {
            parallel_threshold: 0,
            workers: Some(4),
            ..AggregatorConfig::default()
        },
    )
    .unwrap();

    assert_eq!(sequential, parallel);
}

#[test]
fn test_repeated_runs_are_identical() {
    let records = random_records(1000, 3);
    let first = compute(&records, &random_definitions()).unwrap();
    let second = compute(&records, &random_definitions()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_missing_attribute_aborts_whole_call() {
    let mut records = random_records(100, 5);
    records.push(
        PatientRecord::new(4242)
            .with("population", true)
            .with("outcome", true),
    );

    let err = compute(&records, &random_definitions()).unwrap_err();
    match err {
        StudyError::MissingAttribute {
            measure_id,
            patient_id,
            attribute,
        } => {
            assert_eq!(measure_id, "outcome_imd_rate");
            assert_eq!(patient_id, 4242);
            assert_eq!(attribute, "imd");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_duplicate_measure_ids_rejected() {
    let definitions = vec![mi_by_imd(), mi_by_imd()];
    let err = compute(&example_records(), &definitions).unwrap_err();
    assert!(matches!(err, StudyError::InvalidDefinition { .. }));
}

#[test]
fn test_empty_definitions_give_no_rows() {
    assert!(compute(&example_records(), &[]).unwrap().is_empty());
}
