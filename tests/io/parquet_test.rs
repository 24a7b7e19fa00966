use study_measures::algorithm::compute;
use study_measures::error::StudyError;
use study_measures::utils::io::{
    find_parquet_files, load_patient_records_parallel, read_patient_records,
};
use study_measures::{MeasureDefinition, Value};

use crate::utils::{scratch_dir, write_patient_parquet};

#[test]
fn test_find_and_load_directory() {
    let dir = scratch_dir("parquet-dir");
    write_patient_parquet(
        &dir.join("b.parquet"),
        &[(3, Some(70), Some("E54000005"))],
    );
    write_patient_parquet(
        &dir.join("a.parquet"),
        &[(1, Some(45), Some("E54000005")), (2, None, None)],
    );
    std::fs::write(dir.join("notes.txt"), "not parquet").unwrap();

    let files = find_parquet_files(&dir).unwrap();
    let names: Vec<_> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["a.parquet", "b.parquet"]);

    let records = load_patient_records_parallel(&files, "patient_id").unwrap();
    let ids: Vec<_> = records.iter().map(|r| r.patient_id).collect();
    assert_eq!(ids, [1, 2, 3]);
    assert_eq!(records[0].get("age"), Some(&Value::Int(45)));
    assert_eq!(records[1].get("age"), Some(&Value::Null));
    assert_eq!(records[1].get("stp"), Some(&Value::Null));
    assert_eq!(records[2].get("stp"), Some(&Value::from("E54000005")));

    let _ = std::fs::remove_dir_all(&dir);
}

/// Loaded attributes feed straight into the aggregator
#[test]
fn test_loaded_records_aggregate() {
    let dir = scratch_dir("parquet-aggregate");
    let path = dir.join("extract.parquet");
    write_patient_parquet(
        &path,
        &[
            (1, Some(1), Some("north")),
            (2, Some(0), Some("north")),
            (3, Some(1), None),
        ],
    );

    let records = read_patient_records(&path, "patient_id").unwrap();
    // every extracted record is a cohort member here
    let records: Vec<_> = records
        .into_iter()
        .map(|r| r.with("population", true))
        .collect();
    let definition = MeasureDefinition::new("age_stp", "age", "population", &["stp"]);
    let results = compute(&records, &[definition]).unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].group_value("stp"), Some(&Value::from("north")));
    assert_eq!((results[0].numerator, results[0].denominator), (1, 2));
    assert_eq!(results[1].group_value("stp"), Some(&Value::Null));
    assert_eq!((results[1].numerator, results[1].denominator), (1, 1));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_missing_directory_is_an_error() {
    let dir = scratch_dir("parquet-missing").join("nope");
    assert!(matches!(
        find_parquet_files(&dir).unwrap_err(),
        StudyError::Io(_)
    ));
}

#[test]
fn test_wrong_id_column() {
    let dir = scratch_dir("parquet-id");
    let path = dir.join("extract.parquet");
    write_patient_parquet(&path, &[(1, Some(1), Some("north"))]);

    let err = read_patient_records(&path, "pnr").unwrap_err();
    assert!(matches!(err, StudyError::Conversion(_)));

    let _ = std::fs::remove_dir_all(&dir);
}
