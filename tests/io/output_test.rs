use chrono::NaiveDate;

use study_measures::algorithm::compute;
use study_measures::utils::io::{measure_file_name, write_measure_csv};
use study_measures::{MeasureDefinition, Value};

use crate::utils::{example_records, mi_by_imd, scratch_dir};

#[test]
fn test_one_csv_per_measure() {
    let dir = scratch_dir("csv-output");
    let mut records = example_records();
    // patient 3 leaves the denominator, so the missing group becomes 0/0
    records[2].set("population", false);

    let definitions = vec![
        mi_by_imd(),
        MeasureDefinition::new("unused_imd_rate", "mi_admission", "never", &["imd"]),
    ];
    let records: Vec<_> = records.into_iter().map(|r| r.with("never", 0)).collect();
    let results = compute(&records, &definitions).unwrap();

    let index_date = NaiveDate::from_ymd_opt(2018, 3, 1).unwrap();
    let written = write_measure_csv(&dir, &definitions, &results, index_date).unwrap();
    assert_eq!(
        written,
        vec![
            dir.join(measure_file_name("mi_admission_imd_rate")),
            dir.join(measure_file_name("unused_imd_rate")),
        ]
    );

    let text = std::fs::read_to_string(&written[0]).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(
        lines,
        [
            "imd,numerator,denominator,value,date",
            "1,1,2,0.5,2018-03-01",
            ",0,0,,2018-03-01",
        ]
    );

    // no eligible records: every group is 0/0 with an empty value
    let text = std::fs::read_to_string(&written[1]).unwrap();
    assert!(text.lines().skip(1).all(|line| line.contains(",0,0,,")));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_multi_attribute_columns() {
    let dir = scratch_dir("csv-multi");
    let records: Vec<_> = example_records()
        .into_iter()
        .map(|r| {
            let region = if r.patient_id == 2 { "south" } else { "north" };
            r.with("region", region)
        })
        .collect();
    let definition = MeasureDefinition::new(
        "mi_imd_region_rate",
        "mi_admission",
        "population",
        &["imd", "region"],
    );
    let results = compute(&records, std::slice::from_ref(&definition)).unwrap();
    assert_eq!(results[0].group_value("region"), Some(&Value::from("north")));

    let index_date = NaiveDate::from_ymd_opt(2018, 3, 1).unwrap();
    let written = write_measure_csv(&dir, &[definition], &results, index_date).unwrap();
    let text = std::fs::read_to_string(&written[0]).unwrap();
    assert_eq!(
        text.lines().next(),
        Some("imd,region,numerator,denominator,value,date")
    );
    assert_eq!(text.lines().count(), 4);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_measure_without_rows_writes_header_only() {
    let dir = scratch_dir("csv-empty");
    let definitions = vec![mi_by_imd()];
    let results = compute(&[], &definitions).unwrap();
    assert!(results.is_empty());

    let index_date = NaiveDate::from_ymd_opt(2018, 3, 1).unwrap();
    let written = write_measure_csv(&dir, &definitions, &results, index_date).unwrap();
    assert_eq!(written.len(), 1);
    assert_eq!(
        std::fs::read_to_string(&written[0]).unwrap(),
        "imd,numerator,denominator,value,date\n"
    );

    let _ = std::fs::remove_dir_all(&dir);
}
