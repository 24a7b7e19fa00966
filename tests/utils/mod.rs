use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use study_measures::config::DEFAULT_POPULATION_ATTRIBUTE;
use study_measures::{MeasureDefinition, PatientRecord, StudyDefinition, Value};

/// Fresh scratch directory under the system temp dir
#[must_use]
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "study-measures-{}-{name}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// The three-patient example used throughout: two in IMD 1, one missing
#[must_use]
pub fn example_records() -> Vec<PatientRecord> {
    vec![
        PatientRecord::new(1)
            .with("population", true)
            .with("mi_admission", true)
            .with("imd", 1),
        PatientRecord::new(2)
            .with("population", true)
            .with("mi_admission", false)
            .with("imd", 1),
        PatientRecord::new(3)
            .with("population", true)
            .with("mi_admission", true)
            .with("imd", Value::Null),
    ]
}

#[must_use]
pub fn mi_by_imd() -> MeasureDefinition {
    MeasureDefinition::new("mi_admission_imd_rate", "mi_admission", "population", &["imd"])
}

/// Random records with flags `population`, `outcome`, `eligible` and
/// stratifiers `imd` (0-5 or missing) and `sex`
#[must_use]
pub fn random_records(n: usize, seed: u64) -> Vec<PatientRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|i| {
            let imd = match rng.random_range(0..7) {
                6 => Value::Null,
                q => Value::Int(q),
            };
            let sex = if rng.random_bool(0.5) { "F" } else { "M" };
            PatientRecord::new(i as i64)
                .with("population", rng.random_bool(0.8))
                .with("eligible", rng.random_range(0..2_i64))
                .with("outcome", rng.random_bool(0.3))
                .with("imd", imd)
                .with("sex", sex)
        })
        .collect()
}

/// Attributes a study reads from the extraction rather than deriving itself
#[must_use]
pub fn raw_attributes(study: &StudyDefinition) -> BTreeSet<String> {
    let derived: BTreeSet<&str> = study.variables.iter().map(|v| v.name.as_str()).collect();
    let mut required: BTreeSet<&str> = study.population.required_attributes().into_iter().collect();
    for variable in &study.variables {
        required.extend(variable.required_attributes());
    }
    for measure in &study.measures {
        required.extend(measure.required_attributes());
    }
    required.extend(study.covariates.iter().map(String::as_str));
    required
        .into_iter()
        .filter(|name| !derived.contains(name) && *name != DEFAULT_POPULATION_ATTRIBUTE)
        .map(str::to_string)
        .collect()
}

/// Plausible extracted records carrying every raw attribute of `study`
#[must_use]
pub fn synthetic_extract(study: &StudyDefinition, n: usize, seed: u64) -> Vec<PatientRecord> {
    let attributes = raw_attributes(study);
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|i| {
            let mut record = PatientRecord::new(i as i64 + 1);
            for name in &attributes {
                let value = match name.as_str() {
                    "age" => Value::Int(rng.random_range(10..100)),
                    "sex" => Value::from(["F", "M", "U"][rng.random_range(0..3)]),
                    "household" => Value::Int(rng.random_range(0..8)),
                    "index_of_multiple_deprivation" => Value::Int(rng.random_range(0..33_000)),
                    "msoa" => Value::from(if rng.random_bool(0.9) { "E02000001" } else { "" }),
                    "urban_rural" => Value::Int(rng.random_range(1..9)),
                    "stp" => Value::from(if rng.random_bool(0.9) { "E54000005" } else { "missing" }),
                    "migration_status" => {
                        if rng.random_bool(0.1) {
                            Value::Null
                        } else {
                            Value::Int(rng.random_range(1..3))
                        }
                    }
                    "died" => Value::Int(i64::from(rng.random_bool(0.05))),
                    "has_follow_up" => Value::Int(i64::from(rng.random_bool(0.95))),
                    _ => Value::Int(i64::from(rng.random_bool(0.3))),
                };
                record.set(name.clone(), value);
            }
            record
        })
        .collect()
}

/// Write `(patient_id, age, stp)` rows to a Parquet file
pub fn write_patient_parquet(path: &Path, rows: &[(i64, Option<i64>, Option<&str>)]) {
    let schema = Arc::new(Schema::new(vec![
        Field::new("patient_id", DataType::Int64, false),
        Field::new("age", DataType::Int64, true),
        Field::new("stp", DataType::Utf8, true),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.0))),
        Arc::new(rows.iter().map(|r| r.1).collect::<Int64Array>()),
        Arc::new(rows.iter().map(|r| r.2).collect::<StringArray>()),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();

    let file = std::fs::File::create(path).unwrap();
    let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
}
