//! Reading patient records from Parquet files
//!
//! Each row becomes one [`PatientRecord`]. The identifier column supplies the
//! patient id and every other column becomes an attribute of the same name.
//! Boolean columns load as 0/1 integers so a flag groups the same way
//! whichever files typed it as boolean.

use std::fs::File;
use std::path::{Path, PathBuf};

use arrow::array::{Array, ArrayRef, ArrowPrimitiveType, AsArray};
use arrow::datatypes::{
    DataType, Float32Type, Float64Type, Int8Type, Int16Type, Int32Type, Int64Type, UInt8Type,
    UInt16Type, UInt32Type, UInt64Type,
};
use arrow::record_batch::RecordBatch;
use indicatif::ParallelProgressIterator;
use itertools::Itertools;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use rayon::prelude::*;

use crate::error::{Result, StudyError};
use crate::models::{PatientRecord, Value};
use crate::utils::logging::{
    create_main_progress_bar, finish_progress_bar, log_operation_complete, log_operation_start,
    log_warning,
};

/// Validates that a directory exists and is a directory
pub fn validate_directory(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        return Err(StudyError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Directory does not exist: {}", dir.display()),
        )));
    }
    Ok(())
}

/// Find all Parquet files in a directory, sorted by path
///
/// # Errors
/// Returns an error if the directory does not exist or cannot be read
pub fn find_parquet_files(dir: &Path) -> Result<Vec<PathBuf>> {
    log_operation_start("Searching for parquet files in", dir);
    validate_directory(dir)?;

    let parquet_files = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .filter_ok(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "parquet"))
        .collect::<std::io::Result<Vec<_>>>()?
        .into_iter()
        .sorted()
        .collect_vec();

    if parquet_files.is_empty() {
        log_warning("No Parquet files found in directory", Some(dir));
    } else {
        log_operation_complete("found", dir, parquet_files.len(), "files", None);
    }

    Ok(parquet_files)
}

/// Read every row of a Parquet file as a patient record
///
/// # Errors
/// Returns an error if the file cannot be read, the id column is missing or
/// null, or a column has a type that has no [`Value`] counterpart
pub fn read_patient_records(path: &Path, id_column: &str) -> Result<Vec<PatientRecord>> {
    let start = std::time::Instant::now();
    log_operation_start("Reading patient records from", path);

    let file = File::open(path).map_err(|e| {
        StudyError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to open file {}: {}", path.display(), e),
        ))
    })?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut records = Vec::new();
    for batch in reader {
        records.extend(records_from_batch(&batch?, id_column)?);
    }

    log_operation_complete("read", path, records.len(), "records", Some(start.elapsed()));
    Ok(records)
}

/// Read several Parquet files in parallel, keeping file order
///
/// # Errors
/// Returns the first error encountered by any file
pub fn load_patient_records_parallel(
    paths: &[PathBuf],
    id_column: &str,
) -> Result<Vec<PatientRecord>> {
    let pb = create_main_progress_bar(paths.len() as u64, Some("Loading patient records"));

    let per_file = paths
        .par_iter()
        .progress_with(pb.clone())
        .map(|path| read_patient_records(path, id_column))
        .collect::<Result<Vec<_>>>()?;

    let records = per_file.into_iter().flatten().collect_vec();
    finish_progress_bar(&pb, Some("Patient records loaded"));
    log::info!(
        "Loaded {} patient records from {} Parquet files",
        records.len(),
        paths.len()
    );
    Ok(records)
}

/// Convert one record batch into patient records
///
/// # Errors
/// Returns a conversion error if the id column is missing, not an integer
/// column or contains nulls, or if another column has an unsupported type
pub fn records_from_batch(batch: &RecordBatch, id_column: &str) -> Result<Vec<PatientRecord>> {
    let schema = batch.schema();
    let id_index = schema.index_of(id_column).map_err(|_| {
        StudyError::Conversion(format!("id column '{id_column}' not found in record batch"))
    })?;

    let id_array = batch.column(id_index);
    if !id_array.data_type().is_integer() {
        return Err(StudyError::Conversion(format!(
            "id column '{id_column}' has type {}, expected an integer",
            id_array.data_type()
        )));
    }
    let ids = column_values(id_array, id_column)?
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            value.as_i64().ok_or_else(|| {
                StudyError::Conversion(format!("null patient id in row {row} of '{id_column}'"))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut columns = schema
        .fields()
        .iter()
        .enumerate()
        .filter(|(index, _)| *index != id_index)
        .map(|(index, field)| {
            column_values(batch.column(index), field.name())
                .map(|values| (field.name().clone(), values.into_iter()))
        })
        .collect::<Result<Vec<_>>>()?;

    let records = ids
        .into_iter()
        .map(|patient_id| {
            let mut record = PatientRecord::new(patient_id);
            for (name, values) in &mut columns {
                record.set(name.clone(), values.next().unwrap_or_default());
            }
            record
        })
        .collect();
    Ok(records)
}

fn integers<T>(array: &ArrayRef) -> Vec<Value>
where
    T: ArrowPrimitiveType,
    T::Native: Into<i64>,
{
    array
        .as_primitive::<T>()
        .iter()
        .map(|v| v.map_or(Value::Null, |n| Value::Int(n.into())))
        .collect()
}

fn floats<T>(array: &ArrayRef) -> Vec<Value>
where
    T: ArrowPrimitiveType,
    T::Native: Into<f64>,
{
    array
        .as_primitive::<T>()
        .iter()
        .map(|v| v.map_or(Value::Null, |n| Value::Float(n.into())))
        .collect()
}

fn column_values(array: &ArrayRef, name: &str) -> Result<Vec<Value>> {
    let values = match array.data_type() {
        DataType::Null => vec![Value::Null; array.len()],
        DataType::Boolean => array
            .as_boolean()
            .iter()
            .map(|v| v.map_or(Value::Null, |b| Value::Int(i64::from(b))))
            .collect(),
        DataType::Int8 => integers::<Int8Type>(array),
        DataType::Int16 => integers::<Int16Type>(array),
        DataType::Int32 => integers::<Int32Type>(array),
        DataType::Int64 => integers::<Int64Type>(array),
        DataType::UInt8 => integers::<UInt8Type>(array),
        DataType::UInt16 => integers::<UInt16Type>(array),
        DataType::UInt32 => integers::<UInt32Type>(array),
        DataType::UInt64 => array
            .as_primitive::<UInt64Type>()
            .iter()
            .map(|v| match v {
                None => Ok(Value::Null),
                Some(n) => i64::try_from(n).map(Value::Int).map_err(|_| {
                    StudyError::Conversion(format!("column '{name}' value {n} exceeds i64"))
                }),
            })
            .collect::<Result<Vec<_>>>()?,
        DataType::Float32 => floats::<Float32Type>(array),
        DataType::Float64 => floats::<Float64Type>(array),
        DataType::Utf8 => array
            .as_string::<i32>()
            .iter()
            .map(|v| v.map_or(Value::Null, Value::from))
            .collect(),
        DataType::LargeUtf8 => array
            .as_string::<i64>()
            .iter()
            .map(|v| v.map_or(Value::Null, Value::from))
            .collect(),
        other => {
            return Err(StudyError::Conversion(format!(
                "column '{name}' has unsupported type {other}"
            )));
        }
    };
    Ok(values)
}
