//! Writing measure tables
//!
//! One table per measure: a text column per group-by attribute followed by
//! `numerator`, `denominator`, `value` and `date`. Missing group values and
//! undefined rates are written as empty cells.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, Date32Array, Float64Array, StringArray, UInt64Array};
use arrow::csv::WriterBuilder;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;

use crate::error::{Result, StudyError};
use crate::models::{MeasureDefinition, MeasureResult};
use crate::utils::logging::log_operation_complete;

/// Days since the Unix epoch, as stored in a `Date32` column
fn epoch_days(date: NaiveDate) -> Result<i32> {
    let days = date.signed_duration_since(NaiveDate::default()).num_days();
    i32::try_from(days)
        .map_err(|_| StudyError::Conversion(format!("date {date} is out of range for Date32")))
}

/// File name of the table for one measure
#[must_use]
pub fn measure_file_name(measure_id: &str) -> String {
    format!("measure_{measure_id}.csv")
}

/// Build the output table for one measure from the rows that belong to it
///
/// Rows keep the order they have in `results`.
pub fn measure_batch(
    definition: &MeasureDefinition,
    results: &[MeasureResult],
    index_date: NaiveDate,
) -> Result<RecordBatch> {
    let rows: Vec<&MeasureResult> = results
        .iter()
        .filter(|r| r.measure_id == definition.id)
        .collect();

    let mut fields = Vec::with_capacity(definition.group_by.len() + 4);
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(definition.group_by.len() + 4);

    for (index, attribute) in definition.group_by.iter().enumerate() {
        fields.push(Field::new(attribute, DataType::Utf8, true));
        let values: StringArray = rows
            .iter()
            .map(|row| {
                row.group_key
                    .get(index)
                    .filter(|value| !value.is_null())
                    .map(ToString::to_string)
            })
            .collect();
        columns.push(Arc::new(values));
    }

    fields.push(Field::new("numerator", DataType::UInt64, false));
    columns.push(Arc::new(UInt64Array::from_iter_values(
        rows.iter().map(|row| row.numerator),
    )));
    fields.push(Field::new("denominator", DataType::UInt64, false));
    columns.push(Arc::new(UInt64Array::from_iter_values(
        rows.iter().map(|row| row.denominator),
    )));
    fields.push(Field::new("value", DataType::Float64, true));
    columns.push(Arc::new(rows.iter().map(|row| row.rate).collect::<Float64Array>()));

    let date = epoch_days(index_date)?;
    fields.push(Field::new("date", DataType::Date32, false));
    columns.push(Arc::new(Date32Array::from(vec![date; rows.len()])));

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

/// Write one CSV file per measure into `dir`
///
/// Measures with no rows still get a file with only the header.
pub fn write_measure_csv(
    dir: &Path,
    definitions: &[MeasureDefinition],
    results: &[MeasureResult],
    index_date: NaiveDate,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(definitions.len());

    for definition in definitions {
        let batch = measure_batch(definition, results, index_date)?;
        let path = dir.join(measure_file_name(&definition.id));
        let file = File::create(&path)?;
        let mut writer = WriterBuilder::new().with_header(true).build(file);
        writer.write(&batch)?;
        log_operation_complete("wrote", &path, batch.num_rows(), "rows", None);
        written.push(path);
    }

    Ok(written)
}
