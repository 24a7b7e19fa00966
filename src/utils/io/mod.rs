//! File input and output
//!
//! Patient records come in as Parquet, measure tables go out as CSV and
//! study definitions are stored as JSON.

pub mod definition;
pub mod output;
pub mod parquet;

pub use definition::{load_measure_definitions, load_study_definition, save_study_definition};
pub use output::{measure_batch, measure_file_name, write_measure_csv};
pub use parquet::{
    find_parquet_files, load_patient_records_parallel, read_patient_records, records_from_batch,
};
