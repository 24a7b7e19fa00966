//! Stratified measure tables for electronic health record studies.
//!
//! Patient records extracted at an index date are narrowed to a study
//! cohort, enriched with derived variables and counted into
//! numerator/denominator tables per group of stratifying attributes.

pub mod algorithm;
pub mod config;
pub mod error;
pub mod filter;
pub mod models;
pub mod study;
pub mod utils;

// Core types
pub use config::{AggregatorConfig, StudyConfig};
pub use error::{Result, StudyError};
pub use models::{MeasureDefinition, MeasureResult, PatientId, PatientRecord, Value};

// Aggregation and cohort selection
pub use algorithm::population::{CohortStatistics, StudyDefinition, StudyRun};
pub use algorithm::{compute, compute_with_config};

// Criteria
pub use filter::{Expr, attr, flag, lit};

// File input and output
pub use utils::io::{
    find_parquet_files, load_patient_records_parallel, load_study_definition,
    read_patient_records, write_measure_csv,
};
