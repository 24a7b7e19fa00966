//! Error handling for cohort selection and measure aggregation.

use std::io;

use arrow::error::ArrowError;
use parquet::errors::ParquetError;

use crate::models::PatientId;

/// Specialized error type for study runs
#[derive(Debug, thiserror::Error)]
pub enum StudyError {
    /// Structural problem in a measure definition, detected before any record is read
    #[error("Invalid measure definition '{measure_id}': {reason}")]
    InvalidDefinition {
        /// Identifier of the offending definition
        measure_id: String,
        /// What is wrong with it
        reason: String,
    },

    /// A record lacks an attribute referenced by a definition or variable
    #[error("Record {patient_id} has no attribute '{attribute}' required by '{measure_id}'")]
    MissingAttribute {
        /// Definition or variable that referenced the attribute
        measure_id: String,
        /// The record that lacks it
        patient_id: PatientId,
        /// The missing attribute name
        attribute: String,
    },

    /// Malformed predicate expression
    #[error("Invalid expression: {0}")]
    InvalidExpression(String),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Error processing Parquet data
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    /// Error opening or reading a file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Error reading a definition file
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Input column that cannot be turned into attribute values
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// The counting pool could not be started
    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}

impl StudyError {
    /// Shorthand for an [`StudyError::InvalidDefinition`]
    pub fn invalid_definition(measure_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            measure_id: measure_id.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`StudyError::MissingAttribute`]
    pub fn missing_attribute(
        measure_id: impl Into<String>,
        patient_id: PatientId,
        attribute: impl Into<String>,
    ) -> Self {
        Self::MissingAttribute {
            measure_id: measure_id.into(),
            patient_id,
            attribute: attribute.into(),
        }
    }
}

/// Result type for study operations
pub type Result<T> = std::result::Result<T, StudyError>;
