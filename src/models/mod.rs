//! Domain models for measure aggregation
//!
//! Patient records as delivered by the extraction framework, the values they
//! carry, and the measure definitions and results computed over them.

pub mod measure;
pub mod record;
pub mod value;

// Re-export commonly used types
pub use measure::{Counts, GroupKey, MeasureDefinition, MeasureResult, validate_definitions};
pub use record::{PatientId, PatientRecord};
pub use value::Value;
